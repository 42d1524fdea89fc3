use serde::{Deserialize, Serialize};

/// Maximum number of calculator history entries kept per user.
pub const CALC_HISTORY_LIMIT: usize = 10;

/// One finished calculation, e.g. `"2 + 3 = 5"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CalcEntry {
    pub calculation: String,
    /// Unix milliseconds.
    pub created_at: i64,
}

impl CalcEntry {
    pub fn new(calculation: impl Into<String>, created_at: i64) -> Self {
        Self {
            calculation: calculation.into(),
            created_at,
        }
    }
}

/// Puts `entry` in front of `history` (newest first) and drops the overflow.
pub fn push_newest(history: &mut Vec<CalcEntry>, entry: CalcEntry) {
    history.insert(0, entry);
    history.truncate(CALC_HISTORY_LIMIT);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_newest_keeps_latest_ten_newest_first() {
        let mut history = Vec::new();
        for i in 0..12 {
            push_newest(&mut history, CalcEntry::new(format!("{i} + 0 = {i}"), i));
        }

        assert_eq!(history.len(), CALC_HISTORY_LIMIT);
        assert_eq!(history[0].calculation, "11 + 0 = 11");
        assert_eq!(history[9].calculation, "2 + 0 = 2");
    }
}
