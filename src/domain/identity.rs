use rand::{distr::Alphanumeric, Rng};

use super::message::avatar_url;

const ID_SUFFIX_LEN: usize = 6;
const FALLBACK_USER_NAME: &str = "Anonymous";

/// Locally generated, unauthenticated user identity. One per storage context.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, user_name: Option<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name
                .filter(|name| !name.trim().is_empty())
                .unwrap_or_else(|| FALLBACK_USER_NAME.to_owned()),
        }
    }

    pub fn generate(now_ms: i64) -> Self {
        let mut rng = rand::rng();
        Self {
            user_id: local_id("user", now_ms),
            user_name: format!("User{}", rng.random_range(0..10_000)),
        }
    }

    pub fn avatar(&self) -> String {
        avatar_url(&self.user_id)
    }
}

/// Builds a local identifier: `<prefix>_<millis>_<random suffix>`.
///
/// Collisions are unlikely but not prevented.
pub fn local_id(prefix: &str, now_ms: i64) -> String {
    let suffix: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(ID_SUFFIX_LEN)
        .map(char::from)
        .collect();

    format!("{prefix}_{now_ms}_{suffix}")
}

pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
