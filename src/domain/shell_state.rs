use super::{message::ChatMessage, room::ChatRoom};

/// One unit of chat shell output; the UI decides how it looks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutput {
    Notice(String),
    Message(ChatMessage),
    MessageRemoved { message_id: String },
    Rooms {
        rooms: Vec<ChatRoom>,
        current: Option<String>,
    },
    Help,
}

impl ShellOutput {
    pub fn notice(text: impl Into<String>) -> Self {
        Self::Notice(text.into())
    }
}

/// State of the interactive chat shell: running flag plus pending output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellState {
    running: bool,
    output: Vec<ShellOutput>,
}

impl Default for ShellState {
    fn default() -> Self {
        Self {
            running: true,
            output: Vec::new(),
        }
    }
}

impl ShellState {
    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn emit(&mut self, output: ShellOutput) {
        self.output.push(output);
    }

    pub fn notice(&mut self, text: impl Into<String>) {
        self.emit(ShellOutput::notice(text));
    }

    pub fn take_output(&mut self) -> Vec<ShellOutput> {
        std::mem::take(&mut self.output)
    }
}
