use crate::core::widget::UserFeedback;

/// Prints the warning indicator and alerts to the terminal.
#[derive(Debug, Default)]
pub struct TerminalFeedback {
    warning_visible: bool,
}

impl TerminalFeedback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warning_visible(&self) -> bool {
        self.warning_visible
    }
}

impl UserFeedback for TerminalFeedback {
    fn set_warning(&mut self, visible: bool) {
        if visible && !self.warning_visible {
            println!("⚠️  Align your face with the guide box and check the lighting");
        }
        self.warning_visible = visible;
    }

    fn alert(&mut self, message: &str) {
        println!("❌ {}", message);
    }
}
