pub mod ascii_preview;
pub mod feedback;

pub use ascii_preview::{AsciiRenderer, clear_screen};
pub use feedback::TerminalFeedback;
