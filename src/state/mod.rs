/// State management module
///
/// Session state and its transition function, owned exclusively by the
/// session controller.

pub mod session_state;

// Re-export commonly used types
pub use session_state::{MonitoringStatus, Outcome, Phase, SessionInput, SessionState};
