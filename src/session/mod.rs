/// Focus session orchestration
///
/// [`SessionController`] applies inputs to the session state and owns the
/// sentinel worker. [`SessionRunner`] feeds it clock ticks, user commands and
/// sentinel messages from a single thread.
pub mod controller;
pub mod runner;

pub use controller::SessionController;
pub use runner::SessionRunner;
