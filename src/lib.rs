//! ZenFocus
//!
//! A focus timer that watches the camera and pauses its countdown while a
//! phone is in view.
//!
//! The [`session::SessionController`] owns the session state machine. A
//! [`sentinel::Sentinel`] running on its own thread classifies frames and
//! reports debounced violation events back to the controller. Observers
//! receive [`messaging::SessionEvent`]s through the event bus.

pub mod capture;
pub mod config;
pub mod detection;
pub mod error;
pub mod messaging;
pub mod sentinel;
pub mod session;
pub mod state;
