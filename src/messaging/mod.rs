/// Messaging module for the Event/Command split
///
/// - **Events**: notifications of things that happened to the session
///   (past tense, broadcast to observers)
/// - **Commands**: user intents from the presentation layer (imperative,
///   applied to the controller)
///
/// ## Architecture
///
/// ```text
/// ┌──────────────┐  Command   ┌───────────────┐  SessionEvent  ┌───────────┐
/// │ Presentation │ ─────────> │ SessionRunner │ ─────────────> │ Event Bus │
/// └──────────────┘            │  (controller) │                └───────────┘
///        ▲                    └───────────────┘                      │
///        │                            ▲                              │
///        │                            │ DetectionEvent               │
///        │                    ┌───────────────┐                      │
///        │                    │   Sentinel    │                      │
///        │                    └───────────────┘                      │
///        └───────────────────────────────────────────────────────────┘
/// ```

pub mod bus;
pub mod commands;
pub mod events;

// Re-export commonly used types
pub use bus::{EventBus, SubscriberId};
pub use commands::Command;
pub use events::{format_remaining, SessionEvent};
