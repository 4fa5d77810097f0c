//! Session registry
//!
//! The registry is the single owner of viewer sessions. It guarantees at most
//! one live session per resource id, so every consumer rendering the same
//! stream observes the same state machine.
//!
//! ```text
//!                     SessionRegistry
//!               ┌─────────────────────────────┐
//!               │ sessions: HashMap<id,       │
//!               │   Arc<ViewerSession>>       │
//!               │ config, transports,         │
//!               │ signaling                   │
//!               └──────────────┬──────────────┘
//!                              │ get_or_create(id)
//!           ┌──────────────────┼──────────────────┐
//!           ▼                  ▼                  ▼
//!      [SessionBridge]   [SessionBridge]    [RoomClient::join]
//!      subscribe()       get_snapshot()     start()
//! ```
//!
//! Sessions are never evicted; they are released when the registry is.

pub mod store;

pub use store::SessionRegistry;
