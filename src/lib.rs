//! Domain and persistence layer of a discussion forum.
//!
//! Every service receives its [`Database`](storage::database::Database)
//! handle explicitly; [`App`](core::app::App) wires a full set together.

pub mod auth;
pub mod blocking;
pub mod board;
pub mod core;
pub mod crypto;
pub mod storage;
pub mod telemetry;
pub mod validation;

pub use crate::core::app::App;
pub use crate::core::clock::{Clock, ManualClock, SystemClock};
pub use crate::core::config::Config;
pub use crate::core::error::{ForumError, ForumResult};
pub use crate::core::types::{BlockRecord, ContentState, Post, Thread, User};
