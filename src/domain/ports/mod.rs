//! Port trait definitions (Hexagonal Architecture)
//!
//! - SessionStore: durable session snapshot
//! - Narrator: remote status-message generation
//! - FrameSource: optional visual capture
//! - Clock: wall-clock time
//!
//! These traits keep the engine independent of concrete storage, network
//! and capture implementations.

pub mod clock;
pub mod frame_source;
pub mod narrator;
pub mod session_store;

pub use clock::Clock;
pub use frame_source::{CaptureError, FrameSource};
pub use narrator::{Narrator, NarratorError};
pub use session_store::{LoadedSnapshot, SessionStore};
