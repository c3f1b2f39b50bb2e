//! Frame source adapters.

pub mod file_frame;
pub mod mock;

pub use file_frame::FileFrameSource;
pub use mock::{MockCapture, MockFrameSource};
