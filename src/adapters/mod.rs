//! Adapter implementations of the domain ports.

pub mod capture;
pub mod clock;
pub mod narrators;
pub mod storage;
