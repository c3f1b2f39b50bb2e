//! CLI command implementations.

pub mod config;
pub mod init;
pub mod narrate;
pub mod reset;
pub mod run;
pub mod status;
