//! CLI command implementations.

pub mod decode;
pub mod report;
pub mod watch;
