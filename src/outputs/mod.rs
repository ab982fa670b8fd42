//! Output of collected links.
//!
//! - [`console`]: the link listing and run summary on stdout
//! - [`json`]: an optional JSON report file (`--output`)

pub mod console;
pub mod json;
