//! Glass Core - Shared functionality for the glass tools
//!
//! Standard locations and process-wide settings for a looking glass that
//! exposes a fixed set of diagnostic commands to untrusted callers.

pub mod paths;
pub mod settings;

pub use paths::Paths;
pub use settings::{Messages, Settings};
