//! Execution backends
//!
//! A backend owns the raw execution primitive of a router:
//! - Local: runs command text through the local shell
//! - Remote: runs command text on a remote device over SSH

pub mod local;
pub mod remote;

use crate::error::Result;

pub use local::LocalBackend;
pub use remote::{RemoteBackend, RemoteHost};

/// Raw execution primitive supplied by a concrete router variant
pub trait Backend: Send + Sync + std::fmt::Debug {
    /// Run fully built command text and return its textual output
    fn run_raw(&self, command: &str) -> Result<String>;

    /// Whether running a command needs an out-of-process helper
    fn fork_needed(&self) -> bool {
        false
    }

    /// Short description for listings
    fn describe(&self) -> String;
}
