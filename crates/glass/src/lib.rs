//! Glass - a looking glass for network diagnostics
//!
//! Operators declare a fixed set of parameterized commands (ping, traceroute,
//! BGP lookups) per router. Untrusted callers pick a command and supply raw
//! values; every value is validated against its slot before any command text
//! exists, and the text is handed to a local shell or a remote device.

pub mod backend;
pub mod command;
pub mod config;
pub mod error;
pub mod log;
pub mod parameter;
pub mod router;
pub mod store;
pub mod table;

pub use backend::{Backend, LocalBackend, RemoteBackend, RemoteHost};
pub use command::{AnyCommand, Command, Decoration, OptionProbe, Template, TextCommand};
pub use config::GlassConfig;
pub use error::{GlassError, Result};
pub use log::CommandLog;
pub use parameter::{Parameter, ParameterKind, SelectOption, SelectionParameter, TextParameter};
pub use router::{RefreshReport, Router, RouterSettings};
pub use store::PersistentStorage;
pub use table::{Cell, Color, TableDecorator};
