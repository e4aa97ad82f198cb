//! Logging setup.
//!
//! Renderer code only talks to the `log` facade; hosts call [`init_logging`]
//! once at startup to install `env_logger`.

mod init;

pub use init::{init_logging, LoggingConfig};
