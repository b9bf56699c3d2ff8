//! Structured logging and optional OpenTelemetry span export.
//!
//! Log level is configurable via `LOG_LEVEL` (default: `info`); `RUST_LOG`
//! takes precedence when set. Fortune text is never logged, only ids.

pub mod init;

pub use init::init_telemetry;
