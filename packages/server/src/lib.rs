// Food delivery platform - API Core
//
// Order lifecycle, courier dispatch and live order tracking.
// Domain actions live in domains/*; infrastructure behind traits in kernel/.

pub mod common;
pub mod config;
pub mod domains;
pub mod kernel;
pub mod server;

pub use config::*;
