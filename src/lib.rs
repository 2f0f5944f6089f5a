//! Version checking for long-running clients
//!
//! Polls a server for the latest published version, compares it with the
//! version the client is running, and lists preview builds published for
//! pull requests and branches.

pub mod config;
pub mod logging;
pub mod version;
