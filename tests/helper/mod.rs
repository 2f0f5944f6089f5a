//! Shared test utilities

#![allow(dead_code)]

pub mod server;
pub mod store;

pub use server::*;
pub use store::*;
