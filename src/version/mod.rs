//! Version checking layer
//!
//! This module fetches version information from a server, ranks preview
//! builds, and tracks whether the running client is out of date.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌─────────────┐     ┌─────────────┐
//! │VersionListFetcher│────▶│  Selection  │     │ VersionStore│
//! │     (catalog)    │     │(rank/filter)│     │(current/upd)│
//! └──────────────────┘     └─────────────┘     └─────────────┘
//!          │                                          ▲
//!          ▼                                          │
//! ┌──────────────────┐     ┌─────────────────────────────────┐
//! │ Request/Transport│◀────│      LatestVersionChecker       │
//! │   (HTTP GET)     │     │           (latest)              │
//! └──────────────────┘     └─────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`checker`]: Latest-version check that records the updated version
//! - [`fetcher`]: Catalog fetch returning the versions selected by rules
//! - [`selection`]: Ranking and filtering of catalog entries
//! - [`request`]: Request construction and outcome classification
//! - [`transport`]: Transport trait and its `reqwest` implementation
//! - [`store`]: Current/updated version state and durable slots
//! - [`error`]: Error types for requests, storage and selection rules
//! - [`types`]: Descriptors, catalogs and selection rules

pub mod checker;
pub mod error;
pub mod fetcher;
pub mod request;
pub mod selection;
pub mod store;
pub mod transport;
pub mod types;
