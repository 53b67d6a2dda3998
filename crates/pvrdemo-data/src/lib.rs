//! Demo PVR backend data.
//!
//! Loads channels, channel groups, EPG templates, recordings and timers
//! from a single XML document and serves them to a host through the
//! [`host::TransferSink`] callback contract.

/// Host-facing lifecycle glue.
pub mod client;
mod data;
/// Host transfer records, constants and the sink trait.
pub mod host;
mod loader;
/// Records held by the data store.
pub mod types;
mod util;
mod xml;

pub use client::DemoClient;
pub use data::DemoData;
pub use loader::{
    DEFAULT_ICON, DemoDataLoader, DemoDataLoaderBuilder, LoadError, SETTINGS_FILE_NAME,
    settings_file,
};
