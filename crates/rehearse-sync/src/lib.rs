//! Remote progress sync for rehearse.
//!
//! Implements [`RemoteProgressPort`](rehearse_core::RemoteProgressPort) over
//! a small JSON API:
//!
//! | Method | Path              | Body / response          |
//! |--------|-------------------|--------------------------|
//! | `PUT`  | `{base}/progress/{key}` | `ProgressSnapshot` JSON |
//! | `GET`  | `{base}/progress/{key}` | `ProgressSnapshot` JSON, `404` if none |
//!
//! `{key}` is `script::character`, percent-encoded as one path segment.
#![deny(unsafe_code)]
// DefaultSyncClient is meant to be used through the RemoteProgressPort
// trait, not its internal generic structure
#![allow(private_interfaces, private_bounds)]

mod client;
mod config;
mod error;
mod http;

pub use client::DefaultSyncClient;
pub use config::SyncClientConfig;
pub use error::SyncError;
