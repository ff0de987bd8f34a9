//! stashcode: share files and text snippets behind short access codes.
//!
//! The crate keeps a local registry of created shares with expiry and
//! burn-after-reading rules, caches resolved download links, and talks to an
//! external share service over HTTP.

pub mod api;
pub mod config;
pub mod link_cache;
pub mod logging;
pub mod registry;
pub mod storage;
pub mod transfer;
