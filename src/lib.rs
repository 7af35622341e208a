//! Local cache layer for the recipe and social client.
//!
//! The cache mirrors records fetched from the remote document store in
//! bounded, per-domain in-memory stores. It is advisory: a miss is always
//! answered by re-fetching from the remote source.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
