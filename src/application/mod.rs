//! Application services on top of the local cache.

pub mod error;
pub mod repository;
pub mod soak;
