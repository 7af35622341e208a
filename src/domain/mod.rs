//! Domain records mirrored from the remote document store.

pub mod entities;
pub mod types;
