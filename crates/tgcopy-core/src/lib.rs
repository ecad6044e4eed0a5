//! Core domain + application logic for tgcopy, a one-shot Telegram channel copier.
//!
//! This crate is intentionally framework-agnostic. The MTProto client lives behind the
//! `TransportPort` trait implemented in the adapter crate.

pub mod config;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod media;
pub mod pacing;
pub mod preflight;
pub mod replicate;
pub mod resolver;
pub mod staging;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

pub use errors::{Error, Result};
