//! Domain modules organized as vertical slices.
//!
//! Each sub-module contains some of:
//! - `mod.rs` — Domain types (validated, view-ready)
//! - `wire.rs` — Raw payload shapes matching backend responses
//! - `convert.rs` — Decoding from wire payloads
//! - `state.rs` — State containers with update methods (for feed-driven data)
//! - `client.rs` — Sub-client with HTTP methods

pub mod daily;
pub mod interest;
pub mod quote;
pub mod search;
