//! Dispatch Integration Tests
//!
//! Proxies reached through names, remote calls over the loopback transport,
//! delegate swaps under load, and wire-level properties.

#[path = "../common/mod.rs"]
mod common;

mod delegate_swap;
mod properties;
mod remote_calls;
