//! Shared test helpers for `kronos-core` integration tests.
//!
//! These helpers provide an in-memory store and seeding fixtures so the
//! engine tests can focus on behaviour instead of boilerplate.

pub mod stores;
