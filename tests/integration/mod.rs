//! Integration test suite for taskman.
//!
//! These tests drive the update function against a seeded in-memory
//! directory, executing remote commands the same way the runtime does.
//!
//! # Test Categories
//!
//! - `transitions`: Authorization, optimistic moves, drag and rollback
//! - `scopes`: Cache partitioning, reloads and stale responses
//! - `directory`: Create, join and bulk flows against the directory

mod fixtures;

mod directory;
mod scopes;
mod transitions;
