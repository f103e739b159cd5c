//! Core trait abstractions for the impact extraction library.
//!
//! These traits define the seams applications implement to plug in data
//! sources and storage backends.

pub mod sources;
pub mod store;
