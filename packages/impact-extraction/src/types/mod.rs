//! Data types for the impact extraction library.

pub mod config;
pub mod facts;
pub mod material;
pub mod result;
pub mod session;
