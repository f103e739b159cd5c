//! Data-source adapter implementations.
//!
//! - [`JplSbdbSource`] - NASA JPL Small-Body Database asteroid lookup
//! - [`GuardedSource`] - Timeout and bounded retry around any source
//!
//! Geological classification lives in [`crate::types::material`] and raster
//! bathymetry interpretation in [`BathymetrySample::from_raster_value`].
//!
//! [`BathymetrySample::from_raster_value`]: crate::types::facts::BathymetrySample::from_raster_value

pub mod guarded;
pub mod jpl;

pub use guarded::GuardedSource;
pub use jpl::{parse_sbdb_response, JplSbdbSource, SBDB_SOURCE_ID, SBDB_TIMEOUT};
