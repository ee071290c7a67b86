//! Rating aggregation for the map and chart views.
//!
//! Records are bucketed spatially into Web Mercator tiles ([`grid`]) and
//! temporally into calendar units ([`timeline`]); [`assemble`] merges both
//! into the frontend response, and [`individual`] produces the per-type
//! rows for the non-aggregated views.

pub mod assemble;
pub mod grid;
pub mod individual;
pub mod timeline;
pub mod types;
pub mod utility;
