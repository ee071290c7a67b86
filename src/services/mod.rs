pub mod rating_source;

pub use rating_source::{GeoFilter, RatingQuery, RatingSource};
