//! Trait and query types for reading and writing rating records.

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::Result;
use crate::model::{LatLng, RatingRecord};
use crate::parser::BoundsRing;
use crate::rating::{NewRating, Submitter};

/// Spatial restriction applied by the store.
#[derive(Debug, Clone, PartialEq)]
pub enum GeoFilter {
    /// Within `max_distance_m` metres of `point`.
    Near { point: LatLng, max_distance_m: u32 },
    /// Inside (or on the edge of) a bounding ring.
    CoveredBy(BoundsRing),
}

impl GeoFilter {
    /// Orion `georel` parameter.
    pub fn georel(&self) -> String {
        match self {
            GeoFilter::Near { max_distance_m, .. } => format!("near;maxDistance:{max_distance_m}"),
            GeoFilter::CoveredBy(_) => "coveredBy".to_string(),
        }
    }

    /// Orion `geometry` parameter.
    pub fn geometry(&self) -> &'static str {
        match self {
            GeoFilter::Near { .. } => "point",
            GeoFilter::CoveredBy(_) => "polygon",
        }
    }

    /// Orion `coords` parameter, `lat,lng` pairs separated by `;`.
    pub fn coords(&self) -> String {
        match self {
            GeoFilter::Near { point, .. } => format!("{},{}", point.lat, point.lng),
            GeoFilter::CoveredBy(ring) => ring.to_coords(),
        }
    }

    pub fn matches(&self, at: LatLng) -> bool {
        match self {
            GeoFilter::Near {
                point,
                max_distance_m,
            } => haversine_m(*point, at) <= f64::from(*max_distance_m),
            GeoFilter::CoveredBy(ring) => ring.contains(at),
        }
    }
}

#[inline]
fn haversine_m(a: LatLng, b: LatLng) -> f64 {
    let r = 6_371_000.0_f64;
    let dlat = (b.lat - a.lat).to_radians();
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (dlng / 2.0).sin().powi(2);
    2.0 * r * h.sqrt().atan2((1.0 - h).sqrt())
}

/// A filtered, paginated read. Results are ordered by descending timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingQuery {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub limit: u32,
    pub offset: u32,
    pub nickname: Option<String>,
    pub geo: Option<GeoFilter>,
}

impl RatingQuery {
    /// Orion simple query language expression, e.g.
    /// `timestamp>=2024-03-14T15:00:00.000Z;timestamp<=2024-03-20T14:59:59.000Z`.
    pub fn q(&self) -> String {
        let time_range = format!(
            "timestamp>={};timestamp<={}",
            self.start.to_rfc3339_opts(SecondsFormat::Millis, true),
            self.end.to_rfc3339_opts(SecondsFormat::Millis, true),
        );
        match &self.nickname {
            Some(nickname) => format!("nickname=={nickname};{time_range}"),
            None => time_range,
        }
    }

    pub fn with_geo(&self, geo: GeoFilter) -> Self {
        Self {
            geo: Some(geo),
            ..self.clone()
        }
    }

    /// In-memory equivalent of the store-side filter.
    pub fn matches(&self, record: &RatingRecord) -> bool {
        if record.timestamp < self.start || record.timestamp > self.end {
            return false;
        }
        if let Some(nickname) = &self.nickname {
            if record.nickname.as_deref() != Some(nickname.as_str()) {
                return false;
            }
        }
        match (&self.geo, record.location) {
            (None, _) => true,
            (Some(geo), Some(at)) => geo.matches(at),
            (Some(_), None) => false,
        }
    }
}

/// Abstraction over the system of record (live context broker or fixture).
#[async_trait]
pub trait RatingSource: Send + Sync {
    /// Returns up to `query.limit` matching records, newest first.
    async fn query(&self, query: &RatingQuery) -> Result<Vec<RatingRecord>>;

    /// Persists a validated rating under `id`.
    async fn create(&self, id: &str, rating: &NewRating, submitter: &Submitter) -> Result<()>;
}
