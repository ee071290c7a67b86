//! Parsing and validation of caller-supplied query parameters.
//!
//! Everything here runs before any upstream request is issued, so a
//! malformed parameter never costs a round trip to the context broker.

use chrono::{DateTime, FixedOffset};
use std::fmt;
use std::str::FromStr;

use crate::error::{AggregationError, Result};
use crate::model::LatLng;

/// Orion rejects page sizes above this.
pub const MAX_PAGE_SIZE: u32 = 1000;

/// Calendar granularity used for time bucketing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month,
    Day,
    /// One bucket per hour. Spelled `time` on the wire.
    Time,
}

impl FromStr for Period {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "month" => Ok(Period::Month),
            "day" => Ok(Period::Day),
            "time" => Ok(Period::Time),
            other => Err(AggregationError::invalid(format!(
                "period must be one of month, day, time; got '{other}'"
            ))),
        }
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Period::Month => "month",
            Period::Day => "day",
            Period::Time => "time",
        })
    }
}

/// Closed polygon ring NW, NE, SE, SW, NW for a `coveredBy` filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsRing {
    pub vertices: [LatLng; 5],
}

impl BoundsRing {
    pub fn north(&self) -> f64 {
        self.vertices[0].lat
    }

    pub fn south(&self) -> f64 {
        self.vertices[2].lat
    }

    pub fn west(&self) -> f64 {
        self.vertices[0].lng
    }

    pub fn east(&self) -> f64 {
        self.vertices[1].lng
    }

    /// Renders the ring as Orion `coords`: `lat,lng;lat,lng;...`.
    pub fn to_coords(&self) -> String {
        self.vertices
            .iter()
            .map(|v| format!("{},{}", v.lat, v.lng))
            .collect::<Vec<_>>()
            .join(";")
    }

    /// Inclusive containment test, used where the store cannot filter for us.
    pub fn contains(&self, point: LatLng) -> bool {
        point.lat <= self.north()
            && point.lat >= self.south()
            && point.lng >= self.west()
            && point.lng <= self.east()
    }
}

/// Parses a `north,east,south,west` quadruple into a closed ring.
///
/// North/south and east/west are normalized so a swapped pair still yields
/// a well-formed ring.
///
/// # Errors
///
/// Returns [`AggregationError::InvalidArgument`] unless the input holds
/// exactly four finite numbers.
pub fn parse_bounds(bounds: &str) -> Result<BoundsRing> {
    let parts: Vec<&str> = bounds.split(',').map(str::trim).collect();
    if parts.len() != 4 {
        return Err(AggregationError::invalid(format!(
            "bounds must be 'north,east,south,west', got '{bounds}'"
        )));
    }

    let mut values = [0.0f64; 4];
    for (slot, part) in values.iter_mut().zip(&parts) {
        *slot = part
            .parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| {
                AggregationError::invalid(format!("bounds component '{part}' is not a number"))
            })?;
    }

    let [a_lat, a_lng, b_lat, b_lng] = values;
    let (north, south) = (a_lat.max(b_lat), a_lat.min(b_lat));
    let (east, west) = (a_lng.max(b_lng), a_lng.min(b_lng));

    let nw = LatLng::new(north, west);
    Ok(BoundsRing {
        vertices: [
            nw,
            LatLng::new(north, east),
            LatLng::new(south, east),
            LatLng::new(south, west),
            nw,
        ],
    })
}

/// Parses a `lat,lng` pair, e.g. the centre of a `near` filter.
pub fn parse_point(point: &str) -> Result<LatLng> {
    let invalid = || AggregationError::invalid(format!("point must be 'lat,lng', got '{point}'"));
    let (lat, lng) = point.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lng: f64 = lng.trim().parse().map_err(|_| invalid())?;
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lng) {
        return Err(invalid());
    }
    Ok(LatLng::new(lat, lng))
}

/// Parses an ISO-8601 / RFC 3339 instant, keeping the caller's offset.
pub fn parse_datetime(field: &str, value: &str) -> Result<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(value.trim())
        .map_err(|e| AggregationError::invalid(format!("{field} '{value}' is not a valid date: {e}")))
}

/// Parses the `limit` / `offset` pagination strings.
pub fn parse_page(limit: &str, offset: &str) -> Result<(u32, u32)> {
    let limit: u32 = limit
        .trim()
        .parse()
        .map_err(|_| AggregationError::invalid(format!("limit '{limit}' is not a number")))?;
    if limit == 0 || limit > MAX_PAGE_SIZE {
        return Err(AggregationError::invalid(format!(
            "limit must be between 1 and {MAX_PAGE_SIZE}, got {limit}"
        )));
    }
    let offset: u32 = offset
        .trim()
        .parse()
        .map_err(|_| AggregationError::invalid(format!("offset '{offset}' is not a number")))?;
    Ok((limit, offset))
}
