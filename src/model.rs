//! Core domain types: happiness types, answer sets and rating records.

use chrono::{DateTime, Utc};
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::fmt;
use std::ops::{Index, IndexMut};
use std::str::FromStr;

use crate::error::AggregationError;

/// One of the six fixed rating categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HappinessType {
    Happiness1,
    Happiness2,
    Happiness3,
    Happiness4,
    Happiness5,
    Happiness6,
}

impl HappinessType {
    /// Every type, in wire order.
    pub const ALL: [HappinessType; 6] = [
        HappinessType::Happiness1,
        HappinessType::Happiness2,
        HappinessType::Happiness3,
        HappinessType::Happiness4,
        HappinessType::Happiness5,
        HappinessType::Happiness6,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Attribute / JSON field name, e.g. `"happiness3"`.
    pub fn as_str(self) -> &'static str {
        match self {
            HappinessType::Happiness1 => "happiness1",
            HappinessType::Happiness2 => "happiness2",
            HappinessType::Happiness3 => "happiness3",
            HappinessType::Happiness4 => "happiness4",
            HappinessType::Happiness5 => "happiness5",
            HappinessType::Happiness6 => "happiness6",
        }
    }
}

impl fmt::Display for HappinessType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HappinessType {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        HappinessType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| AggregationError::invalid(format!("unknown happiness type '{s}'")))
    }
}

impl Serialize for HappinessType {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// A value per happiness type, serialized as `{"happiness1": .., ..., "happiness6": ..}`.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PerType<T>(pub [T; 6]);

impl<T> PerType<T> {
    pub fn iter(&self) -> impl Iterator<Item = (HappinessType, &T)> {
        HappinessType::ALL.into_iter().zip(self.0.iter())
    }
}

impl<T> Index<HappinessType> for PerType<T> {
    type Output = T;

    fn index(&self, t: HappinessType) -> &T {
        &self.0[t.index()]
    }
}

impl<T> IndexMut<HappinessType> for PerType<T> {
    fn index_mut(&mut self, t: HappinessType) -> &mut T {
        &mut self.0[t.index()]
    }
}

impl<T: Serialize> Serialize for PerType<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(6))?;
        for (t, v) in self.iter() {
            map.serialize_entry(t.as_str(), v)?;
        }
        map.end()
    }
}

/// The six binary answers of one submission.
pub type Answers = PerType<u8>;

/// Per-type arithmetic means over a set of submissions.
pub type Means = PerType<f64>;

impl Answers {
    /// Builds an answer set from raw numeric values, rejecting anything other than 0 or 1.
    pub fn from_values(values: [f64; 6]) -> Result<Self, AggregationError> {
        let mut out = [0u8; 6];
        for (slot, (t, v)) in out.iter_mut().zip(HappinessType::ALL.into_iter().zip(values)) {
            *slot = match v {
                v if v == 0.0 => 0,
                v if v == 1.0 => 1,
                other => {
                    return Err(AggregationError::invalid(format!(
                        "{t} must be 0 or 1, got {other}"
                    )));
                }
            };
        }
        Ok(PerType(out))
    }

    pub fn is_set(&self, t: HappinessType) -> bool {
        self[t] == 1
    }

    /// Types answered with 1, in wire order.
    pub fn selected(&self) -> impl Iterator<Item = HappinessType> + '_ {
        HappinessType::ALL.into_iter().filter(|t| self.is_set(*t))
    }
}

/// A geographic point in `(latitude, longitude)` order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Converts a GeoJSON / Orion `[longitude, latitude]` pair.
    pub fn from_lng_lat(coordinates: [f64; 2]) -> Self {
        Self {
            lat: coordinates[1],
            lng: coordinates[0],
        }
    }

    /// `[latitude, longitude]`, the order the frontend consumes.
    pub fn to_lat_lng(self) -> [f64; 2] {
        [self.lat, self.lng]
    }

    pub fn to_lng_lat(self) -> [f64; 2] {
        [self.lng, self.lat]
    }
}

/// One submitted observation as read back from the context broker.
#[derive(Debug, Clone, PartialEq)]
pub struct RatingRecord {
    pub id: String,
    pub location: Option<LatLng>,
    pub timestamp: DateTime<Utc>,
    pub memo: Option<String>,
    pub answers: Answers,
    pub nickname: Option<String>,
    pub age: Option<String>,
    pub address: Option<String>,
}

impl RatingRecord {
    /// Memo text if present and not blank.
    pub fn memo_text(&self) -> Option<&str> {
        self.memo.as_deref().filter(|m| !m.trim().is_empty())
    }
}
