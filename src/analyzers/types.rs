//! Response shapes consumed by the map and chart frontend.

use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::model::{Answers, HappinessType, LatLng, Means};

/// GeoJSON point, coordinates in `[lat, lng]` order for the frontend.
#[derive(Debug, Clone, Serialize)]
pub struct GeoPoint {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub coordinates: [f64; 2],
}

/// Orion-style `geo:json` location wrapper.
#[derive(Debug, Clone, Serialize)]
pub struct Location {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub value: GeoPoint,
}

impl Location {
    pub fn point(at: LatLng) -> Self {
        Self {
            kind: "geo:json",
            value: GeoPoint {
                kind: "Point",
                coordinates: at.to_lat_lng(),
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Memo {
    pub timestamp: String,
    pub memo: String,
}

/// One happiness type's view of a grid tile.
#[derive(Debug, Clone, Serialize)]
pub struct MapDataItem {
    pub id: Uuid,
    #[serde(rename = "type")]
    pub kind: HappinessType,
    pub location: Location,
    pub answers: Means,
    pub memos: Vec<Memo>,
}

/// All records falling into one tile.
#[derive(Debug, Clone, Serialize)]
pub struct MapData {
    pub count: usize,
    pub data: Vec<MapDataItem>,
}

/// One calendar bucket of the chart series.
#[derive(Debug, Clone, Serialize)]
pub struct GraphData {
    pub count: usize,
    pub timestamp: String,
    /// Month (1-12), day of month (1-31) or hour (0-23) of the bucket start.
    pub unit: u32,
    #[serde(flatten)]
    pub means: Means,
}

/// Aggregated response for the "all" view.
#[derive(Debug, Clone, Serialize)]
pub struct HappinessAllResponse {
    pub count: usize,
    pub map_data: BTreeMap<String, MapData>,
    pub graph_data: Vec<GraphData>,
}

/// One record fanned out for a single happiness type.
#[derive(Debug, Clone, Serialize)]
pub struct IndividualEntry {
    pub id: Uuid,
    #[serde(rename = "entityId")]
    pub entity_id: String,
    #[serde(rename = "type")]
    pub kind: HappinessType,
    pub location: Location,
    pub timestamp: String,
    pub memo: String,
    pub answers: Answers,
}

/// Non-aggregated response; `count` is the number of source records.
#[derive(Debug, Clone, Serialize)]
pub struct IndividualResponse {
    pub count: usize,
    pub data: Vec<IndividualEntry>,
}
