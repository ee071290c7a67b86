//! Spatial bucketing of records into Web Mercator tiles.

use chrono::{FixedOffset, SecondsFormat};
use std::collections::BTreeMap;
use std::f64::consts::PI;
use tracing::debug;
use uuid::Uuid;

use crate::analyzers::types::{Location, MapData, MapDataItem, Memo};
use crate::analyzers::utility::mean_answers;
use crate::model::{HappinessType, LatLng, RatingRecord};

/// Tile edge in pixels.
pub const TILE_SIZE: f64 = 256.0;

/// Deepest zoom level accepted; keeps `2^zoom` well inside `i64`.
pub const MAX_ZOOM: u32 = 30;

/// Web Mercator is undefined at the poles; latitudes are clamped to this.
pub const MAX_LATITUDE: f64 = 85.051_128_78;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TilePoint {
    pub x: i64,
    pub y: i64,
}

fn map_size(zoom: u32) -> f64 {
    TILE_SIZE * 2f64.powi(zoom as i32)
}

/// Projects a point to the tile containing it at `zoom`.
pub fn to_tile(point: LatLng, zoom: u32) -> TilePoint {
    let size = map_size(zoom);
    let tiles = (size / TILE_SIZE) as i64;

    let lat = point.lat.clamp(-MAX_LATITUDE, MAX_LATITUDE).to_radians();
    let pixel_x = (point.lng + 180.0) / 360.0 * size;
    let pixel_y = (1.0 - (lat.tan() + 1.0 / lat.cos()).ln() / PI) / 2.0 * size;

    TilePoint {
        x: ((pixel_x / TILE_SIZE).floor() as i64).clamp(0, tiles - 1),
        y: ((pixel_y / TILE_SIZE).floor() as i64).clamp(0, tiles - 1),
    }
}

/// Inverts the projection at the pixel center of `tile`.
pub fn tile_center(tile: TilePoint, zoom: u32) -> LatLng {
    let size = map_size(zoom);
    let center_x = (tile.x as f64 + 0.5) * TILE_SIZE;
    let center_y = (tile.y as f64 + 0.5) * TILE_SIZE;

    let lng = center_x / size * 360.0 - 180.0;
    let lat = (PI * (1.0 - 2.0 * center_y / size)).sinh().atan().to_degrees();

    LatLng::new(lat, lng)
}

/// `"centerLat,centerLng"` of the tile containing `point`.
pub fn grid_key(point: LatLng, zoom: u32) -> String {
    let center = tile_center(to_tile(point, zoom), zoom);
    format!("{},{}", center.lat, center.lng)
}

/// Records sharing one tile.
#[derive(Debug)]
pub struct GridBucket<'a> {
    pub center: LatLng,
    pub records: Vec<&'a RatingRecord>,
}

/// Groups located records by tile key. Records without coordinates are skipped.
pub fn bucket_by_tile(records: &[RatingRecord], zoom: u32) -> BTreeMap<String, GridBucket<'_>> {
    let mut tiles: BTreeMap<TilePoint, Vec<&RatingRecord>> = BTreeMap::new();
    let mut unlocated = 0usize;

    for record in records {
        match record.location {
            Some(point) => tiles.entry(to_tile(point, zoom)).or_default().push(record),
            None => unlocated += 1,
        }
    }

    if unlocated > 0 {
        debug!(unlocated, "Skipped records without coordinates");
    }

    tiles
        .into_iter()
        .map(|(tile, records)| {
            let center = tile_center(tile, zoom);
            (
                format!("{},{}", center.lat, center.lng),
                GridBucket { center, records },
            )
        })
        .collect()
}

impl GridBucket<'_> {
    /// One item per happiness type, located at the tile center and carrying
    /// the tile-wide means plus memos of the records that chose that type.
    pub fn to_map_data(&self, display_offset: FixedOffset) -> MapData {
        let means = mean_answers(self.records.iter().copied());

        let data = HappinessType::ALL
            .into_iter()
            .map(|kind| MapDataItem {
                id: Uuid::new_v4(),
                kind,
                location: Location::point(self.center),
                answers: means,
                memos: self
                    .records
                    .iter()
                    .filter(|r| r.answers.is_set(kind))
                    .filter_map(|r| {
                        r.memo_text().map(|memo| Memo {
                            timestamp: r
                                .timestamp
                                .with_timezone(&display_offset)
                                .to_rfc3339_opts(SecondsFormat::Millis, false),
                            memo: memo.to_string(),
                        })
                    })
                    .collect(),
            })
            .collect();

        MapData {
            count: self.records.len(),
            data,
        }
    }
}
