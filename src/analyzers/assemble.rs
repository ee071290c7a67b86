use chrono::{DateTime, FixedOffset};

use crate::analyzers::grid::bucket_by_tile;
use crate::analyzers::timeline::{bucket_by_period, rotate_to_current, unit_of};
use crate::analyzers::types::HappinessAllResponse;
use crate::error::Result;
use crate::model::RatingRecord;
use crate::parser::Period;

/// Knobs for one aggregation pass.
#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub zoom: u32,
    pub period: Period,
    pub start: DateTime<FixedOffset>,
    pub end: DateTime<FixedOffset>,
    /// Offset memo timestamps are rendered in.
    pub display_offset: FixedOffset,
    /// When set, the chart series is rotated to start at this instant's unit.
    pub rotate_to: Option<DateTime<FixedOffset>>,
}

/// Builds the aggregated "all" response.
///
/// `map_records` feed the grid pass and `count`; `graph_records` feed the
/// time pass. Both passes are pure and independent of each other.
pub fn assemble(
    map_records: &[RatingRecord],
    graph_records: &[RatingRecord],
    options: &AssembleOptions,
) -> Result<HappinessAllResponse> {
    let mut buckets = bucket_by_period(graph_records, options.start, options.end, options.period)?;
    if let Some(now) = options.rotate_to {
        rotate_to_current(&mut buckets, unit_of(now, options.period));
    }

    let map_data = bucket_by_tile(map_records, options.zoom)
        .into_iter()
        .map(|(key, bucket)| (key, bucket.to_map_data(options.display_offset)))
        .collect();

    Ok(HappinessAllResponse {
        count: map_records.len(),
        map_data,
        graph_data: buckets.iter().map(|b| b.to_graph_data()).collect(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answers, HappinessType, LatLng};
    use crate::parser::parse_datetime;
    use chrono::Utc;

    fn options(period: Period) -> AssembleOptions {
        AssembleOptions {
            zoom: 13,
            period,
            start: parse_datetime("start", "2024-03-15T00:00:00+09:00").unwrap(),
            end: parse_datetime("end", "2024-03-20T23:59:59+09:00").unwrap(),
            display_offset: FixedOffset::east_opt(9 * 3600).unwrap(),
            rotate_to: None,
        }
    }

    fn record(id: &str, ts: &str, lat: f64, lng: f64, values: [f64; 6]) -> RatingRecord {
        RatingRecord {
            id: id.to_string(),
            location: Some(LatLng::new(lat, lng)),
            timestamp: parse_datetime("ts", ts).unwrap().with_timezone(&Utc),
            memo: None,
            answers: Answers::from_values(values).unwrap(),
            nickname: None,
            age: None,
            address: None,
        }
    }

    #[test]
    fn test_empty_input_yields_full_zero_series() {
        let response = assemble(&[], &[], &options(Period::Day)).unwrap();
        assert_eq!(response.count, 0);
        assert!(response.map_data.is_empty());
        assert_eq!(response.graph_data.len(), 6);
        assert!(response.graph_data.iter().all(|g| g.count == 0));

        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["count"], 0);
        assert_eq!(json["map_data"], serde_json::json!({}));
        assert_eq!(json["graph_data"][0]["happiness1"], 0.0);
        assert_eq!(json["graph_data"][0]["timestamp"], "2024-03-15T00:00:00.000+09:00");
    }

    #[test]
    fn test_assemble_combines_grid_and_series() {
        let records = vec![
            record("a", "2024-03-16T14:02:38+09:00", 35.629327, 139.72382, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            record("b", "2024-03-16T18:00:00+09:00", 35.6295, 139.7240, [0.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
            record("c", "2024-03-18T09:00:00+09:00", 34.7, 135.5, [1.0, 1.0, 0.0, 0.0, 0.0, 0.0]),
        ];

        let response = assemble(&records, &records, &options(Period::Day)).unwrap();
        assert_eq!(response.count, 3);
        assert_eq!(response.map_data.len(), 2);
        assert_eq!(response.map_data.values().map(|m| m.count).sum::<usize>(), 3);

        let day16 = &response.graph_data[1];
        assert_eq!(day16.unit, 16);
        assert_eq!(day16.count, 2);
        assert_eq!(day16.means[HappinessType::Happiness1], 0.5);
        assert_eq!(response.graph_data[3].count, 1);
    }

    #[test]
    fn test_graph_uses_its_own_record_set() {
        let all = vec![
            record("a", "2024-03-16T14:00:00+09:00", 35.6, 139.7, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
            record("b", "2024-03-16T15:00:00+09:00", 43.0, 141.3, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0]),
        ];
        let bounded = vec![all[0].clone()];

        let response = assemble(&all, &bounded, &options(Period::Day)).unwrap();
        assert_eq!(response.count, 2);
        assert_eq!(response.graph_data.iter().map(|g| g.count).sum::<usize>(), 1);
    }

    #[test]
    fn test_rotate_to_now() {
        let mut opts = options(Period::Day);
        opts.rotate_to = Some(parse_datetime("now", "2024-03-18T10:00:00+09:00").unwrap());

        let response = assemble(&[], &[], &opts).unwrap();
        let units: Vec<_> = response.graph_data.iter().map(|g| g.unit).collect();
        assert_eq!(units, vec![18, 19, 20, 15, 16, 17]);
    }
}
