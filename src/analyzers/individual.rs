//! Per-type fan-out of records for the non-aggregated views.

use chrono::{FixedOffset, SecondsFormat};
use uuid::Uuid;

use crate::analyzers::types::{IndividualEntry, IndividualResponse, Location};
use crate::model::RatingRecord;

/// Emits one row per happiness type each record answered with 1.
///
/// Records without coordinates have nothing to pin and are dropped from
/// `data`, but still count towards `count`.
pub fn fan_out(records: &[RatingRecord], display_offset: FixedOffset) -> IndividualResponse {
    let data = records
        .iter()
        .filter_map(|record| record.location.map(|at| (record, at)))
        .flat_map(|(record, at)| {
            let timestamp = record
                .timestamp
                .with_timezone(&display_offset)
                .to_rfc3339_opts(SecondsFormat::Millis, false);
            let memo = record.memo.clone().unwrap_or_default();

            record.answers.selected().map(move |kind| IndividualEntry {
                id: Uuid::new_v4(),
                entity_id: record.id.clone(),
                kind,
                location: Location::point(at),
                timestamp: timestamp.clone(),
                memo: memo.clone(),
                answers: record.answers,
            })
        })
        .collect();

    IndividualResponse {
        count: records.len(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Answers, HappinessType, LatLng};
    use chrono::{TimeZone, Utc};

    fn record(id: &str, location: Option<LatLng>, values: [f64; 6]) -> RatingRecord {
        RatingRecord {
            id: id.to_string(),
            location,
            timestamp: Utc.with_ymd_and_hms(2024, 3, 16, 5, 2, 38).unwrap(),
            memo: Some("ダミーメモ".to_string()),
            answers: Answers::from_values(values).unwrap(),
            nickname: None,
            age: None,
            address: None,
        }
    }

    fn tokyo() -> FixedOffset {
        FixedOffset::east_opt(9 * 3600).unwrap()
    }

    #[test]
    fn test_fan_out_one_row_per_selected_type() {
        let records = vec![
            record("e1", Some(LatLng::from_lng_lat([139.72382, 35.629327])), [1.0, 1.0, 1.0, 1.0, 1.0, 1.0]),
            record("e2", Some(LatLng::new(35.0, 139.0)), [0.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
        ];

        let response = fan_out(&records, tokyo());
        assert_eq!(response.count, 2);
        assert_eq!(response.data.len(), 7);

        let last = response.data.last().unwrap();
        assert_eq!(last.entity_id, "e2");
        assert_eq!(last.kind, HappinessType::Happiness3);

        let first = &response.data[0];
        assert_eq!(first.location.value.coordinates, [35.629327, 139.72382]);
        assert_eq!(first.timestamp, "2024-03-16T14:02:38.000+09:00");
        assert_eq!(first.memo, "ダミーメモ");
    }

    #[test]
    fn test_fan_out_ids_are_unique() {
        let records = vec![record("e1", Some(LatLng::new(35.0, 139.0)), [1.0, 1.0, 0.0, 0.0, 0.0, 0.0])];
        let response = fan_out(&records, tokyo());
        assert_ne!(response.data[0].id, response.data[1].id);
    }

    #[test]
    fn test_fan_out_serializes_entity_id() {
        let records = vec![record("e1", Some(LatLng::new(35.0, 139.0)), [0.0, 0.0, 0.0, 0.0, 0.0, 1.0])];
        let json = serde_json::to_value(fan_out(&records, tokyo())).unwrap();
        let row = &json["data"][0];
        assert_eq!(row["entityId"], "e1");
        assert_eq!(row["type"], "happiness6");
        assert_eq!(row["location"]["type"], "geo:json");
        assert_eq!(row["answers"]["happiness6"], 1);
    }

    #[test]
    fn test_unlocated_records_have_no_rows() {
        let records = vec![record("e1", None, [1.0, 0.0, 0.0, 0.0, 0.0, 0.0])];
        let response = fan_out(&records, tokyo());
        assert_eq!(response.count, 1);
        assert!(response.data.is_empty());
    }
}
