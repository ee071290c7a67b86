//! Orion NGSIv2 normalized representation of a happiness entity.

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::error::{AggregationError, Result};
use crate::model::{Answers, HappinessType, LatLng, RatingRecord};
use crate::rating::{NewRating, Submitter};

pub const ENTITY_TYPE: &str = "happiness";

/// `{"type": .., "value": ..}` attribute wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Attr<T> {
    #[serde(rename = "type", default)]
    pub kind: String,
    pub value: T,
}

impl<T> Attr<T> {
    fn new(kind: &str, value: T) -> Self {
        Self {
            kind: kind.to_string(),
            value,
        }
    }
}

/// GeoJSON point, coordinates in `[longitude, latitude]` order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeoJsonPoint {
    #[serde(rename = "type")]
    pub kind: String,
    pub coordinates: Vec<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrionEntity {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub timestamp: Attr<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Attr<GeoJsonPoint>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub memo: Option<Attr<Value>>,
    pub happiness1: Attr<f64>,
    pub happiness2: Attr<f64>,
    pub happiness3: Attr<f64>,
    pub happiness4: Attr<f64>,
    pub happiness5: Attr<f64>,
    pub happiness6: Attr<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nickname: Option<Attr<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<Attr<Value>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Attr<Value>>,
}

/// Text attributes sometimes come back as numbers or null.
fn text(attr: &Option<Attr<Value>>) -> Option<String> {
    match attr.as_ref().map(|a| &a.value) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(other) => Some(other.to_string()),
    }
}

impl OrionEntity {
    fn answer_attr(&self, t: HappinessType) -> &Attr<f64> {
        match t {
            HappinessType::Happiness1 => &self.happiness1,
            HappinessType::Happiness2 => &self.happiness2,
            HappinessType::Happiness3 => &self.happiness3,
            HappinessType::Happiness4 => &self.happiness4,
            HappinessType::Happiness5 => &self.happiness5,
            HappinessType::Happiness6 => &self.happiness6,
        }
    }

    /// Builds the entity posted to `/v2/entities` for a new rating.
    pub fn from_rating(id: &str, rating: &NewRating, submitter: &Submitter) -> Self {
        let answer = |t: HappinessType| Attr::new("Number", f64::from(rating.answers[t]));
        let text_attr = |s: &str| Some(Attr::new("Text", Value::String(s.to_string())));

        Self {
            id: id.to_string(),
            kind: ENTITY_TYPE.to_string(),
            timestamp: Attr::new(
                "DateTime",
                rating.timestamp.to_rfc3339_opts(SecondsFormat::Millis, true),
            ),
            location: Some(Attr::new(
                "geo:json",
                GeoJsonPoint {
                    kind: "Point".to_string(),
                    coordinates: rating.location.to_lng_lat().to_vec(),
                },
            )),
            memo: rating.memo.as_deref().and_then(text_attr),
            happiness1: answer(HappinessType::Happiness1),
            happiness2: answer(HappinessType::Happiness2),
            happiness3: answer(HappinessType::Happiness3),
            happiness4: answer(HappinessType::Happiness4),
            happiness5: answer(HappinessType::Happiness5),
            happiness6: answer(HappinessType::Happiness6),
            nickname: text_attr(&submitter.nickname),
            age: text_attr(&submitter.age),
            address: text_attr(&submitter.address),
        }
    }
}

impl TryFrom<OrionEntity> for RatingRecord {
    type Error = AggregationError;

    fn try_from(entity: OrionEntity) -> Result<Self> {
        let timestamp = DateTime::parse_from_rfc3339(&entity.timestamp.value)
            .map_err(|e| {
                AggregationError::invalid(format!(
                    "entity {} has invalid timestamp '{}': {e}",
                    entity.id, entity.timestamp.value
                ))
            })?
            .with_timezone(&Utc);

        let answers = Answers::from_values(HappinessType::ALL.map(|t| entity.answer_attr(t).value))
            .map_err(|e| AggregationError::invalid(format!("entity {}: {e}", entity.id)))?;

        let location = entity
            .location
            .as_ref()
            .and_then(|attr| match attr.value.coordinates.as_slice() {
                [lng, lat, ..] if lng.is_finite() && lat.is_finite() => {
                    Some(LatLng::from_lng_lat([*lng, *lat]))
                }
                _ => None,
            });

        Ok(RatingRecord {
            memo: text(&entity.memo),
            nickname: text(&entity.nickname),
            age: text(&entity.age),
            address: text(&entity.address),
            id: entity.id,
            location,
            timestamp,
            answers,
        })
    }
}

/// Decodes a raw entity array, skipping entities that do not fit the
/// happiness schema.
pub fn decode_entities(json: Vec<serde_json::Value>) -> Vec<RatingRecord> {
    json.into_iter()
        .filter_map(|item| {
            let id = item["id"].as_str().unwrap_or("<missing>").to_string();
            let decoded = serde_json::from_value::<OrionEntity>(item)
                .map_err(|e| AggregationError::invalid(e.to_string()))
                .and_then(RatingRecord::try_from);
            match decoded {
                Ok(record) => Some(record),
                Err(e) => {
                    warn!(entity_id = %id, error = %e, "Skipping undecodable entity");
                    None
                }
            }
        })
        .collect()
}
