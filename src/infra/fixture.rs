//! File-backed [`RatingSource`] for local runs and tests.
//!
//! Loads an array of Orion-normalized entities once and answers queries in
//! memory with the same filter, ordering and paging semantics as the broker.

use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::{AggregationError, Result};
use crate::infra::orion::entity::{OrionEntity, decode_entities};
use crate::model::RatingRecord;
use crate::rating::{NewRating, Submitter};
use crate::services::{RatingQuery, RatingSource};

pub struct FixtureSource {
    records: RwLock<Vec<RatingRecord>>,
}

impl FixtureSource {
    pub fn new(records: Vec<RatingRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    pub fn from_json(json: &str) -> anyhow::Result<Self> {
        Ok(Self::new(parse_records(json)?))
    }

    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let records = parse_records(&json)
            .with_context(|| format!("Failed to parse fixture {}", path.display()))?;
        info!(path = %path.display(), records = records.len(), "Fixture loaded");
        Ok(Self::new(records))
    }
}

fn parse_records(json: &str) -> anyhow::Result<Vec<RatingRecord>> {
    let entities: Vec<serde_json::Value> =
        serde_json::from_str(json).context("fixture must be a JSON array of entities")?;
    Ok(decode_entities(entities))
}

#[async_trait]
impl RatingSource for FixtureSource {
    async fn query(&self, query: &RatingQuery) -> Result<Vec<RatingRecord>> {
        let records = self.records.read().await;
        let mut matching: Vec<RatingRecord> = records
            .iter()
            .filter(|r| query.matches(r))
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

        let page: Vec<_> = matching
            .into_iter()
            .skip(query.offset as usize)
            .take(query.limit as usize)
            .collect();
        debug!(q = %query.q(), returned = page.len(), "Fixture query");
        Ok(page)
    }

    async fn create(&self, id: &str, rating: &NewRating, submitter: &Submitter) -> Result<()> {
        let record = RatingRecord::try_from(OrionEntity::from_rating(id, rating, submitter))?;
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.id == id) {
            return Err(AggregationError::upstream(format!(
                "entity {id} already exists"
            )));
        }
        records.push(record);
        Ok(())
    }
}
