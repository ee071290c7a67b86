//! Request handling: validates caller input, queries the configured
//! [`RatingSource`] and shapes the response.

use chrono::{DateTime, FixedOffset, Utc};
use serde::Serialize;
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::analyzers::assemble::{AssembleOptions, assemble};
use crate::analyzers::grid::MAX_ZOOM;
use crate::analyzers::individual::fan_out;
use crate::analyzers::types::{HappinessAllResponse, IndividualResponse};
use crate::error::{AggregationError, Result};
use crate::parser::{Period, parse_bounds, parse_datetime, parse_page, parse_point};
use crate::rating::{NewRating, SelectionRule, Submitter};
use crate::services::{GeoFilter, RatingQuery, RatingSource};

/// Nickname characters safe to embed in an Orion `q` value: letters and
/// digits in any script, plus `_` and `-`. Everything else (`,` `..` `;`
/// `==` quotes) carries meaning in the simple query language.
fn is_nickname_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '-'
}

/// Raw aggregation parameters, exactly as received.
#[derive(Debug, Clone)]
pub struct AllRequest {
    pub start: String,
    pub end: String,
    pub limit: String,
    pub offset: String,
    pub period: String,
    pub zoom_level: String,
    /// `north,east,south,west`.
    pub bounds: Option<String>,
    /// Rotate `graph_data` so the current unit comes first.
    pub now_first: bool,
}

/// Raw parameters for the per-record views.
#[derive(Debug, Clone)]
pub struct IndividualRequest {
    pub start: String,
    pub end: String,
    pub limit: String,
    pub offset: String,
    /// `lat,lng` centre of an optional radius filter.
    pub near: Option<String>,
    pub max_distance_m: u32,
}

#[derive(Debug, Clone)]
pub struct SubmitRequest {
    pub latitude: f64,
    pub longitude: f64,
    pub memo: Option<String>,
    pub answers: [f64; 6],
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitResponse {
    pub message: String,
    pub entity_id: String,
}

pub struct HappinessService {
    source: Arc<dyn RatingSource>,
    display_offset: FixedOffset,
    selection_rule: SelectionRule,
}

fn parse_range(start: &str, end: &str) -> Result<(DateTime<FixedOffset>, DateTime<FixedOffset>)> {
    let start = parse_datetime("start", start)?;
    let end = parse_datetime("end", end)?;
    if end < start {
        return Err(AggregationError::invalid(format!(
            "end {end} is before start {start}"
        )));
    }
    Ok((start, end))
}

fn parse_zoom(zoom: &str) -> Result<u32> {
    zoom.trim()
        .parse::<u32>()
        .ok()
        .filter(|z| *z <= MAX_ZOOM)
        .ok_or_else(|| {
            AggregationError::invalid(format!(
                "zoomLevel must be an integer between 0 and {MAX_ZOOM}, got '{zoom}'"
            ))
        })
}

fn validate_nickname(nickname: &str) -> Result<()> {
    if nickname.is_empty() || !nickname.chars().all(is_nickname_char) {
        return Err(AggregationError::invalid(format!(
            "nickname '{nickname}' must be non-empty letters, digits, '_' or '-'"
        )));
    }
    Ok(())
}

fn base_query(
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    limit: &str,
    offset: &str,
) -> Result<RatingQuery> {
    let (limit, offset) = parse_page(limit, offset)?;
    Ok(RatingQuery {
        start: start.with_timezone(&Utc),
        end: end.with_timezone(&Utc),
        limit,
        offset,
        nickname: None,
        geo: None,
    })
}

impl IndividualRequest {
    fn to_query(&self) -> Result<RatingQuery> {
        let (start, end) = parse_range(&self.start, &self.end)?;
        let mut query = base_query(start, end, &self.limit, &self.offset)?;
        if let Some(near) = &self.near {
            query.geo = Some(GeoFilter::Near {
                point: parse_point(near)?,
                max_distance_m: self.max_distance_m,
            });
        }
        Ok(query)
    }
}

impl HappinessService {
    pub fn new(
        source: Arc<dyn RatingSource>,
        display_offset: FixedOffset,
        selection_rule: SelectionRule,
    ) -> Self {
        Self {
            source,
            display_offset,
            selection_rule,
        }
    }

    /// Aggregated map and chart data for every submitter.
    ///
    /// With `bounds`, the chart is computed from a second, polygon-filtered
    /// fetch issued concurrently with the unfiltered one.
    #[tracing::instrument(skip(self), fields(period = %req.period, zoom = %req.zoom_level))]
    pub async fn find_happiness_all(&self, req: &AllRequest) -> Result<HappinessAllResponse> {
        let (start, end) = parse_range(&req.start, &req.end)?;
        let query = base_query(start, end, &req.limit, &req.offset)?;
        let period: Period = req.period.parse()?;
        let zoom = parse_zoom(&req.zoom_level)?;
        let bounded = req
            .bounds
            .as_deref()
            .map(parse_bounds)
            .transpose()?
            .map(|ring| query.with_geo(GeoFilter::CoveredBy(ring)));

        let (map_records, graph_records) = match &bounded {
            Some(bounded) => {
                let (all, within) =
                    tokio::try_join!(self.source.query(&query), self.source.query(bounded))?;
                (all, Some(within))
            }
            None => (self.source.query(&query).await?, None),
        };

        let options = AssembleOptions {
            zoom,
            period,
            start,
            end,
            display_offset: self.display_offset,
            rotate_to: req
                .now_first
                .then(|| Utc::now().with_timezone(start.offset())),
        };
        let response = assemble(
            &map_records,
            graph_records.as_deref().unwrap_or(&map_records),
            &options,
        )?;

        info!(
            count = response.count,
            tiles = response.map_data.len(),
            buckets = response.graph_data.len(),
            "Aggregated happiness"
        );
        Ok(response)
    }

    /// Per-record rows for every submitter.
    #[tracing::instrument(skip(self))]
    pub async fn find_all_individual(&self, req: &IndividualRequest) -> Result<IndividualResponse> {
        let query = req.to_query()?;
        let records = self.source.query(&query).await?;
        Ok(fan_out(&records, self.display_offset))
    }

    /// Per-record rows for one submitter.
    #[tracing::instrument(skip(self))]
    pub async fn find_me(&self, nickname: &str, req: &IndividualRequest) -> Result<IndividualResponse> {
        validate_nickname(nickname)?;
        let mut query = req.to_query()?;
        query.nickname = Some(nickname.to_string());
        let records = self.source.query(&query).await?;
        Ok(fan_out(&records, self.display_offset))
    }

    /// Validates and stores a new rating, returning its entity id.
    #[tracing::instrument(skip(self, req, submitter))]
    pub async fn submit(&self, req: &SubmitRequest, submitter: &Submitter) -> Result<SubmitResponse> {
        let rating = NewRating::parse(
            req.latitude,
            req.longitude,
            req.memo.as_deref(),
            req.answers,
            self.selection_rule,
            Utc::now(),
        )?;
        let id = Uuid::new_v4().to_string();
        self.source.create(&id, &rating, submitter).await?;

        info!(entity_id = %id, "Rating submitted");
        Ok(SubmitResponse {
            message: "Happiness has been sent.".to_string(),
            entity_id: id,
        })
    }
}
