//! Calendar bucketing and per-type averaging for the chart series.
//!
//! Buckets are aligned to the calendar of the offset `start` was given in,
//! so a caller in `+09:00` asking for `day` gets Tokyo midnights, not UTC
//! ones. Every unit spanned by `[start, end]` yields a bucket, including
//! units with no records.

use chrono::{
    DateTime, Datelike, Duration, FixedOffset, Months, NaiveDateTime, NaiveTime, SecondsFormat,
    Timelike, Utc,
};
use tracing::debug;

use crate::analyzers::types::GraphData;
use crate::analyzers::utility::mean_answers;
use crate::error::{AggregationError, Result};
use crate::model::{Means, RatingRecord};
use crate::parser::Period;

/// Upper bound on buckets per series: a little over eleven years hourly.
pub const MAX_BUCKETS: usize = 100_000;

/// One calendar unit of the chart series.
#[derive(Debug, Clone, PartialEq)]
pub struct TimeBucket {
    pub start: DateTime<FixedOffset>,
    /// Month (1-12), day of month (1-31) or hour (0-23).
    pub unit: u32,
    pub count: usize,
    pub means: Means,
}

impl TimeBucket {
    pub fn to_graph_data(&self) -> GraphData {
        GraphData {
            count: self.count,
            timestamp: self.start.to_rfc3339_opts(SecondsFormat::Millis, false),
            unit: self.unit,
            means: self.means,
        }
    }
}

/// Calendar unit value of `at` for `period`.
pub fn unit_of(at: DateTime<FixedOffset>, period: Period) -> u32 {
    match period {
        Period::Month => at.month(),
        Period::Day => at.day(),
        Period::Time => at.hour(),
    }
}

/// Start of the calendar unit containing `at`.
fn truncate(at: DateTime<FixedOffset>, period: Period) -> Result<DateTime<FixedOffset>> {
    let local = at.naive_local();
    let day = match period {
        Period::Month => 1,
        Period::Day | Period::Time => local.day(),
    };
    let hour = match period {
        Period::Time => local.hour(),
        Period::Month | Period::Day => 0,
    };
    local
        .date()
        .with_day(day)
        .zip(NaiveTime::from_hms_opt(hour, 0, 0))
        .map(|(date, time)| date.and_time(time))
        .and_then(|n: NaiveDateTime| n.and_local_timezone(*at.offset()).single())
        .ok_or_else(|| AggregationError::invalid(format!("cannot align {at} to a {period} boundary")))
}

fn advance(at: DateTime<FixedOffset>, period: Period) -> Result<DateTime<FixedOffset>> {
    let next = match period {
        Period::Month => at.checked_add_months(Months::new(1)),
        Period::Day => at.checked_add_signed(Duration::days(1)),
        Period::Time => at.checked_add_signed(Duration::hours(1)),
    };
    next.ok_or_else(|| AggregationError::invalid(format!("{at} is out of the supported date range")))
}

/// Buckets `records` into every `period` unit spanned by `[start, end]`.
///
/// A record falls into the bucket whose start is the latest one not after
/// its timestamp. Records outside `[first_bucket_start, last_bucket_end)`
/// are ignored.
///
/// # Errors
///
/// [`AggregationError::InvalidArgument`] when `end` precedes `start` or the
/// range would produce more than [`MAX_BUCKETS`] buckets.
pub fn bucket_by_period(
    records: &[RatingRecord],
    start: DateTime<FixedOffset>,
    end: DateTime<FixedOffset>,
    period: Period,
) -> Result<Vec<TimeBucket>> {
    if end < start {
        return Err(AggregationError::invalid(format!(
            "end {end} is before start {start}"
        )));
    }

    let mut starts = Vec::new();
    let mut cursor = truncate(start, period)?;
    while cursor <= end {
        if starts.len() == MAX_BUCKETS {
            return Err(AggregationError::invalid(format!(
                "range spans more than {MAX_BUCKETS} {period} buckets"
            )));
        }
        starts.push(cursor);
        cursor = advance(cursor, period)?;
    }
    let range_end: DateTime<Utc> = cursor.with_timezone(&Utc);

    let mut groups: Vec<Vec<&RatingRecord>> = vec![Vec::new(); starts.len()];

    for record in records {
        let ts = record.timestamp;
        if ts >= range_end {
            continue;
        }
        let idx = starts.partition_point(|s| *s <= ts);
        if idx == 0 {
            continue;
        }
        groups[idx - 1].push(record);
    }

    debug!(buckets = starts.len(), %period, "Built time buckets");

    Ok(starts
        .into_iter()
        .zip(groups)
        .map(|(start, group)| TimeBucket {
            start,
            unit: unit_of(start, period),
            count: group.len(),
            means: mean_answers(group.iter().copied()),
        })
        .collect())
}

/// Rotates `buckets` so the most recent bucket whose unit equals
/// `current_unit` comes first. Left unchanged when none matches.
pub fn rotate_to_current(buckets: &mut [TimeBucket], current_unit: u32) {
    if let Some(idx) = buckets.iter().rposition(|b| b.unit == current_unit) {
        buckets.rotate_left(idx);
    }
}
