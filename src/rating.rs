//! Validation of new rating submissions.
//!
//! Each constraint is a standalone predicate; [`NewRating::parse`] composes
//! them and reports the first violation.

use chrono::{DateTime, Utc};
use std::str::FromStr;

use crate::error::{AggregationError, Result};
use crate::model::{Answers, LatLng};

pub const MEMO_MAX_CHARS: usize = 140;

/// How many happiness types a single submission may select.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SelectionRule {
    #[default]
    AtLeastOne,
    ExactlyOne,
}

impl FromStr for SelectionRule {
    type Err = AggregationError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "at-least-one" => Ok(SelectionRule::AtLeastOne),
            "exactly-one" => Ok(SelectionRule::ExactlyOne),
            other => Err(AggregationError::invalid(format!(
                "selection rule must be at-least-one or exactly-one, got '{other}'"
            ))),
        }
    }
}

pub fn is_valid_latitude(lat: f64) -> bool {
    (-90.0..=90.0).contains(&lat)
}

pub fn is_valid_longitude(lng: f64) -> bool {
    (-180.0..=180.0).contains(&lng)
}

pub fn is_memo_within_limit(memo: &str) -> bool {
    memo.chars().count() <= MEMO_MAX_CHARS
}

pub fn is_not_all_zero(answers: &Answers) -> bool {
    answers.selected().next().is_some()
}

pub fn is_exactly_one_selected(answers: &Answers) -> bool {
    answers.selected().count() == 1
}

/// Who submitted a rating. Copied onto the entity at write time.
#[derive(Debug, Clone, Default)]
pub struct Submitter {
    pub nickname: String,
    pub age: String,
    pub address: String,
}

/// A validated, not yet persisted rating.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRating {
    pub location: LatLng,
    pub memo: Option<String>,
    pub answers: Answers,
    pub timestamp: DateTime<Utc>,
}

impl NewRating {
    /// # Errors
    ///
    /// [`AggregationError::InvalidArgument`] naming the first violated constraint.
    pub fn parse(
        lat: f64,
        lng: f64,
        memo: Option<&str>,
        values: [f64; 6],
        rule: SelectionRule,
        timestamp: DateTime<Utc>,
    ) -> Result<Self> {
        if !is_valid_latitude(lat) {
            return Err(AggregationError::invalid(format!(
                "latitude {lat} is outside [-90, 90]"
            )));
        }
        if !is_valid_longitude(lng) {
            return Err(AggregationError::invalid(format!(
                "longitude {lng} is outside [-180, 180]"
            )));
        }

        let memo = memo.map(str::trim).filter(|m| !m.is_empty());
        if let Some(m) = memo {
            if !is_memo_within_limit(m) {
                return Err(AggregationError::invalid(format!(
                    "memo must be at most {MEMO_MAX_CHARS} characters"
                )));
            }
        }

        let answers = Answers::from_values(values)?;
        let selection_ok = match rule {
            SelectionRule::AtLeastOne => is_not_all_zero(&answers),
            SelectionRule::ExactlyOne => is_exactly_one_selected(&answers),
        };
        if !selection_ok {
            return Err(AggregationError::invalid(match rule {
                SelectionRule::AtLeastOne => "All happiness values cannot be zero.",
                SelectionRule::ExactlyOne => {
                    "Exactly one happiness value must be selected (value = 1)."
                }
            }));
        }

        Ok(Self {
            location: LatLng::new(lat, lng),
            memo: memo.map(str::to_string),
            answers,
            timestamp,
        })
    }
}
