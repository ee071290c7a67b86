use crate::model::{HappinessType, Means, PerType, RatingRecord};

/// Per-type mean of the 0/1 answers across `records`. All zeros for empty input.
pub fn mean_answers<'a, I>(records: I) -> Means
where
    I: IntoIterator<Item = &'a RatingRecord>,
{
    let mut sums = [0.0f64; 6];
    let mut count = 0usize;

    for record in records {
        count += 1;
        for t in HappinessType::ALL {
            sums[t.index()] += f64::from(record.answers[t]);
        }
    }

    if count == 0 {
        return PerType::default();
    }
    PerType(sums.map(|s| s / count as f64))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Answers;
    use chrono::Utc;

    fn record(values: [f64; 6]) -> RatingRecord {
        RatingRecord {
            id: "r".to_string(),
            location: None,
            timestamp: Utc::now(),
            memo: None,
            answers: Answers::from_values(values).unwrap(),
            nickname: None,
            age: None,
            address: None,
        }
    }

    #[test]
    fn test_mean_answers_empty_is_zero() {
        let empty: Vec<RatingRecord> = Vec::new();
        let means = mean_answers(&empty);
        assert!(means.iter().all(|(_, v)| *v == 0.0));
    }

    #[test]
    fn test_mean_answers_per_type() {
        let records = vec![
            record([1.0, 0.0, 1.0, 0.0, 0.0, 0.0]),
            record([0.0, 0.0, 1.0, 0.0, 0.0, 1.0]),
        ];
        let means = mean_answers(&records);
        assert_eq!(means[HappinessType::Happiness1], 0.5);
        assert_eq!(means[HappinessType::Happiness2], 0.0);
        assert_eq!(means[HappinessType::Happiness3], 1.0);
        assert_eq!(means[HappinessType::Happiness6], 0.5);
    }
}
