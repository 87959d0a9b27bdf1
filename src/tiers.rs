//! Batch-relative alert tiers.
//!
//! Cutoffs are percentiles of the current batch's scores, so the same score can
//! land in different tiers in different batches.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{PipelineError, Result};
use crate::models::{AlertTier, ClassifiedRecord, Cutoffs, ScoredRecord};

pub const MEDIUM_PERCENTILE: f64 = 70.0;
pub const HIGH_PERCENTILE: f64 = 85.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TierPolicy {
    pub medium_percentile: f64,
    pub high_percentile: f64,
}

impl Default for TierPolicy {
    fn default() -> Self {
        Self {
            medium_percentile: MEDIUM_PERCENTILE,
            high_percentile: HIGH_PERCENTILE,
        }
    }
}

/// Percentile of an ascending slice, interpolating linearly between neighbours.
///
/// Returns `None` for an empty slice. `percent` is clamped to `[0, 100]`.
pub fn percentile(sorted: &[f64], percent: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = percent.clamp(0.0, 100.0) / 100.0 * last as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    let low_value = *sorted.get(lower)?;
    let high_value = *sorted.get(upper)?;
    Some(low_value + (high_value - low_value) * (rank - lower as f64))
}

pub fn compute_cutoffs(scored: &[ScoredRecord], policy: &TierPolicy) -> Result<Cutoffs> {
    if scored.is_empty() {
        return Err(PipelineError::EmptyBatch);
    }

    let mut scores: Vec<f64> = scored.iter().map(|record| record.risk_score).collect();
    scores.sort_by(f64::total_cmp);

    let medium = percentile(&scores, policy.medium_percentile).ok_or(PipelineError::EmptyBatch)?;
    let high = percentile(&scores, policy.high_percentile).ok_or(PipelineError::EmptyBatch)?;
    Ok(Cutoffs { medium, high })
}

/// Ties at a cutoff go to the lower tier.
pub fn assign_tier(risk_score: f64, cutoffs: &Cutoffs) -> AlertTier {
    if risk_score <= cutoffs.medium {
        AlertTier::Low
    } else if risk_score <= cutoffs.high {
        AlertTier::Medium
    } else {
        AlertTier::High
    }
}

pub fn classify(
    scored: &[ScoredRecord],
    policy: &TierPolicy,
) -> Result<(Cutoffs, Vec<ClassifiedRecord>)> {
    let cutoffs = compute_cutoffs(scored, policy)?;
    debug!(medium = cutoffs.medium, high = cutoffs.high, "computed batch cutoffs");

    let classified = scored
        .iter()
        .map(|record| ClassifiedRecord {
            alert_tier: assign_tier(record.risk_score, &cutoffs),
            scored: record.clone(),
        })
        .collect();
    Ok((cutoffs, classified))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{StudentRecord, TierHistogram};

    fn scored(scores: &[f64]) -> Vec<ScoredRecord> {
        scores
            .iter()
            .enumerate()
            .map(|(index, score)| ScoredRecord {
                student: StudentRecord {
                    row: index + 1,
                    failed_course_count: 0,
                    motivation_level: 3.0,
                    fields: Vec::new(),
                },
                risk_score: *score,
            })
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn percentile_interpolates_between_order_statistics() {
        let values = [0.0, 0.0, 1.5, 3.0, 4.5, 6.0, 7.5, 9.0, 10.5, 12.0];
        assert!(close(percentile(&values, 70.0).unwrap(), 7.95));
        assert!(close(percentile(&values, 85.0).unwrap(), 9.975));
        assert_eq!(percentile(&values, 0.0), Some(0.0));
        assert_eq!(percentile(&values, 100.0), Some(12.0));
    }

    #[test]
    fn percentile_of_single_value_is_that_value() {
        for percent in [0.0, 50.0, 70.0, 85.0, 100.0] {
            assert_eq!(percentile(&[4.5], percent), Some(4.5));
        }
        assert_eq!(percentile(&[], 70.0), None);
    }

    #[test]
    fn empty_batch_is_an_error() {
        let result = classify(&[], &TierPolicy::default());
        assert!(matches!(result, Err(PipelineError::EmptyBatch)));
    }

    #[test]
    fn single_record_batch_is_low() {
        let (cutoffs, classified) = classify(&scored(&[6.0]), &TierPolicy::default()).unwrap();
        assert_eq!(cutoffs, Cutoffs { medium: 6.0, high: 6.0 });
        assert_eq!(classified[0].alert_tier, AlertTier::Low);
    }

    #[test]
    fn assign_tier_uses_inclusive_upper_bounds() {
        let cutoffs = Cutoffs { medium: 2.0, high: 4.0 };
        assert_eq!(assign_tier(1.0, &cutoffs), AlertTier::Low);
        assert_eq!(assign_tier(2.0, &cutoffs), AlertTier::Low);
        assert_eq!(assign_tier(2.5, &cutoffs), AlertTier::Medium);
        assert_eq!(assign_tier(4.0, &cutoffs), AlertTier::Medium);
        assert_eq!(assign_tier(4.01, &cutoffs), AlertTier::High);
    }

    #[test]
    fn ties_at_medium_cutoff_stay_low() {
        let records = scored(&[0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 0.0, 3.0, 6.0]);
        let (cutoffs, classified) = classify(&records, &TierPolicy::default()).unwrap();
        assert_eq!(cutoffs.medium, 0.0);
        assert!(close(cutoffs.high, 1.95));

        let histogram = TierHistogram::from_records(&classified);
        assert_eq!(histogram.low, 8);
        assert_eq!(histogram.medium, 0);
        assert_eq!(histogram.high, 2);
        assert!(classified
            .iter()
            .filter(|record| record.risk_score() == cutoffs.medium)
            .all(|record| record.alert_tier == AlertTier::Low));
    }

    #[test]
    fn every_record_gets_exactly_one_tier() {
        let records = scored(&[5.0, 1.0, 9.5, 3.0, 3.0, 0.0, 12.0]);
        let (_, classified) = classify(&records, &TierPolicy::default()).unwrap();
        assert_eq!(classified.len(), records.len());
        assert_eq!(TierHistogram::from_records(&classified).total(), records.len());
        let rows: Vec<usize> = classified.iter().map(|record| record.row()).collect();
        assert_eq!(rows, vec![1, 2, 3, 4, 5, 6, 7]);
    }

    #[test]
    fn uniform_batch_is_entirely_low() {
        let (_, classified) = classify(&scored(&[3.0; 6]), &TierPolicy::default()).unwrap();
        assert!(classified.iter().all(|record| record.alert_tier == AlertTier::Low));
    }
}
