use serde::{Deserialize, Serialize};

use crate::models::{ScoredRecord, StudentRecord};

pub const FAILED_COURSE_WEIGHT: f64 = 1.5;
pub const MOTIVATION_WEIGHT: f64 = 0.5;
pub const SCORE_FLOOR: f64 = 0.0;

/// Coefficients of the linear risk heuristic. Motivation is subtracted.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScoringPolicy {
    pub failed_course_weight: f64,
    pub motivation_weight: f64,
    pub score_floor: f64,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            failed_course_weight: FAILED_COURSE_WEIGHT,
            motivation_weight: MOTIVATION_WEIGHT,
            score_floor: SCORE_FLOOR,
        }
    }
}

impl ScoringPolicy {
    pub fn raw_score(&self, failed_course_count: u32, motivation_level: f64) -> f64 {
        self.failed_course_weight * failed_course_count as f64
            - self.motivation_weight * motivation_level
    }

    /// Never below zero, even when the configured floor is.
    pub fn risk_score(&self, failed_course_count: u32, motivation_level: f64) -> f64 {
        self.raw_score(failed_course_count, motivation_level)
            .max(self.score_floor)
            .max(0.0)
    }
}

pub fn score_records(records: &[StudentRecord], policy: &ScoringPolicy) -> Vec<ScoredRecord> {
    records
        .iter()
        .map(|student| ScoredRecord {
            risk_score: policy.risk_score(student.failed_course_count, student.motivation_level),
            student: student.clone(),
        })
        .collect()
}
