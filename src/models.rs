use serde::{Deserialize, Serialize};

pub const DEFAULT_FAILED_COURSE_FIELD: &str = "failed_course_count";
pub const DEFAULT_MOTIVATION_FIELD: &str = "motivation_level";

/// Column names appended to every exported row.
pub const RISK_SCORE_FIELD: &str = "risk_score";
pub const ALERT_TIER_FIELD: &str = "alert_tier";

/// Names of the two columns the scorer consumes. Every other column is passed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct InputSchema {
    pub failed_course_field: String,
    pub motivation_field: String,
}

impl Default for InputSchema {
    fn default() -> Self {
        Self {
            failed_course_field: DEFAULT_FAILED_COURSE_FIELD.to_string(),
            motivation_field: DEFAULT_MOTIVATION_FIELD.to_string(),
        }
    }
}

impl InputSchema {
    pub fn required_fields(&self) -> [&str; 2] {
        [
            self.failed_course_field.as_str(),
            self.motivation_field.as_str(),
        ]
    }
}

/// An already-parsed table: a header row plus string cells in header order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Batch {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Batch {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|header| header == name)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudentRecord {
    /// 1-based position among the data rows of the batch.
    pub row: usize,
    pub failed_course_count: u32,
    pub motivation_level: f64,
    /// The full input row, untouched, in header order.
    pub fields: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ScoredRecord {
    pub student: StudentRecord,
    pub risk_score: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ClassifiedRecord {
    pub scored: ScoredRecord,
    pub alert_tier: AlertTier,
}

impl ClassifiedRecord {
    pub fn row(&self) -> usize {
        self.scored.student.row
    }

    pub fn risk_score(&self) -> f64 {
        self.scored.risk_score
    }

    pub fn fields(&self) -> &[String] {
        &self.scored.student.fields
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AlertTier {
    Low,
    Medium,
    High,
}

impl AlertTier {
    pub const ALL: [AlertTier; 3] = [AlertTier::Low, AlertTier::Medium, AlertTier::High];

    pub fn as_str(self) -> &'static str {
        match self {
            AlertTier::Low => "LOW",
            AlertTier::Medium => "MEDIUM",
            AlertTier::High => "HIGH",
        }
    }

    /// Suggested follow-up. The final decision stays with tutors and support staff.
    pub fn guidance(self) -> &'static str {
        match self {
            AlertTier::Low => "routine monitoring",
            AlertTier::Medium => "closer follow-up, possible early referral",
            AlertTier::High => "priority intervention (tutoring, counselling)",
        }
    }
}

impl std::fmt::Display for AlertTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Percentile cutoffs for one batch. Scores above `medium` are at least MEDIUM,
/// scores above `high` are HIGH.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Cutoffs {
    pub medium: f64,
    pub high: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct TierHistogram {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl TierHistogram {
    pub fn from_records(records: &[ClassifiedRecord]) -> Self {
        let mut histogram = TierHistogram::default();
        for record in records {
            histogram.add(record.alert_tier);
        }
        histogram
    }

    pub fn add(&mut self, tier: AlertTier) {
        match tier {
            AlertTier::Low => self.low += 1,
            AlertTier::Medium => self.medium += 1,
            AlertTier::High => self.high += 1,
        }
    }

    pub fn count(&self, tier: AlertTier) -> usize {
        match tier {
            AlertTier::Low => self.low,
            AlertTier::Medium => self.medium,
            AlertTier::High => self.high,
        }
    }

    pub fn total(&self) -> usize {
        self.low + self.medium + self.high
    }
}

/// Tier mix for one value of a passthrough column, e.g. one career.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupSummary {
    pub group: String,
    pub histogram: TierHistogram,
    pub avg_score: f64,
}
