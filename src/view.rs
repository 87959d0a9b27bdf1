use std::collections::BTreeSet;
use std::str::FromStr;

use serde::Serialize;

use crate::models::{AlertTier, ClassifiedRecord};

/// The tiers a caller wants to see. Defaults to all three.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TierSelection(BTreeSet<AlertTier>);

impl Default for TierSelection {
    fn default() -> Self {
        Self::all()
    }
}

impl TierSelection {
    pub fn all() -> Self {
        Self(AlertTier::ALL.into_iter().collect())
    }

    pub fn none() -> Self {
        Self(BTreeSet::new())
    }

    pub fn contains(&self, tier: AlertTier) -> bool {
        self.0.contains(&tier)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn tiers(&self) -> impl Iterator<Item = AlertTier> + '_ {
        self.0.iter().copied()
    }
}

impl FromIterator<AlertTier> for TierSelection {
    fn from_iter<I: IntoIterator<Item = AlertTier>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl FromStr for TierSelection {
    type Err = String;

    /// Accepts `all`, `none`, an empty string, or a comma list such as `medium,high`.
    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let trimmed = value.trim();
        if trimmed.eq_ignore_ascii_case("all") {
            return Ok(Self::all());
        }
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("none") {
            return Ok(Self::none());
        }

        trimmed
            .split(',')
            .map(|part| match part.trim().to_ascii_lowercase().as_str() {
                "low" => Ok(AlertTier::Low),
                "medium" => Ok(AlertTier::Medium),
                "high" => Ok(AlertTier::High),
                other => Err(format!(
                    "unknown alert tier '{other}' (expected low, medium, high, all or none)"
                )),
            })
            .collect()
    }
}

/// What the presentation side should show for a selection.
#[derive(Debug, Clone, PartialEq)]
pub enum FilteredView {
    /// The caller deselected every tier. Not an error and not an empty result.
    NothingSelected,
    Rows(Vec<ClassifiedRecord>),
}

impl FilteredView {
    pub fn rows(&self) -> &[ClassifiedRecord] {
        match self {
            FilteredView::NothingSelected => &[],
            FilteredView::Rows(rows) => rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }
}

pub fn filter_view(records: &[ClassifiedRecord], selection: &TierSelection) -> FilteredView {
    if selection.is_empty() {
        return FilteredView::NothingSelected;
    }

    FilteredView::Rows(
        records
            .iter()
            .filter(|record| selection.contains(record.alert_tier))
            .cloned()
            .collect(),
    )
}
