//! Pipeline configuration.
//!
//! Precedence, highest first: command-line flags, the TOML file named by
//! `--config` or `EARLY_WARNING_CONFIG`, compiled defaults.

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use crate::models::InputSchema;
use crate::risk::ScoringPolicy;
use crate::tiers::TierPolicy;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub schema: InputSchema,
    pub scoring: ScoringPolicy,
    pub tiers: TierPolicy,
}

impl PipelineConfig {
    pub fn from_toml_str(content: &str) -> anyhow::Result<Self> {
        let config: PipelineConfig =
            toml::from_str(content).context("invalid pipeline configuration")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("failed to load config file {}", path.display()))
    }

    pub fn with_overrides(
        mut self,
        failed_course_field: Option<String>,
        motivation_field: Option<String>,
    ) -> anyhow::Result<Self> {
        if let Some(field) = failed_course_field {
            self.schema.failed_course_field = field;
        }
        if let Some(field) = motivation_field {
            self.schema.motivation_field = field;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        let failed = self.schema.failed_course_field.trim();
        let motivation = self.schema.motivation_field.trim();
        if failed.is_empty() || motivation.is_empty() {
            bail!("required field names must not be empty");
        }
        if failed == motivation {
            bail!("failed-course and motivation fields must differ (both are '{failed}')");
        }

        let scoring = &self.scoring;
        if ![
            scoring.failed_course_weight,
            scoring.motivation_weight,
            scoring.score_floor,
        ]
        .iter()
        .all(|value| value.is_finite())
        {
            bail!("scoring weights and floor must be finite numbers");
        }
        if scoring.score_floor < 0.0 {
            bail!(
                "score floor must not be negative (got {}), risk scores are never below zero",
                scoring.score_floor
            );
        }

        let tiers = &self.tiers;
        let in_range = |percent: f64| (0.0..=100.0).contains(&percent);
        if !in_range(tiers.medium_percentile) || !in_range(tiers.high_percentile) {
            bail!("tier percentiles must be between 0 and 100");
        }
        if tiers.medium_percentile > tiers.high_percentile {
            bail!(
                "medium percentile ({}) must not exceed high percentile ({})",
                tiers.medium_percentile,
                tiers.high_percentile
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::risk::{FAILED_COURSE_WEIGHT, MOTIVATION_WEIGHT};
    use crate::tiers::{HIGH_PERCENTILE, MEDIUM_PERCENTILE};

    #[test]
    fn defaults_match_named_constants() {
        let config = PipelineConfig::default();
        assert_eq!(config.scoring.failed_course_weight, FAILED_COURSE_WEIGHT);
        assert_eq!(config.scoring.motivation_weight, MOTIVATION_WEIGHT);
        assert_eq!(config.tiers.medium_percentile, MEDIUM_PERCENTILE);
        assert_eq!(config.tiers.high_percentile, HIGH_PERCENTILE);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_toml_keeps_defaults() {
        let config = PipelineConfig::from_toml_str(
            r#"
            [schema]
            motivation_field = "motivacion"

            [scoring]
            failed_course_weight = 2.0
            "#,
        )
        .unwrap();
        assert_eq!(config.schema.failed_course_field, "failed_course_count");
        assert_eq!(config.schema.motivation_field, "motivacion");
        assert_eq!(config.scoring.failed_course_weight, 2.0);
        assert_eq!(config.scoring.motivation_weight, MOTIVATION_WEIGHT);
        assert_eq!(config.tiers, TierPolicy::default());
    }

    #[test]
    fn rejects_inverted_percentiles() {
        let result = PipelineConfig::from_toml_str(
            r#"
            [tiers]
            medium_percentile = 90.0
            high_percentile = 80.0
            "#,
        );
        assert!(result.is_err());
    }

    #[test]
    fn rejects_negative_score_floor() {
        let result = PipelineConfig::from_toml_str(
            r#"
            [scoring]
            score_floor = -10.0
            "#,
        );
        assert!(result.is_err());

        let raised = PipelineConfig::from_toml_str(
            r#"
            [scoring]
            score_floor = 1.0
            "#,
        )
        .unwrap();
        assert_eq!(raised.scoring.score_floor, 1.0);
    }

    #[test]
    fn overrides_take_precedence() {
        let config = PipelineConfig::default()
            .with_overrides(Some("reprobadas".to_string()), None)
            .unwrap();
        assert_eq!(config.schema.failed_course_field, "reprobadas");
        assert_eq!(config.schema.motivation_field, "motivation_level");
    }

    #[test]
    fn rejects_identical_field_names() {
        let result = PipelineConfig::default()
            .with_overrides(Some("score".to_string()), Some("score".to_string()));
        assert!(result.is_err());
    }
}
