use std::collections::HashMap;
use std::fmt::Write;

use chrono::{DateTime, Utc};

use crate::error::{PipelineError, Result};
use crate::export::format_score;
use crate::models::{AlertTier, ClassifiedRecord, GroupSummary, TierHistogram};
use crate::pipeline::PipelineOutput;

#[derive(Debug, Clone, Default)]
pub struct ReportOptions<'a> {
    pub source: Option<&'a str>,
    pub group_by: Option<&'a str>,
    pub label_field: Option<&'a str>,
    pub top: usize,
}

/// Groups records by the value of a passthrough column, most HIGH alerts first.
pub fn summarize_by_group(
    headers: &[String],
    records: &[ClassifiedRecord],
    field: &str,
) -> Result<Vec<GroupSummary>> {
    let index = headers
        .iter()
        .position(|header| header == field)
        .ok_or_else(|| PipelineError::UnknownColumn {
            field: field.to_string(),
            option: "group-by",
        })?;

    let mut map: HashMap<String, (TierHistogram, f64)> = HashMap::new();
    for record in records {
        let group = record
            .fields()
            .get(index)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .unwrap_or("(blank)");
        let entry = map.entry(group.to_string()).or_default();
        entry.0.add(record.alert_tier);
        entry.1 += record.risk_score();
    }

    let mut summaries: Vec<GroupSummary> = map
        .into_iter()
        .map(|(group, (histogram, total_score))| GroupSummary {
            avg_score: if histogram.total() == 0 {
                0.0
            } else {
                total_score / histogram.total() as f64
            },
            group,
            histogram,
        })
        .collect();

    summaries.sort_by(|a, b| {
        b.histogram
            .high
            .cmp(&a.histogram.high)
            .then(b.histogram.total().cmp(&a.histogram.total()))
            .then_with(|| a.group.cmp(&b.group))
    });
    Ok(summaries)
}

fn percent(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 * 100.0 / total as f64
    }
}

pub fn build_report(
    output: &PipelineOutput,
    options: &ReportOptions<'_>,
    generated_at: DateTime<Utc>,
) -> Result<String> {
    let groups = match options.group_by {
        Some(field) => Some((
            field,
            summarize_by_group(&output.headers, &output.classified, field)?,
        )),
        None => None,
    };
    let label_index = match options.label_field {
        Some(field) => Some(
            output
                .headers
                .iter()
                .position(|header| header == field)
                .ok_or_else(|| PipelineError::UnknownColumn {
                    field: field.to_string(),
                    option: "label-field",
                })?,
        ),
        None => None,
    };

    let mut report = String::new();
    let total = output.classified.len();

    let _ = writeln!(report, "# Academic Early Warning Report");
    let _ = writeln!(
        report,
        "Generated {} for {} (batch {})",
        generated_at.format("%Y-%m-%d %H:%M UTC"),
        options.source.unwrap_or("uploaded batch"),
        output.batch_id
    );
    let _ = writeln!(report);
    let _ = writeln!(report, "## Cutoffs");
    let _ = writeln!(
        report,
        "- MEDIUM above {:.2}, HIGH above {:.2} ({} students scored)",
        output.cutoffs.medium, output.cutoffs.high, total
    );

    let _ = writeln!(report);
    let _ = writeln!(report, "## Alert Tiers");
    for tier in AlertTier::ALL {
        let count = output.histogram.count(tier);
        let _ = writeln!(
            report,
            "- {}: {} students ({:.1}%), {}",
            tier,
            count,
            percent(count, total),
            tier.guidance()
        );
    }

    let mut ranked: Vec<&ClassifiedRecord> = output.classified.iter().collect();
    ranked.sort_by(|a, b| b.risk_score().total_cmp(&a.risk_score()));
    let _ = writeln!(report);
    let _ = writeln!(report, "## Highest Risk Students");

    if ranked.is_empty() || options.top == 0 {
        let _ = writeln!(report, "No students listed.");
    } else {
        for record in ranked.iter().take(options.top) {
            let label = label_index
                .and_then(|index| record.fields().get(index))
                .map(|value| value.to_string())
                .unwrap_or_else(|| format!("row {}", record.row()));
            let _ = writeln!(
                report,
                "- {} score {} ({})",
                label,
                format_score(record.risk_score()),
                record.alert_tier
            );
        }
    }

    if let Some((field, summaries)) = groups {
        let _ = writeln!(report);
        let _ = writeln!(report, "## Tier Mix by {field}");
        for summary in summaries.iter() {
            let _ = writeln!(
                report,
                "- {}: {} students, LOW {} / MEDIUM {} / HIGH {} (avg score {:.2})",
                summary.group,
                summary.histogram.total(),
                summary.histogram.low,
                summary.histogram.medium,
                summary.histogram.high,
                summary.avg_score
            );
        }
    }

    Ok(report)
}
