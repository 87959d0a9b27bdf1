use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::models::{Batch, InputSchema, StudentRecord};

const MOTIVATION_SCALE: std::ops::RangeInclusive<f64> = 1.0..=5.0;

/// Checks that both required columns exist in the batch header. Cell values are not inspected.
pub fn validate_schema(batch: &Batch, schema: &InputSchema) -> Result<()> {
    required_columns(batch, schema).map(|_| ())
}

/// Header positions of the failed-course and motivation columns.
fn required_columns(batch: &Batch, schema: &InputSchema) -> Result<(usize, usize)> {
    let failed = batch.column_index(&schema.failed_course_field);
    let motivation = batch.column_index(&schema.motivation_field);

    match (failed, motivation) {
        (Some(failed), Some(motivation)) => Ok((failed, motivation)),
        _ => {
            let missing = [
                (failed, &schema.failed_course_field),
                (motivation, &schema.motivation_field),
            ]
            .into_iter()
            .filter(|(index, _)| index.is_none())
            .map(|(_, field)| field.clone())
            .collect();
            Err(PipelineError::Schema { missing })
        }
    }
}

/// Turns a schema-checked batch into typed student records.
///
/// Any row that cannot be scored rejects the whole batch, so later stages
/// never see a partial dataset.
pub fn parse_records(batch: &Batch, schema: &InputSchema) -> Result<Vec<StudentRecord>> {
    let (failed_index, motivation_index) = required_columns(batch, schema)?;

    let mut records = Vec::with_capacity(batch.len());
    for (offset, fields) in batch.rows.iter().enumerate() {
        let row = offset + 1;
        let failed_raw = cell(fields, failed_index, row, &schema.failed_course_field)?;
        let motivation_raw = cell(fields, motivation_index, row, &schema.motivation_field)?;

        let failed_course_count = parse_failed_count(failed_raw).ok_or_else(|| {
            PipelineError::InvalidValue {
                row,
                field: schema.failed_course_field.clone(),
                value: failed_raw.to_string(),
                expected: "a non-negative whole number",
            }
        })?;
        let motivation_level = parse_motivation(motivation_raw).ok_or_else(|| {
            PipelineError::InvalidValue {
                row,
                field: schema.motivation_field.clone(),
                value: motivation_raw.to_string(),
                expected: "a finite number",
            }
        })?;

        records.push(StudentRecord {
            row,
            failed_course_count,
            motivation_level,
            fields: fields.clone(),
        });
    }

    let off_scale = rows_off_scale(&records);
    if let Some(&first_row) = off_scale.first() {
        warn!(
            rows = off_scale.len(),
            first_row, "motivation outside the usual 1-5 scale"
        );
    }

    debug!(records = records.len(), "parsed student records");
    Ok(records)
}

/// Rows whose motivation falls outside the 1-5 convention. They are still scored.
fn rows_off_scale(records: &[StudentRecord]) -> Vec<usize> {
    records
        .iter()
        .filter(|record| !MOTIVATION_SCALE.contains(&record.motivation_level))
        .map(|record| record.row)
        .collect()
}

fn cell<'a>(fields: &'a [String], index: usize, row: usize, field: &str) -> Result<&'a str> {
    match fields.get(index).map(|value| value.trim()) {
        Some(value) if !value.is_empty() => Ok(value),
        other => Err(PipelineError::InvalidValue {
            row,
            field: field.to_string(),
            value: other.unwrap_or_default().to_string(),
            expected: "a value, the field is required",
        }),
    }
}

/// Accepts `3` as well as spreadsheet-style `3.0`, but nothing fractional or negative.
fn parse_failed_count(raw: &str) -> Option<u32> {
    if let Ok(count) = raw.parse::<u32>() {
        return Some(count);
    }
    let value = raw.parse::<f64>().ok()?;
    if value.is_finite() && value >= 0.0 && value.fract() == 0.0 && value <= u32::MAX as f64 {
        Some(value as u32)
    } else {
        None
    }
}

fn parse_motivation(raw: &str) -> Option<f64> {
    raw.parse::<f64>().ok().filter(|value| value.is_finite())
}
