use std::io::Read;
use std::path::Path;

use tracing::{debug, warn};

use crate::error::{PipelineError, Result};
use crate::models::{Batch, InputSchema, ALERT_TIER_FIELD, RISK_SCORE_FIELD};

/// Reads delimited text into a [`Batch`].
///
/// Anything that keeps the input from being a rectangular table with a header
/// row is reported as malformed input. Columns produced by a previous run
/// (`risk_score`, `alert_tier`) are dropped so they get recomputed.
pub fn load_batch<R: Read>(reader: R, delimiter: u8, schema: &InputSchema) -> Result<Batch> {
    let required = schema.required_fields();
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(true)
        .from_reader(reader);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|err| PipelineError::malformed(describe(&err), &required))?
        .iter()
        .map(|header| header.trim_start_matches('\u{feff}').trim().to_string())
        .collect();

    if headers.iter().all(|header| header.is_empty()) {
        return Err(PipelineError::malformed("no header row", &required));
    }

    let derived: Vec<usize> = headers
        .iter()
        .enumerate()
        .filter(|(_, header)| *header == RISK_SCORE_FIELD || *header == ALERT_TIER_FIELD)
        .map(|(index, _)| index)
        .collect();
    if !derived.is_empty() {
        warn!(
            columns = derived.len(),
            "input already carries derived columns, they will be recomputed"
        );
    }

    let keep = |index: &usize| !derived.contains(index);
    let headers: Vec<String> = headers
        .into_iter()
        .enumerate()
        .filter(|(index, _)| keep(index))
        .map(|(_, header)| header)
        .collect();

    let mut rows = Vec::new();
    for result in reader.records() {
        let record = result.map_err(|err| PipelineError::malformed(describe(&err), &required))?;
        rows.push(
            record
                .iter()
                .enumerate()
                .filter(|(index, _)| keep(index))
                .map(|(_, value)| value.to_string())
                .collect(),
        );
    }

    debug!(columns = headers.len(), rows = rows.len(), "loaded batch");
    Ok(Batch::new(headers, rows))
}

pub fn load_batch_from_path(path: &Path, delimiter: u8, schema: &InputSchema) -> Result<Batch> {
    let file = std::fs::File::open(path)?;
    load_batch(file, delimiter, schema)
}

fn describe(err: &csv::Error) -> String {
    match err.kind() {
        csv::ErrorKind::UnequalLengths {
            pos,
            expected_len,
            len,
        } => {
            let line = pos.as_ref().map(|pos| pos.line()).unwrap_or_default();
            format!("line {line} has {len} fields but the header has {expected_len}")
        }
        csv::ErrorKind::Utf8 { pos, .. } => {
            let line = pos.as_ref().map(|pos| pos.line()).unwrap_or_default();
            format!("line {line} is not valid UTF-8")
        }
        _ => err.to_string(),
    }
}
