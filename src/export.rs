use std::io::Write;

use crate::error::Result;
use crate::models::{ClassifiedRecord, ALERT_TIER_FIELD, RISK_SCORE_FIELD};

pub const EXPORT_FILENAME: &str = "resultados_alerta_academica_filtrado.csv";

pub fn export_headers(input_headers: &[String]) -> Vec<String> {
    input_headers
        .iter()
        .cloned()
        .chain([RISK_SCORE_FIELD.to_string(), ALERT_TIER_FIELD.to_string()])
        .collect()
}

/// Shortest text that parses back to the same `f64`.
pub fn format_score(score: f64) -> String {
    format!("{score}")
}

/// Writes the header row followed by one row per record. Input columns keep
/// their original order and text; the score and tier are appended.
pub fn write_export<W: Write>(
    writer: W,
    input_headers: &[String],
    records: &[ClassifiedRecord],
    delimiter: u8,
) -> Result<()> {
    let mut writer = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);

    writer.write_record(export_headers(input_headers))?;
    for record in records {
        let score = format_score(record.risk_score());
        writer.write_record(
            record
                .fields()
                .iter()
                .map(String::as_str)
                .chain([score.as_str(), record.alert_tier.as_str()]),
        )?;
    }
    writer.flush()?;
    Ok(())
}

pub fn export_to_bytes(
    input_headers: &[String],
    records: &[ClassifiedRecord],
    delimiter: u8,
) -> Result<Vec<u8>> {
    let mut buffer = Vec::new();
    write_export(&mut buffer, input_headers, records, delimiter)?;
    Ok(buffer)
}
