use thiserror::Error;

pub type Result<T> = std::result::Result<T, PipelineError>;

/// Failures a batch can hit on its way through the pipeline.
///
/// None of these are transient: each one means the input batch has to be
/// corrected and resubmitted.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// Required columns are absent from the batch header.
    #[error("missing required field(s): {}", missing.join(", "))]
    Schema { missing: Vec<String> },

    #[error("cannot classify an empty batch (0 records)")]
    EmptyBatch,

    /// The input could not be read as a table at all.
    #[error(
        "input could not be parsed as tabular data: {reason} (expected a header row with the fields: {})",
        required.join(", ")
    )]
    MalformedInput {
        reason: String,
        required: Vec<String>,
    },

    /// A record carries a required field whose value cannot be scored.
    #[error("row {row}: field '{field}' has invalid value '{value}' ({expected})")]
    InvalidValue {
        row: usize,
        field: String,
        value: String,
        expected: &'static str,
    },

    /// An optional column named by the caller does not exist in the batch.
    #[error("unknown column '{field}' given for {option}, it is not in the input header")]
    UnknownColumn { field: String, option: &'static str },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl PipelineError {
    pub fn malformed(reason: impl Into<String>, required: &[&str]) -> Self {
        PipelineError::MalformedInput {
            reason: reason.into(),
            required: required.iter().map(|field| field.to_string()).collect(),
        }
    }
}
