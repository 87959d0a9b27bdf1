//! Academic early warning: scores students from failed courses and motivation,
//! assigns batch-relative alert tiers, and filters/exports the result.

pub mod config;
pub mod error;
pub mod export;
pub mod ingest;
pub mod models;
pub mod pipeline;
pub mod report;
pub mod risk;
pub mod tiers;
pub mod validate;
pub mod view;

pub use config::PipelineConfig;
pub use error::{PipelineError, Result};
pub use models::{AlertTier, Batch, ClassifiedRecord, Cutoffs, InputSchema, TierHistogram};
pub use pipeline::{run_pipeline, PipelineOutput, Summary};
pub use view::{FilteredView, TierSelection};
