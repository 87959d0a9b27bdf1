use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::config::PipelineConfig;
use crate::error::Result;
use crate::export;
use crate::models::{AlertTier, Batch, ClassifiedRecord, Cutoffs, TierHistogram};
use crate::risk;
use crate::tiers;
use crate::validate;
use crate::view::{self, FilteredView, TierSelection};

/// Everything one batch produces. Cutoffs belong to this batch only.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub batch_id: Uuid,
    pub headers: Vec<String>,
    pub cutoffs: Cutoffs,
    pub classified: Vec<ClassifiedRecord>,
    pub histogram: TierHistogram,
}

#[derive(Debug, Clone, Serialize)]
pub struct Summary {
    pub batch_id: Uuid,
    pub record_count: usize,
    pub cutoffs: Cutoffs,
    pub histogram: TierHistogram,
    pub selected_tiers: Vec<AlertTier>,
    pub nothing_selected: bool,
    pub view_rows: usize,
}

/// Validates, scores and classifies one batch.
pub fn run_pipeline(batch: &Batch, config: &PipelineConfig) -> Result<PipelineOutput> {
    let batch_id = Uuid::new_v4();

    let students = validate::parse_records(batch, &config.schema)?;
    let scored = risk::score_records(&students, &config.scoring);
    let (cutoffs, classified) = tiers::classify(&scored, &config.tiers)?;
    let histogram = TierHistogram::from_records(&classified);

    info!(
        %batch_id,
        records = classified.len(),
        medium_cutoff = cutoffs.medium,
        high_cutoff = cutoffs.high,
        low = histogram.low,
        medium = histogram.medium,
        high = histogram.high,
        "classified batch"
    );

    Ok(PipelineOutput {
        batch_id,
        headers: batch.headers.clone(),
        cutoffs,
        classified,
        histogram,
    })
}

impl PipelineOutput {
    pub fn view(&self, selection: &TierSelection) -> FilteredView {
        view::filter_view(&self.classified, selection)
    }

    pub fn export(&self, view: &FilteredView, delimiter: u8) -> Result<Vec<u8>> {
        export::export_to_bytes(&self.headers, view.rows(), delimiter)
    }

    pub fn summary(&self, selection: &TierSelection, view: &FilteredView) -> Summary {
        Summary {
            batch_id: self.batch_id,
            record_count: self.classified.len(),
            cutoffs: self.cutoffs,
            histogram: self.histogram,
            selected_tiers: selection.tiers().collect(),
            nothing_selected: matches!(view, FilteredView::NothingSelected),
            view_rows: view.len(),
        }
    }
}
