//! Master merge and grouped summary.

use std::sync::Arc;

use tracing::{debug, info};

use crate::backend::{delete_if_exists, BackendResult, GeoprocessingBackend};

/// What to merge and how to summarize it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregationSpec {
    /// Per-tile joined layers, in tile order.
    pub layers: Vec<String>,
    pub master_name: String,
    /// Field summed per group.
    pub measure_field: String,
    /// Grouping fields, classification first.
    pub group_fields: Vec<String>,
    pub summary_name: String,
}

/// Result of one aggregation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AggregateOutcome {
    Built {
        master: String,
        summary: String,
        master_rows: usize,
        summary_rows: usize,
    },
    /// No input layers; nothing was written.
    Skipped,
}

/// Merges per-tile layers into a master layer and summarizes it.
pub struct Aggregator {
    backend: Arc<dyn GeoprocessingBackend>,
}

impl Aggregator {
    pub fn new(backend: Arc<dyn GeoprocessingBackend>) -> Self {
        Self { backend }
    }

    /// Replace the master layer and summary table described by `spec`.
    ///
    /// Both outputs are removed first, so a skipped or failed aggregation
    /// never leaves a previous run's results behind.
    pub fn build_master_and_summary(
        &self,
        spec: &AggregationSpec,
    ) -> BackendResult<AggregateOutcome> {
        for name in [&spec.master_name, &spec.summary_name] {
            if delete_if_exists(self.backend.as_ref(), name)? {
                debug!(dataset = %name, "Removed previous output");
            }
        }

        if spec.layers.is_empty() {
            info!(master = %spec.master_name, "No layers to merge, skipping");
            return Ok(AggregateOutcome::Skipped);
        }

        let master = self.backend.merge(&spec.layers, &spec.master_name)?;
        let master_rows = self.backend.feature_count(&master)?;
        info!(
            master = %master,
            inputs = spec.layers.len(),
            rows = master_rows,
            "Merged master layer"
        );

        let summary = self.backend.grouped_statistics(
            &master,
            &spec.measure_field,
            &spec.group_fields,
            &spec.summary_name,
        )?;
        let summary_rows = self.backend.feature_count(&summary)?;
        info!(summary = %summary, rows = summary_rows, "Built summary table");

        Ok(AggregateOutcome::Built {
            master,
            summary,
            master_rows,
            summary_rows,
        })
    }
}
