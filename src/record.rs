use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One validated defect row from an uploaded workbook.
///
/// `defect_id` and both unit indices are guaranteed present and numeric once
/// a record exists; rows that cannot satisfy that are dropped during
/// ingestion and never become a `DefectRecord`.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct DefectRecord {
    pub defect_id: u32,
    pub defect_type: String,
    pub x_coordinate: f64,
    pub y_coordinate: f64,
    pub unit_row_index: u32,
    pub unit_col_index: u32,
}

/// A `DefectRecord` augmented with continuous plot coordinates.
///
/// Purely derived - recomputed on every render, never persisted.
#[derive(Clone, Serialize, Debug)]
pub struct RenderRecord {
    #[serde(flatten)]
    pub record: DefectRecord,
    pub plot_x: f64,
    pub plot_y: f64,
}

/// Summary statistics for one loaded record set, shown in the sidebar of
/// the dashboard and returned from the upload endpoint.
#[derive(Clone, Serialize, Debug)]
pub struct DefectSummary {
    pub total_defects: usize,
    pub unique_types: usize,
    /// Per-type counts, most frequent first.
    pub type_counts: Vec<(String, usize)>,
    /// Grid extent, max index + 1 per axis (0 when no records).
    pub panel_rows: u32,
    pub panel_cols: u32,
}

impl DefectSummary {
    pub fn from_records(records: &[DefectRecord]) -> Self {
        let mut counts: BTreeMap<&str, usize> = BTreeMap::new();
        for r in records {
            *counts.entry(r.defect_type.as_str()).or_insert(0) += 1;
        }

        let mut type_counts: Vec<(String, usize)> = counts
            .into_iter()
            .map(|(ty, n)| (ty.to_string(), n))
            .collect();
        // Most frequent first; ties resolved alphabetically by the BTreeMap order
        type_counts.sort_by(|a, b| b.1.cmp(&a.1));

        let panel_rows = records
            .iter()
            .map(|r| r.unit_row_index + 1)
            .max()
            .unwrap_or(0);
        let panel_cols = records
            .iter()
            .map(|r| r.unit_col_index + 1)
            .max()
            .unwrap_or(0);

        DefectSummary {
            total_defects: records.len(),
            unique_types: type_counts.len(),
            type_counts,
            panel_rows,
            panel_cols,
        }
    }
}
