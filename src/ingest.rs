use crate::record::DefectRecord;
use calamine::{Data, Reader, Xlsx};
use std::io::Cursor;
use thiserror::Error;

/// How many leading rows are scanned when probing for a header row.
const HEADER_SCAN_ROWS: usize = 5;

/// Fraction of empty cells in the nominal type column above which the file
/// is treated as having defect ID and defect type merged into one cell.
const COMBINED_CELL_THRESHOLD: f64 = 0.9;

/// One cell of the raw rectangular table read from a worksheet.
#[derive(Clone, Debug, PartialEq)]
pub enum CellValue {
    Blank,
    Number(f64),
    Text(String),
}

/// The raw worksheet contents, rows of cells in file order.
pub type Table = Vec<Vec<CellValue>>;

/// Structural ingestion failures. Row-level defects never surface here -
/// bad rows are silently excluded from the output instead.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("could not read workbook: {0}")]
    Unreadable(String),

    #[error("workbook contains no worksheets")]
    NoWorksheet,

    #[error("worksheet has no data rows")]
    EmptyTable,

    #[error("missing required columns: {0}")]
    MissingColumns(String),
}

/// Resolved column positions for the expected fields.
///
/// `unit_row` / `unit_col` are mandatory; physical coordinates and the type
/// column may be absent, in which case coordinates default to 0 and the
/// type label to "Unknown".
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ColumnIndices {
    pub id: usize,
    pub ty: Option<usize>,
    pub x: Option<usize>,
    pub y: Option<usize>,
    pub unit_row: usize,
    pub unit_col: usize,
}

impl ColumnIndices {
    /// The conventional six-column layout:
    /// DEFECT_ID, DEFECT_TYPE, X_COORDINATES, Y_COORDINATES,
    /// UNIT_INDEX_X, UNIT_INDEX_Y.
    pub const fn fixed() -> Self {
        ColumnIndices {
            id: 0,
            ty: Some(1),
            x: Some(2),
            y: Some(3),
            unit_row: 4,
            unit_col: 5,
        }
    }

    /// The merged-cell layout: "<id> <type>" in column 0, then
    /// X_COORDINATES, Y_COORDINATES, UNIT_INDEX_X, UNIT_INDEX_Y.
    pub const fn merged() -> Self {
        ColumnIndices {
            id: 0,
            ty: None,
            x: Some(1),
            y: Some(2),
            unit_row: 3,
            unit_col: 4,
        }
    }
}

/// How column positions are resolved for a given file.
///
/// Chosen once per load by `detect_strategy`; the many per-file probing
/// heuristics collapse into this one selector.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnStrategy {
    /// A header row was found in the first few rows; columns are taken by
    /// name from it.
    ByHeaderName {
        header_row: usize,
        columns: ColumnIndices,
    },
    /// No usable header; columns are taken positionally after the title row.
    ByFixedPosition { data_start: usize },
    /// The ID column holds "<id> <type>" merged into one cell; the ID is the
    /// text up to the first whitespace run, the remainder is the type label.
    CombinedCellSplit {
        data_start: usize,
        columns: ColumnIndices,
    },
}

impl ColumnStrategy {
    /// First data row, column positions, and whether the ID cell needs the
    /// split rule applied.
    fn layout(&self) -> (usize, ColumnIndices, bool) {
        match *self {
            ColumnStrategy::ByHeaderName {
                header_row,
                columns,
            } => (header_row + 1, columns, false),
            ColumnStrategy::ByFixedPosition { data_start } => {
                (data_start, ColumnIndices::fixed(), false)
            }
            ColumnStrategy::CombinedCellSplit {
                data_start,
                columns,
            } => (data_start, columns, true),
        }
    }
}

/// Load and clean defect records from the raw bytes of an uploaded
/// .xlsx workbook.
///
/// This is the single entry point for ingestion: it reads the first
/// worksheet, picks a column strategy for the file, and normalizes the rows
/// into validated records in their original order.
///
/// # Arguments
/// * `bytes` - The raw contents of the uploaded file
///
/// # Returns
/// * `Result<Vec<DefectRecord>, IngestError>` - The cleaned records, or a
///   single structural error with no partial data
///
/// # Examples
/// ```no_run
/// use defectviz::ingest::load_workbook;
///
/// let bytes = std::fs::read("defects.xlsx").unwrap();
/// match load_workbook(&bytes) {
///     Ok(records) => println!("Loaded {} defects", records.len()),
///     Err(e) => eprintln!("Ingestion failed: {}", e),
/// }
/// ```
pub fn load_workbook(bytes: &[u8]) -> Result<Vec<DefectRecord>, IngestError> {
    let table = read_table(bytes)?;
    let strategy = detect_strategy(&table)?;
    Ok(normalize(&table, &strategy))
}

/// Read the first worksheet of an .xlsx workbook into a raw table.
pub fn read_table(bytes: &[u8]) -> Result<Table, IngestError> {
    let mut workbook: Xlsx<_> = Xlsx::new(Cursor::new(bytes))
        .map_err(|e| IngestError::Unreadable(e.to_string()))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(IngestError::NoWorksheet)?
        .map_err(|e| IngestError::Unreadable(e.to_string()))?;

    let table = range
        .rows()
        .map(|row| row.iter().map(convert_cell).collect())
        .collect();

    Ok(table)
}

fn convert_cell(data: &Data) -> CellValue {
    match data {
        Data::Empty => CellValue::Blank,
        Data::String(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() {
                CellValue::Blank
            } else {
                CellValue::Text(trimmed.to_string())
            }
        }
        Data::Float(f) => CellValue::Number(*f),
        Data::Int(i) => CellValue::Number(*i as f64),
        Data::Bool(b) => CellValue::Number(if *b { 1.0 } else { 0.0 }),
        Data::DateTime(dt) => CellValue::Number(dt.as_f64()),
        _ => CellValue::Blank,
    }
}

/// Pick the column strategy for a raw table.
///
/// The first `HEADER_SCAN_ROWS` rows are probed for a DEFECT_ID header; if
/// one is found the named columns from that row are used, otherwise the
/// fixed positional layout after a single title row. Either base choice is
/// upgraded to `CombinedCellSplit` when the nominal type column is empty
/// for more than 90% of the data rows, or - for the headerless layout -
/// when the ID column itself holds merged "<id> <type>" text.
///
/// # Errors
/// * `EmptyTable` - no data rows at all
/// * `MissingColumns` - a header row exists but lacks the mandatory unit
///   index columns, or the table is too narrow for positional extraction
pub fn detect_strategy(table: &Table) -> Result<ColumnStrategy, IngestError> {
    if table.iter().all(|row| row_is_blank(row)) {
        return Err(IngestError::EmptyTable);
    }

    let base = match find_header_row(table) {
        Some(header_row) => {
            let columns = resolve_named_columns(&table[header_row])?;
            ColumnStrategy::ByHeaderName {
                header_row,
                columns,
            }
        }
        None => {
            let width = table.iter().map(|row| row.len()).max().unwrap_or(0);
            if width < 5 {
                return Err(IngestError::MissingColumns(
                    "expected at least 5 columns for positional extraction".to_string(),
                ));
            }
            ColumnStrategy::ByFixedPosition { data_start: 1 }
        }
    };

    let (data_start, columns, _) = base.layout();
    let data_rows: Vec<&Vec<CellValue>> = table
        .iter()
        .skip(data_start)
        .filter(|row| !row_is_blank(row))
        .collect();
    if data_rows.is_empty() {
        return Err(IngestError::EmptyTable);
    }

    // A nominal type column that is overwhelmingly empty means the type
    // lives merged inside the ID cell; re-derive both from the ID column.
    if let Some(ty) = columns.ty {
        let empty = data_rows
            .iter()
            .filter(|row| matches!(row.get(ty), None | Some(CellValue::Blank)))
            .count();
        if empty as f64 / data_rows.len() as f64 > COMBINED_CELL_THRESHOLD {
            return Ok(ColumnStrategy::CombinedCellSplit {
                data_start,
                columns: ColumnIndices { ty: None, ..columns },
            });
        }
    }

    // Headerless files with merged cells carry one column less: the ID cell
    // is non-numeric text that splits into a number plus a label, and the
    // numeric fields all shift left by one.
    if matches!(base, ColumnStrategy::ByFixedPosition { .. }) {
        let merged = data_rows
            .iter()
            .filter(|row| match row.first() {
                Some(CellValue::Text(t)) => {
                    t.trim().parse::<f64>().is_err() && split_combined(t).is_some()
                }
                _ => false,
            })
            .count();
        if merged as f64 / data_rows.len() as f64 > COMBINED_CELL_THRESHOLD {
            return Ok(ColumnStrategy::CombinedCellSplit {
                data_start,
                columns: ColumnIndices::merged(),
            });
        }
    }

    Ok(base)
}

/// Clean a raw table into validated records under an already chosen
/// strategy, preserving the input row order.
///
/// Row-level failures (missing or unparseable defect ID or unit index) drop
/// the row silently; a missing coordinate becomes 0. This never errors -
/// structural problems are caught by `detect_strategy`.
pub fn normalize(table: &Table, strategy: &ColumnStrategy) -> Vec<DefectRecord> {
    let (data_start, columns, split_id) = strategy.layout();
    let mut records = Vec::new();

    for row in table.iter().skip(data_start) {
        if row_is_blank(row) {
            continue;
        }

        let (id, defect_type) = if split_id {
            match row.get(columns.id) {
                Some(CellValue::Text(t)) => match split_combined(t) {
                    Some((id, ty)) => (Some(id), ty),
                    None => (None, String::new()),
                },
                // A merged cell that arrived as a bare number has no label
                Some(CellValue::Number(n)) => (integral(*n), String::new()),
                _ => (None, String::new()),
            }
        } else {
            let id = row.get(columns.id).and_then(cell_number).and_then(integral);
            let ty = columns
                .ty
                .and_then(|c| row.get(c))
                .and_then(cell_text)
                .unwrap_or_default();
            (id, ty)
        };

        // Mandatory fields: a fabricated zero here would corrupt grid
        // placement, so the row is dropped instead.
        let Some(id) = id.filter(|&id| id > 0) else {
            continue;
        };
        let Some(unit_row_index) = row.get(columns.unit_row).and_then(cell_number).and_then(integral)
        else {
            continue;
        };
        let Some(unit_col_index) = row.get(columns.unit_col).and_then(cell_number).and_then(integral)
        else {
            continue;
        };

        let x_coordinate = columns
            .x
            .and_then(|c| row.get(c))
            .and_then(cell_number)
            .unwrap_or(0.0);
        let y_coordinate = columns
            .y
            .and_then(|c| row.get(c))
            .and_then(cell_number)
            .unwrap_or(0.0);

        let defect_type = if defect_type.is_empty() {
            "Unknown".to_string()
        } else {
            defect_type
        };

        records.push(DefectRecord {
            defect_id: id,
            defect_type,
            x_coordinate,
            y_coordinate,
            unit_row_index,
            unit_col_index,
        });
    }

    records
}

/// Split a merged "<id> <type>" cell on the first whitespace run.
///
/// Returns the parsed positive integer ID and the trimmed remainder, or
/// `None` when the leading token is not a positive integer.
pub fn split_combined(text: &str) -> Option<(u32, String)> {
    let text = text.trim();
    let mut parts = text.splitn(2, char::is_whitespace);
    let id = parts
        .next()
        .and_then(|tok| tok.parse::<f64>().ok())
        .and_then(integral)
        .filter(|&id| id > 0)?;
    let label = parts.next().unwrap_or("").trim().to_string();
    Some((id, label))
}

fn find_header_row(table: &Table) -> Option<usize> {
    table
        .iter()
        .take(HEADER_SCAN_ROWS)
        .position(|row| row.iter().any(|c| header_matches(c, "DEFECT_ID")))
}

fn resolve_named_columns(header: &[CellValue]) -> Result<ColumnIndices, IngestError> {
    let find = |name: &str| header.iter().position(|c| header_matches(c, name));

    let id = find("DEFECT_ID");
    let unit_row = find("UNIT_INDEX_X");
    let unit_col = find("UNIT_INDEX_Y");

    match (id, unit_row, unit_col) {
        (Some(id), Some(unit_row), Some(unit_col)) => Ok(ColumnIndices {
            id,
            ty: find("DEFECT_TYPE"),
            x: find("X_COORDINATES"),
            y: find("Y_COORDINATES"),
            unit_row,
            unit_col,
        }),
        _ => {
            let mut missing = Vec::new();
            if id.is_none() {
                missing.push("DEFECT_ID");
            }
            if unit_row.is_none() {
                missing.push("UNIT_INDEX_X");
            }
            if unit_col.is_none() {
                missing.push("UNIT_INDEX_Y");
            }
            Err(IngestError::MissingColumns(missing.join(", ")))
        }
    }
}

fn header_matches(cell: &CellValue, name: &str) -> bool {
    match cell {
        CellValue::Text(t) => t.trim().eq_ignore_ascii_case(name),
        _ => false,
    }
}

fn row_is_blank(row: &[CellValue]) -> bool {
    row.iter().all(|c| matches!(c, CellValue::Blank))
}

/// Numeric coercion: numbers pass through, text is parsed, anything else
/// is missing.
fn cell_number(cell: &CellValue) -> Option<f64> {
    match cell {
        CellValue::Number(n) => Some(*n),
        CellValue::Text(t) => t.trim().parse::<f64>().ok(),
        CellValue::Blank => None,
    }
}

fn cell_text(cell: &CellValue) -> Option<String> {
    match cell {
        CellValue::Text(t) => Some(t.trim().to_string()),
        CellValue::Number(n) => Some(n.to_string()),
        CellValue::Blank => None,
    }
}

/// A finite non-negative number truncated to an integer, as the source
/// sheets store indices as floats.
fn integral(value: f64) -> Option<u32> {
    if value.is_finite() && value >= 0.0 && value <= u32::MAX as f64 {
        Some(value.trunc() as u32)
    } else {
        None
    }
}
