use defectviz::ingest::{CellValue, ColumnStrategy, Table, detect_strategy, normalize, split_combined};

fn text(s: &str) -> CellValue {
    CellValue::Text(s.to_string())
}

fn num(n: f64) -> CellValue {
    CellValue::Number(n)
}

// Test header detection on a titled sheet
fn test_header_detection() {
    println!("\n====== Testing header detection ======");

    let table: Table = vec![
        vec![text("Inspection report - panel 4"), CellValue::Blank],
        vec![
            text("DEFECT_ID"),
            text("DEFECT_TYPE"),
            text("X_COORDINATES"),
            text("Y_COORDINATES"),
            text("UNIT_INDEX_X"),
            text("UNIT_INDEX_Y"),
        ],
        vec![num(1.0), text("Short"), num(10.5), num(3.2), num(0.0), num(1.0)],
    ];

    let strategy = detect_strategy(&table).unwrap();
    assert!(matches!(strategy, ColumnStrategy::ByHeaderName { header_row: 1, .. }));
    println!("✓ Header row found below the title row");

    let records = normalize(&table, &strategy);
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].defect_id, 1);
    assert_eq!(records[0].defect_type, "Short");
    println!("✓ Named columns extracted correctly");
}

// Test the merged-cell split rule
fn test_combined_split() {
    println!("\n====== Testing combined cell split ======");

    assert_eq!(
        split_combined("42 Missing Feature"),
        Some((42, "Missing Feature".to_string()))
    );
    println!("✓ \"42 Missing Feature\" splits into id 42 / type \"Missing Feature\"");

    assert_eq!(split_combined("banana"), None);
    println!("✓ Non-numeric leading token rejected");

    let mut table: Table = vec![vec![text("title")]];
    for i in 1..=20u32 {
        table.push(vec![
            text(&format!("{} Nick", i)),
            num(1.0),
            num(2.0),
            num((i % 4) as f64),
            num((i % 6) as f64),
        ]);
    }
    let strategy = detect_strategy(&table).unwrap();
    assert!(matches!(strategy, ColumnStrategy::CombinedCellSplit { .. }));
    let records = normalize(&table, &strategy);
    assert_eq!(records.len(), 20);
    assert_eq!(records[4].defect_id, 5);
    println!("✓ Headerless merged layout detected and normalized");
}

// Test row-level exclusion
fn test_row_exclusion() {
    println!("\n====== Testing row exclusion ======");

    let table: Table = vec![
        vec![text("title")],
        vec![num(1.0), text("Short"), num(0.0), num(0.0), num(1.0), num(1.0)],
        vec![num(2.0), text("Nick"), num(0.0), num(0.0), text("N/A"), num(1.0)],
        vec![num(3.0), text("Cut"), num(0.0), num(0.0), num(2.0), num(2.0)],
    ];

    let strategy = detect_strategy(&table).unwrap();
    let records = normalize(&table, &strategy);
    assert_eq!(records.len(), 2);
    assert!(records.iter().all(|r| r.defect_id != 2));
    println!("✓ Row with unparseable unit index dropped, others kept in order");
}

fn main() {
    println!("=== Ingestion Test Suite ===");

    test_header_detection();
    test_combined_split();
    test_row_exclusion();

    println!("\nAll tests completed.");
}
