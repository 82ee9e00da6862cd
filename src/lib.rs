/*!
# Defect-Viz

A browser-based dashboard for visualizing manufacturing panel defects,
built in Rust.

## Overview

An uploaded Excel workbook describing physical defects
on a manufactured panel (defect ID, type label, physical coordinates, and a
row/column unit index) is cleaned, reshaped, and rendered as a 2D scatter
map of four square sub-panels, with optional per-defect image lookup from
the workbook's embedded media.

## Architecture

Two cooperating stages, both pure transformations over an in-memory table:

### Ingestion & Normalization
- Reads the first worksheet of the uploaded .xlsx bytes
- Locates the header row (or falls back to fixed column positions)
- Repairs the merged "ID + type in one cell" layout via a split rule,
  activated when the nominal type column is more than 90% empty
- Coerces numeric fields, drops rows missing a mandatory value

### Layout Transform
- Maps each record's unit indices into one of four panel quadrants
- Adds sub-unit jitter so co-located defects separate visually
- Jitter is isolated behind a seedable source, so placement is
  reproducible and tests can disable it

The web layer wraps these with a process-wide parse cache, an embedded
media extractor, and a `plotters` renderer for the map image.

## Modules

- **record**: Validated defect records, render records, summary statistics
- **ingest**: Worksheet reading, column strategy detection, normalization
- **layout**: Panel geometry presets and the coordinate transform
- **images**: Embedded media extraction and defect/image pairing
- **cache**: Content-keyed memoization of parsed workbooks
- **plotter**: Defect map rendering to PNG
- **app**: Routing and handlers

## REST API Endpoints

- `POST /api/upload` - Ingests a workbook (multipart field `workbook`)
- `GET /api/defects?preset=<name>` - Render records plus summary as JSON
- `GET /api/map.png?preset=<name>&seed=<n>` - The rendered panel map
- `GET /api/image/{defect_id}/{modality}` - An embedded defect image
- `GET /api/presets` - Available layout presets
*/

// Re-export all modules so they appear in the documentation
pub mod app;
pub mod cache;
pub mod images;
pub mod ingest;
pub mod layout;
pub mod plotter;
pub mod record;

/// Re-export everything from these modules to make it easier to use
pub use cache::*;
pub use images::*;
pub use ingest::*;
pub use layout::*;
pub use record::*;
