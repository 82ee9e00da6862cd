#![cfg(not(tarpaulin_include))]
#![cfg(feature = "web")]
use crate::layout::PanelLayoutConfig;
use crate::record::RenderRecord;
use plotters::coord::cartesian::Cartesian2d;
use plotters::coord::types::RangedCoordf64;
use plotters::prelude::*;
use std::fs::remove_file;

/// Plot background, SandyBrown.
const BG_COLOR: RGBColor = RGBColor(0xF4, 0xA4, 0x60);
/// Panel fill, Brown.
const PANEL_COLOR: RGBColor = RGBColor(0x8B, 0x45, 0x13);

/// Fixed colors for the defect types seen in practice. The set is open -
/// anything else gets a color from `FALLBACK_PALETTE` in order of first
/// appearance.
const DEFECT_COLORS: &[(&str, RGBColor)] = &[
    ("Nick", MAGENTA),
    ("Short", RED),
    ("Missing Feature", RGBColor(0x00, 0xFF, 0x00)),
    ("Cut", CYAN),
    ("Fine Short", RGBColor(0xDD, 0xA0, 0xDD)),
    ("Pad Violation", WHITE),
    ("Island", RGBColor(0xFF, 0xA5, 0x00)),
    ("Cut/Short", RGBColor(0x00, 0xBF, 0xFF)),
    ("Nick/Protrusion", YELLOW),
];

const FALLBACK_PALETTE: &[RGBColor] = &[
    RGBColor(0xFF, 0x63, 0x47), // Tomato
    RGBColor(0x46, 0x82, 0xB4), // SteelBlue
    RGBColor(0x32, 0xCD, 0x32), // LimeGreen
    RGBColor(0xFF, 0xD7, 0x00), // Gold
    RGBColor(0x6A, 0x5A, 0xCD), // SlateBlue
    RGBColor(0x40, 0xE0, 0xD0), // Turquoise
    RGBColor(0xEE, 0x82, 0xEE), // Violet
    RGBColor(0xF5, 0xDE, 0xB3), // Wheat
];

/// Rendering options for the defect map image.
#[derive(Clone, Debug)]
pub struct MapOptions {
    /// Title displayed at the top of the map
    pub title: String,

    /// Width of the image in pixels
    pub width: u32,

    /// Height of the image in pixels
    pub height: u32,
}

impl Default for MapOptions {
    fn default() -> Self {
        Self {
            title: "Panel Defect Map".to_string(),
            width: 800,
            height: 800,
        }
    }
}

/// Color for a defect type, given the order-of-first-appearance index used
/// for types outside the fixed style map.
fn defect_color(defect_type: &str, fallback_index: usize) -> RGBColor {
    DEFECT_COLORS
        .iter()
        .find(|(name, _)| *name == defect_type)
        .map(|(_, color)| *color)
        .unwrap_or(FALLBACK_PALETTE[fallback_index % FALLBACK_PALETTE.len()])
}

/// Render the 2x2 panel defect map as a PNG image.
///
/// Draws the four square sub-panels with their borders and internal grid
/// lines, then the defects as markers colored by type, with a legend of
/// the types present.
///
/// # Arguments
/// * `records` - Layout-transformed records (already carrying plot coordinates)
/// * `config` - Panel geometry the records were placed with
/// * `options` - Image title and dimensions
///
/// # Returns
/// * A Result containing the PNG image data as bytes or an error
///
/// # Implementation Notes
/// * Creates a temporary file to store the image before reading it back
pub fn render_map(
    records: &[RenderRecord],
    config: &PanelLayoutConfig,
    options: &MapOptions,
) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    // Create a temporary file-based bitmap solution
    let filename = "temp_defect_map.png";
    {
        let root =
            BitMapBackend::new(filename, (options.width, options.height)).into_drawing_area();
        root.fill(&BG_COLOR)?;

        let span = config.span() as f64;
        let mut chart = ChartBuilder::on(&root)
            .caption(&options.title, ("sans-serif", 30).into_font())
            .margin(10)
            .build_cartesian_2d(-1.0..span + 1.0, -1.0..span + 1.0)?;

        draw_panels(&mut chart, config)?;
        draw_defects(&mut chart, records)?;

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()?;

        root.present()?;
    }

    // Read the file directly
    let png_data = std::fs::read(filename)?;

    // Clean up
    remove_file(filename)?;

    Ok(png_data)
}

type MapChart<'a, 'b> =
    ChartContext<'a, BitMapBackend<'b>, Cartesian2d<RangedCoordf64, RangedCoordf64>>;

/// Draw the four panel backgrounds, their borders, and the thin internal
/// grid lines.
fn draw_panels(
    chart: &mut MapChart,
    config: &PanelLayoutConfig,
) -> Result<(), Box<dyn std::error::Error>> {
    let p = config.panel_size as f64;
    let shifted = (config.panel_size + config.gap_size) as f64;
    let origins = [
        (0.0, 0.0),
        (shifted, 0.0),
        (0.0, shifted),
        (shifted, shifted),
    ];

    for (x0, y0) in origins {
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, y0), (x0 + p, y0 + p)],
            PANEL_COLOR.filled(),
        )))?;
        chart.draw_series(std::iter::once(Rectangle::new(
            [(x0, y0), (x0 + p, y0 + p)],
            BLACK.stroke_width(3),
        )))?;

        // Thin inner grid lines
        for i in 1..config.panel_size {
            let offset = i as f64;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x0 + offset, y0), (x0 + offset, y0 + p)],
                BLACK.stroke_width(1),
            )))?;
            chart.draw_series(std::iter::once(PathElement::new(
                vec![(x0, y0 + offset), (x0 + p, y0 + offset)],
                BLACK.stroke_width(1),
            )))?;
        }
    }

    Ok(())
}

/// Draw one marker series per defect type, in order of first appearance.
fn draw_defects(
    chart: &mut MapChart,
    records: &[RenderRecord],
) -> Result<(), Box<dyn std::error::Error>> {
    let mut groups: Vec<(&str, Vec<&RenderRecord>)> = Vec::new();
    for r in records {
        match groups.iter_mut().find(|(ty, _)| *ty == r.record.defect_type) {
            Some((_, members)) => members.push(r),
            None => groups.push((r.record.defect_type.as_str(), vec![r])),
        }
    }

    let mut fallback_index = 0;
    for (defect_type, members) in groups {
        let known = DEFECT_COLORS.iter().any(|(name, _)| *name == defect_type);
        let color = defect_color(defect_type, fallback_index);
        if !known {
            fallback_index += 1;
        }

        chart
            .draw_series(
                members
                    .iter()
                    .map(|r| Circle::new((r.plot_x, r.plot_y), 5, color.filled())),
            )?
            .label(defect_type)
            .legend(move |(x, y)| Circle::new((x, y), 5, color.filled()));
    }

    Ok(())
}
