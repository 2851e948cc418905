use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;

use crate::border::{BorderMask, BorderOverlay, replicate_links};
use crate::config::RenderConfig;
use crate::model::{Coordinate, Well};
use crate::plate::Plate;
use crate::theme::Theme;

/// Draws one plate as SVG: axis labels, the well grid, the boundary
/// overlay, and the replicate connector lines, in that order so overlays
/// sit on top of the cells.
pub fn render_svg(
    plate: &Plate,
    overlay: &BorderOverlay,
    names: &BTreeMap<(u32, u32), String>,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let cell = config.cell_size;
    let margin = config.margin;
    let width = plate.columns() as f32 * cell + 2.0 * margin;
    let height = plate.rows() as f32 * cell + 2.0 * margin;

    let mut svg = String::new();
    svg.push_str(&format!(
        "<svg xmlns=\"http://www.w3.org/2000/svg\" width=\"{width}\" height=\"{height}\" viewBox=\"0 0 {width} {height}\">",
    ));
    svg.push_str(&format!(
        "<rect width=\"100%\" height=\"100%\" fill=\"{}\"/>",
        theme.background
    ));

    for col in 0..plate.columns() {
        let letter = (b'A' + (plate.columns() - 1 - col) as u8) as char;
        let x = margin + col as f32 * cell + cell / 2.0;
        svg.push_str(&axis_label(x, margin / 2.0, &letter.to_string(), theme));
    }
    for row in 0..plate.rows() {
        let y = margin + row as f32 * cell + cell / 2.0;
        svg.push_str(&axis_label(margin / 2.0, y, &(row + 1).to_string(), theme));
    }

    for (coord, well) in plate.iter() {
        let x = margin + coord.col as f32 * cell;
        let y = margin + coord.row as f32 * cell;

        let (fill, stroke, lines) = match well {
            Well::Empty => (theme.empty_fill.as_str(), theme.grid_color.as_str(), Vec::new()),
            Well::Calibration { concentration } => (
                theme.calibration_fill.as_str(),
                theme.calibration_border.as_str(),
                vec![format!("{concentration}")],
            ),
            Well::Sample(sample) => {
                let name = names
                    .get(&(sample.experiment, sample.subject))
                    .cloned()
                    .unwrap_or_else(|| format!("S{}", sample.subject));
                (
                    theme.experiment_fill(sample.experiment),
                    theme.sample_border.as_str(),
                    vec![name, format!("t{}", sample.sample)],
                )
            }
        };

        svg.push_str(&format!(
            "<rect x=\"{x:.2}\" y=\"{y:.2}\" width=\"{cell:.2}\" height=\"{cell:.2}\" fill=\"{fill}\" stroke=\"{stroke}\" stroke-width=\"{:.2}\"/>",
            config.grid_stroke_width
        ));
        if !lines.is_empty() {
            svg.push_str(&well_label(
                x + cell / 2.0,
                y + cell / 2.0,
                &lines,
                theme,
            ));
        }
    }

    for (coord, mask) in overlay.iter() {
        if mask.is_empty() {
            continue;
        }
        svg.push_str(&boundary_lines(coord, mask, theme, config));
    }

    for (a, b) in replicate_links(plate) {
        let (ax, ay) = cell_center(a, config);
        let (bx, by) = cell_center(b, config);
        svg.push_str(&format!(
            "<line x1=\"{ax:.2}\" y1=\"{ay:.2}\" x2=\"{bx:.2}\" y2=\"{by:.2}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            theme.link_color, config.link_width
        ));
    }

    svg.push_str("</svg>");
    svg
}

fn cell_center(coord: Coordinate, config: &RenderConfig) -> (f32, f32) {
    (
        config.margin + coord.col as f32 * config.cell_size + config.cell_size / 2.0,
        config.margin + coord.row as f32 * config.cell_size + config.cell_size / 2.0,
    )
}

fn axis_label(x: f32, y: f32, text: &str, theme: &Theme) -> String {
    format!(
        "<text x=\"{x:.2}\" y=\"{y:.2}\" text-anchor=\"middle\" dominant-baseline=\"middle\" font-family=\"{}\" font-size=\"{}\" font-weight=\"bold\" fill=\"{}\">{}</text>",
        theme.font_family,
        theme.font_size,
        theme.label_color,
        escape_xml(text)
    )
}

fn well_label(x: f32, y: f32, lines: &[String], theme: &Theme) -> String {
    let line_height = theme.label_font_size * 1.2;
    let total = lines.len() as f32 * line_height;
    let start_y = y - total / 2.0 + theme.label_font_size;

    let mut text = format!(
        "<text x=\"{x:.2}\" y=\"{start_y:.2}\" text-anchor=\"middle\" font-family=\"{}\" font-size=\"{}\" fill=\"{}\">",
        theme.font_family, theme.label_font_size, theme.label_color
    );
    for (idx, line) in lines.iter().enumerate() {
        if idx == 0 {
            text.push_str(&format!("<tspan x=\"{x:.2}\" dy=\"0\">{}", escape_xml(line)));
        } else {
            text.push_str(&format!(
                "<tspan x=\"{x:.2}\" dy=\"{line_height:.2}\">{}",
                escape_xml(line)
            ));
        }
        text.push_str("</tspan>");
    }
    text.push_str("</text>");
    text
}

fn boundary_lines(
    coord: Coordinate,
    mask: BorderMask,
    theme: &Theme,
    config: &RenderConfig,
) -> String {
    let cell = config.cell_size;
    let x1 = config.margin + coord.col as f32 * cell;
    let y1 = config.margin + coord.row as f32 * cell;
    let x2 = x1 + cell;
    let y2 = y1 + cell;

    let mut out = String::new();
    let mut line = |ax: f32, ay: f32, bx: f32, by: f32| {
        out.push_str(&format!(
            "<line x1=\"{ax:.2}\" y1=\"{ay:.2}\" x2=\"{bx:.2}\" y2=\"{by:.2}\" stroke=\"{}\" stroke-width=\"{:.2}\"/>",
            theme.boundary_color, config.boundary_width
        ));
    };

    if mask.contains(BorderMask::TOP) {
        line(x1, y1, x2, y1);
    }
    if mask.contains(BorderMask::RIGHT) {
        line(x2, y1, x2, y2);
    }
    if mask.contains(BorderMask::BOTTOM) {
        line(x1, y2, x2, y2);
    }
    if mask.contains(BorderMask::LEFT) {
        line(x1, y1, x1, y2);
    }
    out
}

pub fn write_output_svg(svg: &str, output: Option<&Path>) -> Result<()> {
    match output {
        Some(path) => {
            std::fs::write(path, svg)?;
        }
        None => {
            print!("{}", svg);
        }
    }
    Ok(())
}

#[cfg(feature = "png")]
pub fn write_output_png(svg: &str, output: &Path, theme: &Theme) -> Result<()> {
    let mut opt = usvg::Options::default();
    opt.font_family = theme.font_family.clone();

    let tree = usvg::Tree::from_str(svg, &opt)?;
    let size = tree.size().to_int_size();
    let mut pixmap = resvg::tiny_skia::Pixmap::new(size.width(), size.height())
        .ok_or_else(|| anyhow::anyhow!("Failed to allocate pixmap"))?;

    let mut pixmap_mut = pixmap.as_mut();
    resvg::render(&tree, resvg::tiny_skia::Transform::default(), &mut pixmap_mut);
    pixmap.save_png(output)?;
    Ok(())
}

fn escape_xml(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::border::compute_borders;
    use crate::config::GridConfig;
    use crate::model::{Orientation, QueuedSample};

    fn render_sample_plate() -> String {
        let grid = GridConfig::default();
        let mut plate = Plate::new(1, &grid);
        plate
            .place(
                &QueuedSample {
                    experiment: 1,
                    subject: 1,
                    sample: 0,
                    replicates: 3,
                },
                Coordinate::new(0, 2),
                Orientation::Vertical,
            )
            .unwrap();
        let overlay = compute_borders(&plate);
        let mut names = BTreeMap::new();
        names.insert((1, 1), "Ctrl & Co".to_string());
        render_svg(&plate, &overlay, &names, &Theme::classic(), &RenderConfig::default())
    }

    #[test]
    fn render_svg_basic() {
        let svg = render_sample_plate();
        assert!(svg.starts_with("<svg"));
        assert!(svg.ends_with("</svg>"));
        // Ladder top concentration, escaped subject name, timepoint label.
        assert!(svg.contains(">6.4<"));
        assert!(svg.contains("Ctrl &amp; Co"));
        assert!(svg.contains(">t0<"));
        // Experiment 1 takes the first palette entry.
        assert!(svg.contains("#CCFFCC"));
    }

    #[test]
    fn fallback_names_appear_when_unset() {
        let grid = GridConfig::default();
        let mut plate = Plate::new(1, &grid);
        plate
            .place(
                &QueuedSample {
                    experiment: 1,
                    subject: 4,
                    sample: 2,
                    replicates: 2,
                },
                Coordinate::new(1, 2),
                Orientation::Vertical,
            )
            .unwrap();
        let overlay = compute_borders(&plate);
        let svg = render_svg(
            &plate,
            &overlay,
            &BTreeMap::new(),
            &Theme::classic(),
            &RenderConfig::default(),
        );
        assert!(svg.contains(">S4<"));
        assert!(svg.contains(">t2<"));
    }

    #[test]
    fn replicate_links_are_drawn() {
        let svg = render_sample_plate();
        // 3 replicates in one column produce 2 connector lines.
        assert_eq!(svg.matches("stroke=\"#0000FF\"").count(), 2);
    }
}
