use crate::error::PlateError;
use crate::model::Orientation;
use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Plate geometry. The portrait convention ships as the default: 8 columns
/// labeled H..A, 12 rows labeled 1..12, the first two rows reserved for the
/// calibration ladder. The transposed convention is a matter of swapping
/// these numbers, not of touching the packing code.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GridConfig {
    pub columns: usize,
    pub rows: usize,
    /// Rows reserved for the calibration zone, counted from the top.
    pub calibration_rows: usize,
    /// Standard concentrations keyed by column index, strictly descending,
    /// ending with the blank (0).
    pub ladder: Vec<f64>,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            columns: 8,
            rows: 12,
            calibration_rows: 2,
            ladder: vec![6.4, 3.2, 1.6, 0.8, 0.4, 0.2, 0.1, 0.0],
        }
    }
}

impl GridConfig {
    /// Wells per strip: post-calibration rows for a column strip, the full
    /// width for a row strip.
    pub fn strip_len(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Vertical => self.rows - self.calibration_rows,
            Orientation::Horizontal => self.columns,
        }
    }

    pub fn strip_count(&self, orientation: Orientation) -> usize {
        match orientation {
            Orientation::Vertical => self.columns,
            Orientation::Horizontal => self.rows - self.calibration_rows,
        }
    }

    /// Wells available to samples on one plate.
    pub fn sample_capacity(&self) -> usize {
        self.columns * (self.rows - self.calibration_rows)
    }

    pub fn validate(&self) -> Result<(), PlateError> {
        if self.ladder.len() != self.columns {
            return Err(PlateError::LadderLength {
                expected: self.columns,
                actual: self.ladder.len(),
            });
        }
        for (index, pair) in self.ladder.windows(2).enumerate() {
            if pair[1] >= pair[0] {
                return Err(PlateError::LadderOrder { index: index + 1 });
            }
        }
        match self.ladder.last() {
            Some(&blank) if blank == 0.0 => {}
            _ => {
                return Err(PlateError::LadderOrder {
                    index: self.ladder.len().saturating_sub(1),
                });
            }
        }
        Ok(())
    }

    /// Column header labels, leftmost first.
    pub fn column_labels(&self) -> Vec<String> {
        (0..self.columns)
            .map(|c| ((b'A' + (self.columns - 1 - c) as u8) as char).to_string())
            .collect()
    }

    pub fn row_labels(&self) -> Vec<String> {
        (0..self.rows).map(|r| (r + 1).to_string()).collect()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderConfig {
    pub cell_size: f32,
    pub margin: f32,
    pub grid_stroke_width: f32,
    pub boundary_width: f32,
    pub link_width: f32,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            cell_size: 42.0,
            margin: 50.0,
            grid_stroke_width: 1.0,
            boundary_width: 3.0,
            link_width: 2.0,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    pub grid: GridConfig,
    pub render: RenderConfig,
    pub theme: Theme,
}

#[derive(Debug, Deserialize)]
struct GridConfigFile {
    columns: Option<usize>,
    rows: Option<usize>,
    #[serde(rename = "calibrationRows")]
    calibration_rows: Option<usize>,
    ladder: Option<Vec<f64>>,
}

#[derive(Debug, Deserialize)]
struct RenderConfigFile {
    #[serde(rename = "cellSize")]
    cell_size: Option<f32>,
    margin: Option<f32>,
    #[serde(rename = "boundaryWidth")]
    boundary_width: Option<f32>,
    #[serde(rename = "linkWidth")]
    link_width: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    theme: Option<String>,
    palette: Option<Vec<String>>,
    grid: Option<GridConfigFile>,
    render: Option<RenderConfigFile>,
}

pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let mut config = Config::default();
    let Some(path) = path else {
        return Ok(config);
    };

    let contents = std::fs::read_to_string(path)?;
    let parsed: ConfigFile = serde_json::from_str(&contents)?;

    if let Some(theme_name) = parsed.theme.as_deref() {
        if theme_name == "modern" {
            config.theme = Theme::modern();
        } else if theme_name == "classic" || theme_name == "default" {
            config.theme = Theme::classic();
        }
    }

    if let Some(palette) = parsed.palette {
        if !palette.is_empty() {
            config.theme.palette = palette;
        }
    }

    if let Some(grid) = parsed.grid {
        if let Some(v) = grid.columns {
            config.grid.columns = v;
        }
        if let Some(v) = grid.rows {
            config.grid.rows = v;
        }
        if let Some(v) = grid.calibration_rows {
            config.grid.calibration_rows = v;
        }
        if let Some(v) = grid.ladder {
            config.grid.ladder = v;
        }
    }

    if let Some(render) = parsed.render {
        if let Some(v) = render.cell_size {
            config.render.cell_size = v;
        }
        if let Some(v) = render.margin {
            config.render.margin = v;
        }
        if let Some(v) = render.boundary_width {
            config.render.boundary_width = v;
        }
        if let Some(v) = render.link_width {
            config.render.link_width = v;
        }
    }

    config.grid.validate()?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_grid_is_valid() {
        let grid = GridConfig::default();
        assert!(grid.validate().is_ok());
        assert_eq!(grid.strip_len(Orientation::Vertical), 10);
        assert_eq!(grid.strip_len(Orientation::Horizontal), 8);
        assert_eq!(grid.strip_count(Orientation::Vertical), 8);
        assert_eq!(grid.strip_count(Orientation::Horizontal), 10);
        assert_eq!(grid.sample_capacity(), 80);
    }

    #[test]
    fn ladder_length_must_match_columns() {
        let grid = GridConfig {
            ladder: vec![1.0, 0.0],
            ..GridConfig::default()
        };
        assert_eq!(
            grid.validate(),
            Err(PlateError::LadderLength {
                expected: 8,
                actual: 2
            })
        );
    }

    #[test]
    fn ladder_must_descend_to_blank() {
        let mut grid = GridConfig::default();
        grid.ladder = vec![6.4, 3.2, 3.2, 0.8, 0.4, 0.2, 0.1, 0.0];
        assert_eq!(grid.validate(), Err(PlateError::LadderOrder { index: 2 }));

        grid.ladder = vec![8.0, 6.4, 3.2, 1.6, 0.8, 0.4, 0.2, 0.1];
        assert!(matches!(
            grid.validate(),
            Err(PlateError::LadderOrder { .. })
        ));
    }

    #[test]
    fn column_labels_descend_from_left() {
        let labels = GridConfig::default().column_labels();
        assert_eq!(labels.first().map(String::as_str), Some("H"));
        assert_eq!(labels.last().map(String::as_str), Some("A"));
    }
}
