use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::PlateError;

static WELL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^([A-Z])(\d{1,2})$").unwrap());

/// One position on the plate. Columns run left to right under the letter
/// labels, rows top to bottom under the number labels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Coordinate {
    pub col: usize,
    pub row: usize,
}

impl Coordinate {
    pub fn new(col: usize, row: usize) -> Self {
        Self { col, row }
    }

    /// Well id in the portrait convention: column letters descend from the
    /// left edge (`H..A` on an 8-column grid), rows are 1-based numbers.
    pub fn label(&self, columns: usize) -> String {
        let letter = (b'A' + (columns - 1 - self.col) as u8) as char;
        format!("{}{}", letter, self.row + 1)
    }

    /// Parses a well id such as `H1` or `A12` back into grid indices.
    pub fn parse(label: &str, columns: usize, rows: usize) -> Result<Self, PlateError> {
        let caps = WELL_RE
            .captures(label.trim())
            .ok_or_else(|| PlateError::BadWell(label.to_string()))?;
        let letter = caps[1].as_bytes()[0];
        let number: usize = caps[2]
            .parse()
            .map_err(|_| PlateError::BadWell(label.to_string()))?;
        let offset = (letter - b'A') as usize;
        if offset >= columns || number == 0 || number > rows {
            return Err(PlateError::BadWell(label.to_string()));
        }
        Ok(Self {
            col: columns - 1 - offset,
            row: number - 1,
        })
    }
}

/// Occupant of a sample well. Replicates are 1-based; sample indices are the
/// 0-based timepoints (`t0`, `t1`, ...) within a subject.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleWell {
    pub experiment: u32,
    pub subject: u32,
    pub sample: u32,
    pub replicate: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Well {
    Empty,
    Calibration { concentration: f64 },
    Sample(SampleWell),
}

impl Well {
    pub fn is_empty(&self) -> bool {
        matches!(self, Well::Empty)
    }

    pub fn is_calibration(&self) -> bool {
        matches!(self, Well::Calibration { .. })
    }

    pub fn sample(&self) -> Option<&SampleWell> {
        match self {
            Well::Sample(sample) => Some(sample),
            _ => None,
        }
    }
}

/// Direction replicates run in. Vertical fills down a column, horizontal
/// fills across a row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Orientation {
    Vertical,
    Horizontal,
}

impl Orientation {
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "vertical" | "v" => Some(Self::Vertical),
            "horizontal" | "h" => Some(Self::Horizontal),
            _ => None,
        }
    }

    pub fn toggled(self) -> Self {
        match self {
            Self::Vertical => Self::Horizontal,
            Self::Horizontal => Self::Vertical,
        }
    }
}

/// One queued unit of work for the packing engine: a sample and the number
/// of replicate wells it must occupy contiguously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueuedSample {
    pub experiment: u32,
    pub subject: u32,
    pub sample: u32,
    pub replicates: usize,
}

/// Inclusive rectangular selection, as produced by a drag gesture. Corners
/// may arrive in any order; `normalized` sorts them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Selection {
    pub start: Coordinate,
    pub end: Coordinate,
}

impl Selection {
    pub fn new(start: Coordinate, end: Coordinate) -> Self {
        Self { start, end }
    }

    pub fn normalized(&self) -> Self {
        Self {
            start: Coordinate::new(self.start.col.min(self.end.col), self.start.row.min(self.end.row)),
            end: Coordinate::new(self.start.col.max(self.end.col), self.start.row.max(self.end.row)),
        }
    }

    pub fn describe(&self, columns: usize) -> String {
        let norm = self.normalized();
        format!("{}..{}", norm.start.label(columns), norm.end.label(columns))
    }
}
