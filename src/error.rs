use thiserror::Error;

/// Every failure the layout library can surface. The CLI wraps these in
/// `anyhow`; callers embedding the library match on the variants.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum PlateError {
    #[error(
        "sample t{sample} of subject {subject} (experiment {experiment}) needs {replicates} replicates but a strip holds at most {strip_len} wells"
    )]
    Capacity {
        experiment: u32,
        subject: u32,
        sample: u32,
        replicates: usize,
        strip_len: usize,
    },

    #[error("sample t{sample} of subject {subject} (experiment {experiment}) has a replicate count of zero")]
    EmptySample {
        experiment: u32,
        subject: u32,
        sample: u32,
    },

    #[error("well {well} is already occupied or reserved for calibration")]
    Overlap { well: String },

    #[error("selection {0} lies outside the plate")]
    SelectionOutOfBounds(String),

    #[error("selection {0} overlaps the calibration zone")]
    SelectionInCalibration(String),

    #[error("calibration ladder has {actual} entries but the grid has {expected} columns")]
    LadderLength { expected: usize, actual: usize },

    #[error("calibration ladder must descend strictly to a final blank of 0 (entry {index} breaks the order)")]
    LadderOrder { index: usize },

    #[error("layout CSV is missing the required column {0:?}")]
    MissingColumn(&'static str),

    #[error("layout CSV lists well {well} more than once")]
    DuplicateWell { well: String },

    #[error("{0:?} is not a well on this plate")]
    BadWell(String),

    #[error("well {well}: {reason}")]
    BadRecord { well: String, reason: String },

    #[error("well {well} declares calibration concentration {found} but the ladder expects {expected}")]
    LadderMismatch {
        well: String,
        found: f64,
        expected: f64,
    },

    #[error("plate plan: {0}")]
    Plan(String),
}
