use std::collections::BTreeMap;

use crate::config::GridConfig;
use crate::csv_io::ImportedLayout;
use crate::error::PlateError;
use crate::model::{Coordinate, Orientation, SampleWell, Selection, Well};
use crate::plate::Plate;

/// Full-state undo snapshot, cloned immediately before every mutating
/// operation. Restore is a plain swap and cannot fail.
#[derive(Debug, Clone)]
struct Snapshot {
    plate: Plate,
    names: BTreeMap<(u32, u32), String>,
    current_experiment: u32,
    current_subject: u32,
    next_sample: u32,
    subject_closed: bool,
}

/// Interactive design state for one plate: the grid, the subject-name map,
/// the placement cursor, and the undo history. A GUI front end drives this
/// with selections and single-key commands; every call is a complete,
/// atomic operation.
#[derive(Debug)]
pub struct DesignSession {
    grid: GridConfig,
    plate: Plate,
    names: BTreeMap<(u32, u32), String>,
    orientation: Orientation,
    current_experiment: u32,
    current_subject: u32,
    next_sample: u32,
    subject_closed: bool,
    history: Vec<Snapshot>,
}

impl DesignSession {
    pub fn new(grid: GridConfig) -> Result<Self, PlateError> {
        grid.validate()?;
        let plate = Plate::new(1, &grid);
        Ok(Self {
            grid,
            plate,
            names: BTreeMap::new(),
            orientation: Orientation::Vertical,
            current_experiment: 1,
            current_subject: 1,
            next_sample: 0,
            subject_closed: false,
            history: Vec::new(),
        })
    }

    pub fn plate(&self) -> &Plate {
        &self.plate
    }

    pub fn orientation(&self) -> Orientation {
        self.orientation
    }

    pub fn current_experiment(&self) -> u32 {
        self.current_experiment
    }

    pub fn current_subject(&self) -> u32 {
        self.current_subject
    }

    pub fn next_sample(&self) -> u32 {
        self.next_sample
    }

    pub fn names(&self) -> &BTreeMap<(u32, u32), String> {
        &self.names
    }

    /// Display name for a subject, falling back to the generated `S<id>`.
    pub fn subject_name(&self, experiment: u32, subject: u32) -> String {
        self.names
            .get(&(experiment, subject))
            .cloned()
            .unwrap_or_else(|| format!("S{subject}"))
    }

    pub fn rename_subject(&mut self, experiment: u32, subject: u32, name: &str) {
        if name.is_empty() {
            self.names.remove(&(experiment, subject));
        } else {
            self.names
                .insert((experiment, subject), name.to_string());
        }
    }

    /// Fills a drag selection. Each strip inside the rectangle becomes one
    /// new sample of the current subject with replicates running along the
    /// strip; consecutive strips get consecutive sample indices. Existing
    /// sample wells under the selection are repainted. Selections that
    /// leave the grid or touch the calibration rows are rejected wholesale.
    pub fn apply_selection(&mut self, selection: Selection) -> Result<(), PlateError> {
        let sel = selection.normalized();
        if !self.plate.contains(sel.end) {
            return Err(PlateError::SelectionOutOfBounds(
                sel.describe(self.grid.columns),
            ));
        }
        if sel.start.row < self.grid.calibration_rows {
            return Err(PlateError::SelectionInCalibration(
                sel.describe(self.grid.columns),
            ));
        }

        self.save_snapshot();
        if self.subject_closed {
            self.current_subject += 1;
            self.next_sample = 0;
            self.subject_closed = false;
        }

        match self.orientation {
            Orientation::Vertical => {
                for col in sel.start.col..=sel.end.col {
                    let sample = self.next_sample;
                    self.next_sample += 1;
                    for (offset, row) in (sel.start.row..=sel.end.row).enumerate() {
                        self.write_well(Coordinate::new(col, row), sample, offset as u32 + 1)?;
                    }
                }
            }
            Orientation::Horizontal => {
                for row in sel.start.row..=sel.end.row {
                    let sample = self.next_sample;
                    self.next_sample += 1;
                    for (offset, col) in (sel.start.col..=sel.end.col).enumerate() {
                        self.write_well(Coordinate::new(col, row), sample, offset as u32 + 1)?;
                    }
                }
            }
        }
        Ok(())
    }

    fn write_well(&mut self, coord: Coordinate, sample: u32, replicate: u32) -> Result<(), PlateError> {
        self.plate.set_well(
            coord,
            Well::Sample(SampleWell {
                experiment: self.current_experiment,
                subject: self.current_subject,
                sample,
                replicate,
            }),
        )
    }

    /// The next selection starts a new subject under the current experiment.
    pub fn close_subject(&mut self) {
        self.subject_closed = true;
    }

    pub fn subject_closed(&self) -> bool {
        self.subject_closed
    }

    /// Starts a new experiment: subject ids reset, the palette advances
    /// with the experiment id.
    pub fn next_experiment(&mut self) {
        self.save_snapshot();
        self.current_experiment += 1;
        self.current_subject = 1;
        self.next_sample = 0;
        self.subject_closed = false;
    }

    /// Toggles replicate orientation for subsequent fills.
    pub fn rotate(&mut self) {
        self.orientation = self.orientation.toggled();
    }

    /// Restores the most recent snapshot. No-op on empty history.
    pub fn undo(&mut self) {
        if let Some(snapshot) = self.history.pop() {
            self.plate = snapshot.plate;
            self.names = snapshot.names;
            self.current_experiment = snapshot.current_experiment;
            self.current_subject = snapshot.current_subject;
            self.next_sample = snapshot.next_sample;
            self.subject_closed = snapshot.subject_closed;
        }
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    /// Replaces the whole session state from an imported layout. The
    /// pre-import state stays one undo away.
    pub fn load(&mut self, imported: ImportedLayout) {
        self.save_snapshot();
        self.plate = imported.plate;
        self.names = imported.names;
        self.current_experiment = imported.current_experiment;
        self.current_subject = imported.current_subject;
        self.next_sample = imported.next_sample;
        self.subject_closed = false;
    }

    fn save_snapshot(&mut self) {
        self.history.push(Snapshot {
            plate: self.plate.clone(),
            names: self.names.clone(),
            current_experiment: self.current_experiment,
            current_subject: self.current_subject,
            next_sample: self.next_sample,
            subject_closed: self.subject_closed,
        });
    }
}
