use std::collections::BTreeMap;
use std::io::{Read, Write};

use serde::{Deserialize, Serialize};

use crate::config::GridConfig;
use crate::error::PlateError;
use crate::model::{Coordinate, SampleWell, Well};
use crate::plate::Plate;

/// Wire format: one record per well, calibration concentrations and sample
/// identities as plain columns, empty wells written explicitly so a layout
/// file always has `columns * rows` records.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct LayoutRecord {
    #[serde(rename = "Well")]
    well: String,
    #[serde(rename = "Type")]
    kind: String,
    #[serde(rename = "Concentration")]
    concentration: String,
    #[serde(rename = "Experiment")]
    experiment: String,
    #[serde(rename = "Subject")]
    subject: String,
    #[serde(rename = "Timepoint")]
    timepoint: String,
    #[serde(rename = "Replicate")]
    replicate: String,
    #[serde(rename = "Subject Name")]
    subject_name: String,
}

impl LayoutRecord {
    fn empty(well: String) -> Self {
        Self {
            well,
            kind: "Empty".to_string(),
            concentration: String::new(),
            experiment: String::new(),
            subject: String::new(),
            timepoint: String::new(),
            replicate: String::new(),
            subject_name: String::new(),
        }
    }
}

const REQUIRED_COLUMNS: [&str; 8] = [
    "Well",
    "Type",
    "Concentration",
    "Experiment",
    "Subject",
    "Timepoint",
    "Replicate",
    "Subject Name",
];

/// Result of a successful import: the reconstructed plate, the subject
/// names found in the file, and the session cursor recomputed the way the
/// original designer does (resume at the highest experiment/subject seen).
#[derive(Debug, Clone)]
pub struct ImportedLayout {
    pub plate: Plate,
    pub names: BTreeMap<(u32, u32), String>,
    pub current_experiment: u32,
    pub current_subject: u32,
    pub next_sample: u32,
}

pub fn export_csv<W: Write>(
    plate: &Plate,
    names: &BTreeMap<(u32, u32), String>,
    writer: W,
) -> Result<(), PlateError> {
    let mut out = csv::Writer::from_writer(writer);
    for row in 0..plate.rows() {
        for col in 0..plate.columns() {
            let coord = Coordinate::new(col, row);
            let well_id = coord.label(plate.columns());
            let record = match plate.well(coord) {
                Well::Empty => LayoutRecord::empty(well_id),
                Well::Calibration { concentration } => LayoutRecord {
                    kind: "Calibration".to_string(),
                    concentration: format_concentration(*concentration),
                    ..LayoutRecord::empty(well_id)
                },
                Well::Sample(sample) => LayoutRecord {
                    kind: "Experiment".to_string(),
                    experiment: sample.experiment.to_string(),
                    subject: sample.subject.to_string(),
                    timepoint: format!("t{}", sample.sample),
                    replicate: sample.replicate.to_string(),
                    subject_name: names
                        .get(&(sample.experiment, sample.subject))
                        .cloned()
                        .unwrap_or_default(),
                    ..LayoutRecord::empty(well_id)
                },
            };
            out.serialize(record)
                .map_err(|err| PlateError::BadRecord {
                    well: coord.label(plate.columns()),
                    reason: err.to_string(),
                })?;
        }
    }
    out.flush().map_err(|err| PlateError::BadRecord {
        well: String::new(),
        reason: err.to_string(),
    })?;
    Ok(())
}

/// Parses a layout CSV back into a plate. All-or-nothing: any malformed
/// record aborts the import and the caller's state stays untouched.
pub fn import_csv<R: Read>(reader: R, grid: &GridConfig) -> Result<ImportedLayout, PlateError> {
    grid.validate()?;
    let mut input = csv::Reader::from_reader(reader);

    let headers = input
        .headers()
        .map_err(|err| PlateError::BadRecord {
            well: String::new(),
            reason: err.to_string(),
        })?
        .clone();
    for required in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| h == required) {
            return Err(PlateError::MissingColumn(required));
        }
    }

    let mut plate = Plate::new(1, grid);
    let mut names = BTreeMap::new();
    let mut seen = vec![false; grid.columns * grid.rows];

    for record in input.deserialize::<LayoutRecord>() {
        let record = record.map_err(|err| PlateError::BadRecord {
            well: String::new(),
            reason: err.to_string(),
        })?;
        let coord = Coordinate::parse(&record.well, grid.columns, grid.rows)?;
        let well_id = coord.label(grid.columns);

        let idx = coord.row * grid.columns + coord.col;
        if seen[idx] {
            return Err(PlateError::DuplicateWell { well: well_id });
        }
        seen[idx] = true;

        match record.kind.as_str() {
            "Calibration" => {
                let found: f64 =
                    record
                        .concentration
                        .parse()
                        .map_err(|_| PlateError::BadRecord {
                            well: well_id.clone(),
                            reason: format!("bad concentration {:?}", record.concentration),
                        })?;
                let expected = match plate.well(coord) {
                    Well::Calibration { concentration } => *concentration,
                    _ => {
                        return Err(PlateError::BadRecord {
                            well: well_id,
                            reason: "calibration record outside the calibration zone".to_string(),
                        });
                    }
                };
                if found != expected {
                    return Err(PlateError::LadderMismatch {
                        well: well_id,
                        found,
                        expected,
                    });
                }
            }
            "Experiment" => {
                let sample = parse_sample(&record, &well_id)?;
                if !record.subject_name.is_empty() {
                    names
                        .entry((sample.experiment, sample.subject))
                        .or_insert_with(|| record.subject_name.clone());
                }
                plate.set_well(coord, Well::Sample(sample))?;
            }
            "Empty" | "" => {}
            other => {
                return Err(PlateError::BadRecord {
                    well: well_id,
                    reason: format!("unknown well type {other:?}"),
                });
            }
        }
    }

    let (current_experiment, current_subject, next_sample) = resume_cursor(&plate);
    Ok(ImportedLayout {
        plate,
        names,
        current_experiment,
        current_subject,
        next_sample,
    })
}

fn parse_sample(record: &LayoutRecord, well_id: &str) -> Result<SampleWell, PlateError> {
    let bad = |field: &str, value: &str| PlateError::BadRecord {
        well: well_id.to_string(),
        reason: format!("bad {field} {value:?}"),
    };
    let experiment: u32 = record
        .experiment
        .parse()
        .map_err(|_| bad("experiment", &record.experiment))?;
    let subject: u32 = record
        .subject
        .parse()
        .map_err(|_| bad("subject", &record.subject))?;
    let timepoint = record.timepoint.trim();
    let sample: u32 = timepoint
        .strip_prefix('t')
        .or_else(|| timepoint.strip_prefix('T'))
        .unwrap_or(timepoint)
        .parse()
        .map_err(|_| bad("timepoint", &record.timepoint))?;
    let replicate: u32 = record
        .replicate
        .parse()
        .map_err(|_| bad("replicate", &record.replicate))?;
    Ok(SampleWell {
        experiment,
        subject,
        sample,
        replicate,
    })
}

/// Where an interactive session resumes after loading this plate: the
/// highest experiment on the plate, its highest subject, and the sample
/// index after that subject's last timepoint.
fn resume_cursor(plate: &Plate) -> (u32, u32, u32) {
    let mut max_experiment = 0;
    for (_, well) in plate.iter() {
        if let Some(sample) = well.sample() {
            max_experiment = max_experiment.max(sample.experiment);
        }
    }
    let current_experiment = max_experiment.max(1);

    let mut max_subject = 0;
    for (_, well) in plate.iter() {
        if let Some(sample) = well.sample() {
            if sample.experiment == current_experiment {
                max_subject = max_subject.max(sample.subject);
            }
        }
    }
    let current_subject = if max_subject > 0 { max_subject } else { 1 };

    let mut next_sample = 0;
    for (_, well) in plate.iter() {
        if let Some(sample) = well.sample() {
            if sample.experiment == current_experiment && sample.subject == current_subject {
                next_sample = next_sample.max(sample.sample + 1);
            }
        }
    }
    (current_experiment, current_subject, next_sample)
}

/// Concentrations round-trip as the shortest decimal that re-parses to the
/// same f64, so `0.1` stays `0.1`.
fn format_concentration(value: f64) -> String {
    let mut text = format!("{value}");
    if !text.contains('.') {
        text.push_str(".0");
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Orientation, QueuedSample};

    fn sample_plate() -> (Plate, BTreeMap<(u32, u32), String>) {
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
        plate
            .place(
                &QueuedSample {
                    experiment: 2,
                    subject: 1,
                    sample: 4,
                    replicates: 2,
                },
                Coordinate::new(1, 2),
                Orientation::Vertical,
            )
            .unwrap();
        let mut names = BTreeMap::new();
        names.insert((1, 1), "Control".to_string());
        (plate, names)
    }

    fn export_string(plate: &Plate, names: &BTreeMap<(u32, u32), String>) -> String {
        let mut buf = Vec::new();
        export_csv(plate, names, &mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn export_covers_every_well() {
        let (plate, names) = sample_plate();
        let text = export_string(&plate, &names);
        // Header + 96 records.
        assert_eq!(text.lines().count(), 97);
        assert!(text.lines().any(|l| l.starts_with("H1,Calibration,6.4")));
        assert!(text.lines().any(|l| l.starts_with("H3,Experiment,,1,1,t0,1,Control")));
        assert!(text.lines().any(|l| l.starts_with("G3,Experiment,,2,1,t4,1,")));
    }

    #[test]
    fn round_trip_preserves_contents_and_cursor() {
        let (plate, names) = sample_plate();
        let text = export_string(&plate, &names);

        let imported = import_csv(text.as_bytes(), &GridConfig::default()).unwrap();
        assert_eq!(imported.plate, plate);
        assert_eq!(imported.names, names);
        assert_eq!(imported.current_experiment, 2);
        assert_eq!(imported.current_subject, 1);
        assert_eq!(imported.next_sample, 5);

        let again = export_string(&imported.plate, &imported.names);
        assert_eq!(again, text);
    }

    #[test]
    fn missing_column_aborts() {
        let text = "Well,Type,Concentration\nH1,Calibration,6.4\n";
        assert_eq!(
            import_csv(text.as_bytes(), &GridConfig::default()).unwrap_err(),
            PlateError::MissingColumn("Experiment")
        );
    }

    #[test]
    fn duplicate_wells_abort() {
        let (plate, names) = sample_plate();
        let mut text = export_string(&plate, &names);
        text.push_str("H3,Experiment,,1,1,t0,1,Control\n");
        assert_eq!(
            import_csv(text.as_bytes(), &GridConfig::default()).unwrap_err(),
            PlateError::DuplicateWell {
                well: "H3".to_string()
            }
        );
    }

    #[test]
    fn ladder_mismatch_aborts() {
        let (plate, names) = sample_plate();
        let text = export_string(&plate, &names).replace("H1,Calibration,6.4", "H1,Calibration,9.9");
        match import_csv(text.as_bytes(), &GridConfig::default()).unwrap_err() {
            PlateError::LadderMismatch { well, found, expected } => {
                assert_eq!(well, "H1");
                assert_eq!(found, 9.9);
                assert_eq!(expected, 6.4);
            }
            other => panic!("expected LadderMismatch, got {other:?}"),
        }
    }

    #[test]
    fn sample_aimed_at_calibration_aborts() {
        let text = "Well,Type,Concentration,Experiment,Subject,Timepoint,Replicate,Subject Name\n\
                    H1,Experiment,,1,1,t0,1,\n";
        assert_eq!(
            import_csv(text.as_bytes(), &GridConfig::default()).unwrap_err(),
            PlateError::Overlap {
                well: "H1".to_string()
            }
        );
    }

    #[test]
    fn bare_integer_timepoints_are_accepted() {
        let text = "Well,Type,Concentration,Experiment,Subject,Timepoint,Replicate,Subject Name\n\
                    H3,Experiment,,1,1,3,1,\n";
        let imported = import_csv(text.as_bytes(), &GridConfig::default()).unwrap();
        let well = imported.plate.well(Coordinate::new(0, 2));
        assert_eq!(well.sample().unwrap().sample, 3);
        assert_eq!(imported.next_sample, 4);
    }

    #[test]
    fn unknown_type_aborts() {
        let text = "Well,Type,Concentration,Experiment,Subject,Timepoint,Replicate,Subject Name\n\
                    H3,Standard,,,,,,\n";
        assert!(matches!(
            import_csv(text.as_bytes(), &GridConfig::default()).unwrap_err(),
            PlateError::BadRecord { .. }
        ));
    }
}
