use std::collections::BTreeMap;

use serde::Deserialize;

use crate::error::PlateError;
use crate::model::QueuedSample;

/// Hand-written packing input. json5 so plans can carry comments:
///
/// ```json5
/// {
///   experiments: [
///     {
///       subjects: [
///         { name: "Control", samples: [3, 3, 3] }, // replicates per timepoint
///         { samples: [2, 2] },
///       ],
///     },
///   ],
/// }
/// ```
#[derive(Debug, Clone, Deserialize)]
pub struct PlatePlan {
    pub experiments: Vec<ExperimentPlan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ExperimentPlan {
    pub subjects: Vec<SubjectPlan>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubjectPlan {
    #[serde(default)]
    pub name: Option<String>,
    /// Replicate count per sample, in timepoint order (t0, t1, ...).
    pub samples: Vec<usize>,
}

impl PlatePlan {
    pub fn parse(source: &str) -> Result<Self, PlateError> {
        let plan: PlatePlan =
            json5::from_str(source).map_err(|err| PlateError::Plan(err.to_string()))?;
        plan.check()?;
        Ok(plan)
    }

    fn check(&self) -> Result<(), PlateError> {
        if self.experiments.is_empty() {
            return Err(PlateError::Plan("no experiments declared".to_string()));
        }
        for (eidx, experiment) in self.experiments.iter().enumerate() {
            if experiment.subjects.is_empty() {
                return Err(PlateError::Plan(format!(
                    "experiment {} has no subjects",
                    eidx + 1
                )));
            }
            for (sidx, subject) in experiment.subjects.iter().enumerate() {
                if subject.samples.is_empty() {
                    return Err(PlateError::Plan(format!(
                        "subject {} of experiment {} has no samples",
                        sidx + 1,
                        eidx + 1
                    )));
                }
            }
        }
        Ok(())
    }

    /// Flattens the plan into the packing queue in declaration order and
    /// collects the initial subject-name map. Experiment ids are 1-based;
    /// subject ids are 1-based and reset per experiment; sample indices are
    /// the 0-based timepoints.
    pub fn to_queue(&self) -> (Vec<QueuedSample>, BTreeMap<(u32, u32), String>) {
        let mut queue = Vec::new();
        let mut names = BTreeMap::new();

        for (eidx, experiment) in self.experiments.iter().enumerate() {
            let experiment_id = eidx as u32 + 1;
            for (sidx, subject) in experiment.subjects.iter().enumerate() {
                let subject_id = sidx as u32 + 1;
                if let Some(name) = &subject.name {
                    if !name.is_empty() {
                        names.insert((experiment_id, subject_id), name.clone());
                    }
                }
                for (tidx, &replicates) in subject.samples.iter().enumerate() {
                    queue.push(QueuedSample {
                        experiment: experiment_id,
                        subject: subject_id,
                        sample: tidx as u32,
                        replicates,
                    });
                }
            }
        }

        (queue, names)
    }
}
