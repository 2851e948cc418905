use serde::{Deserialize, Serialize};

use crate::model::{Coordinate, Well};
use crate::plate::Plate;

/// Per-well edge mask. A set bit means the renderer draws a thick boundary
/// line on that edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BorderMask(u8);

impl BorderMask {
    pub const TOP: BorderMask = BorderMask(0b0001);
    pub const RIGHT: BorderMask = BorderMask(0b0010);
    pub const BOTTOM: BorderMask = BorderMask(0b0100);
    pub const LEFT: BorderMask = BorderMask(0b1000);

    pub fn insert(&mut self, other: BorderMask) {
        self.0 |= other.0;
    }

    pub fn contains(&self, other: BorderMask) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn bits(&self) -> u8 {
        self.0
    }
}

/// Derived boundary overlay for one plate. Never stored; recompute after
/// any mutation of the plate it came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorderOverlay {
    columns: usize,
    masks: Vec<BorderMask>,
}

impl BorderOverlay {
    pub fn mask(&self, coord: Coordinate) -> BorderMask {
        self.masks[coord.row * self.columns + coord.col]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Coordinate, BorderMask)> + '_ {
        self.masks.iter().enumerate().map(|(idx, mask)| {
            (
                Coordinate::new(idx % self.columns, idx / self.columns),
                *mask,
            )
        })
    }
}

const DIRECTIONS: [(isize, isize, BorderMask); 4] = [
    (0, -1, BorderMask::TOP),
    (1, 0, BorderMask::RIGHT),
    (0, 1, BorderMask::BOTTOM),
    (-1, 0, BorderMask::LEFT),
];

/// Marks, for every non-empty well, the edges that face a "different"
/// neighbor: the grid boundary, an empty well, a calibration/sample
/// mismatch, or another experiment or subject. Two calibration wells never
/// differ, so the calibration zone carries one shared outline. Empty wells
/// get an empty mask.
pub fn compute_borders(plate: &Plate) -> BorderOverlay {
    let mut masks = vec![BorderMask::default(); plate.columns() * plate.rows()];

    for (coord, well) in plate.iter() {
        if well.is_empty() {
            continue;
        }
        let mask = &mut masks[coord.row * plate.columns() + coord.col];
        for (dcol, drow, edge) in DIRECTIONS {
            let neighbor = plate.neighbor(coord, dcol, drow);
            if differs(well, neighbor) {
                mask.insert(edge);
            }
        }
    }

    BorderOverlay {
        columns: plate.columns(),
        masks,
    }
}

fn differs(current: &Well, neighbor: Option<&Well>) -> bool {
    match (current, neighbor) {
        (_, None) => true,
        (_, Some(Well::Empty)) => true,
        (Well::Calibration { .. }, Some(Well::Calibration { .. })) => false,
        (Well::Calibration { .. }, Some(_)) => true,
        (_, Some(Well::Calibration { .. })) => true,
        (Well::Sample(a), Some(Well::Sample(b))) => {
            a.experiment != b.experiment || a.subject != b.subject
        }
        (Well::Empty, Some(_)) => false,
    }
}

/// Segments joining orthogonally adjacent replicates of the same sample,
/// drawn by the renderer as thin connector lines. Only right and down
/// neighbors are emitted, so each pair appears once.
pub fn replicate_links(plate: &Plate) -> Vec<(Coordinate, Coordinate)> {
    let mut links = Vec::new();
    for (coord, well) in plate.iter() {
        let Some(current) = well.sample() else {
            continue;
        };
        for (dcol, drow) in [(1isize, 0isize), (0, 1)] {
            let neighbor = Coordinate::new(
                coord.col.wrapping_add_signed(dcol),
                coord.row.wrapping_add_signed(drow),
            );
            if !plate.contains(neighbor) {
                continue;
            }
            if let Some(other) = plate.well(neighbor).sample() {
                if (other.experiment, other.subject, other.sample)
                    == (current.experiment, current.subject, current.sample)
                {
                    links.push((coord, neighbor));
                }
            }
        }
    }
    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GridConfig;
    use crate::model::{Orientation, QueuedSample};

    fn queued(experiment: u32, subject: u32, sample: u32, replicates: usize) -> QueuedSample {
        QueuedSample {
            experiment,
            subject,
            sample,
            replicates,
        }
    }

    #[test]
    fn subject_boundary_is_marked_on_both_sides() {
        let grid = GridConfig::default();
        let mut plate = Plate::new(1, &grid);
        plate
            .place(&queued(1, 1, 0, 2), Coordinate::new(0, 2), Orientation::Vertical)
            .unwrap();
        plate
            .place(&queued(1, 2, 0, 2), Coordinate::new(0, 4), Orientation::Vertical)
            .unwrap();

        let overlay = compute_borders(&plate);
        assert!(overlay.mask(Coordinate::new(0, 3)).contains(BorderMask::BOTTOM));
        assert!(overlay.mask(Coordinate::new(0, 4)).contains(BorderMask::TOP));
    }

    #[test]
    fn same_subject_interior_edges_are_unmarked() {
        let grid = GridConfig::default();
        let mut plate = Plate::new(1, &grid);
        plate
            .place(&queued(1, 1, 0, 3), Coordinate::new(0, 2), Orientation::Vertical)
            .unwrap();
        plate
            .place(&queued(1, 1, 1, 3), Coordinate::new(0, 5), Orientation::Vertical)
            .unwrap();

        let overlay = compute_borders(&plate);
        // Between t0's replicates, and between t0 and t1 (same subject).
        assert!(!overlay.mask(Coordinate::new(0, 2)).contains(BorderMask::BOTTOM));
        assert!(!overlay.mask(Coordinate::new(0, 4)).contains(BorderMask::BOTTOM));
        assert!(!overlay.mask(Coordinate::new(0, 5)).contains(BorderMask::TOP));
        // Toward the calibration zone above and the empty strip to the right.
        assert!(overlay.mask(Coordinate::new(0, 2)).contains(BorderMask::TOP));
        assert!(overlay.mask(Coordinate::new(0, 2)).contains(BorderMask::RIGHT));
        // Left edge of the grid.
        assert!(overlay.mask(Coordinate::new(0, 2)).contains(BorderMask::LEFT));
    }

    #[test]
    fn experiment_change_is_a_boundary_even_for_matching_subject_ids() {
        let grid = GridConfig::default();
        let mut plate = Plate::new(1, &grid);
        plate
            .place(&queued(1, 1, 0, 5), Coordinate::new(0, 2), Orientation::Vertical)
            .unwrap();
        plate
            .place(&queued(2, 1, 0, 5), Coordinate::new(1, 2), Orientation::Vertical)
            .unwrap();

        let overlay = compute_borders(&plate);
        assert!(overlay.mask(Coordinate::new(0, 2)).contains(BorderMask::RIGHT));
        assert!(overlay.mask(Coordinate::new(1, 2)).contains(BorderMask::LEFT));
    }

    #[test]
    fn calibration_zone_outlines_as_one_block() {
        let grid = GridConfig::default();
        let plate = Plate::new(1, &grid);
        let overlay = compute_borders(&plate);

        // Interior calibration edges are quiet.
        assert!(!overlay.mask(Coordinate::new(0, 0)).contains(BorderMask::RIGHT));
        assert!(!overlay.mask(Coordinate::new(0, 0)).contains(BorderMask::BOTTOM));
        // Perimeter: grid edge above, empty sample zone below.
        assert!(overlay.mask(Coordinate::new(0, 0)).contains(BorderMask::TOP));
        assert!(overlay.mask(Coordinate::new(0, 1)).contains(BorderMask::BOTTOM));
    }

    #[test]
    fn empty_wells_carry_no_mask() {
        let grid = GridConfig::default();
        let plate = Plate::new(1, &grid);
        let overlay = compute_borders(&plate);
        assert!(overlay.mask(Coordinate::new(3, 5)).is_empty());
    }

    #[test]
    fn replicate_links_join_only_same_sample_neighbors() {
        let grid = GridConfig::default();
        let mut plate = Plate::new(1, &grid);
        plate
            .place(&queued(1, 1, 0, 3), Coordinate::new(0, 2), Orientation::Vertical)
            .unwrap();
        plate
            .place(&queued(1, 1, 1, 3), Coordinate::new(0, 5), Orientation::Vertical)
            .unwrap();

        let links = replicate_links(&plate);
        assert_eq!(links.len(), 4);
        assert!(links.contains(&(Coordinate::new(0, 2), Coordinate::new(0, 3))));
        assert!(links.contains(&(Coordinate::new(0, 3), Coordinate::new(0, 4))));
        // No link across the t0/t1 boundary.
        assert!(!links.contains(&(Coordinate::new(0, 4), Coordinate::new(0, 5))));
    }
}
