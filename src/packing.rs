use crate::config::GridConfig;
use crate::error::PlateError;
use crate::model::{Orientation, QueuedSample};
use crate::plate::Plate;

/// Packs the sample queue onto as many plates as it takes, keeping each
/// sample's replicates contiguous within a single strip. Greedy with
/// look-ahead: a strip is first offered to the earliest sample that fills
/// its remaining capacity exactly, then repeatedly to the earliest sample
/// with the largest replicate count that still fits. Whatever is left when
/// nothing fits stays empty; later strips never backfill it.
pub fn pack(
    queue: Vec<QueuedSample>,
    grid: &GridConfig,
    orientation: Orientation,
) -> Result<Vec<Plate>, PlateError> {
    grid.validate()?;
    check_queue(&queue, grid, orientation)?;

    let mut pending = queue;
    let mut plates = Vec::new();

    while !pending.is_empty() {
        let mut plate = Plate::new(plates.len() as u32 + 1, grid);
        pack_plate(&mut plate, &mut pending, orientation)?;
        plates.push(plate);
    }

    Ok(plates)
}

/// Rejects impossible queues before any well is written.
fn check_queue(
    queue: &[QueuedSample],
    grid: &GridConfig,
    orientation: Orientation,
) -> Result<(), PlateError> {
    let strip_len = grid.strip_len(orientation);
    for sample in queue {
        if sample.replicates == 0 {
            return Err(PlateError::EmptySample {
                experiment: sample.experiment,
                subject: sample.subject,
                sample: sample.sample,
            });
        }
        if sample.replicates > strip_len {
            return Err(PlateError::Capacity {
                experiment: sample.experiment,
                subject: sample.subject,
                sample: sample.sample,
                replicates: sample.replicates,
                strip_len,
            });
        }
    }
    Ok(())
}

fn pack_plate(
    plate: &mut Plate,
    pending: &mut Vec<QueuedSample>,
    orientation: Orientation,
) -> Result<(), PlateError> {
    for strip in 0..plate.strip_count(orientation) {
        let mut position = 0;
        loop {
            if pending.is_empty() {
                return Ok(());
            }
            let capacity = plate.free_run_length(strip, position, orientation);
            let Some(idx) = select_next(pending, capacity) else {
                // Leftover wells in this strip stay empty.
                break;
            };
            let sample = pending.remove(idx);
            let start = plate.strip_coord(strip, position, orientation);
            plate.place(&sample, start, orientation)?;
            position += sample.replicates;
        }
    }
    Ok(())
}

/// Index of the next queue entry for a strip with `capacity` free wells:
/// the first exact fit, otherwise the earliest entry with the largest
/// replicate count that fits. Ties keep queue order.
fn select_next(pending: &[QueuedSample], capacity: usize) -> Option<usize> {
    if capacity == 0 {
        return None;
    }
    if let Some(idx) = pending.iter().position(|s| s.replicates == capacity) {
        return Some(idx);
    }
    let mut best: Option<(usize, usize)> = None;
    for (idx, sample) in pending.iter().enumerate() {
        if sample.replicates > capacity {
            continue;
        }
        if best.is_none_or(|(_, count)| sample.replicates > count) {
            best = Some((idx, sample.replicates));
        }
    }
    best.map(|(idx, _)| idx)
}
