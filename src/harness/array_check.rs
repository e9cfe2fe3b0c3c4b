//! Array round-trip check
//!
//! Writes a buffer into named engine storage, reads the same range back into
//! a zeroed buffer and compares each position by its text form.

use bevy::prelude::*;

use crate::constants::{PLOT_X_SPACING, PLOT_Y_SCALE};
use crate::engine::EngineAdapter;
use crate::stimulus::samples_text;

#[derive(Debug, Clone, PartialEq)]
pub struct ArrayCheckReport {
    pub array: String,
    pub offset: usize,
    pub sent: Vec<f32>,
    pub received: Vec<f32>,
    /// Positions whose read-back text differs from what was written
    pub mismatches: Vec<usize>,
}

impl ArrayCheckReport {
    pub fn passed(&self) -> bool {
        self.mismatches.is_empty()
    }

    pub fn sent_text(&self) -> String {
        samples_text(&self.sent)
    }

    pub fn received_text(&self) -> String {
        samples_text(&self.received)
    }

    /// Read-back values as line points for the array plot
    pub fn plot_points(&self) -> Vec<Vec2> {
        plot_points(&self.received)
    }
}

/// Project samples onto plot coordinates (x = index spacing, y = scaled value)
pub fn plot_points(samples: &[f32]) -> Vec<Vec2> {
    samples
        .iter()
        .enumerate()
        .map(|(i, v)| Vec2::new(i as f32 * PLOT_X_SPACING, v * PLOT_Y_SCALE))
        .collect()
}

/// Write `values` to `name` at `offset`, read them straight back and compare
pub fn check(
    engine: &mut dyn EngineAdapter,
    name: &str,
    offset: usize,
    values: &[f32],
) -> ArrayCheckReport {
    if let Err(e) = engine.write_array(name, offset, values) {
        warn!("Array write failed: {}", e);
    }

    let mut received = vec![0.0; values.len()];
    if let Err(e) = engine.read_array(&mut received, name, offset) {
        warn!("Array read failed: {}", e);
        received.fill(0.0);
    }

    let mismatches = values
        .iter()
        .zip(&received)
        .enumerate()
        .filter(|(_, (sent, got))| sent.to_string() != got.to_string())
        .map(|(i, _)| i)
        .collect();

    ArrayCheckReport {
        array: name.to_string(),
        offset,
        sent: values.to_vec(),
        received,
        mismatches,
    }
}
