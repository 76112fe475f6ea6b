//! Intensity normalization and bitmap rasterization.
//!
//! Raw band intensities have no fixed scale, so the renderer tracks the
//! largest value it has ever seen and scales against that. The maximum
//! decays a little every tick; a one-off spike stops dominating after a
//! while, but a sustained loud passage keeps it elevated. Rasterization
//! fills each column upward from the bottom, with unlit cells kept at a
//! dim opacity so the device shows a faint outline instead of going dark.

use crate::palette::ColorRamp;
use crate::params::RenderParams;
use crate::sink::{Capabilities, ChannelOrder};

pub struct IntensityRenderer {
    caps: Capabilities,
    params: RenderParams,
    /// Decaying peak estimate; 0 until the first nonzero intensity
    running_max: f32,
}

impl IntensityRenderer {
    pub fn new(caps: Capabilities, params: RenderParams) -> Self {
        Self {
            caps,
            params,
            running_max: 0.0,
        }
    }

    /// Scale intensities into column heights in `[0, rows]` against the
    /// running maximum, then decay the maximum for the next tick.
    pub fn normalize(&mut self, intensities: &[f32]) -> Vec<f32> {
        let peak = intensities.iter().copied().fold(0.0_f32, f32::max);
        self.running_max = peak.max(self.running_max);

        let heights = if self.running_max > 0.0 {
            intensities
                .iter()
                .map(|v| v / self.running_max * self.caps.rows as f32)
                .collect()
        } else {
            // No signal seen yet
            vec![0.0; intensities.len()]
        };

        self.running_max *= self.params.max_decay;
        heights
    }

    /// Rasterize column heights into a frame for the sink. A cell is lit
    /// when its column's height exceeds the cell's distance from the
    /// bottom row; color comes from the ramp by row either way, only the
    /// opacity differs.
    pub fn rasterize(&self, heights: &[f32], ramp: &ColorRamp) -> Vec<u8> {
        let mut frame = Vec::with_capacity(self.caps.frame_len());

        for row in 0..self.caps.rows {
            let from_bottom = (self.caps.rows - 1 - row) as f32;
            let color = ramp.color_for_row(row);
            for col in 0..self.caps.cols {
                let alpha = if heights[col] > from_bottom {
                    self.params.alpha_on
                } else {
                    self.params.alpha_off
                };
                match self.caps.order {
                    ChannelOrder::Bgra => frame.extend([color.b, color.g, color.r, alpha]),
                    ChannelOrder::Rgba => frame.extend([color.r, color.g, color.b, alpha]),
                }
            }
        }

        frame
    }

    #[cfg(test)]
    fn running_max(&self) -> f32 {
        self.running_max
    }
}
