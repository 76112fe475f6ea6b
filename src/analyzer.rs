//! Spectrum analysis: sample accumulation, FFT, and band shaping.
//!
//! The audio callback feeds stereo pairs into a shared [`SampleFeed`] ring
//! buffer at source rate; on each render tick the [`SpectrumAnalyzer`]
//! snapshots the ring, runs the FFT, and collapses the magnitude spectrum
//! into one smoothed intensity per display column. Band edges are
//! log-spaced so the perceptually denser low end gets more columns.

use std::f32::consts::PI;
use std::sync::{Arc, Mutex};

use log::debug;
use rustfft::{num_complex::Complex, Fft, FftPlanner};

use crate::params::AnalyzerConfig;

/// Accumulation ring shared between the audio callback (producer) and the
/// tick thread (consumer). The producer appends under a short-lived lock
/// and never waits on the FFT; the consumer copies the ring out under the
/// same lock and does all transform work on its own copy.
pub struct SampleFeed {
    channels: u16,
    state: Mutex<FeedState>,
}

struct FeedState {
    ring: Vec<f32>,
    pos: usize,
    /// The ring has wrapped at least once, so a full FFT window exists
    filled: bool,
    /// Samples arrived since the last snapshot
    new_data: bool,
}

impl SampleFeed {
    pub fn new(channels: u16, fft_size: usize) -> Self {
        Self {
            channels,
            state: Mutex::new(FeedState {
                ring: vec![0.0; fft_size],
                pos: 0,
                filled: false,
                new_data: false,
            }),
        }
    }

    /// Add one sample pair, mixed down to mono. Called from the audio
    /// callback at source rate.
    pub fn add(&self, left: f32, right: f32) {
        let mono = if self.channels >= 2 {
            (left + right) * 0.5
        } else {
            left
        };

        let mut state = self.state.lock().unwrap();
        let pos = state.pos;
        state.ring[pos] = mono;
        state.pos = (pos + 1) % state.ring.len();
        if state.pos == 0 {
            state.filled = true;
        }
        state.new_data = true;
    }

    /// Copy the most recent window into `out`, oldest sample first.
    /// Returns false (leaving `out` untouched) when no new samples have
    /// arrived since the last snapshot or the ring has not filled yet.
    pub fn snapshot(&self, out: &mut [f32]) -> bool {
        let mut state = self.state.lock().unwrap();
        if !state.new_data || !state.filled {
            return false;
        }
        let n = state.ring.len();
        let split = n - state.pos;
        out[..split].copy_from_slice(&state.ring[state.pos..]);
        out[split..].copy_from_slice(&state.ring[..state.pos]);
        state.new_data = false;
        true
    }
}

/// Turns the accumulated signal into one intensity per display column
pub struct SpectrumAnalyzer {
    config: AnalyzerConfig,
    num_cols: usize,
    feed: Arc<SampleFeed>,
    fft: Arc<dyn Fft<f32>>,

    /// Hann window coefficients, length = fft_size
    window: Vec<f32>,
    /// `num_cols + 1` bin indices bounding the display bands
    band_edges: Vec<usize>,

    // Scratch, reused across ticks
    time_buf: Vec<f32>,
    fft_buf: Vec<Complex<f32>>,
    magnitudes: Vec<f32>,

    /// Previous tick's intensities, for time smoothing
    prev: Vec<f32>,
}

impl SpectrumAnalyzer {
    /// Build an analyzer for a source with the given format. `num_cols` is
    /// the device width in cells.
    pub fn new(channels: u16, sample_rate: u32, num_cols: usize, config: AnalyzerConfig) -> Self {
        let fft_size = config.fft_size;
        let fft = FftPlanner::new().plan_fft_forward(fft_size);

        let window: Vec<f32> = (0..fft_size)
            .map(|i| 0.5 * (1.0 - ((2.0 * PI * i as f32) / (fft_size as f32 - 1.0)).cos()))
            .collect();

        let band_edges = band_edges(
            sample_rate,
            fft_size,
            num_cols,
            config.min_freq_hz,
            config.max_freq_hz,
        );
        debug!(
            "Analyzer: {} ch @ {} Hz, band edges {:?}",
            channels, sample_rate, band_edges
        );

        Self {
            num_cols,
            feed: Arc::new(SampleFeed::new(channels, fft_size)),
            fft,
            window,
            band_edges,
            time_buf: vec![0.0; fft_size],
            fft_buf: vec![Complex::new(0.0, 0.0); fft_size],
            magnitudes: vec![0.0; fft_size / 2],
            prev: vec![0.0; num_cols],
            config,
        }
    }

    /// Producer handle for the audio callback
    pub fn feed(&self) -> Arc<SampleFeed> {
        Arc::clone(&self.feed)
    }

    /// Run the FFT over the accumulated window and shape the spectrum into
    /// per-column intensities. Returns None when no new samples have
    /// arrived since the last call, which tells the caller to skip the
    /// render for this tick.
    pub fn compute_intensities(&mut self) -> Option<Vec<f32>> {
        if !self.feed.snapshot(&mut self.time_buf) {
            return None;
        }

        for i in 0..self.time_buf.len() {
            self.fft_buf[i] = Complex::new(self.time_buf[i] * self.window[i], 0.0);
        }
        self.fft.process(&mut self.fft_buf);

        for (i, mag) in self.magnitudes.iter_mut().enumerate() {
            *mag = self.fft_buf[i].norm();
        }

        let magnitudes = std::mem::take(&mut self.magnitudes);
        let intensities = self.shape_spectrum(&magnitudes);
        self.magnitudes = magnitudes;
        Some(intensities)
    }

    /// Collapse the magnitude spectrum into smoothed column intensities:
    /// per-band max, decibel scaling against the reference floor, a
    /// high-band boost, time smoothing against the previous tick, and the
    /// noise threshold.
    fn shape_spectrum(&mut self, magnitudes: &[f32]) -> Vec<f32> {
        let cfg = &self.config;
        let mut out = vec![0.0; self.num_cols];

        for (i, value) in out.iter_mut().enumerate() {
            let start = self.band_edges[i].min(magnitudes.len() - 1);
            // A zero-width band reads as a single bin
            let end = self.band_edges[i + 1].max(start + 1).min(magnitudes.len());
            let band_max = magnitudes[start..end]
                .iter()
                .copied()
                .fold(0.0_f32, f32::max);

            // log10(0) guard: silence maps to the floor, not -inf
            let db_scaled = if band_max > 0.0 {
                ((20.0 * band_max.log10() + cfg.db_floor) / cfg.db_floor).max(0.0)
            } else {
                0.0
            };

            // Bring up the perceptually quieter mid-high bands
            let idx_scaled = db_scaled + (i as f32 / self.num_cols as f32).sqrt() * db_scaled;

            let smoothed = self.prev[i] * cfg.smoothing + idx_scaled * (1.0 - cfg.smoothing);
            *value = if smoothed < cfg.min_threshold {
                0.0
            } else {
                smoothed
            };
            self.prev[i] = *value;
        }

        out
    }
}

/// Compute the `num_cols + 1` log-spaced FFT bin indices bounding the
/// display bands. The spacing concentrates columns in the low-frequency
/// range; the table is forced strictly increasing so every band has at
/// least one bin.
pub fn band_edges(
    sample_rate: u32,
    fft_size: usize,
    num_cols: usize,
    min_freq_hz: f32,
    max_freq_hz: f32,
) -> Vec<usize> {
    let half = fft_size / 2;
    let max_bin = half - 1;
    let nyquist = sample_rate as f32 / 2.0;

    let max_idx = ((max_freq_hz / nyquist * half as f32) as usize + 1).min(max_bin);
    let min_idx = ((min_freq_hz / nyquist * half as f32) as usize).min(max_bin);
    let count = max_idx.saturating_sub(min_idx) as f32;

    let num_edges = num_cols + 1;
    let log_base = (num_edges as f32).ln();

    let mut edges = Vec::with_capacity(num_edges);
    for i in 0..num_edges {
        let frac = 1.0 - ((num_edges - i) as f32).ln() / log_base;
        let edge = (frac * count).round() as usize + min_idx;
        edges.push(edge);
    }

    // Degenerate sample rates can land two edges on the same bin
    for i in 1..edges.len() {
        if edges[i] <= edges[i - 1] {
            edges[i] = edges[i - 1] + 1;
        }
    }

    // The bumps can push trailing edges past the last bin when the FFT is
    // tiny. Cap each edge so the final one lands at most on max_bin and
    // each earlier one leaves room below it; the cap rises by exactly one
    // per position, so the table stays strictly increasing.
    let last = edges.len() - 1;
    for (i, edge) in edges.iter_mut().enumerate() {
        *edge = (*edge).min(max_bin.saturating_sub(last - i));
    }

    edges
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    const NUM_COLS: usize = 21;

    fn test_config() -> AnalyzerConfig {
        AnalyzerConfig::default()
    }

    #[test]
    fn band_edges_strictly_increasing_and_bounded() {
        for rate in [8_000, 22_050, 44_100, 48_000, 96_000, 192_000] {
            let edges = band_edges(rate, 4096, NUM_COLS, 20.0, 20_000.0);
            assert_eq!(edges.len(), NUM_COLS + 1);
            for pair in edges.windows(2) {
                assert!(pair[0] < pair[1], "rate {}: {:?}", rate, edges);
            }
            assert!(*edges.last().unwrap() <= 2047, "rate {}: {:?}", rate, edges);
        }
    }

    #[test]
    fn band_edges_degenerate_rate_still_increasing_and_bounded() {
        // A tiny FFT leaves few bins per column; duplicates must be
        // bumped so every band keeps at least one bin, without the bumps
        // pushing trailing edges past the last bin.
        for fft_size in [64, 128, 256] {
            let edges = band_edges(44_100, fft_size, NUM_COLS, 20.0, 20_000.0);
            for pair in edges.windows(2) {
                assert!(pair[0] < pair[1], "fft {}: {:?}", fft_size, edges);
            }
            assert!(
                *edges.last().unwrap() <= fft_size / 2 - 1,
                "fft {}: {:?}",
                fft_size,
                edges
            );
        }
    }

    #[test]
    fn underflow_is_no_new_data() {
        let mut analyzer = SpectrumAnalyzer::new(2, 44_100, NUM_COLS, test_config());
        let feed = analyzer.feed();
        for _ in 0..100 {
            feed.add(0.5, 0.5);
        }
        assert!(analyzer.compute_intensities().is_none());
    }

    #[test]
    fn sine_produces_intensities_once_per_fill() {
        let mut analyzer = SpectrumAnalyzer::new(2, 44_100, NUM_COLS, test_config());
        let feed = analyzer.feed();
        for i in 0..4096 {
            let s = (2.0 * PI * 440.0 * i as f32 / 44_100.0).sin();
            feed.add(s, s);
        }

        let values = analyzer.compute_intensities().expect("full window");
        assert_eq!(values.len(), NUM_COLS);
        assert!(values.iter().all(|v| v.is_finite() && *v >= 0.0));
        assert!(values.iter().any(|v| *v > 0.0));

        // Nothing new arrived, so the next tick skips
        assert!(analyzer.compute_intensities().is_none());

        feed.add(0.1, 0.1);
        assert!(analyzer.compute_intensities().is_some());
    }

    #[test]
    fn silence_never_produces_nan() {
        let mut analyzer = SpectrumAnalyzer::new(2, 44_100, NUM_COLS, test_config());
        let feed = analyzer.feed();
        for _ in 0..4096 {
            feed.add(0.0, 0.0);
        }
        let values = analyzer.compute_intensities().unwrap();
        assert!(values.iter().all(|v| *v == 0.0), "{:?}", values);
    }

    #[test]
    fn smoothing_converges_to_constant_input() {
        let mut analyzer = SpectrumAnalyzer::new(2, 44_100, NUM_COLS, test_config());
        let magnitudes = vec![1.0; 2048];

        let mut last = Vec::new();
        for _ in 0..64 {
            last = analyzer.shape_spectrum(&magnitudes);
        }
        let converged = analyzer.shape_spectrum(&magnitudes);
        for (a, b) in last.iter().zip(&converged) {
            assert_relative_eq!(*a, *b, epsilon = 1e-5);
        }

        // The fixed point of prev*s + v*(1-s) is v itself
        let v = 1.0; // magnitude 1.0 -> db_scaled = 90/90 = 1.0
        assert_relative_eq!(converged[0], v, epsilon = 1e-4);
    }

    #[test]
    fn threshold_zeroes_small_values_exactly() {
        let mut analyzer = SpectrumAnalyzer::new(2, 44_100, NUM_COLS, test_config());

        // Drive the bands up, then feed silence until they drop below the
        // threshold; the result must be exactly 0, never a residual.
        let loud = vec![1.0; 2048];
        let silent = vec![0.0; 2048];
        analyzer.shape_spectrum(&loud);
        for _ in 0..16 {
            analyzer.shape_spectrum(&silent);
        }
        let values = analyzer.shape_spectrum(&silent);
        assert!(values.iter().all(|v| *v == 0.0), "{:?}", values);
    }

    #[test]
    fn high_bands_get_boosted() {
        let mut analyzer = SpectrumAnalyzer::new(2, 44_100, NUM_COLS, test_config());
        let magnitudes = vec![1.0; 2048];
        let values = analyzer.shape_spectrum(&magnitudes);
        // Same magnitude everywhere, so the sqrt(i/n) boost must order the
        // columns low to high
        assert!(values[NUM_COLS - 1] > values[0]);
    }

    #[test]
    fn feed_mixes_stereo_to_mono() {
        let feed = SampleFeed::new(2, 4);
        for _ in 0..4 {
            feed.add(1.0, 0.0);
        }
        let mut out = [0.0; 4];
        assert!(feed.snapshot(&mut out));
        assert!(out.iter().all(|v| *v == 0.5));
        // Snapshot consumed the new-data flag
        assert!(!feed.snapshot(&mut out));
    }
}
