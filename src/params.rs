//! Parameter definitions with documented defaults.
//!
//! Every empirically-tuned constant from the analyzer and renderer lives
//! here under a name rather than inline in the math. The smoothing,
//! threshold, and decibel-floor values are taste constants carried over
//! from the original tuning; they are not physically derived.

/// Spectrum analyzer configuration
#[derive(Debug, Clone)]
pub struct AnalyzerConfig {
    /// FFT window size in samples (must be a power of 2)
    pub fft_size: usize,

    /// Lowest audible frequency mapped into the band table (Hz)
    pub min_freq_hz: f32,

    /// Highest audible frequency mapped into the band table (Hz)
    pub max_freq_hz: f32,

    /// Weight given to the previous tick's value for time smoothing.
    /// 0.0 = no smoothing (fast, flickery); values toward 1.0 make
    /// per-column drops take longer so there is less flickering.
    pub smoothing: f32,

    /// Band values below this after smoothing are dropped to 0 so color
    /// does not linger after sound stops.
    pub min_threshold: f32,

    /// Decibel reference floor: band magnitude m maps to
    /// `max(0, (20*log10(m) + db_floor) / db_floor)`.
    pub db_floor: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 4096,
            min_freq_hz: 20.0,
            max_freq_hz: 20_000.0,
            smoothing: 0.05,
            min_threshold: 0.001,
            db_floor: 90.0,
        }
    }
}

impl AnalyzerConfig {
    /// Validate configuration (FFT size must be a power of 2, etc.)
    pub fn validate(&self) -> Result<(), String> {
        if !self.fft_size.is_power_of_two() {
            return Err(format!(
                "FFT size must be a power of 2, got {}",
                self.fft_size
            ));
        }
        if self.min_freq_hz <= 0.0 || self.max_freq_hz <= self.min_freq_hz {
            return Err(format!(
                "Bad frequency range: {}..{} Hz",
                self.min_freq_hz, self.max_freq_hz
            ));
        }
        if !(0.0..1.0).contains(&self.smoothing) {
            return Err(format!(
                "Smoothing must be in [0, 1), got {}",
                self.smoothing
            ));
        }
        Ok(())
    }
}

/// Intensity renderer configuration
#[derive(Debug, Clone)]
pub struct RenderParams {
    /// Per-tick decay applied to the running maximum after scaling, so a
    /// single loud spike does not wash out quieter frames forever.
    pub max_decay: f32,

    /// Opacity byte for cells the column height reaches
    pub alpha_on: u8,

    /// Opacity byte for cells it does not (a faint outline, not darkness)
    pub alpha_off: u8,
}

impl Default for RenderParams {
    fn default() -> Self {
        Self {
            max_decay: 0.9999,
            alpha_on: 255,
            alpha_off: 70,
        }
    }
}

/// Render tick rate profiles, named as in the original menu
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickRate {
    /// Chill, 8 Hz
    Slow,
    /// Medium, 16 Hz
    Medium,
    /// Fast, 30 Hz
    Fast,
    /// Full, 60 Hz
    Full,
    /// Arbitrary positive interval in milliseconds
    Custom(u64),
}

impl TickRate {
    /// Tick period in milliseconds
    pub fn interval_ms(self) -> u64 {
        match self {
            TickRate::Slow => 1000 / 8,
            TickRate::Medium => 1000 / 16,
            TickRate::Fast => 1000 / 30,
            TickRate::Full => 1000 / 60,
            TickRate::Custom(ms) => ms.max(1),
        }
    }
}

impl Default for TickRate {
    fn default() -> Self {
        TickRate::Slow
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_analyzer_config_is_valid() {
        assert!(AnalyzerConfig::default().validate().is_ok());
    }

    #[test]
    fn non_power_of_two_fft_size_rejected() {
        let config = AnalyzerConfig {
            fft_size: 1000,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn inverted_frequency_range_rejected() {
        let config = AnalyzerConfig {
            min_freq_hz: 20_000.0,
            max_freq_hz: 20.0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn tick_rate_intervals() {
        assert_eq!(TickRate::Slow.interval_ms(), 125);
        assert_eq!(TickRate::Medium.interval_ms(), 62);
        assert_eq!(TickRate::Fast.interval_ms(), 33);
        assert_eq!(TickRate::Full.interval_ms(), 16);
        assert_eq!(TickRate::Custom(0).interval_ms(), 1);
        assert_eq!(TickRate::Custom(40).interval_ms(), 40);
    }
}
