//! Command-line argument parsing.

use std::path::PathBuf;

use clap::Parser;
use log::warn;

use crate::params::TickRate;

/// Command line arguments
#[derive(Parser, Debug)]
#[command(name = "spectrum-led")]
#[command(about = "Audio spectrum equalizer for matrix lighting devices", long_about = None)]
pub struct Args {
    /// Palette file with one name=hex,hex,... entry per line
    #[arg(long, value_name = "FILE")]
    pub palettes: Option<PathBuf>,

    /// Initial palette name
    #[arg(long, value_name = "NAME", default_value = "Fire")]
    pub palette: String,

    /// Tick rate: 8, 16, 30, 60, or an interval like 40ms
    #[arg(long, value_name = "RATE", default_value = "8")]
    pub rate: String,

    /// Device height in cells
    #[arg(long, value_name = "CELLS", default_value = "6")]
    pub rows: usize,

    /// Device width in cells
    #[arg(long, value_name = "CELLS", default_value = "21")]
    pub cols: usize,

    /// List available palettes and exit
    #[arg(long)]
    pub list_palettes: bool,
}

impl Args {
    /// Parse the tick rate argument, falling back to 8 Hz on nonsense
    pub fn parse_tick_rate(&self) -> TickRate {
        parse_rate(&self.rate).unwrap_or_else(|| {
            warn!("Unknown rate {:?}, using 8 Hz", self.rate);
            TickRate::Slow
        })
    }
}

/// Parse a tick rate string: a profile frequency (8/16/30/60) or a
/// millisecond interval like `40ms`
pub fn parse_rate(rate: &str) -> Option<TickRate> {
    if let Some(ms) = rate.strip_suffix("ms") {
        let ms: u64 = ms.trim().parse().ok()?;
        if ms == 0 {
            return None;
        }
        return Some(TickRate::Custom(ms));
    }
    match rate.trim() {
        "8" => Some(TickRate::Slow),
        "16" => Some(TickRate::Medium),
        "30" => Some(TickRate::Fast),
        "60" => Some(TickRate::Full),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn named_rates_parse() {
        assert_eq!(parse_rate("8"), Some(TickRate::Slow));
        assert_eq!(parse_rate("16"), Some(TickRate::Medium));
        assert_eq!(parse_rate("30"), Some(TickRate::Fast));
        assert_eq!(parse_rate("60"), Some(TickRate::Full));
    }

    #[test]
    fn millisecond_rates_parse() {
        assert_eq!(parse_rate("40ms"), Some(TickRate::Custom(40)));
        assert_eq!(parse_rate("0ms"), None);
        assert_eq!(parse_rate("xms"), None);
    }

    #[test]
    fn unknown_rates_rejected() {
        assert_eq!(parse_rate("17"), None);
        assert_eq!(parse_rate("fast"), None);
    }
}
