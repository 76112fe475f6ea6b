//! Color ramps and the palette configuration format.
//!
//! A ramp is one RGB triple per device row, listed top row first. Palettes
//! load from a plain text file with one `name=hex,hex,...` entry per line;
//! malformed entries are logged and skipped so a bad line can never crash
//! the render pipeline or leave a half-parsed ramp selectable.

use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

use log::warn;

/// One 24-bit RGB color
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Parse a 6-digit hex color like `FF9900`
    pub fn from_hex(hex: &str) -> Result<Self, String> {
        let hex = hex.trim();
        if hex.len() != 6 || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(format!("Bad hex color: {:?}", hex));
        }
        let value = u32::from_str_radix(hex, 16).map_err(|e| e.to_string())?;
        Ok(Self {
            r: (value >> 16) as u8,
            g: (value >> 8) as u8,
            b: value as u8,
        })
    }
}

/// An ordered list of colors, one per device row, top row first
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColorRamp {
    colors: Vec<Rgb>,
}

impl ColorRamp {
    /// Create a ramp; `colors` must have one entry per device row
    pub fn new(colors: Vec<Rgb>) -> Self {
        Self { colors }
    }

    pub fn rows(&self) -> usize {
        self.colors.len()
    }

    /// Color for a row counted from the top of the device
    pub fn color_for_row(&self, row_from_top: usize) -> Rgb {
        self.colors[row_from_top]
    }
}

/// Parse one `name=hex,hex,...` palette line
pub fn parse_palette_line(line: &str, expected_rows: usize) -> Result<(String, ColorRamp), String> {
    let (name, colors) = line
        .split_once('=')
        .ok_or_else(|| format!("Missing '=' in palette entry: {:?}", line))?;

    let name = name.trim();
    if name.is_empty() {
        return Err(format!("Empty palette name in entry: {:?}", line));
    }

    let colors = colors
        .split(',')
        .map(Rgb::from_hex)
        .collect::<Result<Vec<_>, _>>()?;

    if colors.len() != expected_rows {
        return Err(format!(
            "Palette {:?} has {} colors, device has {} rows",
            name,
            colors.len(),
            expected_rows
        ));
    }

    Ok((name.to_string(), ColorRamp::new(colors)))
}

/// Named ramps available for selection at runtime
#[derive(Debug, Clone)]
pub struct PaletteSet {
    ramps: BTreeMap<String, ColorRamp>,
}

impl PaletteSet {
    /// The four ramps shipped with the original app, for a 6-row device.
    /// Listed top row first, so Fire runs yellow at the top to red at the
    /// bottom.
    pub fn builtin() -> Self {
        let fire = vec![0xFFFF00, 0xFFCC00, 0xFF9900, 0xFF6600, 0xFF3300, 0xFF0000];
        let ice = vec![0xFFFFFF, 0xCCCCFF, 0x9999FF, 0x6666FF, 0x3333FF, 0x0000FF];

        let ramp = |values: &[u32]| {
            ColorRamp::new(
                values
                    .iter()
                    .map(|&v| Rgb::new((v >> 16) as u8, (v >> 8) as u8, v as u8))
                    .collect(),
            )
        };
        let reversed = |values: &[u32]| {
            let mut v = values.to_vec();
            v.reverse();
            ramp(&v)
        };

        let mut ramps = BTreeMap::new();
        ramps.insert("Fire".to_string(), ramp(&fire));
        ramps.insert("Fire (Inverse)".to_string(), reversed(&fire));
        ramps.insert("Ice".to_string(), ramp(&ice));
        ramps.insert("Ice (Inverse)".to_string(), reversed(&ice));
        Self { ramps }
    }

    /// Parse palette entries from text, one per line. Blank lines and
    /// `#` comments are ignored; malformed entries are logged and skipped.
    pub fn parse(text: &str, expected_rows: usize) -> Self {
        let mut ramps = BTreeMap::new();
        for line in text.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match parse_palette_line(line, expected_rows) {
                Ok((name, ramp)) => {
                    ramps.insert(name, ramp);
                }
                Err(e) => warn!("Skipping palette entry: {}", e),
            }
        }
        Self { ramps }
    }

    /// Load palettes from a file, merged over the built-in set
    pub fn load(path: &Path, expected_rows: usize) -> std::io::Result<Self> {
        let text = fs::read_to_string(path)?;
        let mut set = Self::builtin();
        set.ramps.extend(Self::parse(&text, expected_rows).ramps);
        Ok(set)
    }

    pub fn get(&self, name: &str) -> Option<&ColorRamp> {
        self.ramps.get(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.ramps.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_well_formed_line() {
        let (name, ramp) =
            parse_palette_line("Fire=FFFF00,FFCC00,FF9900,FF6600,FF3300,FF0000", 6).unwrap();
        assert_eq!(name, "Fire");
        assert_eq!(ramp.rows(), 6);
        assert_eq!(ramp.color_for_row(0), Rgb::new(0xFF, 0xFF, 0x00));
        assert_eq!(ramp.color_for_row(2), Rgb::new(0xFF, 0x99, 0x00));
        assert_eq!(ramp.color_for_row(5), Rgb::new(0xFF, 0x00, 0x00));
    }

    #[test]
    fn missing_equals_rejected() {
        assert!(parse_palette_line("Fire FFFF00,FFCC00", 2).is_err());
    }

    #[test]
    fn malformed_hex_rejected() {
        assert!(parse_palette_line("Bad=FFFF00,GGGGGG", 2).is_err());
        assert!(parse_palette_line("Bad=FFF,FFCC00", 2).is_err());
    }

    #[test]
    fn wrong_row_count_rejected() {
        assert!(parse_palette_line("Short=FFFF00,FFCC00", 6).is_err());
    }

    #[test]
    fn parse_skips_bad_entries_keeps_good() {
        let text = "Good=111111,222222\n\n# comment\nbroken line\nBad=nothex,222222\n";
        let set = PaletteSet::parse(text, 2);
        assert!(set.get("Good").is_some());
        assert_eq!(set.names().count(), 1);
    }

    #[test]
    fn builtin_ramps_have_six_rows() {
        let set = PaletteSet::builtin();
        for name in ["Fire", "Fire (Inverse)", "Ice", "Ice (Inverse)"] {
            assert_eq!(set.get(name).unwrap().rows(), 6, "{}", name);
        }
        // Inverse runs red at the top
        let inv = set.get("Fire (Inverse)").unwrap();
        assert_eq!(inv.color_for_row(0), Rgb::new(0xFF, 0x00, 0x00));
        assert_eq!(inv.color_for_row(5), Rgb::new(0xFF, 0xFF, 0x00));
    }
}
