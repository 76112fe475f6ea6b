//! Lighting device sink contract and the bundled implementations.
//!
//! A sink reports its fixed geometry and cell byte order once, then
//! accepts one bitmap per render tick, fire-and-forget. The real target is
//! a matrix-addressable device behind a vendor SDK; shipped here are a
//! terminal preview that draws the matrix with ANSI truecolor cells and an
//! in-memory sink for tests.

use std::io::{self, Write};

/// Byte order of the 4-byte cell tuples in a frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelOrder {
    /// Blue, green, red, opacity (the original device's bitmap layout)
    Bgra,
    /// Red, green, blue, opacity
    Rgba,
}

/// Fixed geometry and format a sink expects, reported before any frames
#[derive(Debug, Clone, Copy)]
pub struct Capabilities {
    /// Device height in cells
    pub rows: usize,
    /// Device width in cells
    pub cols: usize,
    pub order: ChannelOrder,
}

impl Capabilities {
    /// Frame size in bytes: 4 per cell
    pub fn frame_len(&self) -> usize {
        self.rows * self.cols * 4
    }
}

/// A matrix-addressable lighting device
pub trait LightingSink: Send {
    fn capabilities(&self) -> Capabilities;

    /// Acquire the device. Called on pipeline enable, before any frames.
    fn open(&mut self) -> io::Result<()>;

    /// Display one frame; `frame.len() == capabilities().frame_len()`
    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()>;

    /// Release the device. Called on pipeline disable, after the last frame.
    fn close(&mut self);
}

/// Terminal preview: one truecolor block glyph per cell, redrawn in place
pub struct TerminalSink {
    caps: Capabilities,
    out: io::Stdout,
}

impl TerminalSink {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self {
            caps: Capabilities {
                rows,
                cols,
                order: ChannelOrder::Rgba,
            },
            out: io::stdout(),
        }
    }
}

impl LightingSink for TerminalSink {
    fn capabilities(&self) -> Capabilities {
        self.caps
    }

    fn open(&mut self) -> io::Result<()> {
        // Hide the cursor and clear room for the matrix
        write!(self.out, "\x1b[?25l{}", "\n".repeat(self.caps.rows))?;
        self.out.flush()
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        let mut buf = String::with_capacity(frame.len() * 6);
        // Move back to the top of the matrix
        buf.push_str(&format!("\x1b[{}A", self.caps.rows));
        for row in frame.chunks(self.caps.cols * 4) {
            for cell in row.chunks(4) {
                let (r, g, b, a) = (cell[0], cell[1], cell[2], cell[3]);
                // Approximate opacity by scaling the color
                let scale = |v: u8| (v as u16 * a as u16 / 255) as u8;
                buf.push_str(&format!(
                    "\x1b[38;2;{};{};{}m\u{2588}\u{2588}",
                    scale(r),
                    scale(g),
                    scale(b)
                ));
            }
            buf.push_str("\x1b[0m\n");
        }
        self.out.write_all(buf.as_bytes())?;
        self.out.flush()
    }

    fn close(&mut self) {
        let _ = write!(self.out, "\x1b[0m\x1b[?25h");
        let _ = self.out.flush();
    }
}

/// Captures frames for assertions; also counts open/close calls so tests
/// can check teardown ordering
#[derive(Default)]
pub struct MemorySink {
    caps: Option<Capabilities>,
    pub frames: Vec<Vec<u8>>,
    pub opened: usize,
    pub closed: usize,
}

impl MemorySink {
    pub fn new(rows: usize, cols: usize, order: ChannelOrder) -> Self {
        Self {
            caps: Some(Capabilities { rows, cols, order }),
            ..Default::default()
        }
    }

    pub fn last_frame(&self) -> Option<&[u8]> {
        self.frames.last().map(Vec::as_slice)
    }
}

impl LightingSink for MemorySink {
    fn capabilities(&self) -> Capabilities {
        self.caps.unwrap_or(Capabilities {
            rows: 6,
            cols: 21,
            order: ChannelOrder::Bgra,
        })
    }

    fn open(&mut self) -> io::Result<()> {
        self.opened += 1;
        Ok(())
    }

    fn write_frame(&mut self, frame: &[u8]) -> io::Result<()> {
        self.frames.push(frame.to_vec());
        Ok(())
    }

    fn close(&mut self) {
        self.closed += 1;
    }
}
