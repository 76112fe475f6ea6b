//! Real-time audio spectrum equalizer for matrix-addressable lighting
//! devices: capture, FFT band analysis, adaptive normalization, and
//! per-cell color/opacity rasterization.

pub mod analyzer;
pub mod audio;
pub mod cli;
pub mod palette;
pub mod params;
pub mod pipeline;
pub mod renderer;
pub mod sink;

pub use analyzer::SpectrumAnalyzer;
pub use palette::{ColorRamp, PaletteSet, Rgb};
pub use params::{AnalyzerConfig, RenderParams, TickRate};
pub use pipeline::{PipelineController, PipelineError};
pub use renderer::IntensityRenderer;
pub use sink::{Capabilities, ChannelOrder, LightingSink, MemorySink, TerminalSink};
