//! Pipeline control: the enable/disable state machine and the render tick.
//!
//! Two contexts run while enabled. The cpal callback pushes sample pairs
//! into the analyzer's feed, and a tick thread periodically pulls
//! intensities, normalizes, rasterizes, and hands the frame to the sink.
//! If a tick finds no new audio it skips silently. Disable stops the tick
//! thread first, then closes the sink, then drops the capture stream, so
//! no tick can observe a closed resource.

use std::io;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use log::{error, info};
use thiserror::Error;

use crate::analyzer::SpectrumAnalyzer;
use crate::audio::AudioInput;
use crate::palette::ColorRamp;
use crate::params::{AnalyzerConfig, RenderParams, TickRate};
use crate::renderer::IntensityRenderer;
use crate::sink::LightingSink;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no audio input device available")]
    NoInputDevice,
    #[error("unsupported audio sample format {0:?}")]
    UnsupportedSampleFormat(cpal::SampleFormat),
    #[error("failed to read audio input config: {0}")]
    AudioConfig(#[from] cpal::DefaultStreamConfigError),
    #[error("failed to build audio input stream: {0}")]
    BuildStream(#[from] cpal::BuildStreamError),
    #[error("failed to start audio input stream: {0}")]
    PlayStream(#[from] cpal::PlayStreamError),
    #[error("lighting sink error: {0}")]
    Sink(#[from] io::Error),
    #[error("color ramp has {got} rows, device has {expected}")]
    RampSize { expected: usize, got: usize },
    #[error("invalid analyzer config: {0}")]
    Config(String),
}

/// Resources that exist only while enabled. Field order matters: the tick
/// thread is stopped before the stream drops.
struct Enabled {
    stop: Arc<AtomicBool>,
    tick_thread: Option<thread::JoinHandle<()>>,
    /// Capture stream; dropping it stops the audio callback
    _stream: cpal::Stream,
}

/// Owns the timing loop and wires analyzer output through the renderer
/// into the sink
pub struct PipelineController {
    sink: Arc<Mutex<Box<dyn LightingSink>>>,
    renderer: Arc<Mutex<IntensityRenderer>>,
    ramp: Arc<Mutex<ColorRamp>>,
    interval_ms: Arc<AtomicU64>,
    analyzer_config: AnalyzerConfig,
    enabled: Option<Enabled>,
}

impl PipelineController {
    /// Build a disabled pipeline. The renderer (and its running maximum)
    /// lives as long as the controller, across enable cycles.
    pub fn new(
        sink: Box<dyn LightingSink>,
        ramp: ColorRamp,
        rate: TickRate,
        analyzer_config: AnalyzerConfig,
        render_params: RenderParams,
    ) -> Result<Self, PipelineError> {
        analyzer_config.validate().map_err(PipelineError::Config)?;
        let caps = sink.capabilities();
        if ramp.rows() != caps.rows {
            return Err(PipelineError::RampSize {
                expected: caps.rows,
                got: ramp.rows(),
            });
        }

        Ok(Self {
            sink: Arc::new(Mutex::new(sink)),
            renderer: Arc::new(Mutex::new(IntensityRenderer::new(caps, render_params))),
            ramp: Arc::new(Mutex::new(ramp)),
            interval_ms: Arc::new(AtomicU64::new(rate.interval_ms())),
            analyzer_config,
            enabled: None,
        })
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled.is_some()
    }

    /// Enable or disable capture and rendering. Idempotent in both
    /// directions. On enable, any acquisition failure tears down whatever
    /// was acquired and leaves the pipeline disabled.
    pub fn set_enabled(&mut self, enabled: bool) -> Result<(), PipelineError> {
        match (enabled, self.enabled.is_some()) {
            (true, false) => self.enable(),
            (false, true) => {
                self.disable();
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Swap the color ramp; takes effect on the next rendered frame
    pub fn set_palette(&self, ramp: ColorRamp) -> Result<(), PipelineError> {
        let expected = self.sink.lock().unwrap().capabilities().rows;
        if ramp.rows() != expected {
            return Err(PipelineError::RampSize {
                expected,
                got: ramp.rows(),
            });
        }
        *self.ramp.lock().unwrap() = ramp;
        Ok(())
    }

    /// Change the tick period; takes effect on the next tick, enabled or not
    pub fn set_tick_rate(&self, rate: TickRate) {
        self.interval_ms.store(rate.interval_ms(), Ordering::Relaxed);
    }

    fn enable(&mut self) -> Result<(), PipelineError> {
        // Source first: its reported format sizes the analyzer
        let input = AudioInput::open()?;
        let caps = self.sink.lock().unwrap().capabilities();
        let mut analyzer = SpectrumAnalyzer::new(
            input.channels(),
            input.sample_rate(),
            caps.cols,
            self.analyzer_config.clone(),
        );
        let feed = analyzer.feed();

        self.sink.lock().unwrap().open()?;

        let stream = match input.start(feed) {
            Ok(stream) => stream,
            Err(e) => {
                self.sink.lock().unwrap().close();
                return Err(e);
            }
        };

        // Timer last, so a tick never fires against unopened resources
        let stop = Arc::new(AtomicBool::new(false));
        let tick_thread = {
            let stop = Arc::clone(&stop);
            let interval_ms = Arc::clone(&self.interval_ms);
            let renderer = Arc::clone(&self.renderer);
            let ramp = Arc::clone(&self.ramp);
            let sink = Arc::clone(&self.sink);

            thread::spawn(move || {
                while !stop.load(Ordering::Relaxed) {
                    sleep_unless_stopped(&stop, interval_ms.load(Ordering::Relaxed));
                    if stop.load(Ordering::Relaxed) {
                        break;
                    }
                    let ramp = ramp.lock().unwrap().clone();
                    let mut renderer = renderer.lock().unwrap();
                    let mut sink = sink.lock().unwrap();
                    if let Err(e) = render_tick(&mut analyzer, &mut renderer, &ramp, sink.as_mut())
                    {
                        error!("Frame write failed: {}", e);
                    }
                }
            })
        };

        info!("Pipeline enabled");
        self.enabled = Some(Enabled {
            stop,
            tick_thread: Some(tick_thread),
            _stream: stream,
        });
        Ok(())
    }

    /// Teardown order: timer, then sink, then source
    fn disable(&mut self) {
        let Some(mut enabled) = self.enabled.take() else {
            return;
        };

        enabled.stop.store(true, Ordering::Relaxed);
        if let Some(handle) = enabled.tick_thread.take() {
            let _ = handle.join();
        }
        self.sink.lock().unwrap().close();
        drop(enabled); // stops the capture stream

        info!("Pipeline disabled");
    }
}

impl Drop for PipelineController {
    fn drop(&mut self) {
        self.disable();
    }
}

/// How often a sleeping tick thread re-checks the stop flag, so disable
/// stays prompt even with a long custom tick interval
const STOP_POLL_MS: u64 = 25;

/// Sleep for `total_ms`, in slices, returning early once `stop` is set
fn sleep_unless_stopped(stop: &AtomicBool, total_ms: u64) {
    let mut remaining = total_ms;
    while remaining > 0 && !stop.load(Ordering::Relaxed) {
        let slice = remaining.min(STOP_POLL_MS);
        thread::sleep(Duration::from_millis(slice));
        remaining -= slice;
    }
}

/// One render tick: compute intensities and, if new data was available,
/// push a frame to the sink. Returns whether a frame was rendered.
pub fn render_tick(
    analyzer: &mut SpectrumAnalyzer,
    renderer: &mut IntensityRenderer,
    ramp: &ColorRamp,
    sink: &mut dyn LightingSink,
) -> io::Result<bool> {
    let Some(intensities) = analyzer.compute_intensities() else {
        return Ok(false);
    };
    let heights = renderer.normalize(&intensities);
    let frame = renderer.rasterize(&heights, ramp);
    sink.write_frame(&frame)?;
    Ok(true)
}
