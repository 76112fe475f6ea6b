//! Audio capture glue.
//!
//! Opens the default cpal input device, reports its format once, and
//! forwards sample pairs from the stream callback into the analyzer's
//! [`SampleFeed`]. The callback runs on cpal's audio thread at source
//! rate, far more often than the render tick.

use std::sync::Arc;

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::SampleFormat;
use log::{error, info};

use crate::analyzer::SampleFeed;
use crate::pipeline::PipelineError;

/// An opened, not-yet-capturing input device
pub struct AudioInput {
    device: cpal::Device,
    config: cpal::SupportedStreamConfig,
}

impl AudioInput {
    /// Open the default input device and read its format
    pub fn open() -> Result<Self, PipelineError> {
        let host = cpal::default_host();
        let device = host
            .default_input_device()
            .ok_or(PipelineError::NoInputDevice)?;
        let config = device.default_input_config()?;

        info!(
            "Audio: {} @ {} Hz, {} ch, {:?}",
            device.name().unwrap_or_else(|_| "unknown".to_string()),
            config.sample_rate().0,
            config.channels(),
            config.sample_format()
        );

        Ok(Self { device, config })
    }

    pub fn channels(&self) -> u16 {
        self.config.channels()
    }

    pub fn sample_rate(&self) -> u32 {
        self.config.sample_rate().0
    }

    /// Start capturing into `feed`. The returned stream captures until
    /// dropped.
    pub fn start(&self, feed: Arc<SampleFeed>) -> Result<cpal::Stream, PipelineError> {
        let channels = self.channels() as usize;
        let err_fn = |e| error!("Audio stream error: {}", e);

        let stream = match self.config.sample_format() {
            SampleFormat::F32 => self.device.build_input_stream(
                &self.config.config(),
                move |data: &[f32], _: &cpal::InputCallbackInfo| {
                    feed_frames(&feed, data, channels)
                },
                err_fn,
                None,
            )?,
            SampleFormat::I16 => self.device.build_input_stream(
                &self.config.config(),
                move |data: &[i16], _: &cpal::InputCallbackInfo| {
                    for frame in data.chunks_exact(channels) {
                        let left = frame[0] as f32 / i16::MAX as f32;
                        let right = frame.get(1).map_or(left, |&s| s as f32 / i16::MAX as f32);
                        feed.add(left, right);
                    }
                },
                err_fn,
                None,
            )?,
            other => return Err(PipelineError::UnsupportedSampleFormat(other)),
        };

        stream.play()?;
        Ok(stream)
    }
}

fn feed_frames(feed: &SampleFeed, data: &[f32], channels: usize) {
    for frame in data.chunks_exact(channels) {
        let left = frame[0];
        let right = frame.get(1).copied().unwrap_or(left);
        feed.add(left, right);
    }
}
