//! Microphone capture backing the `AudioRecorder` contract.
//!
//! The cpal input stream runs for the whole session; `start`/`stop` only
//! toggle whether the callback retains samples. The callback folds
//! interleaved channels down to mono before buffering.

use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use rehearse_core::capture::{AudioClip, AudioRecorder};
use rehearse_core::error::CaptureError;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

pub struct CpalRecorder {
    // Held for its Drop; the stream stops when the recorder is dropped.
    _stream: cpal::Stream,
    capturing: Arc<AtomicBool>,
    buffer: Arc<Mutex<Vec<f32>>>,
    sample_rate: u32,
}

impl CpalRecorder {
    pub fn new() -> Result<Self, CaptureError> {
        let host = cpal::default_host();
        let device = host.default_input_device().ok_or_else(|| CaptureError::Device {
            message: "no default input device".to_string(),
        })?;
        let supported = device
            .default_input_config()
            .map_err(|e| CaptureError::Device {
                message: e.to_string(),
            })?;
        tracing::info!("using input device: {:?}", device.name().ok());

        let sample_rate = supported.sample_rate().0;
        let channels = supported.channels() as usize;
        let stream_config: cpal::StreamConfig = supported.into();

        let capturing = Arc::new(AtomicBool::new(false));
        let buffer = Arc::new(Mutex::new(Vec::new()));

        let cap = capturing.clone();
        let buf = buffer.clone();
        let input_data_fn = move |data: &[f32], _: &cpal::InputCallbackInfo| {
            if !cap.load(Ordering::Relaxed) {
                return;
            }
            let mono: Vec<f32> = if channels > 1 {
                data.chunks(channels)
                    .map(|c| c.iter().sum::<f32>() / channels as f32)
                    .collect()
            } else {
                data.to_vec()
            };
            if let Ok(mut guard) = buf.lock() {
                guard.extend(mono);
            }
        };

        let stream = device
            .build_input_stream(
                &stream_config,
                input_data_fn,
                move |err| tracing::error!("an error occurred on input stream: {err}"),
                None,
            )
            .map_err(|e| CaptureError::Device {
                message: e.to_string(),
            })?;
        stream.play().map_err(|e| CaptureError::Device {
            message: e.to_string(),
        })?;

        Ok(Self {
            _stream: stream,
            capturing,
            buffer,
            sample_rate,
        })
    }
}

impl AudioRecorder for CpalRecorder {
    fn start(&mut self) -> Result<(), CaptureError> {
        if let Ok(mut guard) = self.buffer.lock() {
            guard.clear();
        }
        self.capturing.store(true, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) -> Result<AudioClip, CaptureError> {
        self.capturing.store(false, Ordering::Relaxed);
        let samples = self
            .buffer
            .lock()
            .map(|mut guard| std::mem::take(&mut *guard))
            .map_err(|_| CaptureError::Device {
                message: "capture buffer poisoned".to_string(),
            })?;
        Ok(AudioClip {
            samples,
            sample_rate: self.sample_rate,
        })
    }
}
