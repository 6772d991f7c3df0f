//! cpal-backed sine synthesis.
//!
//! All sound flows through a [`Mixer`]: a set of sine voices summed
//! against a running sample clock. The mixer owns no device of its own,
//! so everything below [`AudioContext`] is testable without audio
//! hardware. [`AudioContext::init`] opens the default output device and
//! pumps the mixer from the cpal callback; [`SynthSink`] is the handle
//! the sequencer schedules into.

use std::sync::mpsc::{Receiver, TryRecvError};
use std::sync::{Arc, Mutex, mpsc};
use std::time::Duration;

use cpal::SampleFormat;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};

use crate::mapping::Tone;
use crate::sequencer::ToneSink;

/// Length of the linear attack and release ramps, as a fraction of a
/// second. Keeps voice starts and stops click-free.
const RAMP_SECONDS: f32 = 0.01;

/// One sine voice on the mixer clock. `end_at == None` sustains forever
/// (drones); scheduled notes carry a fixed end.
#[derive(Debug)]
struct Voice {
    id: u64,
    frequency: f32,
    gain: f32,
    phase: f32,
    start_at: u64,
    end_at: Option<u64>,
}

/// Sums active voices into an output buffer. Device-free; the cpal
/// callback (or a test) drives it by calling [`render`](Self::render).
#[derive(Debug)]
pub struct Mixer {
    sample_rate: u32,
    clock: u64,
    next_id: u64,
    voices: Vec<Voice>,
}

impl Mixer {
    pub fn new(sample_rate: u32) -> Self {
        Mixer {
            sample_rate,
            clock: 0,
            next_id: 0,
            voices: Vec::new(),
        }
    }

    fn ramp_samples(&self) -> u64 {
        (self.sample_rate as f32 * RAMP_SECONDS) as u64
    }

    fn duration_to_samples(&self, duration: Duration) -> u64 {
        (duration.as_secs_f64() * f64::from(self.sample_rate)) as u64
    }

    /// Add a voice starting `start_offset` from now, sounding for
    /// `duration` (or forever when `None`). Returns the voice id.
    fn add_voice(
        &mut self,
        frequency: f32,
        gain: f32,
        start_offset: Duration,
        duration: Option<Duration>,
    ) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        let start_at = self.clock + self.duration_to_samples(start_offset);
        let end_at = duration.map(|d| start_at + self.duration_to_samples(d));
        self.voices.push(Voice {
            id,
            frequency,
            gain,
            phase: 0.0,
            start_at,
            end_at,
        });
        id
    }

    fn remove_voice(&mut self, id: u64) {
        self.voices.retain(|voice| voice.id != id);
    }

    #[cfg(test)]
    fn voice_count(&self) -> usize {
        self.voices.len()
    }

    /// Fill `buffer` with interleaved frames for `channels` channels,
    /// advancing the clock by one tick per frame. Finished voices are
    /// dropped on the way out.
    pub fn render(&mut self, buffer: &mut [f32], channels: usize) {
        let ramp = self.ramp_samples().max(1);
        for frame in buffer.chunks_mut(channels) {
            let mut sample = 0.0_f32;
            for voice in &mut self.voices {
                if self.clock < voice.start_at {
                    continue;
                }
                if voice.end_at.is_some_and(|end_at| self.clock >= end_at) {
                    continue;
                }
                let elapsed = self.clock - voice.start_at;
                let attack = (elapsed as f32 / ramp as f32).min(1.0);
                let release = match voice.end_at {
                    Some(end_at) => ((end_at - self.clock) as f32 / ramp as f32).min(1.0),
                    None => 1.0,
                };
                sample += voice.phase.sin() * voice.gain * attack * release;
                voice.phase += std::f32::consts::TAU * voice.frequency / self.sample_rate as f32;
                if voice.phase > std::f32::consts::TAU {
                    voice.phase -= std::f32::consts::TAU;
                }
            }
            for out in frame {
                *out = sample;
            }
            self.clock += 1;
        }
        let clock = self.clock;
        self.voices
            .retain(|voice| voice.end_at.is_none_or(|end_at| end_at > clock));
    }
}

/// Scheduling handle over a shared [`Mixer`]. Implements [`ToneSink`]
/// so a `Sequencer` can drive it directly.
#[derive(Clone)]
pub struct SynthSink {
    mixer: Arc<Mutex<Mixer>>,
}

impl SynthSink {
    pub fn play_tone(&self, tone: Tone, start_offset: Duration) {
        let mut mixer = self.mixer.lock().unwrap();
        mixer.add_voice(tone.frequency, tone.gain, start_offset, Some(tone.duration));
    }

    /// Start a sustained voice that sounds until its handle is stopped.
    pub fn play_drone(&self, frequency: f32, gain: f32) -> DroneHandle {
        let mut mixer = self.mixer.lock().unwrap();
        let id = mixer.add_voice(frequency, gain, Duration::ZERO, None);
        DroneHandle {
            id,
            mixer: Arc::clone(&self.mixer),
        }
    }
}

impl ToneSink for SynthSink {
    fn schedule(&mut self, tone: Tone, start_offset: Duration) {
        self.play_tone(tone, start_offset);
    }
}

/// A sustained voice. Dropping the handle without calling
/// [`stop`](Self::stop) leaves the drone sounding.
pub struct DroneHandle {
    id: u64,
    mixer: Arc<Mutex<Mixer>>,
}

impl DroneHandle {
    pub fn stop(self) {
        self.mixer.lock().unwrap().remove_voice(self.id);
    }
}

/// Owns the cpal output stream. Explicit lifecycle: [`init`](Self::init)
/// opens the device and starts rendering, [`shutdown`](Self::shutdown)
/// pauses and releases it.
pub struct AudioContext {
    stream: cpal::Stream,
    mixer: Arc<Mutex<Mixer>>,
    errors: Receiver<cpal::StreamError>,
}

impl AudioContext {
    /// Open the default output device and start the render callback.
    pub fn init() -> Result<Self, String> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| "no audio output device available".to_string())?;
        let config = device
            .default_output_config()
            .map_err(|e| format!("failed to query output config: {e}"))?;
        if config.sample_format() != SampleFormat::F32 {
            return Err(format!(
                "unsupported sample format {}",
                config.sample_format()
            ));
        }
        let sample_rate = config.sample_rate().0;
        let channels = config.channels() as usize;
        log::info!("audio output: {sample_rate} Hz, {channels} channel(s)");

        let mixer = Arc::new(Mutex::new(Mixer::new(sample_rate)));
        let callback_mixer = Arc::clone(&mixer);
        let (error_tx, errors) = mpsc::channel();
        let stream = device
            .build_output_stream(
                &config.into(),
                move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
                    callback_mixer.lock().unwrap().render(data, channels);
                },
                move |err| {
                    let _ = error_tx.send(err);
                },
                None,
            )
            .map_err(|e| format!("failed to build output stream: {e}"))?;
        stream
            .play()
            .map_err(|e| format!("failed to start output stream: {e}"))?;
        Ok(AudioContext {
            stream,
            mixer,
            errors,
        })
    }

    pub fn sink(&self) -> SynthSink {
        SynthSink {
            mixer: Arc::clone(&self.mixer),
        }
    }

    /// Drain any stream errors reported since the last check.
    pub fn take_error(&self) -> Option<cpal::StreamError> {
        match self.errors.try_recv() {
            Ok(err) => Some(err),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    /// Stop rendering and release the device.
    pub fn shutdown(self) {
        if let Err(e) = self.stream.pause() {
            log::warn!("failed to pause output stream: {e}");
        }
        drop(self.stream);
    }
}
