use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::f32::consts::TAU;
use std::sync::mpsc;

/// Attack ramp to avoid clicks at tone onset
const ATTACK_MS: f32 = 4.0;

/// Receives the session's transition cues. Implementations swallow their own failures.
pub trait FeedbackSink {
	fn on_phase_changed(&mut self);
	fn on_completed(&mut self);
}

/// Sink for platforms without audio or haptics
#[derive(Debug, Default)]
pub struct NullFeedback;

impl FeedbackSink for NullFeedback {
	fn on_phase_changed(&mut self) {}
	fn on_completed(&mut self) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cue {
	PhaseChanged,
	Completed,
}

impl Cue {
	pub fn tone(self) -> Tone {
		match self {
			// Short soft tink
			Cue::PhaseChanged => Tone {
				frequency_hz: 1760.0,
				duration_ms: 90,
				amplitude: 0.18,
			},
			// Longer bell
			Cue::Completed => Tone {
				frequency_hz: 880.0,
				duration_ms: 700,
				amplitude: 0.25,
			},
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tone {
	pub frequency_hz: f32,
	pub duration_ms: u32,
	pub amplitude: f32,
}

impl Tone {
	pub fn total_samples(&self, sample_rate: u32) -> u64 {
		u64::from(self.duration_ms) * u64::from(sample_rate) / 1000
	}

	/// Sine with a linear attack and exponential decay, zero past the end
	pub fn sample(&self, index: u64, sample_rate: u32) -> f32 {
		let total = self.total_samples(sample_rate);
		if index >= total || sample_rate == 0 {
			return 0.0;
		}
		let t = index as f32 / sample_rate as f32;
		let attack = (t * 1000.0 / ATTACK_MS).min(1.0);
		let progress = index as f32 / total as f32;
		let decay = (-5.0 * progress).exp() * (1.0 - progress);
		self.amplitude * attack * decay * (TAU * self.frequency_hz * t).sin()
	}
}

/// Monophonic tone generator. A new cue replaces the one still sounding.
pub struct Synth {
	sample_rate: u32,
	voice: Option<(Tone, u64)>,
}

impl Synth {
	pub fn new(sample_rate: u32) -> Self {
		Self {
			sample_rate,
			voice: None,
		}
	}

	pub fn trigger(&mut self, cue: Cue) {
		self.voice = Some((cue.tone(), 0));
	}

	pub fn is_sounding(&self) -> bool {
		self.voice.is_some()
	}

	/// Fill an interleaved buffer, writing the same sample to every channel
	pub fn fill(&mut self, data: &mut [f32], channels: usize) {
		let channels = channels.max(1);
		for frame in data.chunks_mut(channels) {
			let value = match self.voice.as_mut() {
				Some((tone, index)) => {
					let value = tone.sample(*index, self.sample_rate);
					*index += 1;
					if *index >= tone.total_samples(self.sample_rate) {
						self.voice = None;
					}
					value
				}
				None => 0.0,
			};
			for sample in frame.iter_mut() {
				*sample = value;
			}
		}
	}
}

/// Plays cue tones on the default output device
pub struct ToneFeedback {
	cue_tx: mpsc::Sender<Cue>,
	/// Active cpal stream (must be kept alive)
	stream: Option<cpal::Stream>,
}

impl ToneFeedback {
	pub fn new() -> Self {
		let (cue_tx, cue_rx) = mpsc::channel();
		let stream = match Self::start_stream(cue_rx) {
			Ok(stream) => Some(stream),
			Err(e) => {
				log::warn!("Audio feedback unavailable, continuing silently: {:#}", e);
				None
			}
		};
		Self { cue_tx, stream }
	}

	fn start_stream(cue_rx: mpsc::Receiver<Cue>) -> anyhow::Result<cpal::Stream> {
		let host = cpal::default_host();
		let device = host
			.default_output_device()
			.ok_or_else(|| anyhow::anyhow!("no default audio output device"))?;
		let name = device.name().unwrap_or_else(|_| "unknown".into());
		let config = device.default_output_config()?;

		log::info!(
			"Audio output: {} ({} channels, {}Hz, {:?})",
			name,
			config.channels(),
			config.sample_rate().0,
			config.sample_format()
		);

		let channels = config.channels() as usize;
		let mut synth = Synth::new(config.sample_rate().0);

		let stream = device.build_output_stream(
			&config.into(),
			move |data: &mut [f32], _: &cpal::OutputCallbackInfo| {
				// Only the latest cue matters
				if let Some(cue) = cue_rx.try_iter().last() {
					synth.trigger(cue);
				}
				synth.fill(data, channels);
			},
			move |err| {
				log::error!("Audio output stream error: {}", err);
			},
			None,
		)?;
		stream.play()?;

		Ok(stream)
	}

	fn send(&self, cue: Cue) {
		if self.stream.is_none() {
			return;
		}
		if self.cue_tx.send(cue).is_err() {
			log::debug!("Audio stream gone, dropping {:?}", cue);
		}
	}
}

impl Default for ToneFeedback {
	fn default() -> Self {
		Self::new()
	}
}

impl FeedbackSink for ToneFeedback {
	fn on_phase_changed(&mut self) {
		self.send(Cue::PhaseChanged);
	}

	fn on_completed(&mut self) {
		self.send(Cue::Completed);
	}
}
