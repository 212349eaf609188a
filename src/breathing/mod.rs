use crate::feedback::FeedbackSink;
use crate::live_status::LiveStatusPublisher;
use crate::reactor::{ComponentResponse, Event, SessionEvent};
use crate::settings::MIN_TARGET_SETS;
use crate::types::{
	BreathingLevel, BreathingPhase, DEFAULT_LEVEL_ID, DEFAULT_TARGET_SETS, LiveProgress,
	SessionSnapshot, SessionStatus, level_or_default,
};
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Fixed ticker period
pub const TICK_INTERVAL: Duration = Duration::from_secs(1);

/// Timer-driven breathing exercise: phase sequencing, countdown, and half-cycle accounting.
///
/// A half-cycle is one inhale-hold-exhale traversal; two make a set. Every mutation is
/// published to subscribers before the collaborators are notified.
pub struct BreathingSession {
	level: &'static BreathingLevel,
	target_half_cycles: u32,
	phase: BreathingPhase,
	remaining: u32,
	completed_half_cycles: u32,
	is_running: bool,
	is_completed: bool,
	/// Identifies the live tick schedule, bumped on every start and stop
	generation: u64,
	feedback: Box<dyn FeedbackSink>,
	live_status: Box<dyn LiveStatusPublisher>,
	snapshot_tx: watch::Sender<SessionSnapshot>,
}

impl BreathingSession {
	pub fn new(
		feedback: Box<dyn FeedbackSink>,
		live_status: Box<dyn LiveStatusPublisher>,
	) -> Self {
		let level = level_or_default(DEFAULT_LEVEL_ID);
		let target_half_cycles = DEFAULT_TARGET_SETS * 2;
		let initial = SessionSnapshot {
			level_id: level.id,
			phase: BreathingPhase::Inhale,
			remaining_seconds: 0,
			phase_seconds: level.inhale,
			completed_half_cycles: 0,
			target_half_cycles,
			status: SessionStatus::Idle,
			estimated_total_remaining_seconds: target_half_cycles * level.half_cycle_seconds(),
		};
		let (snapshot_tx, _) = watch::channel(initial);

		Self {
			level,
			target_half_cycles,
			phase: BreathingPhase::Inhale,
			remaining: 0,
			completed_half_cycles: 0,
			is_running: false,
			is_completed: false,
			generation: 0,
			feedback,
			live_status,
			snapshot_tx,
		}
	}

	/// Select the duration table and target. Resets a session already in progress.
	pub fn configure(&mut self, level_id: u32, target_sets: u32) {
		let level = level_or_default(level_id);
		if level.id != level_id {
			log::warn!("Unknown level {}, using {}", level_id, level.title);
		}
		if self.in_progress() {
			log::info!("Configuration changed mid-session, resetting");
			self.reset();
		}
		self.level = level;
		self.target_half_cycles = target_sets.max(MIN_TARGET_SETS) * 2;
		log::info!(
			"Configured {} for {} half-cycles",
			level.title,
			self.target_half_cycles
		);
		self.publish();
	}

	/// Begin or resume. Returns false when nothing changed.
	pub fn start(&mut self) -> bool {
		if self.is_completed || self.is_running {
			return false;
		}
		if self.remaining == 0 {
			self.remaining = self.phase_duration();
		}
		self.is_running = true;
		self.generation += 1;
		log::info!(
			"Session started: {} {}s, half-cycle {}/{}",
			self.phase.label(),
			self.remaining,
			self.completed_half_cycles,
			self.target_half_cycles
		);
		self.publish();

		let progress = self.progress();
		let estimate = self.estimated_total_remaining_seconds();
		self.live_status.start(progress, estimate);
		true
	}

	pub fn pause(&mut self) {
		if self.is_running {
			log::info!("Session paused at {} {}s", self.phase.label(), self.remaining);
		}
		self.halt();
		self.publish();
		self.live_status.end(false);
	}

	pub fn reset(&mut self) {
		self.pause();
		self.phase = BreathingPhase::Inhale;
		self.remaining = 0;
		self.completed_half_cycles = 0;
		self.is_completed = false;
		log::debug!("Session reset");
		self.publish();
	}

	/// Start/Pause button; on a finished session it restarts
	pub fn toggle(&mut self) -> bool {
		if self.is_completed {
			return self.restart();
		}
		if self.is_running {
			self.pause();
			false
		} else {
			self.start()
		}
	}

	pub fn restart(&mut self) -> bool {
		self.reset();
		self.start()
	}

	/// Advance by one elapsed second
	pub fn tick(&mut self) {
		if !self.is_running {
			return;
		}

		// Still counting down within the phase
		if self.remaining > 1 {
			self.remaining -= 1;
			log::trace!("{} {}s", self.phase.label(), self.remaining);
			self.publish();
			self.publish_progress();
			return;
		}

		// Last second of the phase elapsed, cross the boundary on this tick
		if self.phase == BreathingPhase::Exhale {
			self.completed_half_cycles += 1;

			if self.completed_half_cycles >= self.target_half_cycles {
				self.remaining = 0;
				self.is_completed = true;
				self.halt();
				log::info!(
					"Session completed: {} half-cycles",
					self.completed_half_cycles
				);
				self.publish();

				self.feedback.on_phase_changed();
				self.feedback.on_completed();
				self.live_status.end(true);
				return;
			}

			self.phase = BreathingPhase::Inhale;
		} else {
			self.phase = self.phase.next();
		}
		self.remaining = self.phase_duration();
		log::debug!(
			"Phase -> {} ({}s), half-cycle {}/{}",
			self.phase.label(),
			self.remaining,
			self.completed_half_cycles,
			self.target_half_cycles
		);
		self.publish();

		self.feedback.on_phase_changed();
		self.publish_progress();
	}

	/// Seconds left until completion. Display only, the countdown never reads it.
	pub fn estimated_total_remaining_seconds(&self) -> u32 {
		if self.is_completed {
			return 0;
		}
		let level = self.level;
		let current = if self.remaining == 0 {
			self.phase_duration()
		} else {
			self.remaining
		};
		let rest_of_half_cycle = match self.phase {
			BreathingPhase::Inhale => level.hold + level.exhale,
			BreathingPhase::Hold => level.exhale,
			BreathingPhase::Exhale => 0,
		};
		let later_half_cycles = self
			.target_half_cycles
			.saturating_sub(self.completed_half_cycles + 1);

		current + rest_of_half_cycle + later_half_cycles * level.half_cycle_seconds()
	}

	pub fn handle(&mut self, event: &Event) -> ComponentResponse {
		match event {
			Event::Session(SessionEvent::Start) => {
				let started = self.start();
				self.first_tick(started)
			}
			Event::Session(SessionEvent::Toggle) => {
				let started = self.toggle();
				self.first_tick(started)
			}
			Event::Session(SessionEvent::Restart) => {
				let started = self.restart();
				self.first_tick(started)
			}
			Event::Session(SessionEvent::Pause) | Event::Session(SessionEvent::Teardown) => {
				self.pause();
				ComponentResponse::none()
			}
			Event::Session(SessionEvent::Reset) => {
				self.reset();
				ComponentResponse::none()
			}
			Event::Session(SessionEvent::Configure {
				level_id,
				target_sets,
			}) => {
				self.configure(*level_id, *target_sets);
				ComponentResponse::none()
			}
			Event::Session(SessionEvent::Tick { generation, due }) => {
				if *generation != self.generation || !self.is_running {
					log::trace!("Dropping stale tick (generation {})", generation);
					return ComponentResponse::none();
				}
				self.tick();
				if !self.is_running {
					return ComponentResponse::none();
				}
				// Next deadline derives from the previous one so the period never drifts
				let next_due = *due + TICK_INTERVAL;
				ComponentResponse::schedule(
					Event::Session(SessionEvent::Tick {
						generation: self.generation,
						due: next_due,
					}),
					next_due.saturating_duration_since(Instant::now()),
				)
			}
			_ => ComponentResponse::none(),
		}
	}

	fn first_tick(&self, started: bool) -> ComponentResponse {
		if !started {
			return ComponentResponse::none();
		}
		ComponentResponse::schedule(
			Event::Session(SessionEvent::Tick {
				generation: self.generation,
				due: Instant::now() + TICK_INTERVAL,
			}),
			TICK_INTERVAL,
		)
	}

	/// Stop ticking without touching the live status
	fn halt(&mut self) {
		if self.is_running {
			self.is_running = false;
			self.generation += 1;
		}
	}

	fn in_progress(&self) -> bool {
		self.is_running || self.is_completed || self.completed_half_cycles > 0 || self.remaining > 0
	}

	fn phase_duration(&self) -> u32 {
		self.level.duration(self.phase)
	}

	fn status(&self) -> SessionStatus {
		if self.is_running {
			SessionStatus::Running
		} else if self.is_completed {
			SessionStatus::Completed
		} else {
			SessionStatus::Idle
		}
	}

	fn progress(&self) -> LiveProgress {
		LiveProgress {
			current_half_cycle: (self.completed_half_cycles + 1).min(self.target_half_cycles),
			target_half_cycles: self.target_half_cycles,
			phase: self.phase,
			remaining_seconds: self.remaining,
		}
	}

	fn publish_progress(&mut self) {
		let progress = self.progress();
		let estimate = self.estimated_total_remaining_seconds();
		self.live_status.update(progress, estimate);
	}

	fn publish(&self) {
		self.snapshot_tx.send_replace(self.snapshot());
	}

	pub fn snapshot(&self) -> SessionSnapshot {
		SessionSnapshot {
			level_id: self.level.id,
			phase: self.phase,
			remaining_seconds: self.remaining,
			phase_seconds: self.phase_duration(),
			completed_half_cycles: self.completed_half_cycles,
			target_half_cycles: self.target_half_cycles,
			status: self.status(),
			estimated_total_remaining_seconds: self.estimated_total_remaining_seconds(),
		}
	}

	pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
		self.snapshot_tx.subscribe()
	}

	pub fn is_running(&self) -> bool {
		self.is_running
	}
}

// Accessors for inspecting the machine in tests, the run loop reads snapshots instead
#[cfg(test)]
impl BreathingSession {
	pub fn level(&self) -> &'static BreathingLevel {
		self.level
	}

	pub fn phase(&self) -> BreathingPhase {
		self.phase
	}

	pub fn remaining(&self) -> u32 {
		self.remaining
	}

	pub fn completed_half_cycles(&self) -> u32 {
		self.completed_half_cycles
	}

	pub fn target_half_cycles(&self) -> u32 {
		self.target_half_cycles
	}

	pub fn is_completed(&self) -> bool {
		self.is_completed
	}

	pub fn generation(&self) -> u64 {
		self.generation
	}
}

#[cfg(test)]
mod tests;
