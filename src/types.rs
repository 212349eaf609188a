use serde::{Deserialize, Serialize};

/// Breathing timer phases
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreathingPhase {
	Inhale,
	Hold,
	Exhale,
}

impl BreathingPhase {
	/// Cyclic successor: inhale -> hold -> exhale -> inhale
	pub fn next(self) -> Self {
		match self {
			BreathingPhase::Inhale => BreathingPhase::Hold,
			BreathingPhase::Hold => BreathingPhase::Exhale,
			BreathingPhase::Exhale => BreathingPhase::Inhale,
		}
	}

	pub fn label(self) -> &'static str {
		match self {
			BreathingPhase::Inhale => "Inhale",
			BreathingPhase::Hold => "Hold",
			BreathingPhase::Exhale => "Exhale",
		}
	}

	pub fn instruction(self) -> &'static str {
		match self {
			BreathingPhase::Inhale => "Breathe in",
			BreathingPhase::Hold => "Hold",
			BreathingPhase::Exhale => "Breathe out",
		}
	}
}

/// Duration preset for one inhale-hold-exhale traversal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreathingLevel {
	pub id: u32,
	pub inhale: u32,
	pub hold: u32,
	pub exhale: u32,
	pub title: &'static str,
}

impl BreathingLevel {
	pub fn duration(&self, phase: BreathingPhase) -> u32 {
		match phase {
			BreathingPhase::Inhale => self.inhale,
			BreathingPhase::Hold => self.hold,
			BreathingPhase::Exhale => self.exhale,
		}
	}

	/// Seconds for a full inhale-hold-exhale traversal
	pub fn half_cycle_seconds(&self) -> u32 {
		self.inhale + self.hold + self.exhale
	}
}

pub const DEFAULT_LEVEL_ID: u32 = 1;
pub const DEFAULT_TARGET_SETS: u32 = 4;

pub static LEVELS: [BreathingLevel; 4] = [
	BreathingLevel {
		id: 0,
		inhale: 2,
		hold: 8,
		exhale: 4,
		title: "Level 0 (2-8-4)",
	},
	BreathingLevel {
		id: 1,
		inhale: 4,
		hold: 16,
		exhale: 8,
		title: "Level 1 (4-16-8)",
	},
	BreathingLevel {
		id: 2,
		inhale: 5,
		hold: 20,
		exhale: 10,
		title: "Level 2 (5-20-10)",
	},
	BreathingLevel {
		id: 3,
		inhale: 8,
		hold: 32,
		exhale: 16,
		title: "Level 3 (8-32-16)",
	},
];

/// Look up a level by id, falling back to the default level
pub fn level_or_default(id: u32) -> &'static BreathingLevel {
	LEVELS
		.iter()
		.find(|level| level.id == id)
		.or_else(|| LEVELS.iter().find(|level| level.id == DEFAULT_LEVEL_ID))
		.unwrap_or(&LEVELS[0])
}

/// Coarse session status, exactly one holds at any instant
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
	Idle,
	Running,
	Completed,
}

/// Immutable copy of the session's observable state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSnapshot {
	pub level_id: u32,
	pub phase: BreathingPhase,
	pub remaining_seconds: u32,
	pub phase_seconds: u32,
	pub completed_half_cycles: u32,
	pub target_half_cycles: u32,
	pub status: SessionStatus,
	pub estimated_total_remaining_seconds: u32,
}

impl SessionSnapshot {
	pub fn completed_sets(&self) -> u32 {
		self.completed_half_cycles / 2
	}

	pub fn target_sets(&self) -> u32 {
		self.target_half_cycles / 2
	}

	/// Fraction of the progress ring still filled
	pub fn ring_fraction(&self) -> f32 {
		if self.remaining_seconds == 0 {
			return 0.0;
		}
		self.remaining_seconds as f32 / self.phase_seconds.max(1) as f32
	}

	/// Countdown to show, a fresh phase displays its full duration
	pub fn display_remaining(&self) -> u32 {
		if self.remaining_seconds == 0 && self.status == SessionStatus::Idle {
			self.phase_seconds
		} else {
			self.remaining_seconds
		}
	}
}

/// Progress payload carried by live status calls
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveProgress {
	pub current_half_cycle: u32,
	pub target_half_cycles: u32,
	pub phase: BreathingPhase,
	pub remaining_seconds: u32,
}
