use std::time::{Duration, Instant};

#[derive(Clone, Debug)]
pub enum Event {
	Session(SessionEvent),
	Settings(SettingsEvent),
}

impl Event {
	pub fn priority(&self) -> Priority {
		match self {
			Event::Session(SessionEvent::Pause) => Priority::Critical,
			Event::Session(SessionEvent::Reset) => Priority::Critical,
			Event::Session(SessionEvent::Teardown) => Priority::Critical,
			Event::Session(SessionEvent::Tick { .. }) => Priority::Normal,
			Event::Session(_) => Priority::High,
			Event::Settings(_) => Priority::Low,
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Priority {
	Critical = 0,
	High = 1,
	Normal = 2,
	Low = 3,
}

impl Priority {
	pub fn as_index(&self) -> usize {
		*self as usize
	}
}

#[derive(Clone, Debug)]
pub enum SessionEvent {
	Start,
	Pause,
	Toggle,
	Reset,
	Restart,
	/// Hosting view went away
	Teardown,
	/// One elapsed second of the schedule identified by `generation`
	Tick { generation: u64, due: Instant },
	Configure { level_id: u32, target_sets: u32 },
}

#[derive(Clone, Debug)]
pub enum SettingsEvent {
	SetLevel { id: u32 },
	SetTargetSets { sets: u32 },
	/// Step target sets by delta
	AdjustTargetSets { delta: i64 },
	ToggleKeepAwake,
	SetLiveStatus { enabled: bool },
}

/// Response from component.handle()
#[derive(Default, Debug)]
pub struct ComponentResponse {
	/// Events to dispatch immediately
	pub events: Vec<Event>,
	/// Events to schedule (event, delay)
	pub scheduled: Vec<(Event, Duration)>,
}

impl ComponentResponse {
	pub fn none() -> Self {
		Self::default()
	}

	pub fn emit(event: Event) -> Self {
		Self {
			events: vec![event],
			scheduled: vec![],
		}
	}

	pub fn schedule(event: Event, delay: Duration) -> Self {
		Self {
			events: vec![],
			scheduled: vec![(event, delay)],
		}
	}

	#[cfg(test)]
	pub fn is_empty(&self) -> bool {
		self.events.is_empty() && self.scheduled.is_empty()
	}
}
