use super::event::Event;
use super::queue::EventQueue;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

struct ScheduledEvent {
	emit_at: Instant,
	event: Event,
}

impl PartialEq for ScheduledEvent {
	fn eq(&self, other: &Self) -> bool {
		self.emit_at == other.emit_at
	}
}

impl Eq for ScheduledEvent {}

impl PartialOrd for ScheduledEvent {
	fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
		Some(self.cmp(other))
	}
}

impl Ord for ScheduledEvent {
	fn cmp(&self, other: &Self) -> Ordering {
		other.emit_at.cmp(&self.emit_at)
	}
}

pub struct Scheduler {
	pending: BinaryHeap<ScheduledEvent>,
}

impl Scheduler {
	pub fn new() -> Self {
		Self {
			pending: BinaryHeap::new(),
		}
	}

	/// Schedule an event to fire after `delay`
	pub fn schedule(&mut self, event: Event, delay: Duration) {
		self.schedule_at(event, Instant::now() + delay);
	}

	pub fn schedule_at(&mut self, event: Event, emit_at: Instant) {
		self.pending.push(ScheduledEvent { emit_at, event });
	}

	/// Drop every pending event matching `predicate`
	pub fn cancel(&mut self, predicate: impl Fn(&Event) -> bool) {
		self.pending.retain(|scheduled| !predicate(&scheduled.event));
	}

	/// Earliest pending deadline, if any
	pub fn next_deadline(&self) -> Option<Instant> {
		self.pending.peek().map(|scheduled| scheduled.emit_at)
	}

	/// Drain events due at `now` into the queue
	pub fn drain_until(&mut self, now: Instant, queue: &mut EventQueue) {
		while self
			.pending
			.peek()
			.is_some_and(|scheduled| scheduled.emit_at <= now)
		{
			if let Some(scheduled) = self.pending.pop() {
				queue.push(scheduled.event);
			}
		}
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.pending.len()
	}
}

impl Default for Scheduler {
	fn default() -> Self {
		Self::new()
	}
}
