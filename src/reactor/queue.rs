use super::event::Event;
use std::collections::VecDeque;

/// Priority event queue with 4 priority levels
pub struct EventQueue {
	queues: [VecDeque<Event>; 4],
}

impl EventQueue {
	pub fn new() -> Self {
		Self {
			queues: [
				VecDeque::new(), // Critical
				VecDeque::new(), // High
				VecDeque::new(), // Normal
				VecDeque::new(), // Low
			],
		}
	}

	/// Push an event to the appropriate priority queue
	pub fn push(&mut self, event: Event) {
		let priority = event.priority();
		self.queues[priority.as_index()].push_back(event);
	}

	/// Pop the highest priority event available
	pub fn pop(&mut self) -> Option<Event> {
		self.queues.iter_mut().find_map(|queue| queue.pop_front())
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.queues.iter().map(VecDeque::len).sum()
	}
}

impl Default for EventQueue {
	fn default() -> Self {
		Self::new()
	}
}
