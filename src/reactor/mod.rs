pub mod event;
pub mod queue;
pub mod scheduler;

pub use event::{ComponentResponse, Event, SessionEvent, SettingsEvent};
pub use queue::EventQueue;
pub use scheduler::Scheduler;

use crate::breathing::BreathingSession;
use crate::settings::SettingsManager;
use std::time::Instant;

/// Upper bound on events handled per drain
const MAX_ITERATIONS: usize = 1000;

/// Single consumer of every event, so ticks and commands never interleave
pub struct Reactor {
	queue: EventQueue,
	scheduler: Scheduler,

	pub session: BreathingSession,
	pub settings: SettingsManager,
}

impl Reactor {
	pub fn new(session: BreathingSession, settings: SettingsManager) -> Self {
		log::info!("Initializing all components");
		let mut reactor = Self {
			queue: EventQueue::new(),
			scheduler: Scheduler::new(),
			session,
			settings,
		};

		// Apply stored preferences to the fresh session
		let configure = reactor.settings.configure_event();
		reactor.dispatch(configure);
		reactor.drain();
		log::info!("Initialization complete");

		reactor
	}

	pub fn dispatch(&mut self, event: Event) {
		self.queue.push(event);
	}

	fn process_response(&mut self, response: ComponentResponse) {
		for e in response.events {
			self.queue.push(e);
		}
		for (e, d) in response.scheduled {
			self.scheduler.schedule(e, d);
		}
	}

	/// Release due scheduled events and process the queue
	pub fn tick(&mut self) {
		self.advance_to(Instant::now());
	}

	pub fn advance_to(&mut self, now: Instant) {
		self.scheduler.drain_until(now, &mut self.queue);
		self.drain();
	}

	fn drain(&mut self) {
		let mut iterations = 0;
		while let Some(event) = self.queue.pop() {
			log::trace!("Processing event: {:?}", event);
			let response = self.route(&event);
			self.process_response(response);

			iterations += 1;
			if iterations > MAX_ITERATIONS {
				log::warn!("Event loop exceeded {} iterations, breaking", MAX_ITERATIONS);
				break;
			}
		}
	}

	fn route(&mut self, event: &Event) -> ComponentResponse {
		match event {
			Event::Session(_) => {
				let response = self.session.handle(event);
				if !self.session.is_running() {
					// Nothing may tick once the schedule stopped
					self.scheduler
						.cancel(|e| matches!(e, Event::Session(SessionEvent::Tick { .. })));
				}
				response
			}
			Event::Settings(_) => self.settings.handle(event),
		}
	}

	pub fn next_deadline(&self) -> Option<Instant> {
		self.scheduler.next_deadline()
	}

	/// The hosting view is going away
	pub fn teardown(&mut self) {
		log::info!("Tearing down session");
		self.dispatch(Event::Session(SessionEvent::Teardown));
		self.drain();
	}
}
