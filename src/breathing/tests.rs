use super::*;
use crate::types::LEVELS;
use std::cell::RefCell;
use std::rc::Rc;

#[derive(Debug, Clone, PartialEq)]
enum Call {
	PhaseChanged,
	Completed,
	LiveStart { progress: LiveProgress, estimate: u32 },
	LiveUpdate { progress: LiveProgress, estimate: u32 },
	LiveEnd { success: bool },
}

type CallLog = Rc<RefCell<Vec<Call>>>;

struct RecordingFeedback(CallLog);

impl FeedbackSink for RecordingFeedback {
	fn on_phase_changed(&mut self) {
		self.0.borrow_mut().push(Call::PhaseChanged);
	}

	fn on_completed(&mut self) {
		self.0.borrow_mut().push(Call::Completed);
	}
}

struct RecordingLiveStatus(CallLog);

impl LiveStatusPublisher for RecordingLiveStatus {
	fn start(&mut self, progress: LiveProgress, estimated_duration_seconds: u32) {
		self.0.borrow_mut().push(Call::LiveStart {
			progress,
			estimate: estimated_duration_seconds,
		});
	}

	fn update(&mut self, progress: LiveProgress, estimated_total_remaining_seconds: u32) {
		self.0.borrow_mut().push(Call::LiveUpdate {
			progress,
			estimate: estimated_total_remaining_seconds,
		});
	}

	fn end(&mut self, success: bool) {
		self.0.borrow_mut().push(Call::LiveEnd { success });
	}
}

fn session(level_id: u32, target_sets: u32) -> (BreathingSession, CallLog) {
	let log: CallLog = Rc::default();
	let mut session = BreathingSession::new(
		Box::new(RecordingFeedback(Rc::clone(&log))),
		Box::new(RecordingLiveStatus(Rc::clone(&log))),
	);
	session.configure(level_id, target_sets);
	log.borrow_mut().clear();
	(session, log)
}

fn ticks(session: &mut BreathingSession, n: u32) {
	for _ in 0..n {
		session.tick();
	}
}

fn count(log: &CallLog, predicate: impl Fn(&Call) -> bool) -> usize {
	log.borrow().iter().filter(|call| predicate(call)).count()
}

#[test]
fn level_one_walkthrough() {
	let (mut session, _) = session(1, 1);
	assert_eq!(session.target_half_cycles(), 2);

	assert!(session.start());
	assert_eq!(session.phase(), BreathingPhase::Inhale);
	assert_eq!(session.remaining(), 4);

	ticks(&mut session, 4);
	assert_eq!(session.phase(), BreathingPhase::Hold);
	assert_eq!(session.remaining(), 16);

	ticks(&mut session, 16);
	assert_eq!(session.phase(), BreathingPhase::Exhale);
	assert_eq!(session.remaining(), 8);

	ticks(&mut session, 8);
	assert_eq!(session.completed_half_cycles(), 1);
	assert_eq!(session.phase(), BreathingPhase::Inhale);
	assert_eq!(session.remaining(), 4);

	ticks(&mut session, 4 + 16 + 7);
	assert_eq!(session.phase(), BreathingPhase::Exhale);
	assert_eq!(session.remaining(), 1);
	assert!(!session.is_completed());

	session.tick();
	assert_eq!(session.completed_half_cycles(), 2);
	assert!(session.is_completed());
	assert!(!session.is_running());
	assert_eq!(session.phase(), BreathingPhase::Exhale);
}

#[test]
fn completes_after_exact_tick_count_for_every_level() {
	for level in &LEVELS {
		for sets in 1..=3 {
			let (mut session, _) = session(level.id, sets);
			session.start();
			let total = sets * 2 * level.half_cycle_seconds();

			ticks(&mut session, total - 1);
			assert!(!session.is_completed(), "{} x{} finished early", level.title, sets);
			assert!(session.is_running());

			session.tick();
			assert!(session.is_completed(), "{} x{} not finished", level.title, sets);
			assert_eq!(session.completed_half_cycles(), sets * 2);
		}
	}
}

#[test]
fn phases_advance_in_order_and_countdown_stays_in_range() {
	let (mut session, _) = session(0, 2);
	session.start();

	let mut previous = session.phase();
	while session.is_running() {
		session.tick();
		let phase = session.phase();
		if phase != previous && !session.is_completed() {
			assert_eq!(phase, previous.next());
		}
		assert!(session.remaining() <= session.level().duration(phase));
		previous = phase;
	}
	assert!(session.is_completed());
}

#[test]
fn estimate_counts_down_one_per_tick() {
	let (mut session, _) = session(2, 2);
	let level = session.level();
	let expected_total = 2 * 2 * level.half_cycle_seconds();
	assert_eq!(session.estimated_total_remaining_seconds(), expected_total);

	session.start();
	let mut estimate = session.estimated_total_remaining_seconds();
	assert_eq!(estimate, expected_total);

	while session.is_running() {
		session.tick();
		let next = session.estimated_total_remaining_seconds();
		assert_eq!(next + 1, estimate);
		estimate = next;
	}
	assert_eq!(estimate, 0);
}

#[test]
fn pause_and_resume_keep_remaining() {
	let (mut session, log) = session(1, 1);
	session.start();
	ticks(&mut session, 6);
	assert_eq!(session.phase(), BreathingPhase::Hold);
	assert_eq!(session.remaining(), 14);

	session.pause();
	session.pause();
	assert!(!session.is_running());
	ticks(&mut session, 5);
	assert_eq!(session.remaining(), 14);

	assert!(session.start());
	assert_eq!(session.phase(), BreathingPhase::Hold);
	assert_eq!(session.remaining(), 14);
	assert!(log.borrow().contains(&Call::LiveEnd { success: false }));
}

#[test]
fn reset_clears_any_state() {
	let (mut session, _) = session(1, 1);
	session.start();
	ticks(&mut session, 30);
	session.reset();
	assert_clean(&session);

	// From completion too
	session.start();
	ticks(&mut session, 56);
	assert!(session.is_completed());
	session.reset();
	assert_clean(&session);
}

fn assert_clean(session: &BreathingSession) {
	assert_eq!(session.phase(), BreathingPhase::Inhale);
	assert_eq!(session.remaining(), 0);
	assert_eq!(session.completed_half_cycles(), 0);
	assert!(!session.is_completed());
	assert!(!session.is_running());
}

#[test]
fn completed_session_ignores_start_until_restart() {
	let (mut session, _) = session(0, 1);
	session.start();
	ticks(&mut session, 28);
	assert!(session.is_completed());

	assert!(!session.start());
	assert!(!session.is_running());

	assert!(session.toggle());
	assert!(session.is_running());
	assert_eq!(session.completed_half_cycles(), 0);
	assert_eq!(session.remaining(), 2);
}

#[test]
fn toggle_alternates_start_and_pause() {
	let (mut session, _) = session(1, 1);
	assert!(session.toggle());
	assert!(session.is_running());
	assert!(!session.toggle());
	assert!(!session.is_running());
}

#[test]
fn configure_clamps_and_defaults() {
	let (mut session, _) = session(1, 0);
	assert_eq!(session.target_half_cycles(), 2);

	session.configure(99, 3);
	assert_eq!(session.level().id, DEFAULT_LEVEL_ID);
	assert_eq!(session.target_half_cycles(), 6);
}

#[test]
fn configure_mid_session_resets() {
	let (mut session, log) = session(1, 2);
	session.start();
	ticks(&mut session, 10);

	session.configure(3, 2);
	assert_clean(&session);
	assert_eq!(session.level().id, 3);
	assert!(log.borrow().contains(&Call::LiveEnd { success: false }));
}

#[test]
fn transition_side_effects() {
	let (mut session, log) = session(1, 1);
	session.start();
	assert_eq!(
		log.borrow()[0],
		Call::LiveStart {
			progress: LiveProgress {
				current_half_cycle: 1,
				target_half_cycles: 2,
				phase: BreathingPhase::Inhale,
				remaining_seconds: 4,
			},
			estimate: 56,
		}
	);

	ticks(&mut session, 56);
	assert_eq!(count(&log, |c| *c == Call::PhaseChanged), 6);
	assert_eq!(count(&log, |c| *c == Call::Completed), 1);
	assert_eq!(count(&log, |c| matches!(c, Call::LiveUpdate { .. })), 55);

	let calls = log.borrow();
	assert_eq!(
		&calls[calls.len() - 3..],
		&[
			Call::PhaseChanged,
			Call::Completed,
			Call::LiveEnd { success: true }
		]
	);
	assert_eq!(count(&log, |c| *c == Call::LiveEnd { success: false }), 0);
}

#[test]
fn progress_update_reports_new_phase() {
	let (mut session, log) = session(1, 1);
	session.start();
	ticks(&mut session, 4);

	let calls = log.borrow();
	assert_eq!(calls[calls.len() - 2], Call::PhaseChanged);
	assert_eq!(
		calls[calls.len() - 1],
		Call::LiveUpdate {
			progress: LiveProgress {
				current_half_cycle: 1,
				target_half_cycles: 2,
				phase: BreathingPhase::Hold,
				remaining_seconds: 16,
			},
			estimate: 52,
		}
	);
}

/// Sees the published snapshot at the moment feedback fires
struct ObservingFeedback {
	rx: Rc<RefCell<Option<watch::Receiver<SessionSnapshot>>>>,
	seen: Rc<RefCell<Vec<BreathingPhase>>>,
}

impl FeedbackSink for ObservingFeedback {
	fn on_phase_changed(&mut self) {
		if let Some(rx) = self.rx.borrow().as_ref() {
			self.seen.borrow_mut().push(rx.borrow().phase);
		}
	}

	fn on_completed(&mut self) {}
}

#[test]
fn state_is_published_before_feedback() {
	let rx = Rc::new(RefCell::new(None));
	let seen = Rc::new(RefCell::new(Vec::new()));
	let mut session = BreathingSession::new(
		Box::new(ObservingFeedback {
			rx: Rc::clone(&rx),
			seen: Rc::clone(&seen),
		}),
		Box::new(crate::live_status::NullLiveStatus),
	);
	session.configure(1, 1);
	*rx.borrow_mut() = Some(session.subscribe());

	session.start();
	ticks(&mut session, 4 + 16);
	assert_eq!(
		*seen.borrow(),
		vec![BreathingPhase::Hold, BreathingPhase::Exhale]
	);
}

#[test]
fn subscribers_observe_snapshots() {
	let (mut session, _) = session(1, 1);
	let rx = session.subscribe();
	assert_eq!(rx.borrow().status, SessionStatus::Idle);
	assert_eq!(rx.borrow().display_remaining(), 4);

	session.start();
	session.tick();
	let snapshot = *rx.borrow();
	assert_eq!(snapshot.status, SessionStatus::Running);
	assert_eq!(snapshot.remaining_seconds, 3);
	assert_eq!(snapshot.estimated_total_remaining_seconds, 55);
	assert_eq!(snapshot, session.snapshot());
}

#[test]
fn handle_start_schedules_first_tick() {
	let (mut session, _) = session(1, 1);
	let response = session.handle(&Event::Session(SessionEvent::Start));
	assert!(response.events.is_empty());
	match response.scheduled.as_slice() {
		[(Event::Session(SessionEvent::Tick { generation, .. }), delay)] => {
			assert_eq!(*generation, session.generation());
			assert_eq!(*delay, TICK_INTERVAL);
		}
		other => panic!("unexpected schedule: {:?}", other),
	}

	// Already running: no second schedule
	let response = session.handle(&Event::Session(SessionEvent::Start));
	assert!(response.is_empty());
}

#[test]
fn handle_tick_reschedules_from_previous_deadline() {
	let (mut session, _) = session(1, 1);
	session.handle(&Event::Session(SessionEvent::Start));
	let due = Instant::now();
	let response = session.handle(&Event::Session(SessionEvent::Tick {
		generation: session.generation(),
		due,
	}));
	assert_eq!(session.remaining(), 3);
	match response.scheduled.as_slice() {
		[(Event::Session(SessionEvent::Tick { due: next, .. }), delay)] => {
			assert_eq!(*next, due + TICK_INTERVAL);
			assert!(*delay <= TICK_INTERVAL);
		}
		other => panic!("unexpected schedule: {:?}", other),
	}
}

#[test]
fn stale_ticks_are_dropped() {
	let (mut session, _) = session(1, 1);
	session.handle(&Event::Session(SessionEvent::Start));
	let stale = session.generation();

	session.handle(&Event::Session(SessionEvent::Pause));
	session.handle(&Event::Session(SessionEvent::Start));
	assert_ne!(session.generation(), stale);

	let response = session.handle(&Event::Session(SessionEvent::Tick {
		generation: stale,
		due: Instant::now(),
	}));
	assert!(response.is_empty());
	assert_eq!(session.remaining(), 4);
}

#[test]
fn final_tick_stops_schedule() {
	let (mut session, _) = session(0, 1);
	session.start();
	ticks(&mut session, 27);
	let response = session.handle(&Event::Session(SessionEvent::Tick {
		generation: session.generation(),
		due: Instant::now(),
	}));
	assert!(session.is_completed());
	assert!(response.is_empty());
}
