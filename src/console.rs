use crate::reactor::{Event, SessionEvent, SettingsEvent};
use crate::types::{LEVELS, SessionSnapshot, SessionStatus, level_or_default};
use anyhow::{Context, bail};
use std::io::BufRead;
use tokio::sync::mpsc;

pub const HELP: &str = "\
Commands:
  <enter>, t, toggle   start or pause
  s, start             start
  p, pause             pause
  r, reset             reset to the first inhale
  restart              reset and start again
  level                list breathing levels
  level <n>            select breathing level
  sets <n>, +, -       set or step target sets
  awake                toggle keep screen awake
  live on|off          enable live status (next launch)
  status               show progress
  q, quit              leave";

#[derive(Debug, Clone)]
pub enum Command {
	Event(Event),
	Status,
	Levels,
	Quit,
}

/// Parse one line of input
pub fn parse(line: &str) -> anyhow::Result<Command> {
	let mut words = line.split_whitespace();
	let Some(head) = words.next() else {
		return Ok(session(SessionEvent::Toggle));
	};
	let arg = words.next();

	let command = match (head.to_lowercase().as_str(), arg) {
		("t" | "toggle", None) => session(SessionEvent::Toggle),
		("s" | "start", None) => session(SessionEvent::Start),
		("p" | "pause", None) => session(SessionEvent::Pause),
		("r" | "reset", None) => session(SessionEvent::Reset),
		("restart", None) => session(SessionEvent::Restart),
		("level" | "levels", None) => Command::Levels,
		("level", Some(n)) => {
			let id: u32 = n.parse().with_context(|| format!("Invalid level: {}", n))?;
			settings(SettingsEvent::SetLevel { id })
		}
		("sets", Some(n)) => {
			let sets: u32 = n.parse().with_context(|| format!("Invalid set count: {}", n))?;
			settings(SettingsEvent::SetTargetSets { sets })
		}
		("+", None) => settings(SettingsEvent::AdjustTargetSets { delta: 1 }),
		("-", None) => settings(SettingsEvent::AdjustTargetSets { delta: -1 }),
		("awake", None) => settings(SettingsEvent::ToggleKeepAwake),
		("live", Some("on")) => settings(SettingsEvent::SetLiveStatus { enabled: true }),
		("live", Some("off")) => settings(SettingsEvent::SetLiveStatus { enabled: false }),
		("status", None) => Command::Status,
		("q" | "quit", None) => Command::Quit,
		_ => bail!("Unknown command: {}", line.trim()),
	};
	Ok(command)
}

/// Blocking line reader, run on its own thread so the runtime never waits on input.
/// Stops at end of input, after `quit`, or once the receiver is gone.
pub fn read_commands(input: impl BufRead, tx: mpsc::Sender<Command>) {
	for line in input.lines() {
		let line = match line {
			Ok(line) => line,
			Err(e) => {
				log::error!("Failed to read input: {}", e);
				break;
			}
		};
		let command = match parse(&line) {
			Ok(command) => command,
			Err(e) => {
				log::warn!("{:#}", e);
				continue;
			}
		};
		let quit = matches!(command, Command::Quit);
		if tx.blocking_send(command).is_err() || quit {
			break;
		}
	}
	log::debug!("Command reader finished");
}

fn session(event: SessionEvent) -> Command {
	Command::Event(Event::Session(event))
}

fn settings(event: SettingsEvent) -> Command {
	Command::Event(Event::Settings(event))
}

/// One-line rendering of the session
pub fn status_line(snapshot: &SessionSnapshot) -> String {
	let level = level_or_default(snapshot.level_id);
	match snapshot.status {
		SessionStatus::Completed => format!(
			"Completed {} sets of {}",
			snapshot.completed_sets(),
			level.title
		),
		_ => {
			let estimate = snapshot.estimated_total_remaining_seconds;
			format!(
				"{:<6} {:>3}s {}  {:<11}  set {}/{}  half-cycle {}/{}  ~{}:{:02} left{}",
				snapshot.phase.label(),
				snapshot.display_remaining(),
				ring(snapshot.ring_fraction()),
				snapshot.phase.instruction(),
				snapshot.completed_sets(),
				snapshot.target_sets(),
				snapshot.completed_half_cycles,
				snapshot.target_half_cycles,
				estimate / 60,
				estimate % 60,
				match snapshot.status {
					SessionStatus::Idle if snapshot.remaining_seconds > 0 => "  (paused)",
					SessionStatus::Idle => "  (ready)",
					_ => "",
				}
			)
		}
	}
}

/// Text stand-in for the progress ring
fn ring(fraction: f32) -> String {
	let filled = (fraction.clamp(0.0, 1.0) * RING_CELLS as f32).round() as usize;
	format!("[{}{}]", "#".repeat(filled), "-".repeat(RING_CELLS - filled))
}

const RING_CELLS: usize = 10;

pub fn level_menu(selected: u32) -> String {
	LEVELS
		.iter()
		.map(|level| {
			let marker = if level.id == selected { '*' } else { ' ' };
			format!("{} {}: {}", marker, level.id, level.title)
		})
		.collect::<Vec<_>>()
		.join("\n")
}
