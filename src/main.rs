mod breathing;
mod console;
mod feedback;
mod live_status;
mod reactor;
mod settings;
mod types;

use breathing::BreathingSession;
use console::Command;
use feedback::ToneFeedback;
use reactor::Reactor;
use settings::{MemoryStore, PreferencesStore, SettingsManager, TomlStore};
use std::time::Instant;
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let store: Box<dyn PreferencesStore> = match settings::preferences_path() {
		Some(path) => {
			log::info!("Preferences file: {}", path.display());
			Box::new(TomlStore::new(path))
		}
		None => {
			log::warn!("No config directory, preferences will not persist");
			Box::new(MemoryStore::default())
		}
	};
	let settings = SettingsManager::new(store);
	if settings.keep_awake() {
		log::info!("Keep-awake requested, screen idle control is left to the host");
	}

	let live_status = live_status::select(settings.live_status(), settings::live_status_path());
	let session = BreathingSession::new(Box::new(ToneFeedback::new()), live_status);
	let mut reactor = Reactor::new(session, settings);
	let mut snapshots = reactor.session.subscribe();

	let (command_tx, mut command_rx) = mpsc::channel(16);
	// Plain thread: a blocked read must not hold up runtime shutdown
	std::thread::Builder::new()
		.name("stdin".into())
		.spawn(move || console::read_commands(std::io::stdin().lock(), command_tx))?;
	let ctrl_c = tokio::signal::ctrl_c();
	tokio::pin!(ctrl_c);

	println!("{}", console::HELP);
	println!("{}", console::status_line(&snapshots.borrow_and_update()));

	let mut input_open = true;
	loop {
		tokio::select! {
			_ = sleep_until(reactor.next_deadline()) => reactor.tick(),
			command = command_rx.recv(), if input_open => match command {
				Some(Command::Event(event)) => {
					reactor.dispatch(event);
					reactor.tick();
				}
				Some(Command::Status) => {
					println!("{}", console::status_line(&reactor.session.snapshot()));
				}
				Some(Command::Levels) => {
					println!("{}", console::level_menu(reactor.settings.level()));
				}
				Some(Command::Quit) => break,
				None => {
					log::debug!("Input closed");
					input_open = false;
				}
			},
			_ = &mut ctrl_c => {
				log::info!("Interrupted");
				break;
			}
		}

		if snapshots.has_changed().unwrap_or(false) {
			println!("{}", console::status_line(&snapshots.borrow_and_update()));
		}
		// Without input nothing can restart an idle session
		if !input_open && !reactor.session.is_running() {
			break;
		}
	}

	reactor.teardown();
	Ok(())
}

/// Resolve at `deadline`, or never when nothing is scheduled
async fn sleep_until(deadline: Option<Instant>) {
	match deadline {
		Some(deadline) => tokio::time::sleep_until(deadline.into()).await,
		None => std::future::pending().await,
	}
}
