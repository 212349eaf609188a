use crate::types::LiveProgress;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

/// Persistent "activity in progress" display. Calls never fail and never block the caller.
pub trait LiveStatusPublisher {
	fn start(&mut self, progress: LiveProgress, estimated_duration_seconds: u32);
	fn update(&mut self, progress: LiveProgress, estimated_total_remaining_seconds: u32);
	fn end(&mut self, success: bool);
}

/// Publisher for platforms without live status, or when the user disabled it
#[derive(Debug, Default)]
pub struct NullLiveStatus;

impl LiveStatusPublisher for NullLiveStatus {
	fn start(&mut self, _progress: LiveProgress, _estimated_duration_seconds: u32) {}
	fn update(&mut self, _progress: LiveProgress, _estimated_total_remaining_seconds: u32) {}
	fn end(&mut self, _success: bool) {}
}

/// Document written for status-bar widgets
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LiveStatusState {
	pub progress: LiveProgress,
	/// Unix seconds
	pub started_at: u64,
	/// Unix seconds
	pub expected_end: u64,
	/// Set once the activity ended
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub success: Option<bool>,
}

/// Writes the current activity to a JSON file. The last document written carries
/// the outcome. File IO happens on a writer thread.
pub struct FileLiveStatus {
	active: Option<LiveStatusState>,
	writer: Option<mpsc::Sender<LiveStatusState>>,
	handle: Option<JoinHandle<()>>,
}

impl FileLiveStatus {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		let path = path.into();
		let (tx, rx) = mpsc::channel();
		let handle = thread::Builder::new()
			.name("live-status".into())
			.spawn(move || run_writer(&path, rx));

		let (writer, handle) = match handle {
			Ok(handle) => (Some(tx), Some(handle)),
			Err(e) => {
				log::warn!("Failed to start live status writer: {}", e);
				(None, None)
			}
		};
		Self {
			active: None,
			writer,
			handle,
		}
	}

	#[cfg(test)]
	pub fn is_active(&self) -> bool {
		self.active.is_some()
	}

	fn publish(&self, state: &LiveStatusState) {
		let Some(writer) = &self.writer else {
			return;
		};
		if writer.send(state.clone()).is_err() {
			log::warn!("Live status writer stopped");
		}
	}
}

impl Drop for FileLiveStatus {
	fn drop(&mut self) {
		// Closing the channel lets the writer flush and exit
		self.writer.take();
		if let Some(handle) = self.handle.take() {
			if handle.join().is_err() {
				log::error!("Live status writer panicked");
			}
		}
	}
}

fn run_writer(path: &Path, rx: mpsc::Receiver<LiveStatusState>) {
	while let Ok(mut state) = rx.recv() {
		// Only the newest document matters
		while let Ok(newer) = rx.try_recv() {
			state = newer;
		}
		if let Err(e) = write_state(path, &state) {
			log::warn!("Live status update failed: {:#}", e);
		}
	}
}

fn write_state(path: &Path, state: &LiveStatusState) -> anyhow::Result<()> {
	if let Some(parent) = path.parent() {
		fs::create_dir_all(parent)
			.with_context(|| format!("Failed to create status dir: {}", parent.display()))?;
	}
	let json = serde_json::to_string_pretty(state).context("Failed to serialize live status")?;
	fs::write(path, json)
		.with_context(|| format!("Failed to write live status: {}", path.display()))?;
	Ok(())
}

impl LiveStatusPublisher for FileLiveStatus {
	fn start(&mut self, progress: LiveProgress, estimated_duration_seconds: u32) {
		let now = unix_now();
		let state = LiveStatusState {
			progress,
			started_at: now,
			expected_end: now + u64::from(estimated_duration_seconds),
			success: None,
		};
		log::debug!("Live status started, expected end in {}s", estimated_duration_seconds);
		self.publish(&state);
		self.active = Some(state);
	}

	fn update(&mut self, progress: LiveProgress, estimated_total_remaining_seconds: u32) {
		let Some(active) = self.active.as_mut() else {
			return;
		};
		active.progress = progress;
		active.expected_end = unix_now() + u64::from(estimated_total_remaining_seconds);
		let state = active.clone();
		self.publish(&state);
	}

	fn end(&mut self, success: bool) {
		let Some(mut state) = self.active.take() else {
			return;
		};
		log::debug!("Live status ended (success={})", success);
		state.expected_end = unix_now();
		state.success = Some(success);
		self.publish(&state);
	}
}

fn unix_now() -> u64 {
	SystemTime::now()
		.duration_since(UNIX_EPOCH)
		.map(|d| d.as_secs())
		.unwrap_or(0)
}

/// Pick the publisher once, at construction
pub fn select(enabled: bool, path: Option<PathBuf>) -> Box<dyn LiveStatusPublisher> {
	match (enabled, path) {
		(true, Some(path)) => {
			log::info!("Live status enabled at {}", path.display());
			Box::new(FileLiveStatus::new(path))
		}
		(true, None) => {
			log::info!("Live status unsupported: no data directory");
			Box::new(NullLiveStatus)
		}
		(false, _) => {
			log::info!("Live status disabled");
			Box::new(NullLiveStatus)
		}
	}
}
