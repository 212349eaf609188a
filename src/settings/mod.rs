use crate::reactor::{ComponentResponse, Event, SessionEvent, SettingsEvent};
use crate::types::{DEFAULT_LEVEL_ID, DEFAULT_TARGET_SETS};
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::PathBuf;

pub const MIN_TARGET_SETS: u32 = 1;
pub const MAX_TARGET_SETS: u32 = 100;

/// Replaced by `targetSets`, kept for migrating older files
const LEGACY_TARGET_KEY: &str = "targetCycles";
const TARGET_KEY: &str = "targetSets";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Preferences {
	pub breath_level: u32,
	pub target_sets: u32,
	pub keep_awake: bool,
	pub live_status: bool,
}

impl Default for Preferences {
	fn default() -> Self {
		Self {
			breath_level: DEFAULT_LEVEL_ID,
			target_sets: DEFAULT_TARGET_SETS,
			keep_awake: true,
			live_status: true,
		}
	}
}

/// Move the deprecated `targetCycles` value to `targetSets`. Returns true if the table changed.
pub fn migrate(table: &mut toml::Table) -> bool {
	if !table.contains_key(LEGACY_TARGET_KEY) {
		return false;
	}
	if let Some(value) = table.remove(LEGACY_TARGET_KEY) {
		if table.contains_key(TARGET_KEY) {
			log::info!("Dropping {} superseded by {}", LEGACY_TARGET_KEY, TARGET_KEY);
		} else {
			log::info!("Migrating {}={} to {}", LEGACY_TARGET_KEY, value, TARGET_KEY);
			table.insert(TARGET_KEY.to_owned(), value);
		}
	}
	true
}

pub trait PreferencesStore {
	fn load(&mut self) -> anyhow::Result<Preferences>;
	fn save(&mut self, prefs: &Preferences) -> anyhow::Result<()>;
}

/// Preferences kept for the lifetime of the process only
#[derive(Debug, Default)]
pub struct MemoryStore {
	prefs: Preferences,
}

impl MemoryStore {
	#[cfg(test)]
	pub fn new(prefs: Preferences) -> Self {
		Self { prefs }
	}
}

impl PreferencesStore for MemoryStore {
	fn load(&mut self) -> anyhow::Result<Preferences> {
		Ok(self.prefs.clone())
	}

	fn save(&mut self, prefs: &Preferences) -> anyhow::Result<()> {
		self.prefs = prefs.clone();
		Ok(())
	}
}

/// Preferences persisted as a TOML file
pub struct TomlStore {
	path: PathBuf,
}

impl TomlStore {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	fn write(&self, content: &str) -> anyhow::Result<()> {
		if let Some(parent) = self.path.parent() {
			fs::create_dir_all(parent)
				.with_context(|| format!("Failed to create config dir: {}", parent.display()))?;
		}
		fs::write(&self.path, content)
			.with_context(|| format!("Failed to write preferences: {}", self.path.display()))
	}
}

impl PreferencesStore for TomlStore {
	fn load(&mut self) -> anyhow::Result<Preferences> {
		if !self.path.exists() {
			log::info!("No preferences at {}, using defaults", self.path.display());
			return Ok(Preferences::default());
		}

		let content = fs::read_to_string(&self.path)
			.with_context(|| format!("Failed to read preferences: {}", self.path.display()))?;
		parse_preferences(&content, |migrated| self.write(migrated))
			.with_context(|| format!("Invalid preferences in {}", self.path.display()))
	}

	fn save(&mut self, prefs: &Preferences) -> anyhow::Result<()> {
		let content = toml::to_string_pretty(prefs).context("Failed to serialize preferences")?;
		self.write(&content)
	}
}

/// Parse a preferences document, migrating legacy keys. A failed rewrite of the
/// migrated document is logged and the migrated values are still returned.
fn parse_preferences(
	content: &str,
	rewrite: impl FnOnce(&str) -> anyhow::Result<()>,
) -> anyhow::Result<Preferences> {
	let mut table: toml::Table = toml::from_str(content).context("Failed to parse preferences")?;

	if migrate(&mut table) {
		match toml::to_string(&table) {
			Ok(migrated) => {
				if let Err(e) = rewrite(&migrated) {
					log::warn!("Migrated preferences not saved, will retry next launch: {:#}", e);
				}
			}
			Err(e) => log::warn!("Failed to serialize migrated preferences: {}", e),
		}
	}

	let prefs: Preferences = toml::Value::Table(table).try_into()?;
	Ok(prefs)
}

/// Platform config/data locations
pub fn project_dirs() -> Option<directories::ProjectDirs> {
	directories::ProjectDirs::from("", "", "Pranayama")
}

pub fn preferences_path() -> Option<PathBuf> {
	project_dirs().map(|dirs| dirs.config_dir().join("preferences.toml"))
}

pub fn live_status_path() -> Option<PathBuf> {
	project_dirs().map(|dirs| dirs.data_dir().join("status.json"))
}

pub struct SettingsManager {
	prefs: Preferences,
	store: Box<dyn PreferencesStore>,
}

impl SettingsManager {
	pub fn new(mut store: Box<dyn PreferencesStore>) -> Self {
		let prefs = match store.load() {
			Ok(prefs) => prefs,
			Err(e) => {
				log::warn!("Failed to load preferences, using defaults: {:#}", e);
				Preferences::default()
			}
		};
		log::info!(
			"Preferences: level={}, sets={}, keep_awake={}, live_status={}",
			prefs.breath_level,
			prefs.target_sets,
			prefs.keep_awake,
			prefs.live_status
		);
		Self { prefs, store }
	}

	/// Event that applies the stored level and target to the session
	pub fn configure_event(&self) -> Event {
		Event::Session(SessionEvent::Configure {
			level_id: self.prefs.breath_level,
			target_sets: self.target_sets(),
		})
	}

	pub fn handle(&mut self, event: &Event) -> ComponentResponse {
		match event {
			Event::Settings(SettingsEvent::SetLevel { id }) => {
				if self.set_level(*id) {
					return ComponentResponse::emit(self.configure_event());
				}
				ComponentResponse::none()
			}
			Event::Settings(SettingsEvent::SetTargetSets { sets }) => {
				if self.set_target_sets(*sets) {
					return ComponentResponse::emit(self.configure_event());
				}
				ComponentResponse::none()
			}
			Event::Settings(SettingsEvent::AdjustTargetSets { delta }) => {
				let current = i64::from(self.target_sets());
				let next = (current + delta).clamp(
					i64::from(MIN_TARGET_SETS),
					i64::from(MAX_TARGET_SETS),
				);
				if self.set_target_sets(next as u32) {
					return ComponentResponse::emit(self.configure_event());
				}
				ComponentResponse::none()
			}
			Event::Settings(SettingsEvent::ToggleKeepAwake) => {
				let keep_awake = !self.prefs.keep_awake;
				self.set_keep_awake(keep_awake);
				ComponentResponse::none()
			}
			Event::Settings(SettingsEvent::SetLiveStatus { enabled }) => {
				if self.prefs.live_status != *enabled {
					self.prefs.live_status = *enabled;
					self.persist();
					log::info!("Live status set to {}, applies on next launch", enabled);
				}
				ComponentResponse::none()
			}
			_ => ComponentResponse::none(),
		}
	}

	fn persist(&mut self) {
		if let Err(e) = self.store.save(&self.prefs) {
			log::error!("Failed to save preferences: {:#}", e);
		}
	}

	pub fn set_level(&mut self, id: u32) -> bool {
		if self.prefs.breath_level == id {
			return false;
		}
		log::info!("Breathing level set to {}", id);
		self.prefs.breath_level = id;
		self.persist();
		true
	}

	pub fn set_target_sets(&mut self, sets: u32) -> bool {
		let sets = sets.clamp(MIN_TARGET_SETS, MAX_TARGET_SETS);
		if self.prefs.target_sets == sets {
			return false;
		}
		log::info!("Target sets set to {}", sets);
		self.prefs.target_sets = sets;
		self.persist();
		true
	}

	pub fn set_keep_awake(&mut self, keep_awake: bool) {
		if self.prefs.keep_awake == keep_awake {
			return;
		}
		log::info!("Keep screen awake: {}", keep_awake);
		self.prefs.keep_awake = keep_awake;
		self.persist();
	}

	// Accessors for the session and the command line
	pub fn level(&self) -> u32 {
		self.prefs.breath_level
	}

	pub fn target_sets(&self) -> u32 {
		self.prefs.target_sets.max(MIN_TARGET_SETS)
	}

	pub fn keep_awake(&self) -> bool {
		self.prefs.keep_awake
	}

	pub fn live_status(&self) -> bool {
		self.prefs.live_status
	}
}
