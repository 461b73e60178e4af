//! Persisted user preferences and per-session collapsed sets.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::mode::VisualizationPreference;
use super::visibility::CollapseState;

pub const SETTINGS_KEY: &str = "depgraph-view.settings";
const COLLAPSED_KEY_PREFIX: &str = "depgraph-view.collapsed.";

/// Failure reading or writing persisted state.
#[derive(Debug, Error)]
pub enum SettingsError {
	/// No `localStorage` (private browsing, sandboxed iframe, headless).
	#[error("storage is unavailable")]
	Unavailable,
	/// The store rejected an operation, e.g. over quota.
	#[error("storage {op} failed for key {key}: {message}")]
	Storage {
		/// `read`, `write` or `remove`.
		op: &'static str,
		/// Key operated on.
		key: String,
		/// Error text from the store.
		message: String,
	},
	/// A stored value is not valid JSON for its type.
	#[error("malformed value under {key}")]
	Malformed {
		/// Key holding the bad value.
		key: String,
		/// Parse error.
		#[source]
		source: serde_json::Error,
	},
	/// A value could not be serialized.
	#[error("failed to serialize value for {key}")]
	Serialize {
		/// Key that was being written.
		key: String,
		/// Serialization error.
		#[source]
		source: serde_json::Error,
	},
}

/// String key/value persistence. The browser implementation wraps
/// `localStorage`; tests use [`MemoryStore`].
pub trait KeyValueStore {
	/// Value under `key`, `None` if absent.
	fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;
	/// Store `value` under `key`, replacing any previous value.
	fn set(&self, key: &str, value: &str) -> Result<(), SettingsError>;
	/// Delete `key`. Missing keys are not an error.
	fn remove(&self, key: &str) -> Result<(), SettingsError>;
}

/// In-memory store for headless use.
#[derive(Debug, Default)]
pub struct MemoryStore {
	entries: RefCell<HashMap<String, String>>,
}

impl KeyValueStore for MemoryStore {
	fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
		Ok(self.entries.borrow().get(key).cloned())
	}

	fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
		self.entries.borrow_mut().insert(key.to_string(), value.to_string());
		Ok(())
	}

	fn remove(&self, key: &str) -> Result<(), SettingsError> {
		self.entries.borrow_mut().remove(key);
		Ok(())
	}
}

pub struct LocalStorageStore {
	storage: web_sys::Storage,
}

impl LocalStorageStore {
	pub fn open() -> Result<Self, SettingsError> {
		let storage = web_sys::window()
			.and_then(|w| w.local_storage().ok().flatten())
			.ok_or(SettingsError::Unavailable)?;
		Ok(Self { storage })
	}
}

fn storage_error(op: &'static str, key: &str, err: wasm_bindgen::JsValue) -> SettingsError {
	SettingsError::Storage {
		op,
		key: key.to_string(),
		message: format!("{err:?}"),
	}
}

impl KeyValueStore for LocalStorageStore {
	fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
		self.storage.get_item(key).map_err(|e| storage_error("read", key, e))
	}

	fn set(&self, key: &str, value: &str) -> Result<(), SettingsError> {
		self.storage
			.set_item(key, value)
			.map_err(|e| storage_error("write", key, e))
	}

	fn remove(&self, key: &str) -> Result<(), SettingsError> {
		self.storage
			.remove_item(key)
			.map_err(|e| storage_error("remove", key, e))
	}
}

/// Everything persisted under [`SETTINGS_KEY`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GraphSettings {
	#[serde(default)]
	pub visualization_mode: VisualizationPreference,
}

fn read_json<T: for<'de> Deserialize<'de>>(
	store: &dyn KeyValueStore,
	key: &str,
) -> Result<Option<T>, SettingsError> {
	let Some(raw) = store.get(key)? else {
		return Ok(None);
	};
	serde_json::from_str(&raw)
		.map(Some)
		.map_err(|source| SettingsError::Malformed {
			key: key.to_string(),
			source,
		})
}

fn write_json<T: Serialize>(store: &dyn KeyValueStore, key: &str, value: &T) -> Result<(), SettingsError> {
	let raw = serde_json::to_string(value).map_err(|source| SettingsError::Serialize {
		key: key.to_string(),
		source,
	})?;
	store.set(key, &raw)
}

pub fn load_settings(store: &dyn KeyValueStore) -> Result<GraphSettings, SettingsError> {
	Ok(read_json(store, SETTINGS_KEY)?.unwrap_or_default())
}

/// Like [`load_settings`], but logs failures and falls back to defaults.
pub fn load_settings_or_default(store: &dyn KeyValueStore) -> GraphSettings {
	load_settings(store).unwrap_or_else(|err| {
		log::warn!("depgraph-view: {err}; using default settings");
		GraphSettings::default()
	})
}

pub fn save_settings(store: &dyn KeyValueStore, settings: &GraphSettings) -> Result<(), SettingsError> {
	write_json(store, SETTINGS_KEY, settings)
}

pub fn collapsed_key(session: &str) -> String {
	format!("{COLLAPSED_KEY_PREFIX}{session}")
}

/// The collapsed set for `session`. No session means no persistence.
pub fn load_collapsed(
	store: &dyn KeyValueStore,
	session: Option<&str>,
) -> Result<CollapseState, SettingsError> {
	let Some(session) = session else {
		return Ok(CollapseState::default());
	};
	Ok(read_json(store, &collapsed_key(session))?.unwrap_or_default())
}

/// Persist `state` for `session`; an empty set removes the entry.
pub fn save_collapsed(
	store: &dyn KeyValueStore,
	session: Option<&str>,
	state: &CollapseState,
) -> Result<(), SettingsError> {
	let Some(session) = session else {
		return Ok(());
	};
	let key = collapsed_key(session);
	if state.is_empty() {
		store.remove(&key)
	} else {
		write_json(store, &key, state)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn settings_default_to_auto_and_round_trip() {
		let store = MemoryStore::default();
		assert_eq!(load_settings(&store).expect("empty store").visualization_mode, VisualizationPreference::Auto);

		let settings = GraphSettings {
			visualization_mode: VisualizationPreference::ForceRaster,
		};
		save_settings(&store, &settings).expect("saves");

		assert_eq!(
			store.get(SETTINGS_KEY).expect("reads").as_deref(),
			Some(r#"{"visualizationMode":"force-raster"}"#)
		);
		assert_eq!(load_settings(&store).expect("loads"), settings);
	}

	#[test]
	fn malformed_settings_fall_back_to_defaults() {
		let store = MemoryStore::default();
		store.set(SETTINGS_KEY, "{not json").expect("writes");

		assert!(matches!(load_settings(&store), Err(SettingsError::Malformed { .. })));
		assert_eq!(load_settings_or_default(&store), GraphSettings::default());
	}

	#[test]
	fn collapsed_sets_are_scoped_by_session() {
		let store = MemoryStore::default();
		let mut state = CollapseState::default();
		state.collapse("b");
		state.collapse("a");
		save_collapsed(&store, Some("s1"), &state).expect("saves");

		assert_eq!(
			store.get("depgraph-view.collapsed.s1").expect("reads").as_deref(),
			Some(r#"["a","b"]"#)
		);
		assert_eq!(load_collapsed(&store, Some("s1")).expect("loads"), state);
		assert!(load_collapsed(&store, Some("s2")).expect("loads").is_empty());
		assert!(load_collapsed(&store, None).expect("loads").is_empty());

		save_collapsed(&store, Some("s1"), &CollapseState::default()).expect("clears");
		assert_eq!(store.get("depgraph-view.collapsed.s1").expect("reads"), None);
	}
}
