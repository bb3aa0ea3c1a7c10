//! Persistent key-value storage
//!
//! A small process-wide map saved as a versioned JSON record. Saving writes
//! a uniquely named sibling temp file and renames it over the target, so
//! readers never see a half-written file. Concurrent writers do not lock each
//! other; the last rename wins.
//!
//! Storage: ~/.local/share/glass/storage.json

use crate::parameter::SelectOption;
use crate::router::Router;
use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Current on-disk schema version
pub const STORAGE_VERSION: u32 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct StoredRecord {
    version: u32,
    #[serde(default)]
    data: BTreeMap<String, Value>,
}

/// Process-wide key-value map
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PersistentStorage {
    data: BTreeMap<String, Value>,
}

impl PersistentStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from a file; a missing file gives an empty store
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read storage file: {}", path.display()))?;
        let record: StoredRecord = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse storage file: {}", path.display()))?;

        if record.version > STORAGE_VERSION {
            bail!(
                "Storage file {} has version {}, newest supported is {}",
                path.display(),
                record.version,
                STORAGE_VERSION
            );
        }

        Ok(Self { data: record.data })
    }

    /// Save to a file via a uniquely named temp file renamed over the target
    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create storage directory: {}", parent.display()))?;

        let record = StoredRecord {
            version: STORAGE_VERSION,
            data: self.data.clone(),
        };

        let mut tmp = NamedTempFile::new_in(parent)
            .with_context(|| format!("Failed to create temp file in {}", parent.display()))?;
        serde_json::to_writer_pretty(&mut tmp, &record).context("Failed to serialize storage")?;
        tmp.flush()
            .with_context(|| format!("Failed to write storage file: {}", tmp.path().display()))?;
        tmp.persist(path)
            .map_err(|e| e.error)
            .with_context(|| format!("Failed to replace storage file: {}", path.display()))?;

        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: Value) {
        self.data.insert(key.to_string(), value);
    }

    /// Remove a key; absent keys are ignored
    pub fn delete(&mut self, key: &str) -> bool {
        self.data.remove(key).is_some()
    }

    /// All entries in key order
    pub fn entries(&self) -> &BTreeMap<String, Value> {
        &self.data
    }

    /// Record the current options of every refreshed selection slot of
    /// `router`. Slots no refresh hook owns keep their declared options and
    /// are never stored.
    pub fn remember_options(&mut self, router: &Router) -> Result<usize> {
        let mut saved = 0;

        for command in router.commands() {
            for slot in command.refreshed_slots() {
                let Some(param) = command.param_specs().get(slot) else {
                    continue;
                };
                let Some(selection) = param.as_selection() else {
                    continue;
                };
                let value = serde_json::to_value(selection.options().as_ref())
                    .context("Failed to serialize options")?;
                self.set(&options_key(router.name(), command.name(), param.name()), value);
                saved += 1;
            }
        }

        Ok(saved)
    }

    /// Put remembered option sets back into the refreshed slots of `router`.
    /// Entries that no longer fit the declaration are skipped.
    pub fn restore_options(&self, router: &Router) -> usize {
        let mut restored = 0;

        for command in router.commands() {
            for slot in command.refreshed_slots() {
                let Some(param) = command.param_specs().get(slot) else {
                    continue;
                };
                let Some(selection) = param.as_selection() else {
                    continue;
                };
                let key = options_key(router.name(), command.name(), param.name());
                let Some(value) = self.get(&key) else {
                    continue;
                };

                let applied = serde_json::from_value::<Vec<SelectOption>>(value.clone())
                    .map_err(anyhow::Error::from)
                    .and_then(|options| selection.set_options(options).map_err(anyhow::Error::from));

                match applied {
                    Ok(()) => restored += 1,
                    Err(e) => tracing::warn!(%key, error = %e, "ignoring stored options"),
                }
            }
        }

        restored
    }
}

/// Storage key of one refreshed slot, independent of its position
pub fn options_key(router: &str, command: &str, slot: &str) -> String {
    format!("options/{}/{}/{}", router, command, slot)
}
