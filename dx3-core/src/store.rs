//! JSON persistence layer for the DX3 bot.
//!
//! State is split into five documents under one directory, each loaded
//! fully at startup and rewritten fully on every mutation:
//!
//! | File              | Contents                                         |
//! |-------------------|--------------------------------------------------|
//! | `characters.json` | server → user → name → [`CharacterRecord`]       |
//! | `active.json`     | server → user → active character name            |
//! | `combos.json`     | server → user → name → combo name → [`LocalCombo`] |
//! | `version.json`    | data version counter                             |
//! | `sheets.json`     | server → user → name → [`SheetLink`]             |
//!
//! Writes go to a sibling `.tmp` file that is then renamed over the
//! original, so a crash mid-write leaves the previous document intact.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::character::{CharacterRecord, LocalCombo};
use crate::error::{Dx3Error, Result};
use crate::types::{CharacterKey, ServerId, UserId};

type PerUser<T> = BTreeMap<ServerId, BTreeMap<UserId, T>>;
type PerCharacter<T> = PerUser<BTreeMap<String, T>>;

/// Link between a character and its spreadsheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SheetLink {
    /// Google spreadsheet id.
    pub spreadsheet_id: String,
    /// When the link was made.
    pub linked_at: DateTime<Utc>,
}

/// Data version counter, bumped by the owner after template changes.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VersionInfo {
    /// Monotonic version number.
    pub version: u32,
    /// When it was last bumped.
    pub updated_at: Option<DateTime<Utc>>,
}

// ---------------------------------------------------------------------------
// Document
// ---------------------------------------------------------------------------

/// One JSON file mirrored in memory.
#[derive(Debug)]
struct Document<T> {
    path: Option<PathBuf>,
    data: T,
}

impl<T: Serialize + DeserializeOwned + Default> Document<T> {
    fn load(path: PathBuf) -> Result<Self> {
        let data = match std::fs::read(&path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => T::default(),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| Dx3Error::Serialization(format!("{}: {e}", path.display())))?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => T::default(),
            Err(e) => return Err(e.into()),
        };
        Ok(Self {
            path: Some(path),
            data,
        })
    }

    fn in_memory() -> Self {
        Self {
            path: None,
            data: T::default(),
        }
    }

    fn save(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let start = Instant::now();
        let json = serde_json::to_vec_pretty(&self.data)
            .map_err(|e| Dx3Error::Serialization(e.to_string()))?;

        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        std::fs::write(&tmp, &json)?;
        std::fs::rename(&tmp, path)?;

        debug!(
            path = %path.display(),
            bytes = json.len(),
            elapsed_us = start.elapsed().as_micros(),
            "Saved document"
        );
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Store
// ---------------------------------------------------------------------------

/// Owner of all persisted bot state.
///
/// # Usage
///
/// ```no_run
/// # use dx3_core::store::Store;
/// # use dx3_core::types::{CharacterKey, ServerId, UserId};
/// let mut store = Store::open("data")?;
/// let key = CharacterKey::new(ServerId(1), UserId(2), "카미야");
/// store.update_character(&key, true, |c| c.hp = 28)?;
/// store.set_active(&key)?;
/// # Ok::<(), dx3_core::error::Dx3Error>(())
/// ```
#[derive(Debug)]
pub struct Store {
    characters: Document<PerCharacter<CharacterRecord>>,
    active: Document<PerUser<String>>,
    combos: Document<PerCharacter<BTreeMap<String, LocalCombo>>>,
    version: Document<VersionInfo>,
    sheets: Document<PerCharacter<SheetLink>>,
}

impl Store {
    /// Open (or create) the store under `dir`.
    ///
    /// # Errors
    /// Returns [`Dx3Error::Io`] if the directory cannot be created or a
    /// document cannot be read, and [`Dx3Error::Serialization`] if a
    /// document is not valid JSON.
    pub fn open<P: AsRef<Path>>(dir: P) -> Result<Self> {
        let dir = dir.as_ref();
        std::fs::create_dir_all(dir)?;

        let mut store = Self {
            characters: Document::load(dir.join("characters.json"))?,
            active: Document::load(dir.join("active.json"))?,
            combos: Document::load(dir.join("combos.json"))?,
            version: Document::load(dir.join("version.json"))?,
            sheets: Document::load(dir.join("sheets.json"))?,
        };
        for users in store.characters.data.values_mut() {
            for records in users.values_mut() {
                for record in records.values_mut() {
                    record.normalize();
                }
            }
        }

        info!(
            path = %dir.display(),
            characters = store.character_count(),
            version = store.version.data.version,
            "DX3 store opened"
        );
        Ok(store)
    }

    /// A store that never touches disk (useful for tests).
    #[must_use]
    pub fn in_memory() -> Self {
        Self {
            characters: Document::in_memory(),
            active: Document::in_memory(),
            combos: Document::in_memory(),
            version: Document::in_memory(),
            sheets: Document::in_memory(),
        }
    }

    // ------------------------------------------------------------------
    // Characters
    // ------------------------------------------------------------------

    /// Look up a record.
    #[must_use]
    pub fn character(&self, key: &CharacterKey) -> Option<&CharacterRecord> {
        self.characters
            .data
            .get(&key.server)?
            .get(&key.user)?
            .get(&key.name)
    }

    /// Names of a user's characters in a server.
    #[must_use]
    pub fn character_names(&self, server: ServerId, user: UserId) -> Vec<String> {
        self.characters
            .data
            .get(&server)
            .and_then(|u| u.get(&user))
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }

    /// Total number of records across all servers.
    #[must_use]
    pub fn character_count(&self) -> usize {
        self.characters
            .data
            .values()
            .flat_map(BTreeMap::values)
            .map(BTreeMap::len)
            .sum()
    }

    /// Mutate a record and flush. With `create`, a missing record is
    /// created first. If the flush fails the in-memory record is rolled
    /// back, so memory never holds a change the caller was told failed.
    ///
    /// # Errors
    /// Returns [`Dx3Error::CharacterNotFound`] if the record is missing
    /// and `create` is false, or an I/O error from the flush.
    pub fn update_character<F, R>(&mut self, key: &CharacterKey, create: bool, f: F) -> Result<R>
    where
        F: FnOnce(&mut CharacterRecord) -> R,
    {
        let previous = self.character(key).cloned();
        if previous.is_none() && !create {
            return Err(Dx3Error::CharacterNotFound(key.name.clone()));
        }
        let record = self
            .characters
            .data
            .entry(key.server)
            .or_default()
            .entry(key.user)
            .or_default()
            .entry(key.name.clone())
            .or_insert_with(|| CharacterRecord::new(key.name.clone()));
        let out = f(record);
        if let Err(e) = self.characters.save() {
            self.restore_character(key, previous);
            return Err(e);
        }
        Ok(out)
    }

    /// Insert or overwrite a record wholesale. Rolled back if the flush
    /// fails.
    ///
    /// # Errors
    /// Returns an I/O or serialization error from the flush.
    pub fn put_character(&mut self, key: &CharacterKey, mut record: CharacterRecord) -> Result<()> {
        record.normalize();
        let previous = insert_nested(&mut self.characters.data, key, record);
        if let Err(e) = self.characters.save() {
            self.restore_character(key, previous);
            return Err(e);
        }
        Ok(())
    }

    fn restore_character(&mut self, key: &CharacterKey, previous: Option<CharacterRecord>) {
        match previous {
            Some(record) => {
                insert_nested(&mut self.characters.data, key, record);
            }
            None => {
                remove_nested(&mut self.characters.data, key);
            }
        }
        warn!(character = %key, "Flush failed, change rolled back");
    }

    /// Delete a record along with its local combos, its sheet link and,
    /// if it was active, the active pointer.
    ///
    /// # Errors
    /// Returns [`Dx3Error::CharacterNotFound`] if there is no such record.
    pub fn delete_character(&mut self, key: &CharacterKey) -> Result<CharacterRecord> {
        let removed = remove_nested(&mut self.characters.data, key)
            .ok_or_else(|| Dx3Error::CharacterNotFound(key.name.clone()))?;
        self.characters.save()?;

        if remove_nested(&mut self.combos.data, key).is_some() {
            self.combos.save()?;
        }
        if remove_nested(&mut self.sheets.data, key).is_some() {
            self.sheets.save()?;
        }
        if self.active(key.server, key.user) == Some(key.name.as_str()) {
            self.clear_active(key.server, key.user)?;
        }

        info!(character = %key, "Character deleted");
        Ok(removed)
    }

    // ------------------------------------------------------------------
    // Active character
    // ------------------------------------------------------------------

    /// Name of the user's active character.
    #[must_use]
    pub fn active(&self, server: ServerId, user: UserId) -> Option<&str> {
        self.active
            .data
            .get(&server)
            .and_then(|u| u.get(&user))
            .map(String::as_str)
    }

    /// Key of the user's active character.
    ///
    /// # Errors
    /// Returns [`Dx3Error::NoActiveCharacter`] when none is set.
    pub fn active_key(&self, server: ServerId, user: UserId) -> Result<CharacterKey> {
        self.active(server, user)
            .map(|name| CharacterKey::new(server, user, name))
            .ok_or(Dx3Error::NoActiveCharacter)
    }

    /// Make `key` the user's active character, replacing any previous one.
    ///
    /// # Errors
    /// Returns [`Dx3Error::CharacterNotFound`] if the record does not exist.
    pub fn set_active(&mut self, key: &CharacterKey) -> Result<()> {
        if self.character(key).is_none() {
            return Err(Dx3Error::CharacterNotFound(key.name.clone()));
        }
        self.active
            .data
            .entry(key.server)
            .or_default()
            .insert(key.user, key.name.clone());
        self.active.save()
    }

    /// Clear the user's active character. Returns the previous name.
    ///
    /// # Errors
    /// Returns an I/O or serialization error from the flush.
    pub fn clear_active(&mut self, server: ServerId, user: UserId) -> Result<Option<String>> {
        let previous = self
            .active
            .data
            .get_mut(&server)
            .and_then(|u| u.remove(&user));
        if previous.is_some() {
            self.active.save()?;
        }
        Ok(previous)
    }

    // ------------------------------------------------------------------
    // Local combos
    // ------------------------------------------------------------------

    /// Register a combo. Returns `true` if it replaced a same-named one.
    ///
    /// # Errors
    /// Returns [`Dx3Error::CharacterNotFound`] if the record does not exist.
    pub fn put_combo(&mut self, key: &CharacterKey, combo: LocalCombo) -> Result<bool> {
        if self.character(key).is_none() {
            return Err(Dx3Error::CharacterNotFound(key.name.clone()));
        }
        let replaced = self
            .combos
            .data
            .entry(key.server)
            .or_default()
            .entry(key.user)
            .or_default()
            .entry(key.name.clone())
            .or_default()
            .insert(combo.name.clone(), combo)
            .is_some();
        self.combos.save()?;
        Ok(replaced)
    }

    /// Remove a combo.
    ///
    /// # Errors
    /// Returns [`Dx3Error::ComboNotFound`] if there is no such combo.
    pub fn remove_combo(&mut self, key: &CharacterKey, name: &str) -> Result<LocalCombo> {
        let removed = self
            .combos
            .data
            .get_mut(&key.server)
            .and_then(|u| u.get_mut(&key.user))
            .and_then(|c| c.get_mut(&key.name))
            .and_then(|m| m.remove(name))
            .ok_or_else(|| Dx3Error::ComboNotFound(name.to_string()))?;
        self.combos.save()?;
        Ok(removed)
    }

    /// Look up a combo.
    #[must_use]
    pub fn combo(&self, key: &CharacterKey, name: &str) -> Option<&LocalCombo> {
        nested(&self.combos.data, key)?.get(name)
    }

    /// All combos of a character, sorted by name.
    #[must_use]
    pub fn combos(&self, key: &CharacterKey) -> Vec<&LocalCombo> {
        nested(&self.combos.data, key)
            .map(|m| m.values().collect())
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // Sheet links
    // ------------------------------------------------------------------

    /// Link a character to a spreadsheet.
    ///
    /// # Errors
    /// Returns an I/O or serialization error from the flush.
    pub fn link_sheet(&mut self, key: &CharacterKey, spreadsheet_id: impl Into<String>) -> Result<()> {
        let link = SheetLink {
            spreadsheet_id: spreadsheet_id.into(),
            linked_at: Utc::now(),
        };
        self.sheets
            .data
            .entry(key.server)
            .or_default()
            .entry(key.user)
            .or_default()
            .insert(key.name.clone(), link);
        self.sheets.save()
    }

    /// The character's sheet link, if any.
    #[must_use]
    pub fn sheet_link(&self, key: &CharacterKey) -> Option<&SheetLink> {
        nested(&self.sheets.data, key)
    }

    // ------------------------------------------------------------------
    // Version & admin
    // ------------------------------------------------------------------

    /// Current data version.
    #[must_use]
    pub fn version(&self) -> u32 {
        self.version.data.version
    }

    /// Increment the data version.
    ///
    /// # Errors
    /// Returns an I/O or serialization error from the flush.
    pub fn bump_version(&mut self) -> Result<u32> {
        self.version.data.version += 1;
        self.version.data.updated_at = Some(Utc::now());
        self.version.save()?;
        Ok(self.version.data.version)
    }

    /// Drop every record, pointer, combo and link for a server. Returns
    /// the number of characters removed.
    ///
    /// # Errors
    /// Returns an I/O or serialization error from the flush.
    pub fn reset_server(&mut self, server: ServerId) -> Result<usize> {
        let removed = self
            .characters
            .data
            .remove(&server)
            .map(|u| u.values().map(BTreeMap::len).sum())
            .unwrap_or(0);
        self.active.data.remove(&server);
        self.combos.data.remove(&server);
        self.sheets.data.remove(&server);

        self.characters.save()?;
        self.active.save()?;
        self.combos.save()?;
        self.sheets.save()?;

        info!(server = %server, characters = removed, "Server data reset");
        Ok(removed)
    }
}

fn nested<'a, T>(table: &'a PerCharacter<T>, key: &CharacterKey) -> Option<&'a T> {
    table.get(&key.server)?.get(&key.user)?.get(&key.name)
}

fn insert_nested<T>(table: &mut PerCharacter<T>, key: &CharacterKey, value: T) -> Option<T> {
    table
        .entry(key.server)
        .or_default()
        .entry(key.user)
        .or_default()
        .insert(key.name.clone(), value)
}

/// Remove an entry, pruning server and user maps left empty.
fn remove_nested<T>(table: &mut PerCharacter<T>, key: &CharacterKey) -> Option<T> {
    let users = table.get_mut(&key.server)?;
    let names = users.get_mut(&key.user)?;
    let removed = names.remove(&key.name);
    if names.is_empty() {
        users.remove(&key.user);
    }
    if users.is_empty() {
        table.remove(&key.server);
    }
    removed
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::character::Lois;

    fn key(name: &str) -> CharacterKey {
        CharacterKey::new(ServerId(10), UserId(20), name)
    }

    fn combo(name: &str) -> LocalCombo {
        LocalCombo {
            name: name.into(),
            erosion_cost: 4,
            content: "백병 공격".into(),
        }
    }

    #[test]
    fn update_without_create_requires_record() {
        let mut store = Store::in_memory();
        let result = store.update_character(&key("A"), false, |c| c.hp = 1);
        assert!(matches!(result, Err(Dx3Error::CharacterNotFound(_))));
        store.update_character(&key("A"), true, |c| c.hp = 1).expect("create");
        assert_eq!(store.character(&key("A")).map(|c| c.hp), Some(1));
    }

    #[test]
    fn missing_record_leaves_no_empty_maps() {
        let mut store = Store::in_memory();
        assert!(store.update_character(&key("A"), false, |c| c.hp = 1).is_err());
        assert!(store.characters.data.is_empty());

        store.update_character(&key("A"), true, |_| ()).expect("create");
        store.delete_character(&key("A")).expect("delete");
        assert!(store.characters.data.is_empty());
    }

    #[test]
    fn failed_flush_rolls_back() {
        let dir = tempfile::tempdir().expect("tempdir");
        let root = dir.path().join("data");
        let mut store = Store::open(&root).expect("open");
        store.update_character(&key("A"), true, |c| c.hp = 20).expect("create");

        // A file where the directory was makes every write fail.
        std::fs::remove_dir_all(&root).expect("remove");
        std::fs::write(&root, b"").expect("block");

        assert!(store.update_character(&key("A"), false, |c| c.hp = 1).is_err());
        assert_eq!(store.character(&key("A")).map(|c| c.hp), Some(20));

        assert!(store.update_character(&key("B"), true, |c| c.hp = 5).is_err());
        assert!(store.character(&key("B")).is_none());

        assert!(store.put_character(&key("A"), CharacterRecord::new("A")).is_err());
        assert_eq!(store.character(&key("A")).map(|c| c.hp), Some(20));
    }

    #[test]
    fn set_active_requires_record() {
        let mut store = Store::in_memory();
        assert!(store.set_active(&key("A")).is_err());
        store.update_character(&key("A"), true, |_| ()).expect("create");
        store.set_active(&key("A")).expect("active");
        assert_eq!(store.active(ServerId(10), UserId(20)), Some("A"));
    }

    #[test]
    fn one_active_character_per_user() {
        let mut store = Store::in_memory();
        store.update_character(&key("A"), true, |_| ()).expect("create");
        store.update_character(&key("B"), true, |_| ()).expect("create");
        store.set_active(&key("A")).expect("active");
        store.set_active(&key("B")).expect("active");
        assert_eq!(store.active(ServerId(10), UserId(20)), Some("B"));
    }

    #[test]
    fn delete_cascades() {
        let mut store = Store::in_memory();
        store.update_character(&key("A"), true, |_| ()).expect("create");
        store.set_active(&key("A")).expect("active");
        store.put_combo(&key("A"), combo("일격")).expect("combo");
        store.link_sheet(&key("A"), "sheet-id").expect("link");

        store.delete_character(&key("A")).expect("delete");

        assert!(store.character(&key("A")).is_none());
        assert!(store.combos(&key("A")).is_empty());
        assert!(store.sheet_link(&key("A")).is_none());
        assert!(matches!(
            store.active_key(ServerId(10), UserId(20)),
            Err(Dx3Error::NoActiveCharacter)
        ));
    }

    #[test]
    fn delete_keeps_other_active_pointer() {
        let mut store = Store::in_memory();
        store.update_character(&key("A"), true, |_| ()).expect("create");
        store.update_character(&key("B"), true, |_| ()).expect("create");
        store.set_active(&key("B")).expect("active");
        store.delete_character(&key("A")).expect("delete");
        assert_eq!(store.active(ServerId(10), UserId(20)), Some("B"));
    }

    #[test]
    fn combos_replace_by_name() {
        let mut store = Store::in_memory();
        store.update_character(&key("A"), true, |_| ()).expect("create");
        assert!(!store.put_combo(&key("A"), combo("일격")).expect("put"));
        assert!(store.put_combo(&key("A"), combo("일격")).expect("put"));
        assert_eq!(store.combos(&key("A")).len(), 1);
        store.remove_combo(&key("A"), "일격").expect("remove");
        assert!(matches!(
            store.remove_combo(&key("A"), "일격"),
            Err(Dx3Error::ComboNotFound(_))
        ));
    }

    #[test]
    fn reset_server_only_touches_that_server() {
        let mut store = Store::in_memory();
        let other = CharacterKey::new(ServerId(11), UserId(20), "A");
        store.update_character(&key("A"), true, |_| ()).expect("create");
        store.update_character(&other, true, |_| ()).expect("create");
        assert_eq!(store.reset_server(ServerId(10)).expect("reset"), 1);
        assert!(store.character(&key("A")).is_none());
        assert!(store.character(&other).is_some());
    }

    #[test]
    fn documents_survive_reopen() {
        let dir = tempfile::tempdir().expect("tempdir");
        {
            let mut store = Store::open(dir.path()).expect("open");
            store
                .update_character(&key("A"), true, |c| {
                    c.set_erosion(105);
                    c.upsert_lois(Lois::new("B", "P", "N", ""));
                })
                .expect("create");
            store.set_active(&key("A")).expect("active");
            store.put_combo(&key("A"), combo("일격")).expect("combo");
            store.bump_version().expect("version");
        }
        let store = Store::open(dir.path()).expect("reopen");
        let record = store.character(&key("A")).expect("record");
        assert_eq!(record.erosion_rate(), 105);
        assert_eq!(record.erosion_d(), 3);
        assert_eq!(record.lois.len(), 1);
        assert_eq!(store.active(ServerId(10), UserId(20)), Some("A"));
        assert_eq!(store.combos(&key("A")).len(), 1);
        assert_eq!(store.version(), 1);
        assert!(!dir.path().join("characters.json.tmp").exists());
    }

    #[test]
    fn corrupt_document_is_serialization_error() {
        let dir = tempfile::tempdir().expect("tempdir");
        std::fs::write(dir.path().join("active.json"), "{not json").expect("write");
        assert!(matches!(
            Store::open(dir.path()),
            Err(Dx3Error::Serialization(_))
        ));
    }
}
