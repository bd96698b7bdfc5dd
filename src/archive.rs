//! Local chat archive.
//!
//! Saved transcripts live as one JSON list under a single key of a
//! [`Storage`] backend, most recent first. The backend is synchronous and
//! assumed to have a single writer.

use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

use time::OffsetDateTime;

use crate::error::{Error, Result};
use crate::types::{ChatMessage, SavedChat};
use crate::utils::time::unix_millis;

/// Storage key holding the serialized list of saved chats.
pub const ARCHIVE_KEY: &str = "pungde_chats";

/// A string key/value store.
pub trait Storage {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` under `key`, replacing any previous value.
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

/// In-memory storage, mostly useful for tests and ephemeral sessions.
#[derive(Debug, Default, Clone)]
pub struct MemoryStorage {
    entries: HashMap<String, String>,
}

impl MemoryStorage {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Storage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

/// Storage backed by a directory with one `<key>.json` file per key.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Opens (creating if needed) the storage directory.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|err| {
            Error::io(
                format!("failed to create storage directory {}", dir.display()),
                err,
            )
        })?;
        Ok(Self { dir })
    }

    /// The storage directory.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.json"))
    }
}

impl Storage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>> {
        match fs::read_to_string(self.path_for(key)) {
            Ok(contents) => Ok(Some(contents)),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(None),
            Err(err) => Err(Error::io(format!("failed to read {key}"), err)),
        }
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        let file =
            File::create(&tmp).map_err(|err| Error::io(format!("failed to create {key}"), err))?;
        let mut writer = BufWriter::new(file);
        writer
            .write_all(value.as_bytes())
            .and_then(|()| writer.flush())
            .map_err(|err| Error::io(format!("failed to write {key}"), err))?;
        drop(writer);
        fs::rename(&tmp, &path).map_err(|err| Error::io(format!("failed to replace {key}"), err))
    }
}

/// Saved transcripts over a [`Storage`] backend.
pub struct ChatArchive<S: Storage> {
    storage: S,
}

impl<S: Storage> ChatArchive<S> {
    /// Creates an archive over `storage`.
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Saves a transcript under `name` and returns the stored record.
    ///
    /// The new record goes to the front of the list. Its id is the save time
    /// in milliseconds, bumped past the newest existing id if needed.
    pub fn save(&mut self, name: impl Into<String>, messages: &[ChatMessage]) -> Result<SavedChat> {
        self.save_at(name, messages, OffsetDateTime::now_utc())
    }

    fn save_at(
        &mut self,
        name: impl Into<String>,
        messages: &[ChatMessage],
        saved_at: OffsetDateTime,
    ) -> Result<SavedChat> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(Error::validation(
                "a saved chat needs a name",
                Some("name".to_string()),
            ));
        }
        let mut chats = self.list()?;
        let newest = chats
            .iter()
            .filter_map(|chat| chat.id.parse::<i128>().ok())
            .max();
        let mut id = unix_millis(saved_at);
        if let Some(newest) = newest
            && id <= newest
        {
            id = newest + 1;
        }
        let chat = SavedChat {
            id: id.to_string(),
            name,
            messages: messages.to_vec(),
            saved_at,
        };
        chats.insert(0, chat.clone());
        self.write(&chats)?;
        tracing::debug!(id = %chat.id, messages = chat.messages.len(), "saved chat");
        Ok(chat)
    }

    /// Returns every saved chat, most recent first.
    pub fn list(&self) -> Result<Vec<SavedChat>> {
        match self.storage.get(ARCHIVE_KEY)? {
            Some(stored) => serde_json::from_str(&stored).map_err(|err| {
                Error::serialization("saved chats are corrupt", Some(Box::new(err)))
            }),
            None => Ok(Vec::new()),
        }
    }

    /// Returns the saved chat with `id`.
    pub fn get(&self, id: &str) -> Result<Option<SavedChat>> {
        Ok(self.list()?.into_iter().find(|chat| chat.id == id))
    }

    /// Removes the saved chat with `id`; returns false if there was none.
    pub fn delete(&mut self, id: &str) -> Result<bool> {
        let chats = self.list()?;
        let before = chats.len();
        let remaining: Vec<SavedChat> = chats.into_iter().filter(|chat| chat.id != id).collect();
        if remaining.len() == before {
            return Ok(false);
        }
        self.write(&remaining)?;
        tracing::debug!(id, "deleted chat");
        Ok(true)
    }

    /// The underlying storage.
    pub fn storage(&self) -> &S {
        &self.storage
    }

    fn write(&mut self, chats: &[SavedChat]) -> Result<()> {
        let serialized = serde_json::to_string(chats)?;
        self.storage.set(ARCHIVE_KEY, &serialized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    fn transcript() -> Vec<ChatMessage> {
        vec![
            ChatMessage::assistant("Namaste 👋 I am Pungda."),
            ChatMessage::user("My banana leaves are yellowing."),
            ChatMessage::assistant("That often points to **potassium** deficiency."),
        ]
    }

    #[test]
    fn empty_archive_lists_nothing() {
        let archive = ChatArchive::new(MemoryStorage::new());
        assert!(archive.list().unwrap().is_empty());
    }

    #[test]
    fn save_then_list_round_trips_messages() {
        let mut archive = ChatArchive::new(MemoryStorage::new());
        let saved = archive.save("Banana advisory", &transcript()).unwrap();

        let chats = archive.list().unwrap();
        assert_eq!(chats.len(), 1);
        assert_eq!(chats[0], saved);
        assert_eq!(chats[0].messages, transcript());
        assert_eq!(chats[0].name, "Banana advisory");
    }

    #[test]
    fn most_recent_first() {
        let mut archive = ChatArchive::new(MemoryStorage::new());
        archive
            .save_at("first", &[], datetime!(2025-01-01 00:00:00 UTC))
            .unwrap();
        archive
            .save_at("second", &[], datetime!(2025-01-02 00:00:00 UTC))
            .unwrap();
        let names: Vec<String> = archive
            .list()
            .unwrap()
            .into_iter()
            .map(|chat| chat.name)
            .collect();
        assert_eq!(names, vec!["second", "first"]);
    }

    #[test]
    fn ids_are_unique_within_one_millisecond() {
        let mut archive = ChatArchive::new(MemoryStorage::new());
        let at = datetime!(2025-01-01 00:00:00 UTC);
        let a = archive.save_at("a", &[], at).unwrap();
        let b = archive.save_at("b", &[], at).unwrap();
        let c = archive.save_at("c", &[], at).unwrap();
        assert_eq!(a.id, "1735689600000");
        assert_eq!(b.id, "1735689600001");
        assert_eq!(c.id, "1735689600002");
    }

    #[test]
    fn delete_removes_only_the_match() {
        let mut archive = ChatArchive::new(MemoryStorage::new());
        let at = datetime!(2025-01-01 00:00:00 UTC);
        let keep_a = archive.save_at("a", &transcript(), at).unwrap();
        let gone = archive.save_at("b", &[], at).unwrap();
        let keep_c = archive.save_at("c", &[], at).unwrap();

        assert!(archive.delete(&gone.id).unwrap());
        assert_eq!(archive.list().unwrap(), vec![keep_c, keep_a]);
        assert!(!archive.delete(&gone.id).unwrap());
        assert!(archive.get(&gone.id).unwrap().is_none());
    }

    #[test]
    fn blank_name_rejected() {
        let mut archive = ChatArchive::new(MemoryStorage::new());
        assert!(archive.save("  ", &transcript()).unwrap_err().is_validation());
        assert!(archive.list().unwrap().is_empty());
    }

    #[test]
    fn corrupt_archive_is_an_error() {
        let mut storage = MemoryStorage::new();
        storage.set(ARCHIVE_KEY, "{not a list").unwrap();
        let mut archive = ChatArchive::new(storage);
        assert!(matches!(archive.list(), Err(Error::Serialization { .. })));
        // Saving must not silently replace what could not be read.
        assert!(archive.save("x", &[]).is_err());
        assert_eq!(
            archive.storage().get(ARCHIVE_KEY).unwrap().as_deref(),
            Some("{not a list")
        );
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        let saved = {
            let mut archive = ChatArchive::new(FileStorage::open(dir.path()).unwrap());
            archive.save("Soil health", &transcript()).unwrap()
        };

        let archive = ChatArchive::new(FileStorage::open(dir.path()).unwrap());
        assert_eq!(archive.get(&saved.id).unwrap(), Some(saved));
        assert!(dir.path().join("pungde_chats.json").exists());
        assert!(!dir.path().join("pungde_chats.json.tmp").exists());
    }

    #[test]
    fn file_storage_missing_key() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::open(dir.path().join("nested")).unwrap();
        assert_eq!(storage.get("absent").unwrap(), None);
        assert!(storage.dir().ends_with("nested"));
    }
}
