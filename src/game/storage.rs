//! Character store: the in-memory map of handle -> [`Character`] and its JSON save file.
//!
//! In-process exclusivity comes from `&mut self`. Across processes every read takes a shared
//! `fs2` lock and every save an exclusive one on a sidecar `<file>.lock`, so the lock survives
//! the rename that replaces the primary file.
//!
//! Save sequence:
//! 1. copy the current primary to `<file>.bak`
//! 2. write `.<file>.tmp-<pid>-<n>` in the same directory and fsync it
//! 3. rename it over the primary
//! 4. fsync the directory (best-effort)

use fs2::FileExt;
use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::game::content::GameContent;
use crate::game::errors::{GameError, StorageError};
use crate::game::stats;
use crate::game::types::Character;

#[derive(Debug)]
pub struct CharacterStore {
    path: PathBuf,
    characters: BTreeMap<String, Character>,
}

fn sidecar(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

fn open_lock_file(path: &Path) -> std::io::Result<File> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        fs::create_dir_all(dir)?;
    }
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(sidecar(path, ".lock"))
}

/// Write and sync `bytes` into the new temp file at `path`; the file is removed if any step fails.
fn fill_temp(path: &Path, mut tmp: File, bytes: &[u8]) -> std::io::Result<()> {
    let written = tmp
        .write_all(bytes)
        .and_then(|_| tmp.flush())
        .and_then(|_| tmp.sync_all());
    if written.is_err() {
        drop(tmp);
        let _ = fs::remove_file(path);
    }
    written
}

fn read_locked(path: &Path) -> Result<BTreeMap<String, Character>, StorageError> {
    let lock = open_lock_file(path)?;
    lock.lock_shared()?;
    let contents = fs::read_to_string(path)?;
    drop(lock);
    if contents.trim().is_empty() {
        return Ok(BTreeMap::new());
    }
    Ok(serde_json::from_str(&contents)?)
}

impl CharacterStore {
    /// An empty store that will save to `path`. Nothing is read.
    pub fn empty<P: Into<PathBuf>>(path: P) -> Self {
        Self {
            path: path.into(),
            characters: BTreeMap::new(),
        }
    }

    /// Load `path`, settling each record against `content`.
    ///
    /// A missing file is a fresh world. An unreadable or corrupt file is logged and the store
    /// starts empty; the next save keeps the damaged file as `.bak`.
    pub fn open<P: Into<PathBuf>>(path: P, content: &GameContent) -> Self {
        let path = path.into();
        let mut characters = if path.exists() {
            match read_locked(&path) {
                Ok(map) => map,
                Err(e) => {
                    log::warn!(
                        "Failed to load characters from {}: {}; starting empty",
                        path.display(),
                        e
                    );
                    BTreeMap::new()
                }
            }
        } else {
            log::info!("{} does not exist yet; starting empty", path.display());
            BTreeMap::new()
        };
        for character in characters.values_mut() {
            stats::settle_loaded(character, content);
        }
        log::info!("Loaded {} characters from {}", characters.len(), path.display());
        Self { path, characters }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.characters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.characters.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.characters.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<&Character> {
        self.characters.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut Character> {
        self.characters.get_mut(id)
    }

    /// Insert a new record. An existing record is left untouched.
    pub fn create(&mut self, id: &str, character: Character) -> Result<&Character, GameError> {
        if self.characters.contains_key(id) {
            return Err(GameError::AlreadyExists(id.to_string()));
        }
        Ok(self.characters.entry(id.to_string()).or_insert(character))
    }

    /// Run `f` against one record.
    pub fn mutate<T>(
        &mut self,
        id: &str,
        f: impl FnOnce(&mut Character) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        let character = self
            .characters
            .get_mut(id)
            .ok_or_else(|| GameError::NotFound(id.to_string()))?;
        f(character)
    }

    /// Run `f` against two distinct records at once.
    pub fn mutate_pair<T>(
        &mut self,
        a: &str,
        b: &str,
        f: impl FnOnce(&mut Character, &mut Character) -> Result<T, GameError>,
    ) -> Result<T, GameError> {
        if a == b {
            return Err(GameError::InvalidTarget(a.to_string()));
        }
        let mut first = self
            .characters
            .remove(a)
            .ok_or_else(|| GameError::NotFound(a.to_string()))?;
        let Some(mut second) = self.characters.remove(b) else {
            self.characters.insert(a.to_string(), first);
            return Err(GameError::NotFound(b.to_string()));
        };
        let result = f(&mut first, &mut second);
        self.characters.insert(a.to_string(), first);
        self.characters.insert(b.to_string(), second);
        result
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Character)> {
        self.characters.iter()
    }

    /// The `n` best characters by level, then XP, both descending; ties by handle.
    pub fn leaderboard(&self, n: usize) -> Vec<(&str, &Character)> {
        let mut ranked: Vec<(&str, &Character)> = self
            .characters
            .iter()
            .map(|(id, c)| (id.as_str(), c))
            .collect();
        ranked.sort_by(|(ia, a), (ib, b)| {
            (b.level, b.xp).cmp(&(a.level, a.xp)).then_with(|| ia.cmp(ib))
        });
        ranked.truncate(n);
        ranked
    }

    /// Persist every record. The in-memory state is kept either way.
    pub fn save(&self) -> Result<(), StorageError> {
        let json = serde_json::to_string_pretty(&self.characters)?;
        let lock = open_lock_file(&self.path)?;
        lock.lock_exclusive()?;

        if self.path.exists() {
            fs::copy(&self.path, sidecar(&self.path, ".bak"))?;
        }

        let dir = self
            .path
            .parent()
            .filter(|d| !d.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        let base = self
            .path
            .file_name()
            .and_then(|s| s.to_str())
            .unwrap_or("characters.json");
        let mut counter = 0u32;
        let tmp_path = loop {
            let candidate = dir.join(format!(".{}.tmp-{}-{}", base, std::process::id(), counter));
            match OpenOptions::new().write(true).create_new(true).open(&candidate) {
                Ok(tmp) => {
                    fill_temp(&candidate, tmp, json.as_bytes())?;
                    break candidate;
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    counter = counter.saturating_add(1);
                }
                Err(e) => return Err(e.into()),
            }
        };

        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        if let Ok(dir_file) = File::open(dir) {
            let _ = dir_file.sync_all();
        }
        drop(lock);
        log::debug!("Saved {} characters to {}", self.characters.len(), self.path.display());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn create_twice_keeps_first_record() {
        let mut store = CharacterStore::empty("unused.json");
        store.create("alice", Character::new(10, 30)).unwrap();
        let err = store.create("alice", Character::new(999, 30)).unwrap_err();
        assert!(matches!(err, GameError::AlreadyExists(_)));
        assert_eq!(store.get("alice").unwrap().gold, 10);
    }

    #[test]
    fn mutate_pair_rejects_self_and_restores_on_missing() {
        let mut store = CharacterStore::empty("unused.json");
        store.create("alice", Character::new(10, 30)).unwrap();
        assert!(matches!(
            store.mutate_pair("alice", "alice", |_, _| Ok(())),
            Err(GameError::InvalidTarget(_))
        ));
        assert!(matches!(
            store.mutate_pair("alice", "ghost", |_, _| Ok(())),
            Err(GameError::NotFound(id)) if id == "ghost"
        ));
        assert!(store.contains("alice"));
    }

    #[test]
    fn save_writes_backup_and_leaves_no_temp_files() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("characters.json");
        let content = GameContent::builtin();

        let mut store = CharacterStore::open(&path, &content);
        store.create("alice", Character::new(5, 30)).unwrap();
        store.save().unwrap();
        assert!(!tmp.path().join("characters.json.bak").exists());

        store.mutate("alice", |c| {
            c.gold = 7;
            Ok(())
        })
        .unwrap();
        store.save().unwrap();

        let bak: BTreeMap<String, Character> =
            serde_json::from_str(&fs::read_to_string(tmp.path().join("characters.json.bak")).unwrap()).unwrap();
        assert_eq!(bak["alice"].gold, 5);
        let reloaded = CharacterStore::open(&path, &content);
        assert_eq!(reloaded.get("alice").unwrap().gold, 7);

        let leftovers: Vec<_> = fs::read_dir(tmp.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp-"))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn failed_temp_write_removes_the_partial_file() {
        let tmp = tempdir().unwrap();
        let partial = tmp.path().join(".characters.json.tmp-1-0");
        fs::write(&partial, "{").unwrap();
        // a read-only handle refuses the write
        let handle = File::open(&partial).unwrap();
        assert!(fill_temp(&partial, handle, b"{}").is_err());
        assert!(!partial.exists());
    }

    #[test]
    fn corrupt_file_degrades_to_empty() {
        let tmp = tempdir().unwrap();
        let path = tmp.path().join("characters.json");
        fs::write(&path, "{ this is not json").unwrap();
        let store = CharacterStore::open(&path, &GameContent::builtin());
        assert!(store.is_empty());
    }

    #[test]
    fn leaderboard_orders_by_level_then_xp() {
        let mut store = CharacterStore::empty("unused.json");
        for (id, level, xp) in [("a", 2, 10), ("b", 3, 0), ("c", 2, 50), ("d", 1, 99)] {
            let mut c = Character::new(0, 30);
            c.level = level;
            c.xp = xp;
            store.create(id, c).unwrap();
        }
        let ids: Vec<&str> = store.leaderboard(3).into_iter().map(|(id, _)| id).collect();
        assert_eq!(ids, vec!["b", "c", "a"]);
    }
}
