use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Context;
use tracing::debug;

/// String-keyed persistent slots, the server-side stand-in for browser
/// local storage.
pub trait SlotStore: Send + Sync {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>>;
    fn write(&self, key: &str, value: &str) -> anyhow::Result<()>;
    /// Removing a slot that was never written is not an error.
    fn remove(&self, key: &str) -> anyhow::Result<()>;
}

/// One file per slot under `dir`.
#[derive(Debug, Clone)]
pub struct FileSlots {
    dir: PathBuf,
}

impl FileSlots {
    pub fn open(dir: impl AsRef<Path>) -> anyhow::Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("create slot dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> anyhow::Result<PathBuf> {
        anyhow::ensure!(is_valid_key(key), "invalid slot key {:?}", key);
        Ok(self.dir.join(format!("{}.json", key)))
    }
}

fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

impl SlotStore for FileSlots {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let path = self.path_for(key)?;
        match std::fs::read_to_string(&path) {
            Ok(s) => Ok(Some(s)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("read slot {}", path.display())),
        }
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        // write-then-rename keeps the previous value intact on a torn write
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value).with_context(|| format!("write {}", tmp.display()))?;
        std::fs::rename(&tmp, &path).with_context(|| format!("replace {}", path.display()))?;
        debug!(key, bytes = value.len(), "slot written");
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let path = self.path_for(key)?;
        match std::fs::remove_file(&path) {
            Ok(()) => {
                debug!(key, "slot removed");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e).with_context(|| format!("remove slot {}", path.display())),
        }
    }
}

/// In-memory slots for tests.
#[derive(Debug, Default)]
pub struct MemorySlots {
    slots: Mutex<HashMap<String, String>>,
}

impl MemorySlots {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SlotStore for MemorySlots {
    fn read(&self, key: &str) -> anyhow::Result<Option<String>> {
        let slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("slot map poisoned"))?;
        Ok(slots.get(key).cloned())
    }

    fn write(&self, key: &str, value: &str) -> anyhow::Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("slot map poisoned"))?;
        slots.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> anyhow::Result<()> {
        let mut slots = self
            .slots
            .lock()
            .map_err(|_| anyhow::anyhow!("slot map poisoned"))?;
        slots.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod storage_tests {
    use super::*;

    #[test]
    fn file_slots_roundtrip_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let slots = FileSlots::open(dir.path().join("slots")).unwrap();

        assert_eq!(slots.read("mealImages").unwrap(), None);
        slots.write("mealImages", "[1,2,3]").unwrap();
        assert_eq!(slots.read("mealImages").unwrap().as_deref(), Some("[1,2,3]"));

        slots.write("mealImages", "[]").unwrap();
        assert_eq!(slots.read("mealImages").unwrap().as_deref(), Some("[]"));

        slots.remove("mealImages").unwrap();
        assert_eq!(slots.read("mealImages").unwrap(), None);
        // absent slot
        slots.remove("mealImages").unwrap();
    }

    #[test]
    fn file_slots_reject_path_like_keys() {
        let dir = tempfile::tempdir().unwrap();
        let slots = FileSlots::open(dir.path()).unwrap();
        assert!(slots.write("../escape", "x").is_err());
        assert!(slots.read("").is_err());
        assert!(!dir.path().parent().unwrap().join("escape.json").exists());
    }

    #[test]
    fn memory_slots_behave_like_files() {
        let slots = MemorySlots::new();
        assert_eq!(slots.read("k").unwrap(), None);
        slots.write("k", "v").unwrap();
        assert_eq!(slots.read("k").unwrap().as_deref(), Some("v"));
        slots.remove("k").unwrap();
        slots.remove("k").unwrap();
        assert_eq!(slots.read("k").unwrap(), None);
    }
}
