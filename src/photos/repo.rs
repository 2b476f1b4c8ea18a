use std::collections::HashSet;
use std::sync::Arc;

use anyhow::Context;
use rand::Rng;
use time::OffsetDateTime;
use tracing::{debug, warn};

use super::repo_types::PhotoRecord;
use crate::clock::unix_millis;
use crate::storage::SlotStore;

const ID_ALPHABET: &[u8] = b"0123456789abcdefghijklmnopqrstuvwxyz";
const ID_SUFFIX_LEN: usize = 9;

/// The ordered photo collection kept in a single slot.
#[derive(Clone)]
pub struct PhotoLog {
    slots: Arc<dyn SlotStore>,
    key: String,
}

impl PhotoLog {
    pub fn new(slots: Arc<dyn SlotStore>, key: impl Into<String>) -> Self {
        Self {
            slots,
            key: key.into(),
        }
    }

    /// Persisted records in insertion order. Anything unreadable counts as empty.
    pub fn load_all(&self) -> Vec<PhotoRecord> {
        let raw = match self.slots.read(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Vec::new(),
            Err(e) => {
                warn!(error = %e, key = %self.key, "photo slot unreadable; treating as empty");
                return Vec::new();
            }
        };
        match serde_json::from_str::<Vec<PhotoRecord>>(&raw) {
            Ok(records) => records,
            Err(e) => {
                warn!(error = %e, key = %self.key, "photo slot malformed; treating as empty");
                Vec::new()
            }
        }
    }

    /// Full overwrite; callers read-modify-write.
    pub fn save_all(&self, records: &[PhotoRecord]) -> anyhow::Result<()> {
        let raw = serde_json::to_string(records).context("serialize photo records")?;
        self.slots
            .write(&self.key, &raw)
            .with_context(|| format!("write photo slot {}", self.key))?;
        debug!(count = records.len(), "photo log saved");
        Ok(())
    }

    pub fn clear(&self) -> anyhow::Result<()> {
        self.slots
            .remove(&self.key)
            .with_context(|| format!("clear photo slot {}", self.key))
    }
}

/// `<unix-millis>-<random base36>`. Collisions are unlikely, not impossible.
pub fn generate_id(now: OffsetDateTime) -> String {
    let mut rng = rand::thread_rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| ID_ALPHABET[rng.gen_range(0..ID_ALPHABET.len())] as char)
        .collect();
    format!("{}-{}", unix_millis(now), suffix)
}

/// Gives every record a non-empty id unique within the collection. The first
/// holder of a duplicated id keeps it.
pub fn normalize(records: Vec<PhotoRecord>, now: OffsetDateTime) -> Vec<PhotoRecord> {
    let mut taken: HashSet<String> = records
        .iter()
        .filter(|r| !r.id.is_empty())
        .map(|r| r.id.clone())
        .collect();
    let mut seen = HashSet::with_capacity(records.len());

    records
        .into_iter()
        .map(|mut r| {
            if r.id.is_empty() || !seen.insert(r.id.clone()) {
                let mut id = generate_id(now);
                while taken.contains(&id) {
                    id = generate_id(now);
                }
                debug!(old = %r.id, new = %id, "assigned photo id");
                taken.insert(id.clone());
                seen.insert(id.clone());
                r.id = id;
            }
            r
        })
        .collect()
}

#[cfg(test)]
mod repo_tests {
    use super::*;
    use crate::meal_type::MealType;
    use crate::storage::MemorySlots;
    use time::macros::{date, datetime};

    fn record(id: &str, ts: i64) -> PhotoRecord {
        PhotoRecord {
            id: id.into(),
            url: format!("https://img.local/{}.jpg", ts),
            meal: MealType::Lunch,
            date: date!(2024 - 12 - 10),
            timestamp: ts,
        }
    }

    fn log() -> (Arc<MemorySlots>, PhotoLog) {
        let slots = Arc::new(MemorySlots::new());
        let log = PhotoLog::new(slots.clone(), "mealImages");
        (slots, log)
    }

    #[test]
    fn load_all_is_empty_when_never_written() {
        let (_, log) = log();
        assert!(log.load_all().is_empty());
    }

    #[test]
    fn save_then_load_returns_same_records() {
        let (_, log) = log();
        let records = vec![record("a", 1), record("b", 2), record("c", 3)];
        log.save_all(&records).unwrap();
        assert_eq!(log.load_all(), records);
    }

    #[test]
    fn malformed_slot_loads_as_empty() {
        let (slots, log) = log();
        slots.write("mealImages", "{not json").unwrap();
        assert!(log.load_all().is_empty());
        slots.write("mealImages", r#"[{"url": 5}]"#).unwrap();
        assert!(log.load_all().is_empty());
    }

    #[test]
    fn legacy_records_without_id_load_with_empty_id() {
        let (slots, log) = log();
        slots
            .write(
                "mealImages",
                r#"[{"url":"https://x/1.jpg","meal":"dinner","date":"2024-12-10","timestamp":1733850000000}]"#,
            )
            .unwrap();
        let records = log.load_all();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "");
        assert_eq!(records[0].meal, MealType::Dinner);
    }

    #[test]
    fn clear_empties_the_log() {
        let (_, log) = log();
        log.save_all(&[record("a", 1)]).unwrap();
        log.clear().unwrap();
        assert!(log.load_all().is_empty());
    }

    #[test]
    fn normalize_fills_missing_and_duplicate_ids() {
        let now = datetime!(2024-12-10 12:00 UTC);
        let out = normalize(vec![record("", 1), record("a", 2), record("a", 3)], now);

        assert_eq!(out.len(), 3);
        assert!(!out[0].id.is_empty());
        assert!(out[0].id.starts_with(&unix_millis(now).to_string()));
        assert_eq!(out[1].id, "a");
        assert_ne!(out[2].id, "a");
        let ids: HashSet<_> = out.iter().map(|r| r.id.clone()).collect();
        assert_eq!(ids.len(), 3);
    }

    #[test]
    fn normalize_is_idempotent() {
        let now = datetime!(2024-12-10 12:00 UTC);
        let once = normalize(vec![record("", 1), record("b", 2)], now);
        let twice = normalize(once.clone(), now);
        assert_eq!(once, twice);
    }
}
