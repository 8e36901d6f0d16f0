use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde::Deserialize;
use serde_json::Value;
use slog::{debug, error, warn, Logger};

use crate::backend::KeyValueStore;
use crate::errors::{PersistenceError, StoreError};
use crate::record::Record;

/// The key the whole collection is stored under.
pub const STORAGE_KEY: &str = "@matcha_logs";

/// The key corrupt stored data is copied to before it can be
/// overwritten.
pub const CORRUPT_KEY: &str = "@matcha_logs.corrupt";

/// Reads and writes the full collection of records as a single value.
#[derive(Clone)]
pub struct PersistenceAdapter {
    logger: Arc<Logger>,
    backend: Arc<dyn KeyValueStore>,
    /// Set when the stored value could neither be read nor backed up.
    read_only: Arc<AtomicBool>,
}

impl PersistenceAdapter {
    pub fn new(logger: Arc<Logger>, backend: Arc<dyn KeyValueStore>) -> Self {
        let logger = Arc::new(logger.new(slog::o!("key" => STORAGE_KEY)));

        Self {
            logger,
            backend,
            read_only: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Serializes the collection and overwrites the stored value.
    ///
    /// Fails with [`PersistenceError::ReadOnly`] after a [`load`] that
    /// couldn't read the stored value or couldn't back it up.
    ///
    /// [`load`]: PersistenceAdapter::load
    pub async fn save(&self, records: &[Record]) -> Result<(), PersistenceError> {
        if self.read_only.load(Ordering::SeqCst) {
            return Err(PersistenceError::ReadOnly);
        }

        let serialized =
            serde_json::to_string(records).map_err(|source| PersistenceError::Serialize { source })?;

        self.backend.set(STORAGE_KEY, serialized).await?;

        debug!(self.logger, "Saved records"; "count" => records.len());

        Ok(())
    }

    /// Loads the collection, distinguishing absent, corrupt and
    /// unreadable data. A single corrupt record makes the whole
    /// collection corrupt.
    pub async fn try_load(&self) -> Result<Option<Vec<Record>>, PersistenceError> {
        let raw = match self.backend.get(STORAGE_KEY).await? {
            None => return Ok(None),
            Some(raw) => raw,
        };

        let parsed = parse(&raw)?;

        match parsed.rejected.into_iter().next() {
            Some((_, source)) => Err(PersistenceError::Corrupt { source }),
            None => Ok(Some(parsed.records)),
        }
    }

    /// Loads the collection, never failing.
    ///
    /// Absent data loads as empty. Records that can't be read are
    /// skipped and copied to [`CORRUPT_KEY`]; a value that can't be read
    /// at all is copied there whole and loads as empty. If the value
    /// can't be read from the backend, or the backup fails, later saves
    /// are refused so they can't destroy it.
    pub async fn load(&self) -> Vec<Record> {
        let raw = match self.backend.get(STORAGE_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(self.logger, "No stored records");
                return vec![];
            }
            Err(StoreError::NotUtf8 { .. }) => {
                warn!(self.logger, "Stored records are not UTF-8, starting empty"; "backup_key" => CORRUPT_KEY);
                let copied = self.backend.copy(STORAGE_KEY, CORRUPT_KEY).await;
                self.check_backup(copied.map(|_| ()));
                return vec![];
            }
            Err(e) => {
                error!(self.logger, "Failed to read stored records, refusing to save over them"; "error" => format!("{:?}", e));
                self.read_only.store(true, Ordering::SeqCst);
                return vec![];
            }
        };

        let parsed = match parse(&raw) {
            Ok(parsed) => parsed,
            Err(e) => {
                warn!(self.logger, "Stored records are corrupt, starting empty"; "error" => format!("{:?}", e), "backup_key" => CORRUPT_KEY);
                let copied = self.backend.set(CORRUPT_KEY, raw).await;
                self.check_backup(copied);
                return vec![];
            }
        };

        if !parsed.rejected.is_empty() {
            let first = format!("{:?}", parsed.rejected[0].1);
            warn!(self.logger, "Skipping corrupt records"; "skipped" => parsed.rejected.len(), "error" => first, "backup_key" => CORRUPT_KEY);

            let rejected = parsed.rejected.into_iter().map(|(value, _)| value).collect();
            let copied = self.backend.set(CORRUPT_KEY, Value::Array(rejected).to_string()).await;
            self.check_backup(copied);
        }

        debug!(self.logger, "Loaded records"; "count" => parsed.records.len());

        parsed.records
    }

    fn check_backup(&self, result: Result<(), StoreError>) {
        if let Err(e) = result {
            error!(self.logger, "Failed to back up corrupt records, refusing to save over them"; "error" => format!("{:?}", e));
            self.read_only.store(true, Ordering::SeqCst);
        }
    }
}

/// A stored collection read one record at a time.
struct Parsed {
    records: Vec<Record>,
    rejected: Vec<(Value, serde_json::Error)>,
}

fn parse(raw: &str) -> Result<Parsed, PersistenceError> {
    let values: Vec<Value> =
        serde_json::from_str(raw).map_err(|source| PersistenceError::Corrupt { source })?;

    let mut parsed = Parsed {
        records: Vec::with_capacity(values.len()),
        rejected: vec![],
    };

    for value in values {
        let record = Record::deserialize(&value);

        match record {
            Ok(record) => parsed.records.push(record),
            Err(e) => parsed.rejected.push((value, e)),
        }
    }

    Ok(parsed)
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use proptest::collection::vec;
    use proptest::option;
    use proptest::prelude::*;
    use time::OffsetDateTime;

    use super::*;
    use crate::backend::{FileStore, MemoryStore};
    use crate::record::{Amount, Currency, Rating, RecordId, RecordInput};

    fn adapter() -> (Arc<MemoryStore>, PersistenceAdapter) {
        let backend = Arc::new(MemoryStore::new());
        let logger = Arc::new(log::discard());

        (backend.clone(), PersistenceAdapter::new(logger, backend))
    }

    fn runtime() -> tokio::runtime::Runtime {
        tokio::runtime::Builder::new_current_thread().build().unwrap()
    }

    #[tokio::test]
    async fn absent_storage_loads_as_empty() {
        let (_, adapter) = adapter();

        assert!(adapter.load().await.is_empty());
        assert!(adapter.try_load().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_storage_loads_as_empty_and_is_backed_up() {
        let (backend, adapter) = adapter();
        backend.insert(STORAGE_KEY, "{not json");

        assert!(matches!(
            adapter.try_load().await,
            Err(PersistenceError::Corrupt { .. })
        ));
        assert!(adapter.load().await.is_empty());
        assert_eq!(backend.peek(CORRUPT_KEY).as_deref(), Some("{not json"));
        assert_eq!(backend.peek(STORAGE_KEY).as_deref(), Some("{not json"));
    }

    #[tokio::test]
    async fn unreadable_records_are_skipped_and_backed_up() {
        let (backend, adapter) = adapter();
        backend.insert(
            STORAGE_KEY,
            r#"[{"id":"good","name":"Good","umami":3,"sweetness":3,"bitterness":3,"notes":[],"powderGrams":2,"createdAt":"2024-01-01T00:00:00.000Z"},{"id":"bad","name":"n","umami":9,"sweetness":3,"bitterness":3,"notes":[],"powderGrams":2,"createdAt":"2024-01-01T00:00:00.000Z"}]"#,
        );

        assert!(matches!(
            adapter.try_load().await,
            Err(PersistenceError::Corrupt { .. })
        ));

        let records = adapter.load().await;
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name(), "Good");

        let backup: Vec<Value> = serde_json::from_str(&backend.peek(CORRUPT_KEY).unwrap()).unwrap();
        assert_eq!(backup.len(), 1);
        assert_eq!(backup[0]["id"], "bad");
        assert_eq!(backup[0]["umami"], 9);
    }

    #[tokio::test]
    async fn records_written_by_the_mobile_app_load() {
        let (backend, adapter) = adapter();
        backend.insert(
            STORAGE_KEY,
            r#"[{"name":"Ceremonial","brand":"","umami":4,"sweetness":3,"bitterness":2,"notes":["grassy"],"powderGrams":2,"waterMl":70,"wouldRepurchase":false,"id":"0b7e5a52-4f0c-4a5e-9a57-1f0d7e0d9b11","createdAt":"2024-05-02T08:15:30.123Z"},{"name":"Daily","umami":3,"sweetness":3,"bitterness":3,"notes":[],"powderGrams":1.5,"waterMl":0,"quantityGrams":0,"id":"1","createdAt":"2024-05-01T07:00:00.000Z"}]"#,
        );

        let records = adapter.load().await;

        assert_eq!(records.len(), 2);
        let record = &records[0];
        assert_eq!(record.name(), "Ceremonial");
        assert_eq!(record.id().as_str(), "0b7e5a52-4f0c-4a5e-9a57-1f0d7e0d9b11");
        assert_eq!(record.fields().brand.as_deref(), Some(""));
        assert_eq!(record.fields().water_ml.map(Amount::value), Some(70.0));
        assert!(record.fields().drink_photos.is_empty());
        assert_eq!(record.created_at().millisecond(), 123);

        assert_eq!(records[1].name(), "Daily");
        assert_eq!(records[1].fields().water_ml, None);
        assert_eq!(records[1].fields().quantity_grams, None);
        assert!(backend.peek(CORRUPT_KEY).is_none());
    }

    #[tokio::test]
    async fn unreadable_storage_is_never_overwritten() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(dir.path());
        // a directory where the file should be can't be read as a value
        std::fs::create_dir_all(files.path_for(STORAGE_KEY)).unwrap();

        let adapter = PersistenceAdapter::new(Arc::new(log::discard()), Arc::new(files.clone()));

        assert!(adapter.load().await.is_empty());
        assert!(matches!(
            adapter.save(&[]).await,
            Err(PersistenceError::ReadOnly)
        ));
        assert!(files.path_for(STORAGE_KEY).is_dir());
    }

    #[tokio::test]
    async fn failed_backups_stop_later_saves() {
        let dir = tempfile::tempdir().unwrap();
        let files = FileStore::new(dir.path());
        std::fs::write(files.path_for(STORAGE_KEY), "{not json").unwrap();
        // the backup can't be renamed over a directory
        std::fs::create_dir_all(files.path_for(CORRUPT_KEY).join("occupied")).unwrap();

        let adapter = PersistenceAdapter::new(Arc::new(log::discard()), Arc::new(files.clone()));

        assert!(adapter.load().await.is_empty());
        assert!(adapter.save(&[]).await.is_err());
        assert_eq!(std::fs::read_to_string(files.path_for(STORAGE_KEY)).unwrap(), "{not json");
    }

    fn text() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9 ]{0,12}"
    }

    fn amount() -> impl Strategy<Value = Amount> {
        (1u32..100_000).prop_map(|n| Amount::try_from(f64::from(n) / 100.0).unwrap())
    }

    fn rating() -> impl Strategy<Value = Rating> {
        (1u8..=5).prop_map(|n| Rating::try_from(n).unwrap())
    }

    prop_compose! {
        fn record()(
            name in "[a-zA-Z]{1,12}",
            labels in (option::of(text()), option::of(text())),
            price in (
                option::of(0.0f64..10_000.0),
                option::of(prop_oneof![Just(Currency::Usd), Just(Currency::Jpy)]),
                option::of(amount()),
            ),
            ratings in (rating(), rating(), rating()),
            notes in vec(text(), 0..4),
            ratio in (amount(), option::of(amount()), option::of(amount())),
            photos in (option::of(text()), vec(text(), 0..=5)),
            would_repurchase in option::of(any::<bool>()),
            seconds in 0i64..2_000_000_000,
        ) -> Record {
            let fields = RecordInput {
                name,
                brand: labels.0,
                origin: labels.1,
                price_amount: price.0,
                price_currency: price.1,
                quantity_grams: price.2,
                umami: ratings.0,
                sweetness: ratings.1,
                bitterness: ratings.2,
                notes,
                powder_grams: ratio.0,
                water_ml: ratio.1,
                milk_ml: ratio.2,
                can_photo: photos.0,
                drink_photos: photos.1,
                would_repurchase,
            };
            let created_at = OffsetDateTime::from_unix_timestamp(seconds).unwrap();

            Record::new(RecordId::generate(), created_at, fields)
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 200, ..ProptestConfig::default()
        })]

        #[test]
        fn saved_collections_load_unchanged(records in vec(record(), 0..6)) {
            let (_, adapter) = adapter();

            let loaded = runtime().block_on(async {
                adapter.save(&records).await.unwrap();
                adapter.load().await
            });

            prop_assert_eq!(loaded, records);
        }
    }
}
