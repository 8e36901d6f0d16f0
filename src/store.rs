use std::sync::Arc;

use slog::{debug, error, o, trace, Logger};
use time::OffsetDateTime;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::persistence::PersistenceAdapter;
use crate::record::{Record, RecordId, RecordInput, RecordUpdate};

/// Messages sent to the background writer.
enum Message {
    /// Persist this snapshot of the whole collection.
    Save(Vec<Record>),

    /// Reply once every earlier snapshot has been handled.
    Flush(oneshot::Sender<()>),
}

/// The in-memory authority over the collection of records.
///
/// Every mutation updates memory first and then hands a snapshot to a
/// background writer, so callers never wait on storage. Only the most
/// recent queued snapshot is written.
pub struct RecordStore {
    logger: Arc<Logger>,
    records: Vec<Record>,
    sender: mpsc::UnboundedSender<Message>,
    writer: JoinHandle<()>,
}

impl RecordStore {
    /// Loads the collection once and starts the background writer.
    /// Must be called from within a Tokio runtime.
    pub async fn open(logger: Arc<Logger>, adapter: PersistenceAdapter) -> Self {
        let records = adapter.load().await;

        debug!(logger, "Opened record store"; "count" => records.len());

        let (sender, receiver) = mpsc::unbounded_channel();
        let writer = tokio::spawn(run_writer(
            Arc::new(logger.new(o!("task" => "writer"))),
            adapter,
            receiver,
        ));

        RecordStore {
            logger,
            records,
            sender,
            writer,
        }
    }

    /// Returns a snapshot of the collection, newest first.
    pub fn list(&self) -> Vec<Record> {
        self.records.clone()
    }

    /// Borrows the collection, newest first.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn get(&self, id: &RecordId) -> Option<&Record> {
        self.records.iter().find(|r| &r.id == id)
    }

    /// Creates a record from the given fields and puts it first.
    pub fn add(&mut self, fields: RecordInput) -> RecordId {
        let id = RecordId::generate();
        let record = Record::new(id.clone(), OffsetDateTime::now_utc(), fields);

        debug!(self.logger, "Adding record"; "id" => id.as_str());

        self.records.insert(0, record);
        self.persist();

        id
    }

    /// Merges the given fields over the record with the given ID.
    /// Returns `false`, changing nothing, if there is no such record.
    pub fn update(&mut self, id: &RecordId, update: RecordUpdate) -> bool {
        let record = match self.records.iter_mut().find(|r| &r.id == id) {
            Some(record) => record,
            None => {
                debug!(self.logger, "Ignoring update of non-existent record"; "id" => id.as_str());
                return false;
            }
        };

        debug!(self.logger, "Updating record"; "id" => id.as_str());

        record.apply(update);
        self.persist();

        true
    }

    /// Removes the record with the given ID. Returns `false`, changing
    /// nothing, if there is no such record.
    pub fn delete(&mut self, id: &RecordId) -> bool {
        let position = match self.records.iter().position(|r| &r.id == id) {
            Some(position) => position,
            None => {
                debug!(self.logger, "Ignoring deletion of non-existent record"; "id" => id.as_str());
                return false;
            }
        };

        debug!(self.logger, "Deleting record"; "id" => id.as_str());

        self.records.remove(position);
        self.persist();

        true
    }

    /// Waits until every write scheduled so far has been attempted.
    pub async fn flush(&self) {
        let (sender, receiver) = oneshot::channel();

        if self.sender.send(Message::Flush(sender)).is_err() {
            return;
        }

        // the writer only drops the sender without replying if it died
        let _ = receiver.await;
    }

    /// Flushes pending writes and stops the background writer.
    pub async fn close(self) {
        self.flush().await;

        let RecordStore {
            logger,
            sender,
            writer,
            ..
        } = self;

        drop(sender);

        if let Err(e) = writer.await {
            error!(logger, "Writer task failed"; "error" => format!("{:?}", e));
        }
    }

    fn persist(&self) {
        trace!(self.logger, "Scheduling save"; "count" => self.records.len());

        if self.sender.send(Message::Save(self.records.clone())).is_err() {
            error!(self.logger, "Writer task is gone, change will not be saved");
        }
    }
}

async fn run_writer(
    logger: Arc<Logger>,
    adapter: PersistenceAdapter,
    mut receiver: mpsc::UnboundedReceiver<Message>,
) {
    while let Some(message) = receiver.recv().await {
        let mut latest = match message {
            Message::Save(records) => records,
            Message::Flush(reply) => {
                let _ = reply.send(());
                continue;
            }
        };

        let mut waiting = None;

        // later snapshots supersede earlier ones, up to the next flush
        while let Ok(message) = receiver.try_recv() {
            match message {
                Message::Save(records) => {
                    trace!(logger, "Skipping superseded snapshot");
                    latest = records;
                }
                Message::Flush(reply) => {
                    waiting = Some(reply);
                    break;
                }
            }
        }

        if let Err(e) = adapter.save(&latest).await {
            error!(logger, "Failed to save records"; "error" => format!("{:?}", e), "count" => latest.len());
        }

        if let Some(reply) = waiting {
            let _ = reply.send(());
        }
    }

    debug!(logger, "Writer stopped");
}

#[cfg(test)]
mod tests {
    use std::convert::TryFrom;

    use super::*;
    use crate::backend::MemoryStore;
    use crate::persistence::STORAGE_KEY;
    use crate::record::{Amount, Rating};

    async fn open() -> (Arc<MemoryStore>, RecordStore) {
        let backend = Arc::new(MemoryStore::new());
        let logger = Arc::new(log::discard());
        let adapter = PersistenceAdapter::new(logger.clone(), backend.clone());

        (backend, RecordStore::open(logger, adapter).await)
    }

    fn input(name: &str) -> RecordInput {
        RecordInput::new(name, Amount::try_from(2.0).unwrap())
    }

    fn stored(backend: &MemoryStore) -> Vec<Record> {
        serde_json::from_str(&backend.peek(STORAGE_KEY).unwrap()).unwrap()
    }

    #[tokio::test]
    async fn new_records_come_first() {
        let (_, mut store) = open().await;

        let a = store.add(input("A"));
        let b = store.add(input("B"));

        let ids = store.list().into_iter().map(|r| r.id).collect::<Vec<_>>();
        assert_eq!(ids, vec![b, a]);
    }

    #[tokio::test]
    async fn added_records_get_fresh_ids_and_timestamps() {
        let (_, mut store) = open().await;
        let before = OffsetDateTime::now_utc();

        let mut fields = input("Ceremonial");
        fields.umami = Rating::try_from(4).unwrap();
        let first = store.add(fields);
        let second = store.add(input("Ceremonial"));

        assert_ne!(first, second);
        assert!(!first.as_str().is_empty());

        let record = store.get(&first).unwrap();
        assert_eq!(record.name(), "Ceremonial");
        assert_eq!(record.fields().umami.value(), 4);
        assert!(record.created_at() >= before);
        assert!(record.created_at() <= OffsetDateTime::now_utc());
    }

    #[tokio::test]
    async fn missing_ids_are_ignored() {
        let (backend, mut store) = open().await;
        store.add(input("A"));
        store.flush().await;
        let before = store.list();

        let missing = RecordId::from("missing");
        let update = RecordUpdate {
            name: Some("B".to_owned()),
            ..RecordUpdate::default()
        };

        assert!(!store.update(&missing, update));
        assert!(!store.delete(&missing));
        store.flush().await;

        assert_eq!(store.list(), before);
        assert_eq!(stored(&backend), before);
    }

    #[tokio::test]
    async fn mutations_reach_storage() {
        let (backend, mut store) = open().await;

        let a = store.add(input("A"));
        let b = store.add(input("B"));
        store.update(
            &a,
            RecordUpdate {
                origin: Some(Some("Uji".to_owned())),
                ..RecordUpdate::default()
            },
        );
        store.delete(&b);
        store.flush().await;

        let persisted = stored(&backend);
        assert_eq!(persisted, store.list());
        assert_eq!(persisted.len(), 1);
        assert_eq!(persisted[0].fields().origin.as_deref(), Some("Uji"));
    }

    #[tokio::test]
    async fn reopening_sees_closed_state() {
        let backend = Arc::new(MemoryStore::new());
        let logger = Arc::new(log::discard());

        let mut store =
            RecordStore::open(logger.clone(), PersistenceAdapter::new(logger.clone(), backend.clone())).await;
        store.add(input("A"));
        store.add(input("B"));
        let expected = store.list();
        store.close().await;

        let reopened = RecordStore::open(logger.clone(), PersistenceAdapter::new(logger, backend)).await;
        assert_eq!(reopened.list(), expected);
    }
}
