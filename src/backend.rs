use std::io;
use std::path::{Path, PathBuf};

use futures::future::{BoxFuture, FutureExt};
use tokio::fs;

use crate::errors::StoreError;

pub mod memory;

pub use self::memory::MemoryStore;

/// A durable home for string values under string keys.
pub trait KeyValueStore: Send + Sync {
    /// Reads the value under the given key, if any.
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>>;

    /// Writes the given value under the given key, replacing any
    /// previous value entirely.
    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>>;

    /// Copies the value under `from` to `to`. Backends that hold raw bytes
    /// copy them as-is, even when they aren't UTF-8. Returns `false` if
    /// `from` has no value.
    fn copy<'a>(&'a self, from: &'a str, to: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        async move {
            match self.get(from).await? {
                Some(value) => {
                    self.set(to, value).await?;
                    Ok::<_, StoreError>(true)
                }
                None => Ok(false),
            }
        }
        .boxed()
    }
}

/// A store that keeps each key in its own file inside a directory.
#[derive(Clone, Debug)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates a new instance. The directory is created on first write.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns the file that holds the given key.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(file_name_for(key))
    }
}

impl KeyValueStore for FileStore {
    fn get<'a>(&'a self, key: &'a str) -> BoxFuture<'a, Result<Option<String>, StoreError>> {
        read(self, key).boxed()
    }

    fn set<'a>(&'a self, key: &'a str, value: String) -> BoxFuture<'a, Result<(), StoreError>> {
        write(self, key, value.into_bytes()).boxed()
    }

    fn copy<'a>(&'a self, from: &'a str, to: &'a str) -> BoxFuture<'a, Result<bool, StoreError>> {
        duplicate(self, from, to).boxed()
    }
}

async fn read(store: &FileStore, key: &str) -> Result<Option<String>, StoreError> {
    match fs::read(store.path_for(key)).await {
        Ok(raw) => String::from_utf8(raw)
            .map(Some)
            .map_err(|_| StoreError::NotUtf8 { key: key.to_owned() }),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(source) => Err(StoreError::Io {
            key: key.to_owned(),
            source,
        }),
    }
}

async fn duplicate(store: &FileStore, from: &str, to: &str) -> Result<bool, StoreError> {
    match fs::read(store.path_for(from)).await {
        Ok(raw) => write(store, to, raw).await.map(|()| true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(source) => Err(StoreError::Io {
            key: from.to_owned(),
            source,
        }),
    }
}

async fn write(store: &FileStore, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
    let map_io = |source| StoreError::Io {
        key: key.to_owned(),
        source,
    };

    fs::create_dir_all(&store.dir).await.map_err(map_io)?;

    let path = store.path_for(key);
    let mut temporary = path.clone().into_os_string();
    temporary.push(".tmp");

    // rename is atomic on the same filesystem, so readers see either the
    // old value or the new one
    fs::write(&temporary, &value).await.map_err(map_io)?;
    fs::rename(&temporary, &path).await.map_err(map_io)?;

    Ok(())
}

/// Maps a key to a file name made only of portable characters.
///
/// ```
/// use journal::backend::file_name_for;
/// assert_eq!(file_name_for("@matcha_logs"), "_matcha_logs.json");
/// ```
pub fn file_name_for(key: &str) -> String {
    let stem: String = key
        .chars()
        .map(|c| match c {
            'a'..='z' | 'A'..='Z' | '0'..='9' | '.' | '_' | '-' => c,
            _ => '_',
        })
        .collect();

    format!("{}.json", stem)
}
