//! Key-value preference storage.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use log::debug;
use serde_json::{Map, Value};

use super::error::PrefsError;

/// Extension-style key-value storage shared by agents and control surfaces.
pub trait PreferenceStore: Send + Sync {
    /// Values for the requested keys. Missing keys are simply absent.
    fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, PrefsError>;
    /// Merge `values` into the stored map.
    fn set(&self, values: Map<String, Value>) -> Result<(), PrefsError>;
}

fn select(all: &Map<String, Value>, keys: &[&str]) -> Map<String, Value> {
    keys.iter()
        .filter_map(|key| all.get(*key).map(|value| (key.to_string(), value.clone())))
        .collect()
}

/// Store kept in memory for the life of the process.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<Map<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_values(values: Map<String, Value>) -> Self {
        Self {
            values: Mutex::new(values),
        }
    }

    pub fn snapshot(&self) -> Map<String, Value> {
        self.values.lock().unwrap().clone()
    }
}

impl PreferenceStore for MemoryStore {
    fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, PrefsError> {
        Ok(select(&self.values.lock().unwrap(), keys))
    }

    fn set(&self, values: Map<String, Value>) -> Result<(), PrefsError> {
        self.values.lock().unwrap().extend(values);
        Ok(())
    }
}

/// Store backed by a JSON object on disk.
///
/// A missing file reads as an empty store and is created on the first write.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_all(&self) -> Result<Map<String, Value>, PrefsError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("no preferences at {}; using an empty store", self.path.display());
                return Ok(Map::new());
            }
            Err(err) => return Err(err.into()),
        };
        if raw.trim().is_empty() {
            return Ok(Map::new());
        }
        Ok(serde_json::from_str(&raw)?)
    }
}

impl PreferenceStore for JsonFileStore {
    fn get(&self, keys: &[&str]) -> Result<Map<String, Value>, PrefsError> {
        let _guard = self.lock.lock().unwrap();
        Ok(select(&self.read_all()?, keys))
    }

    fn set(&self, values: Map<String, Value>) -> Result<(), PrefsError> {
        let _guard = self.lock.lock().unwrap();
        let mut all = self.read_all()?;
        all.extend(values);
        let json = serde_json::to_string_pretty(&Value::Object(all))?;
        fs::write(&self.path, json)?;
        Ok(())
    }
}
