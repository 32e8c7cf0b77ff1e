/*
 * Licensed to the Apache Software Foundation (ASF) under one
 * or more contributor license agreements.  See the NOTICE file
 * distributed with this work for additional information
 * regarding copyright ownership.  The ASF licenses this file
 * to you under the Apache License, Version 2.0 (the
 * "License"); you may not use this file except in compliance
 * with the License.  You may obtain a copy of the License at
 *
 *   http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing,
 * software distributed under the License is distributed on an
 * "AS IS" BASIS, WITHOUT WARRANTIES OR CONDITIONS OF ANY
 * KIND, either express or implied.  See the License for the
 * specific language governing permissions and limitations
 * under the License.
 */

//! Backing stores hold the flat key/value form of a settings tree.

use super::error::SettingsError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A persistence medium for flat string-keyed settings data.
///
/// Entries are only accessible after `load`; accessing them earlier is a
/// `NotLoaded` error. `clear` resets to an empty, loaded property set so
/// a full rewrite does not require a prior load.
pub trait BackingStore {
    /// Load the properties into memory.
    fn load(&mut self) -> Result<(), SettingsError>;

    /// Persist the properties to the underlying medium.
    fn store(&mut self) -> Result<(), SettingsError>;

    /// Delete the underlying properties; the store must be loaded again
    /// before further access.
    fn delete(&mut self) -> Result<(), SettingsError>;

    fn keys(&self) -> Result<Vec<String>, SettingsError>;

    fn get(&self, key: &str) -> Result<Option<String>, SettingsError>;

    fn set(&mut self, key: &str, value: String) -> Result<(), SettingsError>;

    fn remove(&mut self, key: &str) -> Result<(), SettingsError>;

    fn clear(&mut self) -> Result<(), SettingsError>;

    /// Returns a copy of the loaded properties.
    fn snapshot(&self) -> Result<BTreeMap<String, String>, SettingsError>;
}

/// File-backed store using a flat `key = value` line format with `#` and
/// `!` comments. No escape sequences; keys and values are trimmed.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    properties: Option<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            properties: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn properties(&self) -> Result<&BTreeMap<String, String>, SettingsError> {
        self.properties.as_ref().ok_or(SettingsError::NotLoaded)
    }

    fn properties_mut(&mut self) -> Result<&mut BTreeMap<String, String>, SettingsError> {
        self.properties.as_mut().ok_or(SettingsError::NotLoaded)
    }

    fn parse(content: &str, path: &Path) -> BTreeMap<String, String> {
        let mut properties = BTreeMap::new();
        for (number, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
                continue;
            }
            match line.split_once('=') {
                Some((key, value)) => {
                    properties.insert(key.trim().to_string(), value.trim().to_string());
                }
                None => warn!(
                    "Ignoring malformed line {} in settings file: '{}'.",
                    number + 1,
                    path.display()
                ),
            }
        }
        properties
    }
}

impl BackingStore for FileStore {
    fn load(&mut self) -> Result<(), SettingsError> {
        if !self.path.is_file() {
            info!(
                "Settings file not found at path: '{}', starting empty.",
                self.path.display()
            );
            self.properties = Some(BTreeMap::new());
            return Ok(());
        }

        let content = std::fs::read_to_string(&self.path)
            .map_err(|_| SettingsError::CannotReadFile(self.path.display().to_string()))?;
        self.properties = Some(Self::parse(&content, &self.path));
        Ok(())
    }

    fn store(&mut self) -> Result<(), SettingsError> {
        let properties = self.properties()?;
        let mut content = String::new();
        for (key, value) in properties {
            content.push_str(key);
            content.push_str(" = ");
            content.push_str(value);
            content.push('\n');
        }

        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)
                .map_err(|_| SettingsError::CannotWriteFile(self.path.display().to_string()))?;
        }
        std::fs::write(&self.path, content)
            .map_err(|_| SettingsError::CannotWriteFile(self.path.display().to_string()))
    }

    fn delete(&mut self) -> Result<(), SettingsError> {
        if self.path.is_file() {
            std::fs::remove_file(&self.path)
                .map_err(|_| SettingsError::CannotDeleteFile(self.path.display().to_string()))?;
        }
        self.properties = None;
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, SettingsError> {
        Ok(self.properties()?.keys().cloned().collect())
    }

    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.properties()?.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), SettingsError> {
        self.properties_mut()?.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        self.properties_mut()?.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SettingsError> {
        self.properties = Some(BTreeMap::new());
        Ok(())
    }

    fn snapshot(&self) -> Result<BTreeMap<String, String>, SettingsError> {
        Ok(self.properties()?.clone())
    }
}

/// In-memory store, standing in for transient preference stores and used
/// heavily by tests. Always loaded; `store` is a no-op.
#[derive(Debug, Default)]
pub struct MemoryStore {
    properties: BTreeMap<String, String>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_properties(properties: BTreeMap<String, String>) -> Self {
        Self { properties }
    }
}

impl BackingStore for MemoryStore {
    fn load(&mut self) -> Result<(), SettingsError> {
        Ok(())
    }

    fn store(&mut self) -> Result<(), SettingsError> {
        Ok(())
    }

    fn delete(&mut self) -> Result<(), SettingsError> {
        self.properties.clear();
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, SettingsError> {
        Ok(self.properties.keys().cloned().collect())
    }

    fn get(&self, key: &str) -> Result<Option<String>, SettingsError> {
        Ok(self.properties.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), SettingsError> {
        self.properties.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), SettingsError> {
        self.properties.remove(key);
        Ok(())
    }

    fn clear(&mut self) -> Result<(), SettingsError> {
        self.properties.clear();
        Ok(())
    }

    fn snapshot(&self) -> Result<BTreeMap<String, String>, SettingsError> {
        Ok(self.properties.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_store_requires_load_before_access() {
        let store = FileStore::new("/tmp/unused-settings-file");
        assert_eq!(store.keys().unwrap_err(), SettingsError::NotLoaded);
        assert_eq!(store.get("any").unwrap_err(), SettingsError::NotLoaded);
    }

    #[test]
    fn file_store_loads_missing_file_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = FileStore::new(dir.path().join("missing.properties"));
        store.load().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }

    #[test]
    fn file_store_round_trips_properties() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");

        let mut store = FileStore::new(&path);
        store.load().unwrap();
        store.set("http.port", "8080".to_string()).unwrap();
        store.set("http.enabled", "true".to_string()).unwrap();
        store.store().unwrap();

        let mut reloaded = FileStore::new(&path);
        reloaded.load().unwrap();
        assert_eq!(
            reloaded.get("http.port").unwrap(),
            Some("8080".to_string())
        );
        assert_eq!(
            reloaded.get("http.enabled").unwrap(),
            Some("true".to_string())
        );
    }

    #[test]
    fn file_store_skips_comments_and_malformed_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");
        std::fs::write(
            &path,
            "# comment\n! also a comment\n\nhttp.port = 8080\nbroken line\n",
        )
        .unwrap();

        let mut store = FileStore::new(&path);
        store.load().unwrap();
        assert_eq!(store.keys().unwrap(), vec!["http.port".to_string()]);
    }

    #[test]
    fn file_store_delete_removes_file_and_unloads() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.properties");

        let mut store = FileStore::new(&path);
        store.load().unwrap();
        store.set("a", "1".to_string()).unwrap();
        store.store().unwrap();
        assert!(path.is_file());

        store.delete().unwrap();
        assert!(!path.is_file());
        assert_eq!(store.keys().unwrap_err(), SettingsError::NotLoaded);
    }

    #[test]
    fn memory_store_is_always_loaded() {
        let mut store = MemoryStore::new();
        store.set("a", "1".to_string()).unwrap();
        assert_eq!(store.get("a").unwrap(), Some("1".to_string()));

        store.delete().unwrap();
        assert!(store.keys().unwrap().is_empty());
    }
}
