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

//! File-based settings provider.

use super::binding::{
    DictProvider, extract_settings, masked_flat_settings, schema_defaults_dict, snapshot_dict,
};
use super::error::SettingsError;
use super::mapper::TypeMapperRegistry;
use super::problem::{DefaultProblemReporter, Problem};
use super::store::{BackingStore, FileStore};
use super::traits::{SettingsProvider, SettingsType};
use figment::{
    Figment, Provider,
    providers::{Data, Toml},
};
use std::{
    env,
    path::{Path, PathBuf},
};
use tracing::{info, warn};

const DISPLAY_SETTINGS_ENV: &str = "SETTINGS_DISPLAY";

/// Settings provider that combines schema defaults, optional TOML
/// defaults, a flat properties file, and environment overrides.
pub struct FileSettingsProvider<P> {
    file_path: String,
    default_settings: Option<Data<Toml>>,
    env_provider: P,
    display_settings: bool,
    mappers: TypeMapperRegistry,
}

impl<P: Provider> FileSettingsProvider<P> {
    /// Create a new file settings provider.
    ///
    /// # Arguments
    /// * `file_path` - Path to the settings file
    /// * `env_provider` - Environment variable provider
    /// * `display_settings` - Whether to display the loaded settings
    /// * `default_settings` - Optional default TOML settings data
    pub fn new(
        file_path: String,
        env_provider: P,
        display_settings: bool,
        default_settings: Option<Data<Toml>>,
    ) -> Self {
        Self {
            file_path,
            env_provider,
            default_settings,
            display_settings,
            mappers: TypeMapperRegistry::new(),
        }
    }

    pub fn with_mappers(mut self, mappers: TypeMapperRegistry) -> Self {
        self.mappers = mappers;
        self
    }
}

impl<P: Provider + Clone> FileSettingsProvider<P> {
    /// Load the settings graph along with the problems collected while
    /// binding the file layer (unknown keys, rejected values).
    pub fn load_settings_with_problems<T: SettingsType>(
        &self,
    ) -> Result<(T, Vec<Problem>), SettingsError> {
        info!("Loading settings from path: '{}'...", self.file_path);

        let mut reporter = DefaultProblemReporter::new();
        let defaults = schema_defaults_dict::<T>(&self.mappers)?;
        let mut builder =
            Figment::new().merge(DictProvider::new("schema defaults", defaults));

        let has_default = self.default_settings.is_some();
        if let Some(default) = &self.default_settings {
            builder = builder.merge(default);
        } else {
            warn!("No default settings provided.");
        }

        // If the settings file exists, merge it into the layers
        if let Some(path) = locate_file(&self.file_path) {
            info!("Found settings file at path: '{}'.", path.display());
            let mut store = FileStore::new(path);
            store.load()?;
            let snapshot = store.snapshot()?;
            let stored = snapshot_dict::<T>(&snapshot, &self.mappers, &mut reporter);
            builder = builder.merge(DictProvider::new("settings file", stored));
        } else {
            warn!("Settings file not found at path: '{}'.", self.file_path);
            if has_default {
                info!("Using default settings, as no settings file was found.");
            }
        }

        // Merge environment variables into the settings
        builder = builder.merge(self.env_provider.clone());

        let settings = extract_settings::<T>(&builder, &mut reporter)?;
        info!("Settings loaded successfully.");

        let display_settings = env::var(DISPLAY_SETTINGS_ENV)
            .map(|val| val == "1" || val.to_lowercase() == "true")
            .unwrap_or(self.display_settings);
        if display_settings {
            for (key, value) in masked_flat_settings(&settings, &self.mappers)? {
                info!("Using setting: {key} = {value}");
            }
        }
        Ok((settings, reporter.into_problems()))
    }
}

impl<P: Provider + Clone> SettingsProvider for FileSettingsProvider<P> {
    fn load_settings<T: SettingsType>(&self) -> Result<T, SettingsError> {
        let (settings, _) = self.load_settings_with_problems()?;
        Ok(settings)
    }
}

fn locate_file<P: AsRef<Path>>(path: P) -> Option<PathBuf> {
    let path = path.as_ref();

    if path.is_absolute() {
        return path.is_file().then(|| path.to_path_buf());
    }

    let cwd = env::current_dir().ok()?;
    let mut current_dir = cwd.as_path();
    loop {
        let file_path = current_dir.join(path);
        if file_path.is_file() {
            return Some(file_path);
        }

        current_dir = current_dir.parent()?;
    }
}
