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

//! The binding engine: drives the property schema against a backing
//! store in both directions, and the `SettingsStore` facade wiring a
//! store, a mapper registry and environment overrides together.

use super::env_provider::{EnvOverrideProvider, SECRET_MASK};
use super::error::SettingsError;
use super::mapper::{TypeMapper, TypeMapperRegistry};
use super::parsing::{convert_lists_in_dict, insert_at_path};
use super::problem::{DefaultProblemReporter, Problem, ProblemReporter};
use super::schema::{self, Children, PropertyInfo, PropertyKind, SettingsSchema};
use super::store::{BackingStore, FileStore, MemoryStore};
use super::traits::SettingsType;
use figment::{
    Figment, Metadata, Profile, Provider,
    value::{Dict, Map as FigmentMap, Value as FigmentValue},
};
use serde::Deserialize;
use serde_json::Value as JsonValue;
use std::collections::{BTreeMap, HashSet};
use std::marker::PhantomData;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, warn};

type ProfileMap = FigmentMap<Profile, Dict>;

/// Figment provider over a prebuilt dict (defaults layer, store layer).
#[derive(Debug, Clone)]
pub(crate) struct DictProvider {
    name: &'static str,
    dict: Dict,
}

impl DictProvider {
    pub(crate) fn new(name: &'static str, dict: Dict) -> Self {
        Self { name, dict }
    }
}

impl Provider for DictProvider {
    fn metadata(&self) -> Metadata {
        Metadata::named(self.name)
    }

    fn data(&self) -> Result<ProfileMap, figment::Error> {
        let mut data = ProfileMap::new();
        data.insert(Profile::default(), self.dict.clone());
        Ok(data)
    }
}

fn json_to_figment(value: JsonValue) -> Result<FigmentValue, SettingsError> {
    <FigmentValue as Deserialize>::deserialize(value)
        .map_err(|e| SettingsError::MappingFailed(e.to_string()))
}

/// Build the lowest-priority layer from schema-declared defaults, each
/// parsed through its property's mapper.
pub(crate) fn schema_defaults_dict<T: SettingsSchema>(
    mappers: &TypeMapperRegistry,
) -> Result<Dict, SettingsError> {
    let mut dict = Dict::new();
    for leaf in schema::flatten_leaves(T::properties()) {
        let Some(default) = leaf.info.default else {
            continue;
        };
        let mapper = mappers.for_property(leaf.info.mapper)?;
        let parsed = mapper
            .parse(default)
            .and_then(json_to_figment)
            .map_err(|e| SettingsError::InvalidValue {
                key: leaf.key_path.clone(),
                reason: format!("invalid default: {e}"),
            })?;
        insert_at_path(&mut dict, &leaf.field_path, parsed);
    }
    Ok(dict)
}

/// Translate a store snapshot into a nested dict keyed by serde field
/// names. Unknown keys become warning problems with suggestions; values
/// the mapper rejects become error problems.
pub(crate) fn snapshot_dict<T: SettingsSchema>(
    snapshot: &BTreeMap<String, String>,
    mappers: &TypeMapperRegistry,
    reporter: &mut dyn ProblemReporter,
) -> Dict {
    let known_paths: Vec<String> = schema::flatten_leaves(T::properties())
        .into_iter()
        .map(|leaf| leaf.key_path)
        .collect();
    let known_refs: HashSet<&str> = known_paths.iter().map(|s| s.as_str()).collect();

    let mut dict = Dict::new();
    for (key, raw) in snapshot {
        let Some(resolved) = schema::resolve_key(T::properties(), key) else {
            let suggestions = schema::similar_keys(key, &known_refs);
            let hint = if suggestions.is_empty() {
                String::new()
            } else {
                format!(" Similar keys: {}", suggestions.join(", "))
            };
            warn!("Unknown settings key '{}' will be ignored.{}", key, hint);
            reporter.report(Problem::warning(key.clone(), format!("unknown key{hint}")));
            continue;
        };

        let value = mappers
            .for_property(resolved.mapper)
            .and_then(|mapper| mapper.parse(raw))
            .and_then(json_to_figment);
        match value {
            Ok(value) => insert_at_path(&mut dict, &resolved.field_path, value),
            Err(e) => reporter.report(Problem::error(key.clone(), e.to_string())),
        }
    }
    convert_lists_in_dict(dict, T::properties())
}

/// Report mandatory leaves the merged layers do not supply.
pub(crate) fn check_mandatory<T: SettingsSchema>(
    figment: &Figment,
    reporter: &mut dyn ProblemReporter,
) {
    for leaf in schema::flatten_leaves(T::properties()) {
        if leaf.info.mandatory && figment.find_value(&leaf.field_path).is_err() {
            let error = SettingsError::MissingMandatoryProperty(leaf.key_path.clone());
            reporter.report(Problem::error(leaf.key_path, error.to_string()));
        }
    }
}

/// Extract and validate a settings graph from merged layers. Any
/// error-severity problem collected so far fails the load.
pub(crate) fn extract_settings<T: SettingsType>(
    figment: &Figment,
    reporter: &mut DefaultProblemReporter,
) -> Result<T, SettingsError> {
    check_mandatory::<T>(figment, reporter);

    if reporter.has_errors() {
        for problem in reporter.problems() {
            if problem.severity == super::problem::Severity::Error {
                error!("Settings problem at '{}': {}", problem.key, problem.message);
            }
        }
        return Err(SettingsError::CannotLoadSettings);
    }

    let settings: T = figment.extract().map_err(|e| {
        error!("Failed to load settings: {e}");
        SettingsError::CannotLoadSettings
    })?;
    settings.validate()?;
    Ok(settings)
}

/// Flatten a settings graph into its stored key/value form, walking the
/// schema alongside the serialized value.
pub(crate) fn flatten_settings<T: SettingsType>(
    value: &T,
    mappers: &TypeMapperRegistry,
) -> Result<BTreeMap<String, String>, SettingsError> {
    let json = serde_json::to_value(value).map_err(|_| SettingsError::SerializationFailed)?;
    let JsonValue::Object(object) = json else {
        return Err(SettingsError::SerializationFailed);
    };

    let mut out = BTreeMap::new();
    flatten_branch(T::properties(), "", &object, mappers, &mut out)?;
    Ok(out)
}

fn flatten_branch(
    props: &'static [PropertyInfo],
    prefix: &str,
    object: &serde_json::Map<String, JsonValue>,
    mappers: &TypeMapperRegistry,
    out: &mut BTreeMap<String, String>,
) -> Result<(), SettingsError> {
    for p in props {
        let Some(value) = object.get(p.field) else {
            continue;
        };
        if value.is_null() {
            continue;
        }

        let key = if prefix.is_empty() {
            p.name.to_string()
        } else {
            format!("{prefix}.{}", p.name)
        };

        match p.kind {
            PropertyKind::Leaf => {
                let mapper = mappers.for_property(p.mapper)?;
                out.insert(key.clone(), render_leaf(&key, mapper.as_ref(), value)?);
            }
            PropertyKind::Branch(children) => {
                let JsonValue::Object(nested) = value else {
                    return Err(invalid_value(&key, "expected a nested object"));
                };
                flatten_branch(children(), &key, nested, mappers, out)?;
            }
            PropertyKind::List(element) => {
                let JsonValue::Array(items) = value else {
                    return Err(invalid_value(&key, "expected a list"));
                };
                for (index, item) in items.iter().enumerate() {
                    flatten_item(p, element, &format!("{key}.{index}"), item, mappers, out)?;
                }
            }
            PropertyKind::Map(element) => {
                let JsonValue::Object(entries) = value else {
                    return Err(invalid_value(&key, "expected a map"));
                };
                for (entry, item) in entries {
                    if entry.is_empty() || entry.contains('.') {
                        return Err(invalid_value(
                            &format!("{key}.{entry}"),
                            "map entry keys must be non-empty and must not contain '.'",
                        ));
                    }
                    flatten_item(p, element, &format!("{key}.{entry}"), item, mappers, out)?;
                }
            }
        }
    }
    Ok(())
}

fn flatten_item(
    container: &'static PropertyInfo,
    element: Children,
    key: &str,
    value: &JsonValue,
    mappers: &TypeMapperRegistry,
    out: &mut BTreeMap<String, String>,
) -> Result<(), SettingsError> {
    if value.is_null() {
        return Ok(());
    }
    match element {
        Children::Leaf => {
            let mapper = mappers.for_property(container.mapper)?;
            out.insert(key.to_string(), render_leaf(key, mapper.as_ref(), value)?);
            Ok(())
        }
        Children::Branch(children) => {
            let JsonValue::Object(nested) = value else {
                return Err(invalid_value(key, "expected a nested object"));
            };
            flatten_branch(children(), key, nested, mappers, out)
        }
    }
}

fn render_leaf(
    key: &str,
    mapper: &dyn TypeMapper,
    value: &JsonValue,
) -> Result<String, SettingsError> {
    mapper.render(value).map_err(|e| invalid_value(key, &e.to_string()))
}

fn invalid_value(key: &str, reason: &str) -> SettingsError {
    SettingsError::InvalidValue {
        key: key.to_string(),
        reason: reason.to_string(),
    }
}

/// Flattened key/value pairs with secret values masked, for logging.
pub(crate) fn masked_flat_settings<T: SettingsType>(
    value: &T,
    mappers: &TypeMapperRegistry,
) -> Result<Vec<(String, String)>, SettingsError> {
    let flat = flatten_settings(value, mappers)?;
    Ok(flat
        .into_iter()
        .map(|(key, value)| {
            let secret = schema::resolve_key(T::properties(), &key)
                .map(|r| r.secret)
                .unwrap_or(false);
            if secret {
                (key, SECRET_MASK.to_string())
            } else {
                (key, value)
            }
        })
        .collect())
}

fn collect_mapper_names(props: &'static [PropertyInfo], out: &mut HashSet<&'static str>) {
    for p in props {
        if let Some(name) = p.mapper {
            out.insert(name);
        }
        match p.kind {
            PropertyKind::Branch(children)
            | PropertyKind::List(Children::Branch(children))
            | PropertyKind::Map(Children::Branch(children)) => {
                collect_mapper_names(children(), out);
            }
            _ => {}
        }
    }
}

/// A typed handle over a backing store: loads, saves and deletes one
/// settings graph and collects the problems found along the way.
pub struct SettingsStore<T: SettingsType> {
    store: Box<dyn BackingStore>,
    mappers: TypeMapperRegistry,
    env_prefix: Option<String>,
    problems: Vec<Problem>,
    _phantom: PhantomData<T>,
}

impl<T: SettingsType + Send + Sync> SettingsStore<T> {
    pub fn new(store: Box<dyn BackingStore>, mappers: TypeMapperRegistry) -> Self {
        let prefix = T::env_prefix();
        Self {
            store,
            mappers,
            env_prefix: (!prefix.is_empty()).then(|| prefix.to_string()),
            problems: Vec::new(),
            _phantom: PhantomData,
        }
    }

    /// Check that every mapper the schema references is registered.
    /// Useful at startup, before any load or save runs.
    pub fn verify_schema(&self) -> Result<(), SettingsError> {
        let mut names = HashSet::new();
        collect_mapper_names(T::properties(), &mut names);
        for name in names {
            self.mappers.get(name)?;
        }
        Ok(())
    }

    /// Stop applying environment variable overrides on load.
    pub fn disable_env_overrides(&mut self) {
        self.env_prefix = None;
    }

    pub fn set_env_prefix(&mut self, prefix: impl Into<String>) {
        self.env_prefix = Some(prefix.into());
    }

    /// Load the settings graph: schema defaults, then stored values, then
    /// environment overrides. Problems found are collected and available
    /// through `problems()`; error-severity problems fail the load.
    pub fn load(&mut self) -> Result<T, SettingsError> {
        self.store.load()?;
        let snapshot = self.store.snapshot()?;

        let mut reporter = DefaultProblemReporter::new();
        let defaults = schema_defaults_dict::<T>(&self.mappers)?;
        let stored = snapshot_dict::<T>(&snapshot, &self.mappers, &mut reporter);

        let mut figment = Figment::new()
            .merge(DictProvider::new("schema defaults", defaults))
            .merge(DictProvider::new("backing store", stored));
        if let Some(prefix) = &self.env_prefix {
            figment = figment.merge(EnvOverrideProvider::<T>::new(prefix, &[]));
        }

        let result = extract_settings::<T>(&figment, &mut reporter);
        self.problems = reporter.into_problems();
        result
    }

    /// Persist the settings graph, replacing the stored properties
    /// wholesale so removed entries leave no stale keys behind.
    pub fn save(&mut self, value: &T) -> Result<(), SettingsError> {
        let flat = flatten_settings(value, &self.mappers)?;
        let count = flat.len();

        self.store.clear()?;
        for (key, stored) in flat {
            self.store.set(&key, stored)?;
        }
        self.store.store()?;
        info!("Stored {count} settings properties.");
        Ok(())
    }

    /// Delete the stored properties entirely.
    pub fn delete(&mut self) -> Result<(), SettingsError> {
        self.store.delete()
    }

    /// Problems collected by the most recent load.
    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    pub fn backing_store(&self) -> &dyn BackingStore {
        self.store.as_ref()
    }

    pub fn mappers(&self) -> &TypeMapperRegistry {
        &self.mappers
    }
}

/// Builds typed settings stores over files, memory or custom backing
/// stores, sharing one mapper registry.
#[derive(Clone, Default)]
pub struct SettingsStoreFactory {
    mappers: TypeMapperRegistry,
}

impl SettingsStoreFactory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a custom type mapper under a name referable from
    /// `#[settings(mapper = "...")]` attributes.
    pub fn with_mapper(mut self, name: impl Into<String>, mapper: Arc<dyn TypeMapper>) -> Self {
        self.mappers.register(name, mapper);
        self
    }

    pub fn new_file_store<T: SettingsType + Send + Sync>(
        &self,
        path: impl Into<PathBuf>,
    ) -> SettingsStore<T> {
        SettingsStore::new(Box::new(FileStore::new(path)), self.mappers.clone())
    }

    pub fn new_memory_store<T: SettingsType + Send + Sync>(&self) -> SettingsStore<T> {
        SettingsStore::new(Box::new(MemoryStore::new()), self.mappers.clone())
    }

    pub fn new_store<T: SettingsType + Send + Sync>(
        &self,
        store: Box<dyn BackingStore>,
    ) -> SettingsStore<T> {
        SettingsStore::new(store, self.mappers.clone())
    }
}
