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

//! Schema-driven settings binding between struct graphs and flat
//! key/value stores.
//!
//! `#[derive(Settings)]` walks a struct's fields at compile time and emits
//! a static property schema; the runtime drives that schema against a
//! [`BackingStore`] to populate a settings graph (through figment layers
//! for defaults, stored values and environment overrides) or to persist
//! one back as flat dotted keys.

// Allows the derive macro output to refer to this crate by name from
// within its own tests.
extern crate self as settings;

mod settings_impl;

pub use settings_derive::Settings;
pub use settings_impl::{
    BackingStore, Children, DefaultProblemReporter, DurationMapper, EnvOverrideProvider,
    FileSettingsProvider, FileStore, FlatEnvMapping, InferMapper, MemoryStore, Problem,
    ProblemReporter, PropertyInfo, PropertyKind, SchemaFn, SettingsError, SettingsProvider,
    SettingsSchema, SettingsStore, SettingsStoreFactory, SettingsType, Severity, StringMapper,
    TypeMapper, TypeMapperRegistry, Validatable, parse_stored_value_to_json,
};
