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

//! Settings binding module providing flexible settings loading and
//! persistence with file and environment support.
//!
//! This module provides a schema-based binding system that supports:
//! - Loading settings from flat key/value property files
//! - Environment variable overrides with schema-derived variable names
//! - List and map containers of nested branch structs
//! - Type mappers converting stored strings to and from typed values
//! - Problem reporting for unknown keys, invalid values and missing
//!   mandatory properties

mod binding;
mod env_provider;
mod error;
mod file_provider;
mod mapper;
mod parsing;
mod problem;
mod schema;
mod store;
mod traits;

pub use binding::{SettingsStore, SettingsStoreFactory};
pub use env_provider::EnvOverrideProvider;
pub use error::SettingsError;
pub use file_provider::FileSettingsProvider;
pub use mapper::{DurationMapper, InferMapper, StringMapper, TypeMapper, TypeMapperRegistry};
pub use parsing::parse_stored_value_to_json;
pub use problem::{DefaultProblemReporter, Problem, ProblemReporter, Severity};
pub use schema::{Children, FlatEnvMapping, PropertyInfo, PropertyKind, SchemaFn, SettingsSchema};
pub use store::{BackingStore, FileStore, MemoryStore};
pub use traits::{SettingsProvider, SettingsType, Validatable};
