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

//! Settings error types.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettingsError {
    #[error("Cannot load settings")]
    CannotLoadSettings,
    #[error("Settings have not been loaded")]
    NotLoaded,
    #[error("Cannot read settings file, Path: {0}")]
    CannotReadFile(String),
    #[error("Cannot write settings file, Path: {0}")]
    CannotWriteFile(String),
    #[error("Cannot delete settings file, Path: {0}")]
    CannotDeleteFile(String),
    #[error("Invalid value for property: {key}, {reason}")]
    InvalidValue { key: String, reason: String },
    #[error("Cannot map value: {0}")]
    MappingFailed(String),
    #[error("Unknown type mapper: {0}")]
    UnknownTypeMapper(String),
    #[error("Missing mandatory property: {0}")]
    MissingMandatoryProperty(String),
    #[error("Failed to serialize settings")]
    SerializationFailed,
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}
