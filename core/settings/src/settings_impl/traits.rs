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

//! Core traits for settings types and providers.

use super::error::SettingsError;
use super::schema::SettingsSchema;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Post-load validation hook. Runs after a settings graph has been
/// extracted; failures abort the load.
pub trait Validatable {
    fn validate(&self) -> Result<(), SettingsError>;
}

/// A root settings type: carries a schema and is (de)serializable and
/// validatable. Blanket-implemented; user types only implement the
/// pieces.
pub trait SettingsType: SettingsSchema + Serialize + DeserializeOwned + Validatable {}

impl<T> SettingsType for T where T: SettingsSchema + Serialize + DeserializeOwned + Validatable {}

/// Loads a settings graph from some combination of layers (defaults,
/// stored values, environment).
pub trait SettingsProvider {
    fn load_settings<T: SettingsType>(&self) -> Result<T, SettingsError>;
}
