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

//! Proc macro for generating property schemas for settings structs.
//!
//! This crate provides `#[derive(Settings)]` which generates:
//! - A static `PropertyInfo` descriptor for every bindable field
//! - A `SettingsSchema` trait implementation for runtime traversal
//!
//! # Field Classification
//!
//! The macro classifies every named field by its declared type:
//! - **Leaf types** (primitives, `String`, fields marked `leaf`): bound
//!   through a type mapper under the field's own key segment
//! - **Branch types** (structs that also derive `Settings`): contribute
//!   their schema under the field's key segment
//! - **`Vec<T>`**: bound under numeric key segments (`field.0`, `field.1`, ...)
//! - **`HashMap<String, T>` / `BTreeMap<String, T>`**: bound under the
//!   entry's key segment (`field.<entry>`)
//! - **`Arc<T>`**, **`Box<T>`**, **`Rc<T>`**, **`Option<T>`**: transparently unwrapped

mod settings_schema;

use proc_macro::TokenStream;
use syn::{DeriveInput, parse_macro_input};

/// Derive macro for generating a property schema.
///
/// # Container Attributes
/// - `#[settings(prefix = "APP_")]` - Environment variable prefix (only on the root)
/// - `#[settings(name = "app-settings")]` - Provider metadata name
///
/// Root settings structs should specify both `prefix` and `name`:
/// ```ignore
/// #[derive(Settings)]
/// #[settings(prefix = "APP_", name = "app-settings")]
/// pub struct AppSettings { ... }
/// ```
///
/// # Field Attributes
/// - `#[settings(key = "custom")]` - Override the stored key segment
/// - `#[settings(skip)]` - Exclude this field from binding entirely
/// - `#[settings(secret)]` - Mask this field's value in logs
/// - `#[settings(leaf)]` - Treat as a value type, not a nested branch
///   (for custom types such as enums or durations)
/// - `#[settings(default = "...")]` - Stored-form default, parsed through
///   the field's type mapper when no value is present
/// - `#[settings(mandatory)]` - Loading fails when no value is present
/// - `#[settings(mapper = "name")]` - Bind through the named type mapper
///   from the registry instead of the inference mapper
///
/// # Type Handling
/// - **Primitives** (bool, u8-u128, i8-i128, f32, f64, String): automatically
///   treated as leaves
/// - **Non-primitives**: assumed to be nested branches that implement
///   `SettingsSchema`
/// - Use `#[settings(leaf)]` for value types that should not be recursively
///   expanded (durations, enums, custom scalar types)
///
/// # Example
/// ```ignore
/// #[derive(Settings)]
/// #[settings(prefix = "APP_", name = "app-settings")]
/// pub struct AppSettings {
///     pub http: HttpSettings,          // Branch: http.*
///     #[settings(leaf, mapper = "duration")]
///     pub poll_interval: String,       // Leaf with a named mapper
/// }
///
/// #[derive(Settings)]
/// pub struct HttpSettings {
///     pub enabled: bool,               // Leaf: http.enabled
///     #[settings(default = "8080")]
///     pub port: u16,                   // Leaf with default: http.port
///     #[settings(secret)]
///     pub api_key: String,             // Leaf, masked in logs
/// }
/// ```
#[proc_macro_derive(Settings, attributes(settings))]
pub fn derive_settings(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);
    settings_schema::generate_impl(&input).into()
}
