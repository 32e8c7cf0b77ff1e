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

//! Type mappers convert between the stored string form of a property and
//! its typed in-memory value.
//!
//! Properties bind through the inference mapper unless the field names
//! a registered mapper via `#[settings(mapper = "...")]`. Custom mappers
//! registered on the factory make custom scalar types bindable without
//! touching the library.

use super::error::SettingsError;
use super::parsing::{parse_stored_value_to_json, render_json_value};
use serde_json::Value as JsonValue;
use std::collections::HashMap;
use std::sync::Arc;

/// Converts between a stored string and a typed value. `parse` runs in
/// the load direction, `render` in the persist direction; rendering the
/// parse result must yield an equivalent stored string.
pub trait TypeMapper: Send + Sync + std::fmt::Debug {
    fn parse(&self, raw: &str) -> Result<JsonValue, SettingsError>;
    fn render(&self, value: &JsonValue) -> Result<String, SettingsError>;
}

/// Default mapper: infers bool, integer, float, bracketed array or string.
#[derive(Debug, Default)]
pub struct InferMapper;

impl TypeMapper for InferMapper {
    fn parse(&self, raw: &str) -> Result<JsonValue, SettingsError> {
        Ok(parse_stored_value_to_json(raw))
    }

    fn render(&self, value: &JsonValue) -> Result<String, SettingsError> {
        render_json_value(value)
    }
}

/// Keeps values as verbatim strings, for stored values that would
/// otherwise be inferred as numbers or booleans (ports kept as text,
/// version strings, "true" as a literal).
#[derive(Debug, Default)]
pub struct StringMapper;

impl TypeMapper for StringMapper {
    fn parse(&self, raw: &str) -> Result<JsonValue, SettingsError> {
        Ok(JsonValue::String(raw.to_owned()))
    }

    fn render(&self, value: &JsonValue) -> Result<String, SettingsError> {
        match value {
            JsonValue::String(s) => Ok(s.clone()),
            other => Err(SettingsError::MappingFailed(format!(
                "expected a string value, got: {other}"
            ))),
        }
    }
}

/// Validates and canonicalizes humantime durations ("5s", "2m 30s").
/// The typed field deserializes the canonical string itself, typically
/// through a display-backed serde adapter.
#[derive(Debug, Default)]
pub struct DurationMapper;

impl TypeMapper for DurationMapper {
    fn parse(&self, raw: &str) -> Result<JsonValue, SettingsError> {
        let duration = humantime::parse_duration(raw)
            .map_err(|e| SettingsError::MappingFailed(format!("invalid duration: {e}")))?;
        Ok(JsonValue::String(
            humantime::format_duration(duration).to_string(),
        ))
    }

    fn render(&self, value: &JsonValue) -> Result<String, SettingsError> {
        let JsonValue::String(raw) = value else {
            return Err(SettingsError::MappingFailed(format!(
                "expected a duration string, got: {value}"
            )));
        };
        let duration = humantime::parse_duration(raw)
            .map_err(|e| SettingsError::MappingFailed(format!("invalid duration: {e}")))?;
        Ok(humantime::format_duration(duration).to_string())
    }
}

/// Named registry of type mappers. Starts with the built-ins (`infer`,
/// `string`, `duration`); custom mappers are registered by name and
/// referenced from `#[settings(mapper = "...")]` attributes.
#[derive(Clone)]
pub struct TypeMapperRegistry {
    mappers: HashMap<String, Arc<dyn TypeMapper>>,
}

impl Default for TypeMapperRegistry {
    fn default() -> Self {
        let mut registry = Self {
            mappers: HashMap::new(),
        };
        registry.register("infer", Arc::new(InferMapper));
        registry.register("string", Arc::new(StringMapper));
        registry.register("duration", Arc::new(DurationMapper));
        registry
    }
}

impl TypeMapperRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: impl Into<String>, mapper: Arc<dyn TypeMapper>) {
        self.mappers.insert(name.into(), mapper);
    }

    pub fn get(&self, name: &str) -> Result<Arc<dyn TypeMapper>, SettingsError> {
        self.mappers
            .get(name)
            .cloned()
            .ok_or_else(|| SettingsError::UnknownTypeMapper(name.to_string()))
    }

    /// Mapper for a property: the named one if declared, inference otherwise.
    pub(crate) fn for_property(
        &self,
        mapper: Option<&str>,
    ) -> Result<Arc<dyn TypeMapper>, SettingsError> {
        match mapper {
            Some(name) => self.get(name),
            None => self.get("infer"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn infer_mapper_round_trips() {
        let mapper = InferMapper;
        let parsed = mapper.parse("8080").unwrap();
        assert_eq!(parsed, serde_json::json!(8080));
        assert_eq!(mapper.render(&parsed).unwrap(), "8080");
    }

    #[test]
    fn string_mapper_keeps_numbers_as_text() {
        let mapper = StringMapper;
        let parsed = mapper.parse("8080").unwrap();
        assert_eq!(parsed, serde_json::json!("8080"));
        assert_eq!(mapper.render(&parsed).unwrap(), "8080");
    }

    #[test]
    fn string_mapper_rejects_non_strings_on_render() {
        let mapper = StringMapper;
        assert!(mapper.render(&serde_json::json!(1)).is_err());
    }

    #[test]
    fn duration_mapper_canonicalizes() {
        let mapper = DurationMapper;
        let parsed = mapper.parse("90s").unwrap();
        assert_eq!(parsed, serde_json::json!("1m 30s"));
        assert_eq!(mapper.render(&parsed).unwrap(), "1m 30s");
    }

    #[test]
    fn duration_mapper_rejects_garbage() {
        let mapper = DurationMapper;
        assert!(mapper.parse("not-a-duration").is_err());
    }

    #[test]
    fn registry_resolves_builtins_and_custom_mappers() {
        let mut registry = TypeMapperRegistry::new();
        assert!(registry.get("infer").is_ok());
        assert!(registry.get("duration").is_ok());

        registry.register("upper", Arc::new(StringMapper));
        assert!(registry.get("upper").is_ok());
    }

    #[test]
    fn registry_reports_unknown_mappers() {
        let registry = TypeMapperRegistry::new();
        assert_eq!(
            registry.get("missing").unwrap_err(),
            SettingsError::UnknownTypeMapper("missing".to_string())
        );
    }

    #[test]
    fn for_property_defaults_to_inference() {
        let registry = TypeMapperRegistry::new();
        let mapper = registry.for_property(None).unwrap();
        assert_eq!(mapper.parse("true").unwrap(), serde_json::json!(true));
    }
}
