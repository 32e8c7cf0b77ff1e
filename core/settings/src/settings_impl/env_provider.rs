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

use super::error::SettingsError;
use super::parsing::{convert_lists_in_dict, insert_at_path, parse_stored_value};
use super::schema::{self, FlatEnvMapping, SettingsSchema};
use figment::{
    Profile, Provider,
    value::{Dict, Map as FigmentMap},
};
use std::{collections::HashSet, env, marker::PhantomData};
use tracing::{info, warn};

pub(crate) const SECRET_MASK: &str = "******";

type ProfileMap = FigmentMap<Profile, Dict>;

/// Environment variable provider using schema-derived variable names.
///
/// Variable names come straight from the property schema (prefix plus the
/// upper-cased key path with `_` separators), so there is no ambiguity in
/// mapping a variable back to its config path. Map entries have no
/// derivable names and cannot be overridden from the environment.
///
/// # Example
/// ```ignore
/// let provider = EnvOverrideProvider::<AppSettings>::new("APP_", &["APP_ENCRYPTION_KEY"]);
/// ```
#[derive(Debug, Clone)]
pub struct EnvOverrideProvider<T: SettingsSchema> {
    prefix: String,
    mappings: Vec<FlatEnvMapping>,
    secret_keys: Vec<String>,
    _phantom: PhantomData<T>,
}

impl<T: SettingsSchema> EnvOverrideProvider<T> {
    /// Create a new environment override provider.
    ///
    /// # Arguments
    /// * `prefix` - Environment variable prefix to validate against (e.g., "APP_")
    /// * `secret_keys` - Additional variable names that should be masked in logs
    pub fn new(prefix: &str, secret_keys: &[&str]) -> Self {
        Self {
            prefix: prefix.to_string(),
            mappings: schema::env_mappings(T::properties()),
            secret_keys: secret_keys.iter().map(|s| s.to_string()).collect(),
            _phantom: PhantomData,
        }
    }

    /// Create a provider using the prefix declared on the schema root.
    pub fn from_schema() -> Self {
        Self::new(T::env_prefix(), &[])
    }

    /// Deserialize environment variables into a settings profile map.
    ///
    /// This method:
    /// 1. Validates that all env vars with the prefix are known (warns on unknown)
    /// 2. Iterates over the schema-derived mappings and applies set values
    pub fn deserialize(&self) -> Result<ProfileMap, SettingsError> {
        self.warn_unknown_env_vars();

        let mut root_dict = Dict::new();

        for mapping in &self.mappings {
            let env_name = format!("{}{}", self.prefix, mapping.env_suffix);

            let env_value = match env::var(&env_name) {
                Ok(val) if !val.is_empty() => val,
                _ => continue,
            };

            let is_secret = mapping.secret || self.secret_keys.iter().any(|s| s == &env_name);
            let display_value = if is_secret {
                SECRET_MASK.to_string()
            } else {
                env_value.clone()
            };

            info!(
                "{} value changed to: {} from environment variable",
                env_name, display_value
            );

            let parsed_value = parse_stored_value(&env_value);
            insert_at_path(&mut root_dict, &mapping.config_path, parsed_value);
        }

        let root_dict = convert_lists_in_dict(root_dict, T::properties());

        let mut data = ProfileMap::new();
        data.insert(Profile::default(), root_dict);
        Ok(data)
    }

    fn warn_unknown_env_vars(&self) {
        // Without a prefix there is no namespace to police.
        if self.prefix.is_empty() {
            return;
        }

        let known_vars: HashSet<String> = self
            .mappings
            .iter()
            .map(|m| format!("{}{}", self.prefix, m.env_suffix))
            .collect();
        let known_refs: HashSet<&str> = known_vars.iter().map(|s| s.as_str()).collect();

        for (key, _) in env::vars() {
            if !key.starts_with(&self.prefix) || known_vars.contains(&key) {
                continue;
            }

            let suggestions = schema::similar_keys(&key, &known_refs);
            if suggestions.is_empty() {
                warn!("Unknown environment variable '{}' will be ignored.", key);
            } else {
                warn!(
                    "Unknown environment variable '{}' will be ignored. Similar variables: {}?",
                    key,
                    suggestions.join(", ")
                );
            }
        }
    }
}

impl<T: SettingsSchema + Send + Sync> Provider for EnvOverrideProvider<T> {
    fn metadata(&self) -> figment::Metadata {
        figment::Metadata::named(format!("{} environment overrides", T::provider_name()))
    }

    fn data(&self) -> Result<ProfileMap, figment::Error> {
        self.deserialize()
            .map_err(|e| figment::Error::from(format!("Failed to deserialize env vars: {e}")))
    }
}
