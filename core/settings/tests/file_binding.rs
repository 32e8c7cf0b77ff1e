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

use serde::de::{self, Deserializer, Visitor};
use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use settings::{
    Settings, SettingsError, SettingsStoreFactory, Severity, TypeMapper, Validatable,
};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Settings)]
#[settings(name = "app-settings")]
struct AppSettings {
    #[settings(default = "true")]
    enabled: bool,
    #[settings(mandatory)]
    name: String,
    #[settings(key = "max-size")]
    max_size: u64,
    http: HttpSettings,
    #[serde(default)]
    servers: Vec<ServerSettings>,
    #[serde(default)]
    accounts: HashMap<String, AccountSettings>,
    #[serde(default)]
    tags: Vec<String>,
    #[settings(skip)]
    #[serde(default)]
    runtime_state: Option<String>,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Settings)]
struct HttpSettings {
    #[settings(default = "8080")]
    port: u16,
    #[settings(default = "30s", mapper = "duration")]
    timeout: String,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Settings)]
struct ServerSettings {
    host: String,
    port: u16,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Settings)]
struct AccountSettings {
    role: String,
    #[settings(secret)]
    #[serde(default)]
    token: Option<String>,
}

impl Validatable for AppSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        if self.http.port == 0 {
            return Err(SettingsError::InvalidSettings(
                "http.port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

fn sample_settings() -> AppSettings {
    AppSettings {
        enabled: false,
        name: "prod".to_string(),
        max_size: 1024,
        http: HttpSettings {
            port: 9090,
            timeout: "1m 30s".to_string(),
        },
        servers: vec![
            ServerSettings {
                host: "alpha".to_string(),
                port: 7001,
            },
            ServerSettings {
                host: "beta".to_string(),
                port: 7002,
            },
        ],
        accounts: HashMap::from([(
            "alice".to_string(),
            AccountSettings {
                role: "admin".to_string(),
                token: Some("s3cr3t".to_string()),
            },
        )]),
        tags: vec!["fast".to_string(), "eu-west".to_string()],
        runtime_state: None,
    }
}

#[test]
fn save_writes_flat_dotted_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<AppSettings>(&path);
    store.save(&sample_settings()).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("enabled = false"));
    assert!(content.contains("name = prod"));
    assert!(content.contains("max-size = 1024"));
    assert!(content.contains("http.port = 9090"));
    assert!(content.contains("http.timeout = 1m 30s"));
    assert!(content.contains("servers.0.host = alpha"));
    assert!(content.contains("servers.1.port = 7002"));
    assert!(content.contains("accounts.alice.role = admin"));
    assert!(content.contains("accounts.alice.token = s3cr3t"));
    assert!(content.contains("tags.0 = fast"));
    assert!(!content.contains("runtime_state"));
}

#[test]
fn save_then_load_round_trips_the_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<AppSettings>(&path);
    let original = sample_settings();
    store.save(&original).unwrap();

    let mut reloaded_store = factory.new_file_store::<AppSettings>(&path);
    reloaded_store.disable_env_overrides();
    let reloaded = reloaded_store.load().unwrap();

    assert_eq!(reloaded, original);
    assert!(reloaded_store.problems().is_empty());
}

#[test]
fn save_removes_stale_keys() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<AppSettings>(&path);
    let mut settings = sample_settings();
    store.save(&settings).unwrap();

    settings.servers.pop();
    settings.accounts.clear();
    store.save(&settings).unwrap();

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("servers.0.host = alpha"));
    assert!(!content.contains("servers.1"));
    assert!(!content.contains("accounts."));
}

#[test]
fn load_tolerates_numeric_gaps_in_lists() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");
    std::fs::write(
        &path,
        "name = gappy\nmax-size = 1\ntags.0 = first\ntags.2 = third\n",
    )
    .unwrap();

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<AppSettings>(&path);
    let settings = store.load().unwrap();

    assert_eq!(settings.tags, vec!["first".to_string(), "third".to_string()]);
}

#[test]
fn load_reports_unknown_keys_with_suggestions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");
    std::fs::write(&path, "name = x\nmax-size = 1\nhttp.prot = 9090\n").unwrap();

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<AppSettings>(&path);
    let settings = store.load().unwrap();

    assert_eq!(settings.http.port, 8080);
    let problem = store
        .problems()
        .iter()
        .find(|p| p.key == "http.prot")
        .unwrap();
    assert_eq!(problem.severity, Severity::Warning);
    assert!(problem.message.contains("http.port"));
}

#[test]
fn load_fails_on_missing_mandatory_property() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");
    std::fs::write(&path, "max-size = 1\n").unwrap();

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<AppSettings>(&path);
    let result = store.load();

    assert_eq!(result.unwrap_err(), SettingsError::CannotLoadSettings);
    let problem = store.problems().iter().find(|p| p.key == "name").unwrap();
    assert_eq!(problem.severity, Severity::Error);
    assert!(problem.message.contains("mandatory"));
}

#[test]
fn load_fails_when_validation_rejects_the_graph() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");
    std::fs::write(&path, "name = x\nmax-size = 1\nhttp.port = 0\n").unwrap();

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<AppSettings>(&path);
    let result = store.load();

    assert!(matches!(
        result.unwrap_err(),
        SettingsError::InvalidSettings(_)
    ));
}

#[test]
fn delete_removes_the_settings_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("app.properties");

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<AppSettings>(&path);
    store.save(&sample_settings()).unwrap();
    assert!(path.is_file());

    store.delete().unwrap();
    assert!(!path.is_file());
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Settings)]
#[settings(prefix = "FBENV_", name = "env-settings")]
struct EnvSettings {
    #[settings(default = "from-default")]
    name: String,
}

impl Validatable for EnvSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        Ok(())
    }
}

#[test]
fn env_overrides_take_precedence_over_stored_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("env.properties");
    std::fs::write(&path, "name = from-store\n").unwrap();

    unsafe {
        std::env::set_var("FBENV_NAME", "from-env");
    }

    let factory = SettingsStoreFactory::new();
    let mut store = factory.new_file_store::<EnvSettings>(&path);
    let settings = store.load();

    unsafe {
        std::env::remove_var("FBENV_NAME");
    }

    assert_eq!(settings.unwrap().name, "from-env");
}

/// "host:port" scalar bound through a custom mapper.
#[derive(Debug, Default, Clone, PartialEq)]
struct HostPort {
    host: String,
    port: u16,
}

impl HostPort {
    fn parse(raw: &str) -> Option<Self> {
        let (host, port) = raw.split_once(':')?;
        Some(Self {
            host: host.to_string(),
            port: port.parse().ok()?,
        })
    }
}

impl fmt::Display for HostPort {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl Serialize for HostPort {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for HostPort {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct HostPortVisitor;

        impl Visitor<'_> for HostPortVisitor {
            type Value = HostPort;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a host:port string")
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<HostPort, E> {
                HostPort::parse(v).ok_or_else(|| E::custom(format!("invalid host:port: {v}")))
            }
        }

        deserializer.deserialize_str(HostPortVisitor)
    }
}

#[derive(Debug)]
struct HostPortMapper;

impl TypeMapper for HostPortMapper {
    fn parse(&self, raw: &str) -> Result<JsonValue, SettingsError> {
        let parsed = HostPort::parse(raw).ok_or_else(|| {
            SettingsError::MappingFailed(format!("invalid host:port: {raw}"))
        })?;
        Ok(JsonValue::String(parsed.to_string()))
    }

    fn render(&self, value: &JsonValue) -> Result<String, SettingsError> {
        match value {
            JsonValue::String(s) if HostPort::parse(s).is_some() => Ok(s.clone()),
            other => Err(SettingsError::MappingFailed(format!(
                "expected a host:port string, got: {other}"
            ))),
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize, Settings)]
#[settings(name = "endpoint-settings")]
struct EndpointSettings {
    #[settings(leaf, mapper = "hostport", default = "localhost:8080")]
    endpoint: HostPort,
}

impl Validatable for EndpointSettings {
    fn validate(&self) -> Result<(), SettingsError> {
        Ok(())
    }
}

#[test]
fn custom_mapper_binds_custom_scalar_types() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("endpoint.properties");
    std::fs::write(&path, "endpoint = db.internal:5432\n").unwrap();

    let factory =
        SettingsStoreFactory::new().with_mapper("hostport", Arc::new(HostPortMapper));
    let mut store = factory.new_file_store::<EndpointSettings>(&path);
    store.verify_schema().unwrap();

    let settings = store.load().unwrap();
    assert_eq!(
        settings.endpoint,
        HostPort {
            host: "db.internal".to_string(),
            port: 5432,
        }
    );

    store.save(&settings).unwrap();
    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("endpoint = db.internal:5432"));
}

#[test]
fn custom_mapper_rejects_malformed_values() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("endpoint.properties");
    std::fs::write(&path, "endpoint = not-an-endpoint\n").unwrap();

    let factory =
        SettingsStoreFactory::new().with_mapper("hostport", Arc::new(HostPortMapper));
    let mut store = factory.new_file_store::<EndpointSettings>(&path);
    let result = store.load();

    assert_eq!(result.unwrap_err(), SettingsError::CannotLoadSettings);
    let problem = store.problems().iter().find(|p| p.key == "endpoint").unwrap();
    assert_eq!(problem.severity, Severity::Error);
}

#[test]
fn verify_schema_rejects_unregistered_mappers() {
    let factory = SettingsStoreFactory::new();
    let store = factory.new_memory_store::<EndpointSettings>();

    assert_eq!(
        store.verify_schema().unwrap_err(),
        SettingsError::UnknownTypeMapper("hostport".to_string())
    );
}
