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

//! Property descriptor tree and traversal helpers.
//!
//! The `Settings` derive macro emits one static [`PropertyInfo`] per
//! bindable field; nested schemas are reached through function pointers,
//! so the whole tree is const-constructible. Everything at runtime (key
//! resolution, env var derivation, defaults, validation) is a walk over
//! this tree.

use std::collections::HashSet;

/// Maximum number of list elements environment variable mappings are
/// generated for.
///
/// For list properties, mappings cover indices 0 through 9 (e.g.
/// `FIELD_0_NAME`, ..., `FIELD_9_NAME`). Environment variables for higher
/// indices are silently ignored; stored keys are not affected.
pub(crate) const MAX_LIST_ELEMENTS: usize = 10;

/// Access to a nested schema's descriptor slice.
pub type SchemaFn = fn() -> &'static [PropertyInfo];

/// How a property binds to the flat key space.
#[derive(Debug, Clone, Copy)]
pub enum PropertyKind {
    /// Scalar value converted through a type mapper.
    Leaf,
    /// Nested settings struct contributing its schema under this segment.
    Branch(SchemaFn),
    /// List stored under numeric key segments (`field.0`, `field.1`, ...).
    List(Children),
    /// String-keyed map stored under entry key segments (`field.<entry>`).
    Map(Children),
}

/// Element shape of a list or map property.
#[derive(Debug, Clone, Copy)]
pub enum Children {
    Leaf,
    Branch(SchemaFn),
}

/// A single field descriptor emitted by the derive macro.
#[derive(Debug, Clone, Copy)]
pub struct PropertyInfo {
    /// Stored key segment (field name or `key` attribute override).
    pub name: &'static str,
    /// Serde field name, used when (de)serializing the host struct.
    pub field: &'static str,
    pub kind: PropertyKind,
    pub secret: bool,
    pub mandatory: bool,
    /// Stored-form default, parsed through the property's mapper.
    pub default: Option<&'static str>,
    /// Name of a registered type mapper; `None` uses value inference.
    pub mapper: Option<&'static str>,
}

/// Trait for settings types that carry a property schema.
/// Implemented automatically by `#[derive(Settings)]`.
pub trait SettingsSchema {
    /// Descriptors for this struct's own fields.
    fn properties() -> &'static [PropertyInfo];

    /// Environment variable prefix declared on the root struct.
    fn env_prefix() -> &'static str {
        ""
    }

    /// Metadata name for figment providers built from this schema.
    fn provider_name() -> &'static str {
        "settings"
    }
}

/// A derived environment variable mapping, relative to the root prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlatEnvMapping {
    /// Env var name without the prefix (e.g. "HTTP_ENABLED").
    pub env_suffix: String,
    /// Dotted serde field path (e.g. "http.enabled").
    pub config_path: String,
    pub secret: bool,
}

/// A leaf property reachable without crossing a list or map, with its
/// fully qualified paths in both spellings.
#[derive(Debug, Clone)]
pub(crate) struct FlatLeaf {
    /// Dotted stored key path (uses `name` segments).
    pub key_path: String,
    /// Dotted serde field path (uses `field` segments).
    pub field_path: String,
    pub info: &'static PropertyInfo,
}

/// Result of resolving a stored key against a schema.
#[derive(Debug, Clone)]
pub(crate) struct ResolvedKey {
    /// Dotted serde field path the value belongs at.
    pub field_path: String,
    /// Mapper governing the value (from the leaf or its container field).
    pub mapper: Option<&'static str>,
    /// True if any property along the path is marked secret.
    pub secret: bool,
}

/// Derive environment variable mappings for a schema. List properties
/// expand to indexed mappings; map entries have no derivable names and
/// are reachable only through the store.
pub(crate) fn env_mappings(props: &'static [PropertyInfo]) -> Vec<FlatEnvMapping> {
    let mut out = Vec::new();
    collect_env_mappings(props, "", "", false, &mut out);
    out
}

fn collect_env_mappings(
    props: &'static [PropertyInfo],
    env_prefix: &str,
    path_prefix: &str,
    secret: bool,
    out: &mut Vec<FlatEnvMapping>,
) {
    for p in props {
        let env_name = join_env(env_prefix, &env_segment(p.name));
        let path = join_path(path_prefix, p.field);
        let secret = secret || p.secret;

        match p.kind {
            PropertyKind::Leaf => out.push(FlatEnvMapping {
                env_suffix: env_name,
                config_path: path,
                secret,
            }),
            PropertyKind::Branch(children) => {
                collect_env_mappings(children(), &env_name, &path, secret, out);
            }
            PropertyKind::List(Children::Leaf) => {
                for i in 0..MAX_LIST_ELEMENTS {
                    out.push(FlatEnvMapping {
                        env_suffix: format!("{env_name}_{i}"),
                        config_path: format!("{path}.{i}"),
                        secret,
                    });
                }
            }
            PropertyKind::List(Children::Branch(children)) => {
                for i in 0..MAX_LIST_ELEMENTS {
                    collect_env_mappings(
                        children(),
                        &format!("{env_name}_{i}"),
                        &format!("{path}.{i}"),
                        secret,
                        out,
                    );
                }
            }
            PropertyKind::Map(_) => {}
        }
    }
}

/// Collect leaves reachable without crossing a container. Defaults and
/// mandatory checks only apply to these; container items have no
/// well-defined key ahead of time.
pub(crate) fn flatten_leaves(props: &'static [PropertyInfo]) -> Vec<FlatLeaf> {
    let mut out = Vec::new();
    collect_leaves(props, "", "", &mut out);
    out
}

fn collect_leaves(
    props: &'static [PropertyInfo],
    key_prefix: &str,
    field_prefix: &str,
    out: &mut Vec<FlatLeaf>,
) {
    for p in props {
        let key_path = join_path(key_prefix, p.name);
        let field_path = join_path(field_prefix, p.field);
        match p.kind {
            PropertyKind::Leaf => out.push(FlatLeaf {
                key_path,
                field_path,
                info: p,
            }),
            PropertyKind::Branch(children) => {
                collect_leaves(children(), &key_path, &field_path, out);
            }
            PropertyKind::List(_) | PropertyKind::Map(_) => {}
        }
    }
}

/// Resolve a stored key against the schema, translating `name` segments
/// into serde `field` segments. Returns `None` for keys no property
/// pattern matches.
pub(crate) fn resolve_key(props: &'static [PropertyInfo], key: &str) -> Option<ResolvedKey> {
    let segments: Vec<&str> = key.split('.').collect();
    resolve_segments(props, &segments, "", false)
}

fn resolve_segments(
    props: &'static [PropertyInfo],
    segments: &[&str],
    field_prefix: &str,
    secret: bool,
) -> Option<ResolvedKey> {
    let (first, rest) = segments.split_first()?;
    let p = props.iter().find(|p| p.name == *first)?;
    let secret = secret || p.secret;
    let field_path = join_path(field_prefix, p.field);

    match p.kind {
        PropertyKind::Leaf => rest.is_empty().then_some(ResolvedKey {
            field_path,
            mapper: p.mapper,
            secret,
        }),
        PropertyKind::Branch(children) => {
            if rest.is_empty() {
                None
            } else {
                resolve_segments(children(), rest, &field_path, secret)
            }
        }
        PropertyKind::List(children) => {
            let (index, rest) = rest.split_first()?;
            index.parse::<usize>().ok()?;
            resolve_item(p, children, index, rest, &field_path, secret)
        }
        PropertyKind::Map(children) => {
            let (entry, rest) = rest.split_first()?;
            if entry.is_empty() {
                return None;
            }
            resolve_item(p, children, entry, rest, &field_path, secret)
        }
    }
}

fn resolve_item(
    container: &'static PropertyInfo,
    children: Children,
    item_segment: &str,
    rest: &[&str],
    field_path: &str,
    secret: bool,
) -> Option<ResolvedKey> {
    let item_path = join_path(field_path, item_segment);
    match children {
        Children::Leaf => rest.is_empty().then_some(ResolvedKey {
            field_path: item_path,
            mapper: container.mapper,
            secret,
        }),
        Children::Branch(children) => {
            if rest.is_empty() {
                None
            } else {
                resolve_segments(children(), rest, &item_path, secret)
            }
        }
    }
}

fn join_path(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}.{segment}")
    }
}

fn join_env(prefix: &str, segment: &str) -> String {
    if prefix.is_empty() {
        segment.to_string()
    } else {
        format!("{prefix}_{segment}")
    }
}

/// Upper-case a key segment into an exportable env var segment. Stored
/// segments may contain characters shells reject (`max-size`), so
/// anything non-alphanumeric becomes `_`.
fn env_segment(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Find similar key or variable names using Levenshtein edit distance.
/// Returns up to 3 suggestions sorted by similarity.
pub(crate) fn similar_keys(unknown: &str, known: &HashSet<&str>) -> Vec<String> {
    let unknown_lower = unknown.to_lowercase();
    let mut suggestions: Vec<(String, usize)> = known
        .iter()
        .filter_map(|&known_key| {
            let known_lower = known_key.to_lowercase();
            let distance = levenshtein_distance(&unknown_lower, &known_lower);
            let threshold = (unknown.len().max(known_key.len()) * 3) / 10;
            if distance <= threshold.max(3) {
                Some((known_key.to_string(), distance))
            } else {
                None
            }
        })
        .collect();

    suggestions.sort_by_key(|(_, dist)| *dist);
    suggestions.truncate(3);
    suggestions.into_iter().map(|(s, _)| s).collect()
}

pub(crate) fn levenshtein_distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let a_len = a_chars.len();
    let b_len = b_chars.len();

    if a_len == 0 {
        return b_len;
    }
    if b_len == 0 {
        return a_len;
    }

    let mut prev_row: Vec<usize> = (0..=b_len).collect();
    let mut curr_row = vec![0; b_len + 1];

    for (i, a_char) in a_chars.iter().enumerate() {
        curr_row[0] = i + 1;

        for (j, b_char) in b_chars.iter().enumerate() {
            let cost = if a_char == b_char { 0 } else { 1 };
            curr_row[j + 1] = (prev_row[j + 1] + 1)
                .min(curr_row[j] + 1)
                .min(prev_row[j] + cost);
        }

        std::mem::swap(&mut prev_row, &mut curr_row);
    }

    prev_row[b_len]
}
