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

//! Stored value parsing and rendering utilities.
//!
//! The stored form is always a string; parsing infers bool, integer,
//! float, bracketed array or string, and rendering produces the string a
//! later parse round-trips.

use super::error::SettingsError;
use super::schema::{Children, PropertyInfo, PropertyKind};
use figment::value::{Dict, Tag, Value as FigmentValue};
use serde_json::Value as JsonValue;

/// Parse a stored value into a FigmentValue with type inference.
pub(crate) fn parse_stored_value(value: &str) -> FigmentValue {
    // Handle array syntax [a, b, c]
    if value.starts_with('[') && value.ends_with(']') {
        let inner = value.trim_start_matches('[').trim_end_matches(']');
        let elements: Vec<FigmentValue> = split_array_elements(inner)
            .into_iter()
            .map(|s| parse_stored_value(strip_quotes(s)))
            .collect();
        return FigmentValue::from(elements);
    }

    // Boolean
    match value.to_lowercase().as_str() {
        "true" => return FigmentValue::from(true),
        "false" => return FigmentValue::from(false),
        _ => {}
    }

    // Try numeric types
    if let Ok(n) = value.parse::<u64>() {
        return FigmentValue::from(n);
    }
    if let Ok(n) = value.parse::<i64>() {
        return FigmentValue::from(n);
    }
    if let Ok(n) = value.parse::<f64>() {
        return FigmentValue::from(n);
    }

    // Default to string
    FigmentValue::from(value)
}

/// Parse a stored value into a JSON value with type inference.
pub fn parse_stored_value_to_json(value: &str) -> JsonValue {
    if value.starts_with('[') && value.ends_with(']') {
        let inner = value.trim_start_matches('[').trim_end_matches(']');
        let values: Vec<JsonValue> = split_array_elements(inner)
            .into_iter()
            .map(|s| parse_stored_value_to_json(strip_quotes(s)))
            .collect();
        return JsonValue::Array(values);
    }

    match value.to_lowercase().as_str() {
        "true" => return JsonValue::Bool(true),
        "false" => return JsonValue::Bool(false),
        _ => {}
    }

    if let Ok(n) = value.parse::<u64>() {
        return JsonValue::Number(n.into());
    }
    if let Ok(n) = value.parse::<i64>() {
        return JsonValue::Number(n.into());
    }
    if let Ok(n) = value.parse::<f64>()
        && let Some(num) = serde_json::Number::from_f64(n)
    {
        return JsonValue::Number(num);
    }

    JsonValue::String(value.to_owned())
}

/// Render a JSON value into its stored string form. Objects have no flat
/// form and must be flattened into separate keys before rendering.
pub(crate) fn render_json_value(value: &JsonValue) -> Result<String, SettingsError> {
    match value {
        JsonValue::Null => Err(SettingsError::MappingFailed(
            "null has no stored form".to_string(),
        )),
        JsonValue::Bool(b) => Ok(b.to_string()),
        JsonValue::Number(n) => Ok(n.to_string()),
        JsonValue::String(s) => Ok(s.clone()),
        JsonValue::Array(items) => {
            let mut rendered = Vec::with_capacity(items.len());
            for item in items {
                let element = render_json_value(item)?;
                rendered.push(quote_array_element(element));
            }
            Ok(format!("[{}]", rendered.join(", ")))
        }
        JsonValue::Object(_) => Err(SettingsError::MappingFailed(
            "nested object has no stored form".to_string(),
        )),
    }
}

/// Elements containing separators must be quoted so a later parse splits
/// the array at the right places.
fn quote_array_element(element: String) -> String {
    if element.contains(',') || element.contains('"') {
        format!("\"{}\"", element.replace('"', "\\\""))
    } else {
        element
    }
}

pub(crate) fn split_array_elements(s: &str) -> Vec<&str> {
    let mut elements = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    for (i, c) in s.char_indices() {
        match c {
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                elements.push(s[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
    }
    if start < s.len() {
        elements.push(s[start..].trim());
    }
    elements
}

pub(crate) fn strip_quotes(s: &str) -> &str {
    s.trim_matches('"')
}

/// Insert a value into a nested dict at a dotted path, creating
/// intermediate dicts as needed.
pub(crate) fn insert_at_path(dict: &mut Dict, path: &str, value: FigmentValue) {
    let segments: Vec<&str> = path.split('.').collect();
    insert_at_path_segments(dict, &segments, value);
}

fn insert_at_path_segments(dict: &mut Dict, segments: &[&str], value: FigmentValue) {
    if segments.is_empty() {
        return;
    }

    if segments.len() == 1 {
        dict.insert(segments[0].to_string(), value);
        return;
    }

    let key = segments[0].to_string();
    dict.entry(key.clone())
        .or_insert_with(|| FigmentValue::Dict(Tag::Default, Dict::new()));

    if let Some(FigmentValue::Dict(_, inner_dict)) = dict.get_mut(&key) {
        insert_at_path_segments(inner_dict, &segments[1..], value);
    }
}

/// Convert numeric-keyed dicts to arrays, but only at positions the
/// schema declares as lists, so string-keyed maps with numeric entry
/// names survive. Index gaps are compacted in ascending order.
pub(crate) fn convert_lists_in_dict(dict: Dict, props: &'static [PropertyInfo]) -> Dict {
    dict.into_iter()
        .map(|(key, value)| {
            let converted = match props.iter().find(|p| p.field == key) {
                Some(p) => convert_property_value(value, p),
                None => value,
            };
            (key, converted)
        })
        .collect()
}

fn convert_property_value(value: FigmentValue, p: &'static PropertyInfo) -> FigmentValue {
    match (p.kind, value) {
        (PropertyKind::Branch(children), FigmentValue::Dict(tag, dict)) => {
            FigmentValue::Dict(tag, convert_lists_in_dict(dict, children()))
        }
        (PropertyKind::List(element), FigmentValue::Dict(tag, dict)) => {
            let mut indexed: Vec<(usize, FigmentValue)> = dict
                .into_iter()
                .filter_map(|(k, v)| k.parse::<usize>().ok().map(|i| (i, v)))
                .collect();
            indexed.sort_by_key(|(i, _)| *i);

            let items = indexed
                .into_iter()
                .map(|(_, v)| convert_element(v, element))
                .collect();
            FigmentValue::Array(tag, items)
        }
        (PropertyKind::Map(element), FigmentValue::Dict(tag, dict)) => {
            let converted = dict
                .into_iter()
                .map(|(k, v)| (k, convert_element(v, element)))
                .collect();
            FigmentValue::Dict(tag, converted)
        }
        (_, value) => value,
    }
}

fn convert_element(value: FigmentValue, element: Children) -> FigmentValue {
    match (element, value) {
        (Children::Branch(children), FigmentValue::Dict(tag, dict)) => {
            FigmentValue::Dict(tag, convert_lists_in_dict(dict, children()))
        }
        (_, value) => value,
    }
}
