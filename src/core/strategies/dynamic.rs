use super::{build_record, RawFields, RosterStrategy};
use crate::core::headers::CanonicalField;
use crate::core::season::{parse_selector, Season};
use crate::domain::model::{Extraction, Team};
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use scraper::{Html, Selector};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::OnceLock;

const DEFAULT_KEYS: &[(&str, CanonicalField)] = &[
    ("jerseyNumber", CanonicalField::Jersey),
    ("jersey", CanonicalField::Jersey),
    ("uniformNumber", CanonicalField::Jersey),
    ("number", CanonicalField::Jersey),
    ("fullName", CanonicalField::Name),
    ("displayName", CanonicalField::Name),
    ("name", CanonicalField::Name),
    ("firstName", CanonicalField::FirstName),
    ("lastName", CanonicalField::LastName),
    ("positionShort", CanonicalField::Position),
    ("position.abbreviation", CanonicalField::Position),
    ("position.name", CanonicalField::Position),
    ("position", CanonicalField::Position),
    ("heightDisplay", CanonicalField::Height),
    ("height", CanonicalField::Height),
    ("academicYear", CanonicalField::AcademicYear),
    ("classYear", CanonicalField::AcademicYear),
    ("year", CanonicalField::AcademicYear),
    ("hometown", CanonicalField::Hometown),
    ("highSchool", CanonicalField::HighSchool),
    ("previousSchool", CanonicalField::PreviousSchool),
    ("major", CanonicalField::Major),
    ("url", CanonicalField::ProfileUrl),
    ("profileUrl", CanonicalField::ProfileUrl),
    ("bioUrl", CanonicalField::ProfileUrl),
];

/// Programmatic key paths (dot separated, case-insensitive) to canonical
/// fields. Earlier entries win when several keys are present.
#[derive(Debug, Clone)]
pub struct KeyTable {
    entries: Vec<(String, CanonicalField)>,
}

impl Default for KeyTable {
    fn default() -> Self {
        Self {
            entries: DEFAULT_KEYS
                .iter()
                .map(|(key, field)| (key.to_string(), *field))
                .collect(),
        }
    }
}

impl KeyTable {
    /// Per-site keys are consulted before the defaults. Overrides naming an
    /// unknown field are skipped with a warning.
    pub fn with_overrides(mut self, overrides: &HashMap<String, String>) -> Self {
        let mut sorted: Vec<_> = overrides.iter().collect();
        sorted.sort();
        let mut extra = Vec::with_capacity(sorted.len());
        for (key, field) in sorted {
            match field.parse::<CanonicalField>() {
                Ok(f) => extra.push((key.clone(), f)),
                Err(e) => tracing::warn!("Ignoring key table entry '{}': {}", key, e),
            }
        }
        extra.append(&mut self.entries);
        self.entries = extra;
        self
    }

    fn has_name_key(&self, object: &Value) -> bool {
        self.entries.iter().any(|(path, field)| {
            matches!(
                field,
                CanonicalField::Name | CanonicalField::FirstName | CanonicalField::LastName
            ) && lookup(object, path).and_then(scalar_text).is_some()
        })
    }

    fn read(&self, object: &Value) -> RawFields {
        let mut raw = RawFields::default();
        for (path, field) in &self.entries {
            if let Some(text) = lookup(object, path).and_then(scalar_text) {
                raw.set(*field, text);
            }
        }
        raw
    }
}

fn lookup<'a>(value: &'a Value, path: &str) -> Option<&'a Value> {
    path.split('.').try_fold(value, |current, segment| {
        current
            .as_object()?
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(segment))
            .map(|(_, v)| v)
    })
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn state_assignment_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"window\.__[A-Za-z0-9_]+__\s*=\s*").expect("state assignment regex")
    })
}

/// Slice of `text` holding the JSON value that opens at `start`, matching
/// brackets while skipping string contents.
fn balanced_json(text: &str, start: usize) -> Option<&str> {
    let bytes = text.as_bytes();
    if !matches!(bytes.get(start), Some(b'{') | Some(b'[')) {
        return None;
    }
    let mut depth = 0usize;
    let mut in_string = false;
    let mut escaped = false;
    for (offset, &b) in bytes[start..].iter().enumerate() {
        if in_string {
            match b {
                _ if escaped => escaped = false,
                b'\\' => escaped = true,
                b'"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match b {
            b'"' => in_string = true,
            b'{' | b'[' => depth += 1,
            b'}' | b']' => {
                depth = depth.checked_sub(1)?;
                if depth == 0 {
                    return Some(&text[start..start + offset + 1]);
                }
            }
            _ => {}
        }
    }
    None
}

/// Reads client-rendered pages by pulling the player list out of the state
/// blob the page ships with.
pub struct DynamicStrategy {
    keys: KeyTable,
    roster_path: Option<String>,
    scripts: Selector,
}

impl DynamicStrategy {
    pub fn new(keys: KeyTable, roster_path: Option<String>) -> Result<Self> {
        Ok(Self {
            keys,
            roster_path,
            scripts: parse_selector("script")?,
        })
    }

    fn blobs(&self, content: &str) -> Vec<Value> {
        let document = Html::parse_document(content);
        let mut blobs = Vec::new();
        for script in document.select(&self.scripts) {
            let text: String = script.text().collect();
            let element = script.value();
            let is_json = matches!(
                element.attr("type"),
                Some("application/json") | Some("application/ld+json")
            ) || element.id() == Some("__NEXT_DATA__");

            if is_json {
                match serde_json::from_str::<Value>(text.trim()) {
                    Ok(value) => blobs.push(value),
                    Err(e) => tracing::debug!("Skipping unparseable JSON script: {}", e),
                }
                continue;
            }

            for m in state_assignment_re().find_iter(&text) {
                let Some(slice) = balanced_json(&text, m.end()) else {
                    continue;
                };
                match serde_json::from_str::<Value>(slice) {
                    Ok(value) => blobs.push(value),
                    Err(e) => tracing::debug!("Skipping unparseable state assignment: {}", e),
                }
            }
        }
        blobs
    }

    fn player_array<'a>(&self, blob: &'a Value) -> Option<&'a Vec<Value>> {
        match &self.roster_path {
            Some(pointer) => blob.pointer(pointer).and_then(Value::as_array),
            None => self.find_player_array(blob),
        }
    }

    /// Depth-first. Object members follow serde_json's map order, which sorts keys by default.
    fn find_player_array<'a>(&self, value: &'a Value) -> Option<&'a Vec<Value>> {
        match value {
            Value::Array(items) => {
                let is_players = items.iter().any(|item| item.is_object() && self.keys.has_name_key(item));
                if is_players {
                    return Some(items);
                }
                items.iter().find_map(|item| self.find_player_array(item))
            }
            Value::Object(map) => map.values().find_map(|v| self.find_player_array(v)),
            _ => None,
        }
    }
}

impl RosterStrategy for DynamicStrategy {
    fn name(&self) -> &'static str {
        "dynamic"
    }

    fn parse(&self, content: &str, team: &Team, season: &Season) -> Result<Extraction> {
        let blobs = self.blobs(content);
        if blobs.is_empty() {
            return Err(EtlError::structural("no embedded data blob"));
        }

        let players = blobs
            .iter()
            .find_map(|blob| self.player_array(blob))
            .ok_or_else(|| match &self.roster_path {
                Some(pointer) => {
                    EtlError::structural(format!("no player array at '{}'", pointer))
                }
                None => EtlError::structural("no player array in embedded data"),
            })?;

        let mut extraction = Extraction::default();
        for player in players.iter().filter(|p| p.is_object()) {
            let raw = self.keys.read(player);
            extraction.push(build_record(team, season, &raw, self.name()));
        }
        Ok(extraction)
    }
}
