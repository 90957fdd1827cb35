//! Page-shape specific roster parsers.
//!
//! Which strategy runs for a team is decided by its configured platform
//! (see [`factory::StrategyFactory`]); strategies never look at a page to
//! decide whether it is "theirs".

pub mod dynamic;
pub mod factory;
pub mod standard;
pub mod table;

use crate::core::extractors::{
    clean_text, extract_height, extract_jersey_number, extract_position, normalize_academic_year,
    parse_hometown_school,
};
use crate::core::headers::CanonicalField;
use crate::core::season::Season;
use crate::domain::model::{Extraction, RosterRecord, Team};
use crate::utils::error::Result;
use scraper::ElementRef;
use std::collections::HashMap;
use url::Url;

pub use dynamic::{DynamicStrategy, KeyTable};
pub use factory::StrategyFactory;
pub use standard::StandardStrategy;
pub use table::{TableMode, TableStrategy};

pub trait RosterStrategy: Send + Sync {
    fn name(&self) -> &'static str;

    /// Parse one fetched page into records in page order.
    ///
    /// Returns `StructuralError` only when the container this strategy expects
    /// is missing entirely. Missing optional fields are never an error.
    fn parse(&self, content: &str, team: &Team, season: &Season) -> Result<Extraction>;
}

/// Raw text per canonical field for one player block, before normalization.
#[derive(Debug, Default, Clone)]
pub(crate) struct RawFields {
    values: HashMap<CanonicalField, String>,
}

impl RawFields {
    /// First non-empty value for a field wins.
    pub(crate) fn set(&mut self, field: CanonicalField, value: impl Into<String>) {
        let value = value.into();
        if value.trim().is_empty() {
            return;
        }
        self.values.entry(field).or_insert(value);
    }

    pub(crate) fn has(&self, field: CanonicalField) -> bool {
        self.values.contains_key(&field)
    }

    fn get(&self, field: CanonicalField) -> &str {
        self.values.get(&field).map(String::as_str).unwrap_or("")
    }
}

/// Apply the field extractors and stamp team/season/strategy metadata.
pub(crate) fn build_record(team: &Team, season: &Season, raw: &RawFields, strategy: &str) -> RosterRecord {
    let mut name = clean_text(raw.get(CanonicalField::Name));
    if name.is_empty() {
        let first = clean_text(raw.get(CanonicalField::FirstName));
        let last = clean_text(raw.get(CanonicalField::LastName));
        name = format!("{} {}", first, last).trim().to_string();
    }

    let jersey = extract_jersey_number(raw.get(CanonicalField::Jersey));
    let height = extract_height(raw.get(CanonicalField::Height));

    let mut hometown = clean_text(raw.get(CanonicalField::Hometown));
    let mut high_school = clean_text(raw.get(CanonicalField::HighSchool));
    let mut previous_school = clean_text(raw.get(CanonicalField::PreviousSchool));

    // A combined cell fills whatever the dedicated cells left empty. A bare
    // hometown cell holding a delimiter is treated the same way.
    let combined = if raw.has(CanonicalField::HometownSchool) {
        Some(raw.get(CanonicalField::HometownSchool).to_string())
    } else if !raw.has(CanonicalField::HighSchool) && parse_hometown_school(&hometown).segments().len() > 1 {
        Some(hometown.clone())
    } else {
        None
    };
    if let Some(text) = combined {
        let origin = parse_hometown_school(&text);
        if hometown.is_empty() || origin.segments().len() > 1 {
            hometown = origin.hometown().to_string();
        }
        if high_school.is_empty() {
            high_school = origin.high_school().to_string();
        }
        if previous_school.is_empty() {
            previous_school = origin.previous_school();
        }
    }

    RosterRecord {
        team_id: team.id.clone(),
        team: team.name.clone(),
        season: season.to_string(),
        division: team.division.clone(),
        jersey: (!jersey.is_empty()).then_some(jersey),
        name,
        position: extract_position(raw.get(CanonicalField::Position)),
        height: height.primary(),
        academic_year: normalize_academic_year(raw.get(CanonicalField::AcademicYear)),
        major: clean_text(raw.get(CanonicalField::Major)),
        hometown,
        high_school,
        previous_school,
        url: resolve_profile_url(&team.base_url, raw.get(CanonicalField::ProfileUrl)),
        height_metric: height.metric,
        strategy: strategy.to_string(),
    }
}

/// Absolute profile URL; relative links resolve against the team's site.
pub(crate) fn resolve_profile_url(base_url: &str, href: &str) -> String {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') || href.starts_with("javascript:") {
        return String::new();
    }
    match Url::parse(base_url).and_then(|base| base.join(href)) {
        Ok(url) => url.to_string(),
        Err(_) => href.to_string(),
    }
}

pub(crate) fn element_text(el: &ElementRef<'_>) -> String {
    clean_text(&el.text().collect::<Vec<_>>().join(" "))
}
