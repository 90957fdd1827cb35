use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Schema field a raw label or key resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CanonicalField {
    Jersey,
    Name,
    FirstName,
    LastName,
    Position,
    Height,
    AcademicYear,
    Hometown,
    HighSchool,
    PreviousSchool,
    /// A combined "Hometown / High School" column, split by the origin parser.
    HometownSchool,
    Major,
    ProfileUrl,
}

impl CanonicalField {
    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalField::Jersey => "jersey",
            CanonicalField::Name => "name",
            CanonicalField::FirstName => "first_name",
            CanonicalField::LastName => "last_name",
            CanonicalField::Position => "position",
            CanonicalField::Height => "height",
            CanonicalField::AcademicYear => "class",
            CanonicalField::Hometown => "hometown",
            CanonicalField::HighSchool => "high_school",
            CanonicalField::PreviousSchool => "previous_school",
            CanonicalField::HometownSchool => "hometown_school",
            CanonicalField::Major => "major",
            CanonicalField::ProfileUrl => "url",
        }
    }
}

impl fmt::Display for CanonicalField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CanonicalField {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let field = match s.trim().to_ascii_lowercase().as_str() {
            "jersey" | "number" => CanonicalField::Jersey,
            "name" => CanonicalField::Name,
            "first_name" => CanonicalField::FirstName,
            "last_name" => CanonicalField::LastName,
            "position" => CanonicalField::Position,
            "height" => CanonicalField::Height,
            "class" | "academic_year" | "year" => CanonicalField::AcademicYear,
            "hometown" => CanonicalField::Hometown,
            "high_school" => CanonicalField::HighSchool,
            "previous_school" => CanonicalField::PreviousSchool,
            "hometown_school" => CanonicalField::HometownSchool,
            "major" => CanonicalField::Major,
            "url" | "profile_url" => CanonicalField::ProfileUrl,
            other => return Err(format!("unknown canonical field '{}'", other)),
        };
        Ok(field)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HeaderMapping {
    Field(CanonicalField),
    /// Kept with the original label so the run can report it.
    Unmapped(String),
}

impl HeaderMapping {
    pub fn field(&self) -> Option<CanonicalField> {
        match self {
            HeaderMapping::Field(f) => Some(*f),
            HeaderMapping::Unmapped(_) => None,
        }
    }
}

const SYNONYMS: &[(&str, CanonicalField)] = &[
    ("no", CanonicalField::Jersey),
    ("#", CanonicalField::Jersey),
    ("num", CanonicalField::Jersey),
    ("number", CanonicalField::Jersey),
    ("jersey", CanonicalField::Jersey),
    ("jersey number", CanonicalField::Jersey),
    ("name", CanonicalField::Name),
    ("player", CanonicalField::Name),
    ("full name", CanonicalField::Name),
    ("player name", CanonicalField::Name),
    ("first name", CanonicalField::FirstName),
    ("last name", CanonicalField::LastName),
    ("pos", CanonicalField::Position),
    ("position", CanonicalField::Position),
    ("ht", CanonicalField::Height),
    ("height", CanonicalField::Height),
    ("cl", CanonicalField::AcademicYear),
    ("class", CanonicalField::AcademicYear),
    ("yr", CanonicalField::AcademicYear),
    ("year", CanonicalField::AcademicYear),
    ("academic year", CanonicalField::AcademicYear),
    ("elig", CanonicalField::AcademicYear),
    ("eligibility", CanonicalField::AcademicYear),
    ("hometown", CanonicalField::Hometown),
    ("home town", CanonicalField::Hometown),
    ("high school", CanonicalField::HighSchool),
    ("hs", CanonicalField::HighSchool),
    ("previous school", CanonicalField::PreviousSchool),
    ("previous college", CanonicalField::PreviousSchool),
    ("prev school", CanonicalField::PreviousSchool),
    ("last school", CanonicalField::PreviousSchool),
    ("former school", CanonicalField::PreviousSchool),
    ("hometown/high school", CanonicalField::HometownSchool),
    ("hometown/previous school", CanonicalField::HometownSchool),
    ("hometown/last school", CanonicalField::HometownSchool),
    ("hometown/high school/previous school", CanonicalField::HometownSchool),
    ("major", CanonicalField::Major),
    ("academic major", CanonicalField::Major),
    ("bio", CanonicalField::ProfileUrl),
];

/// Lowercase, drop `.`/`:`, collapse whitespace and tighten spaces around `/`.
pub fn normalize_label(label: &str) -> String {
    let lowered: String = label
        .to_lowercase()
        .chars()
        .filter(|c| *c != '.' && *c != ':')
        .collect();
    lowered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace(" / ", "/")
        .replace("/ ", "/")
        .replace(" /", "/")
}

/// Maps human-facing column labels to canonical fields.
#[derive(Debug, Clone)]
pub struct HeaderMapper {
    table: HashMap<String, CanonicalField>,
}

impl Default for HeaderMapper {
    fn default() -> Self {
        let table = SYNONYMS
            .iter()
            .map(|(label, field)| (label.to_string(), *field))
            .collect();
        Self { table }
    }
}

impl HeaderMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Extra per-site synonyms. Aliases naming an unknown field are skipped with a warning.
    pub fn with_aliases(mut self, aliases: &HashMap<String, String>) -> Self {
        for (label, field) in aliases {
            match field.parse::<CanonicalField>() {
                Ok(f) => {
                    self.table.insert(normalize_label(label), f);
                }
                Err(e) => tracing::warn!("Ignoring header alias '{}': {}", label, e),
            }
        }
        self
    }

    pub fn map(&self, label: &str) -> HeaderMapping {
        match self.table.get(&normalize_label(label)) {
            Some(field) => HeaderMapping::Field(*field),
            None => HeaderMapping::Unmapped(label.trim().to_string()),
        }
    }

    pub fn map_all<S: AsRef<str>>(&self, labels: &[S]) -> Vec<HeaderMapping> {
        labels.iter().map(|l| self.map(l.as_ref())).collect()
    }
}
