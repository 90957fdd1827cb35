//! Stateless text normalizers for roster fields.
//!
//! None of these fail: missing or unusable input yields an empty value, and
//! text that is not recognized passes through instead of being guessed at.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;

macro_rules! cached_regex {
    ($name:ident, $pattern:expr) => {
        fn $name() -> &'static Regex {
            static RE: OnceLock<Regex> = OnceLock::new();
            RE.get_or_init(|| Regex::new($pattern).expect(concat!("regex ", stringify!($name))))
        }
    };
}

cached_regex!(whitespace_re, r"\s+");
cached_regex!(trailer_re, r"(?i)\s*(Full Bio|Instagram|Twitter|Opens in a new window)\b.*$");
cached_regex!(
    label_re,
    r"(?i)^\s*(?:Hometown\s*/\s*(?:High School|Previous School|Last School)|Class|Cl\.?|Yr\.?|Year|Hometown|High school|Previous College|Previous School|Last School|Ht\.?|Height|Pos\.?|Position|Major|No\.?|Jersey Number|Number)\s*:\s*"
);
cached_regex!(
    position_abbrev_re,
    r"(?i)\b(GK|G|DEF|DF|CB|FB|WB|LB|RB|D|MID|MF|CM|DM|AM|M|FWD|FW|FOR|CF|ST|W|F)\b"
);
cached_regex!(
    position_word_re,
    r"(?i)(goalkeeper|goalie|keeper|defender|defence|defense|back|midfielder|midfield|forward|striker|winger|attacker)"
);
cached_regex!(
    height_imperial_re,
    r#"(\d)\s*(?:'|′|’|ft\.?|feet)\s*(\d{1,2})\s*(?:''|"|″|”|in\.?|inches)?"#
);
cached_regex!(height_dash_re, r"\b([4-7])-(\d{1,2})\b");
cached_regex!(height_meters_re, r"(?i)\b([12])[.,](\d{2})\s*m\b");
cached_regex!(height_cm_re, r"(?i)\b(1\d{2}|2[0-2]\d)\s*cm\b");
cached_regex!(digits_re, r"\d+");
cached_regex!(origin_delimiter_re, r"\s*(?:/|\|)\s*|\s+-\s+");
cached_regex!(college_re, r"(?i)\b(University|College|Institute|Polytechnic|Tech|CC)\b");
cached_regex!(ordinal_year_re, r"(?i)^(1st|2nd|3rd|4th|5th|6th|first|second|third|fourth|fifth|sixth)(?:[\s-]*year)?$");

/// Collapse whitespace and drop trailing social-media or bio link text.
pub fn clean_text(text: &str) -> String {
    let collapsed = whitespace_re().replace_all(text.trim(), " ");
    let without_trailer = trailer_re().replace(&collapsed, "");
    clean_field_labels(without_trailer.trim())
}

/// Strip a leading "Label:" prefix that some sites render inside the value cell.
pub fn clean_field_labels(text: &str) -> String {
    label_re().replace(text, "").trim().to_string()
}

/// Normalize a position to GK, D, M or F.
///
/// Abbreviations are tried before full words. When several positions are
/// listed ("D/M", "Midfielder/Defender") the leftmost one wins. Text that
/// names no known position is returned cleaned but otherwise unchanged.
pub fn extract_position(text: &str) -> String {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return String::new();
    }

    if let Some(m) = position_abbrev_re().find(&cleaned) {
        let code = match m.as_str().to_ascii_uppercase().as_str() {
            "GK" | "G" => "GK",
            "DEF" | "DF" | "CB" | "FB" | "WB" | "LB" | "RB" | "D" => "D",
            "MID" | "MF" | "CM" | "DM" | "AM" | "M" => "M",
            _ => "F",
        };
        return code.to_string();
    }

    if let Some(m) = position_word_re().find(&cleaned) {
        let code = match m.as_str().to_ascii_lowercase().as_str() {
            "goalkeeper" | "goalie" | "keeper" => "GK",
            "defender" | "defence" | "defense" | "back" => "D",
            "midfielder" | "midfield" => "M",
            _ => "F",
        };
        return code.to_string();
    }

    cleaned
}

/// A height in normalized imperial form with an optional metric companion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Height {
    pub imperial: Option<String>,
    pub metric: Option<String>,
}

impl Height {
    pub fn is_empty(&self) -> bool {
        self.imperial.is_none() && self.metric.is_none()
    }

    /// Primary value for the record's `height` column.
    pub fn primary(&self) -> String {
        self.imperial
            .clone()
            .or_else(|| self.metric.clone())
            .unwrap_or_default()
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.imperial, &self.metric) {
            (Some(i), Some(m)) => write!(f, "{} / {}", i, m),
            (Some(i), None) => f.write_str(i),
            (None, Some(m)) => f.write_str(m),
            (None, None) => Ok(()),
        }
    }
}

/// Parse imperial (`6'2"`, `6-2`, `6 ft 2 in`), metric (`1.88m`, `188 cm`)
/// or combined heights. Unparseable text gives an empty `Height`.
pub fn extract_height(text: &str) -> Height {
    let text = text.trim();
    if text.is_empty() {
        return Height::default();
    }

    let imperial = height_imperial_re()
        .captures(text)
        .or_else(|| height_dash_re().captures(text))
        .and_then(|caps| {
            let feet: u32 = caps.get(1)?.as_str().parse().ok()?;
            let inches: u32 = caps.get(2)?.as_str().parse().ok()?;
            ((4..=7).contains(&feet) && inches < 12).then(|| format!("{}'{}\"", feet, inches))
        });

    let metric = height_meters_re()
        .captures(text)
        .and_then(|caps| Some(format!("{}.{}m", caps.get(1)?.as_str(), caps.get(2)?.as_str())))
        .or_else(|| {
            height_cm_re().captures(text).and_then(|caps| {
                let cm: u32 = caps.get(1)?.as_str().parse().ok()?;
                Some(format!("{}.{:02}m", cm / 100, cm % 100))
            })
        });

    Height { imperial, metric }
}

/// First run of digits, so `#07`, `No. 7` and ` 7 ` give `07`, `7`, `7`.
/// Placeholders without digits (`--`, `N/A`) pass through verbatim.
pub fn extract_jersey_number(text: &str) -> String {
    let cleaned = clean_field_labels(text.trim());
    match digits_re().find(&cleaned) {
        Some(m) => m.as_str().to_string(),
        None => cleaned,
    }
}

/// Hometown and schools split from a combined "City, ST / School / College" cell.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Origin {
    segments: Vec<String>,
}

impl Origin {
    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn hometown(&self) -> &str {
        self.segments.first().map(String::as_str).unwrap_or("")
    }

    pub fn high_school(&self) -> &str {
        match self.segments.get(1) {
            Some(second) if !looks_like_college(second) => second,
            _ => "",
        }
    }

    pub fn previous_school(&self) -> String {
        let second = self.segments.get(1).filter(|s| looks_like_college(s));
        let rest = self.segments.iter().skip(2);
        second
            .into_iter()
            .chain(rest)
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(ORIGIN_JOINER)
    }

    pub fn rejoin(&self) -> String {
        self.segments.join(ORIGIN_JOINER)
    }
}

const ORIGIN_JOINER: &str = " / ";

fn looks_like_college(segment: &str) -> bool {
    college_re().is_match(segment)
}

fn origin_segments(text: &str) -> Vec<String> {
    let cleaned = clean_text(text);
    origin_delimiter_re()
        .split(&cleaned)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Split on `/`, `|` or ` - ` only. Commas stay inside "City, Region".
pub fn parse_hometown_school(text: &str) -> Origin {
    Origin {
        segments: origin_segments(text),
    }
}

/// The input with every delimiter rewritten to the canonical ` / `.
pub fn normalize_origin(text: &str) -> String {
    origin_segments(text).join(ORIGIN_JOINER)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcademicYear {
    Freshman,
    Sophomore,
    Junior,
    Senior,
    FifthYear,
    SixthYear,
    Graduate,
    RedshirtFreshman,
    RedshirtSophomore,
    RedshirtJunior,
    RedshirtSenior,
}

impl AcademicYear {
    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicYear::Freshman => "Freshman",
            AcademicYear::Sophomore => "Sophomore",
            AcademicYear::Junior => "Junior",
            AcademicYear::Senior => "Senior",
            AcademicYear::FifthYear => "Fifth Year",
            AcademicYear::SixthYear => "Sixth Year",
            AcademicYear::Graduate => "Graduate",
            AcademicYear::RedshirtFreshman => "Redshirt Freshman",
            AcademicYear::RedshirtSophomore => "Redshirt Sophomore",
            AcademicYear::RedshirtJunior => "Redshirt Junior",
            AcademicYear::RedshirtSenior => "Redshirt Senior",
        }
    }

    fn redshirt(self) -> Self {
        match self {
            AcademicYear::Freshman => AcademicYear::RedshirtFreshman,
            AcademicYear::Sophomore => AcademicYear::RedshirtSophomore,
            AcademicYear::Junior => AcademicYear::RedshirtJunior,
            AcademicYear::Senior => AcademicYear::RedshirtSenior,
            other => other,
        }
    }

    fn from_token(token: &str) -> Option<Self> {
        let t = token.trim().trim_end_matches('.').to_ascii_lowercase();
        if let Some(caps) = ordinal_year_re().captures(&t) {
            return match caps.get(1)?.as_str() {
                "1st" | "first" => Some(AcademicYear::Freshman),
                "2nd" | "second" => Some(AcademicYear::Sophomore),
                "3rd" | "third" => Some(AcademicYear::Junior),
                "4th" | "fourth" => Some(AcademicYear::Senior),
                "5th" | "fifth" => Some(AcademicYear::FifthYear),
                _ => Some(AcademicYear::SixthYear),
            };
        }
        for prefix in ["redshirt ", "redshirt-", "r-", "rs-", "rs ", "r "] {
            if let Some(rest) = t.strip_prefix(prefix) {
                return Self::from_token(rest).map(AcademicYear::redshirt);
            }
        }
        match t.as_str() {
            "fr" | "fy" | "fresh" | "freshman" | "first-year" | "first year" => Some(AcademicYear::Freshman),
            "so" | "soph" | "sophomore" => Some(AcademicYear::Sophomore),
            "jr" | "junior" => Some(AcademicYear::Junior),
            "sr" | "senior" => Some(AcademicYear::Senior),
            "gr" | "grad" | "graduate" | "graduate student" | "gs" => Some(AcademicYear::Graduate),
            _ => None,
        }
    }
}

/// Map a class-year token to the closed vocabulary. Hybrid values such as
/// "Jr./Sr." resolve to the first listed year. Unknown tokens come back unchanged.
pub fn normalize_academic_year(text: &str) -> String {
    let cleaned = clean_text(text);
    if cleaned.is_empty() {
        return String::new();
    }
    if let Some(year) = AcademicYear::from_token(&cleaned) {
        return year.as_str().to_string();
    }
    let first = cleaned.split('/').next().unwrap_or_default();
    match AcademicYear::from_token(first) {
        Some(year) => year.as_str().to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_abbreviations() {
        assert_eq!(extract_position("GK"), "GK");
        assert_eq!(extract_position("MF"), "M");
        assert_eq!(extract_position("fw"), "F");
        assert_eq!(extract_position("Pos.: DEF"), "D");
        assert_eq!(extract_position(" D "), "D");
    }

    #[test]
    fn test_position_full_words() {
        assert_eq!(extract_position("Midfielder"), "M");
        assert_eq!(extract_position("Goalkeeper"), "GK");
        assert_eq!(extract_position("Forward"), "F");
        assert_eq!(extract_position("Defender"), "D");
    }

    #[test]
    fn test_position_hybrid_takes_first_listed() {
        assert_eq!(extract_position("D/M"), "D");
        assert_eq!(extract_position("M/F"), "M");
        assert_eq!(extract_position("Midfielder/Defender"), "M");
    }

    #[test]
    fn test_position_abbreviation_beats_words() {
        assert_eq!(extract_position("Forward (D)"), "D");
    }

    #[test]
    fn test_position_unknown_passes_through() {
        assert_eq!(extract_position("Utility"), "Utility");
        assert_eq!(extract_position(""), "");
    }

    #[test]
    fn test_height_imperial_variants() {
        assert_eq!(extract_height("6'2\"").primary(), "6'2\"");
        assert_eq!(extract_height("6′2″").primary(), "6'2\"");
        assert_eq!(extract_height("6’ 2”").primary(), "6'2\"");
        assert_eq!(extract_height("5-11").primary(), "5'11\"");
        assert_eq!(extract_height("6 ft 0 in").primary(), "6'0\"");
    }

    #[test]
    fn test_height_metric_and_combined() {
        let metric = extract_height("1.88m");
        assert_eq!(metric.imperial, None);
        assert_eq!(metric.metric.as_deref(), Some("1.88m"));

        let combined = extract_height("6'2\" / 1.88m");
        assert_eq!(combined.imperial.as_deref(), Some("6'2\""));
        assert_eq!(combined.metric.as_deref(), Some("1.88m"));

        assert_eq!(extract_height("185 cm").metric.as_deref(), Some("1.85m"));
    }

    #[test]
    fn test_height_unparseable_is_empty() {
        assert!(extract_height("").is_empty());
        assert!(extract_height("tall").is_empty());
        assert!(extract_height("2024-25").is_empty());
        assert!(extract_height("9'14\"").is_empty());
    }

    #[test]
    fn test_height_idempotent_on_display() {
        for raw in ["6'2\"", "6-2", "6'2\" / 1.88m", "1.88 m", "190cm", "5′9″"] {
            let once = extract_height(raw);
            let twice = extract_height(&once.to_string());
            assert_eq!(once, twice, "input {}", raw);
        }
    }

    #[test]
    fn test_jersey_number() {
        assert_eq!(extract_jersey_number("#10"), "10");
        assert_eq!(extract_jersey_number(" 7 "), "7");
        assert_eq!(extract_jersey_number("No.: 12"), "12");
        assert_eq!(extract_jersey_number("00"), "00");
        assert_eq!(extract_jersey_number("--"), "--");
        assert_eq!(extract_jersey_number("N/A"), "N/A");
        assert_eq!(extract_jersey_number(""), "");
    }

    #[test]
    fn test_hometown_school_split() {
        let origin = parse_hometown_school("Chapel Hill, NC / Chapel Hill High School");
        assert_eq!(origin.hometown(), "Chapel Hill, NC");
        assert_eq!(origin.high_school(), "Chapel Hill High School");
        assert_eq!(origin.previous_school(), "");
    }

    #[test]
    fn test_hometown_school_college_and_three_parts() {
        let college = parse_hometown_school("London, England | University of Kent");
        assert_eq!(college.hometown(), "London, England");
        assert_eq!(college.high_school(), "");
        assert_eq!(college.previous_school(), "University of Kent");

        let three = parse_hometown_school("Austin, Texas - Westlake HS - Texas Tech");
        assert_eq!(three.hometown(), "Austin, Texas");
        assert_eq!(three.high_school(), "Westlake HS");
        assert_eq!(three.previous_school(), "Texas Tech");
    }

    #[test]
    fn test_hometown_never_splits_on_comma() {
        let origin = parse_hometown_school("Winston-Salem, N.C.");
        assert_eq!(origin.segments().len(), 1);
        assert_eq!(origin.hometown(), "Winston-Salem, N.C.");
    }

    #[test]
    fn test_hometown_strips_label_and_trailer() {
        let origin = parse_hometown_school("Hometown/High School: Dallas, Texas / Jesuit Instagram");
        assert_eq!(origin.hometown(), "Dallas, Texas");
        assert_eq!(origin.high_school(), "Jesuit");
    }

    #[test]
    fn test_hometown_round_trip() {
        for raw in [
            "Chapel Hill, NC / Chapel Hill HS",
            "Lyon, France|INSA Lyon| Duke University",
            "Austin, Texas - Westlake",
            "Toronto, Ontario",
        ] {
            assert_eq!(parse_hometown_school(raw).rejoin(), normalize_origin(raw));
        }
    }

    #[test]
    fn test_academic_year_abbreviations() {
        assert_eq!(normalize_academic_year("So"), "Sophomore");
        assert_eq!(normalize_academic_year("Jr."), "Junior");
        assert_eq!(normalize_academic_year("FR"), "Freshman");
        assert_eq!(normalize_academic_year("Gr."), "Graduate");
        assert_eq!(normalize_academic_year("R-So."), "Redshirt Sophomore");
        assert_eq!(normalize_academic_year("Redshirt Senior"), "Redshirt Senior");
    }

    #[test]
    fn test_academic_year_ordinals() {
        assert_eq!(normalize_academic_year("1st"), "Freshman");
        assert_eq!(normalize_academic_year("3rd Year"), "Junior");
        assert_eq!(normalize_academic_year("Fifth-Year"), "Fifth Year");
        assert_eq!(normalize_academic_year("First-Year"), "Freshman");
    }

    #[test]
    fn test_academic_year_hybrid_and_unknown() {
        assert_eq!(normalize_academic_year("Jr./Sr."), "Junior");
        assert_eq!(normalize_academic_year("Cl.: Sr."), "Senior");
        assert_eq!(normalize_academic_year("Post-Bac"), "Post-Bac");
        assert_eq!(normalize_academic_year(""), "");
    }
}
