//! Season designators and on-page season verification.
//!
//! A season can be written as a single year (`2024`) or an academic range
//! (`2024-25`, `2024-2025`). Both spellings of the same season compare equal:
//! a single year `Y` is the range `Y-(Y+1)`.

use crate::domain::model::{EntityKind, VerificationResult, VerificationStatus};
use crate::utils::error::{EtlError, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::fmt;
use std::sync::OnceLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SeasonForm {
    Single,
    Range,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Season {
    start_year: u16,
    given: SeasonForm,
}

fn season_token_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"\b((?:19|20)\d{2})(?:\s*[-–—/]\s*(\d{4}|\d{2}))?\b").expect("season token regex")
    })
}

impl Season {
    pub fn from_start_year(start_year: u16) -> Self {
        Self {
            start_year,
            given: SeasonForm::Single,
        }
    }

    /// Accepts `2024`, `2024-25`, `2024-2025` and en-dash or slash separators.
    /// A range whose second year does not follow the first is rejected.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        let caps = season_token_regex().captures(trimmed)?;
        let whole = caps.get(0)?;
        if whole.start() != 0 || whole.end() != trimmed.len() {
            return None;
        }
        Self::from_captures(&caps)
    }

    fn from_captures(caps: &regex::Captures<'_>) -> Option<Self> {
        let start_year: u16 = caps.get(1)?.as_str().parse().ok()?;
        match caps.get(2) {
            None => Some(Self {
                start_year,
                given: SeasonForm::Single,
            }),
            Some(end) => {
                let end_str = end.as_str();
                let end_year: u16 = end_str.parse().ok()?;
                let follows = if end_str.len() == 2 {
                    (start_year + 1) % 100 == end_year
                } else {
                    start_year + 1 == end_year
                };
                follows.then_some(Self {
                    start_year,
                    given: SeasonForm::Range,
                })
            }
        }
    }

    pub fn start_year(&self) -> u16 {
        self.start_year
    }

    pub fn single(&self) -> String {
        self.start_year.to_string()
    }

    pub fn range(&self) -> String {
        format!("{}-{:02}", self.start_year, (self.start_year + 1) % 100)
    }

    /// Four-digit range, `2024-2025`.
    pub fn range_long(&self) -> String {
        format!("{}-{}", self.start_year, self.start_year + 1)
    }

    pub fn render(&self, form: SeasonForm) -> String {
        match form {
            SeasonForm::Single => self.single(),
            SeasonForm::Range => self.range(),
        }
    }

    /// Same logical season regardless of spelling.
    pub fn matches(&self, other: &Season) -> bool {
        self.start_year == other.start_year
    }
}

impl fmt::Display for Season {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(self.given))
    }
}

/// Every season-like token in `text`, in order of appearance.
pub fn season_tokens(text: &str) -> Vec<(String, Season)> {
    season_token_regex()
        .captures_iter(text)
        .filter_map(|caps| {
            let token = caps.get(0)?.as_str().to_string();
            Season::from_captures(&caps).map(|season| (token, season))
        })
        .collect()
}

const EVIDENCE_LIMIT: usize = 160;

/// Confirms a fetched page shows the requested season. Fail-closed: a page
/// with no season token near the entity heading is not confirmed.
pub struct SeasonVerifier {
    headings: Selector,
    selected_options: Selector,
}

impl SeasonVerifier {
    pub fn new() -> Result<Self> {
        Ok(Self {
            headings: parse_selector("title, h1, h2, h3, caption")?,
            selected_options: parse_selector("option[selected]")?,
        })
    }

    pub fn verify(&self, content: &str, expected: &Season, kind: EntityKind) -> VerificationResult {
        let document = Html::parse_document(content);
        let keyword = kind.keyword();

        let mut candidates: Vec<String> = document
            .select(&self.headings)
            .map(|el| element_text(&el))
            .filter(|text| text.to_lowercase().contains(keyword))
            .collect();

        // Sidearm-style pages put the season in a header block or a season picker
        // rather than in the heading text itself.
        if let Ok(block) = parse_selector(&format!(
            "[class*=\"{k}-header\"], [class*=\"{k}-title\"], [class*=\"{k}-heading\"]",
            k = keyword
        )) {
            candidates.extend(document.select(&block).map(|el| element_text(&el)));
        }
        candidates.extend(
            document
                .select(&self.selected_options)
                .filter(|option| picker_mentions(option, keyword))
                .map(|el| element_text(&el)),
        );

        let mut found_tokens = Vec::new();
        for text in &candidates {
            for (token, season) in season_tokens(text) {
                if season.matches(expected) {
                    tracing::debug!("Season {} confirmed by '{}'", expected, text);
                    return VerificationResult {
                        status: VerificationStatus::Confirmed,
                        matched_token: Some(token),
                        found_tokens: vec![],
                        evidence: Some(truncate(text)),
                    };
                }
                found_tokens.push(token);
            }
        }

        let status = if found_tokens.is_empty() {
            VerificationStatus::NoToken
        } else {
            VerificationStatus::Mismatch
        };
        VerificationResult {
            status,
            matched_token: None,
            found_tokens,
            evidence: candidates.first().map(|t| truncate(t)),
        }
    }
}

fn picker_mentions(option: &ElementRef<'_>, keyword: &str) -> bool {
    option
        .ancestors()
        .filter_map(ElementRef::wrap)
        .find(|el| el.value().name() == "select")
        .map(|select| {
            let attrs = [select.value().id(), select.value().attr("name")];
            attrs
                .into_iter()
                .flatten()
                .any(|a| a.to_lowercase().contains(keyword))
        })
        .unwrap_or(false)
}

fn element_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<Vec<_>>().join(" ").split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate(text: &str) -> String {
    text.chars().take(EVIDENCE_LIMIT).collect()
}

pub(crate) fn parse_selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|e| EtlError::config(format!("invalid selector '{}': {}", css, e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn verifier() -> SeasonVerifier {
        SeasonVerifier::new().unwrap()
    }

    #[test]
    fn test_parse_single_and_range() {
        let single = Season::parse("2024").unwrap();
        let range = Season::parse("2024-25").unwrap();
        let long = Season::parse("2024-2025").unwrap();
        assert_eq!(single.range(), "2024-25");
        assert_eq!(range.single(), "2024");
        assert!(single.matches(&range));
        assert!(long.matches(&range));
        assert_eq!(range.to_string(), "2024-25");
        assert_eq!(single.to_string(), "2024");
    }

    #[test]
    fn test_parse_century_rollover() {
        let season = Season::parse("1999-00").unwrap();
        assert_eq!(season.range(), "1999-00");
        assert_eq!(Season::from_start_year(2099).range(), "2099-00");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(Season::parse("2024-27").is_none());
        assert!(Season::parse("fall 2024").is_none());
        assert!(Season::parse("").is_none());
        assert!(Season::parse("24-25").is_none());
    }

    #[test]
    fn test_verify_confirms_range_heading() {
        let html = "<html><head><title>2024-25 Men's Soccer Roster - Albany</title></head></html>";
        let result = verifier().verify(html, &Season::parse("2024").unwrap(), EntityKind::Roster);
        assert!(result.is_confirmed());
        assert_eq!(result.matched_token.as_deref(), Some("2024-25"));
    }

    #[test]
    fn test_verify_confirms_single_year_heading_for_range_request() {
        let html = "<h1>2025 Women's Soccer Roster</h1>";
        let result = verifier().verify(html, &Season::parse("2025-26").unwrap(), EntityKind::Roster);
        assert!(result.is_confirmed());
    }

    #[test]
    fn test_verify_no_token_is_not_confirmed() {
        let html = "<html><head><title>Men's Soccer Roster</title></head><body><h2>Roster</h2></body></html>";
        let result = verifier().verify(html, &Season::parse("2025").unwrap(), EntityKind::Roster);
        assert!(!result.is_confirmed());
        assert_eq!(result.status, VerificationStatus::NoToken);
    }

    #[test]
    fn test_verify_mismatch_reports_found_tokens() {
        let html = "<title>2025 Men's Soccer Roster</title>";
        let result = verifier().verify(html, &Season::parse("2023-24").unwrap(), EntityKind::Roster);
        assert_eq!(result.status, VerificationStatus::Mismatch);
        assert_eq!(result.found_tokens, vec!["2025".to_string()]);
    }

    #[test]
    fn test_verify_ignores_year_outside_entity_heading() {
        // The copyright line has a year but no roster keyword.
        let html = "<h2>Men's Soccer</h2><h3>&copy; 2025 Athletics</h3>";
        let result = verifier().verify(html, &Season::parse("2025").unwrap(), EntityKind::Roster);
        assert_eq!(result.status, VerificationStatus::NoToken);
    }

    #[test]
    fn test_verify_uses_season_picker() {
        let html = r#"<h2>Roster</h2>
            <select id="ddl_past_rosters"><option value="1">2023</option><option selected value="2">2024-25</option></select>"#;
        let result = verifier().verify(html, &Season::parse("2024").unwrap(), EntityKind::Roster);
        assert!(result.is_confirmed());
    }

    #[test]
    fn test_verify_schedule_keyword() {
        let html = "<h1>2024 Schedule</h1>";
        let v = verifier();
        let expected = Season::parse("2024").unwrap();
        assert!(v.verify(html, &expected, EntityKind::Schedule).is_confirmed());
        assert!(!v.verify(html, &expected, EntityKind::Roster).is_confirmed());
    }

    #[test]
    fn test_season_tokens_in_order() {
        let tokens = season_tokens("2023 Roster, then 2024–25 and 2025/2026");
        let labels: Vec<_> = tokens.iter().map(|(t, _)| t.as_str()).collect();
        assert_eq!(labels, vec!["2023", "2024–25", "2025/2026"]);
    }
}
