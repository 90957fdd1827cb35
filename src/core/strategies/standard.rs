use super::{build_record, element_text, RawFields, RosterStrategy};
use crate::core::headers::{CanonicalField, HeaderMapper};
use crate::core::season::{parse_selector, Season};
use crate::domain::model::{Extraction, Team};
use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Html, Selector};

/// Alternatives per field, tried in order inside each player unit.
const FIELD_SELECTORS: &[(CanonicalField, &[&str])] = &[
    (
        CanonicalField::Jersey,
        &[
            ".sidearm-roster-player-jersey-number",
            ".sidearm-roster-list-item-photo-number",
            ".s-stamp__text",
            "[class*=\"jersey-number\"]",
        ],
    ),
    (
        CanonicalField::Name,
        &[
            ".sidearm-roster-player-name a",
            ".sidearm-roster-player-name h3",
            ".sidearm-roster-list-item-name a",
            ".s-person-details__personal-single-line",
            "h3 a",
            "h3",
        ],
    ),
    (
        CanonicalField::Position,
        &[
            ".sidearm-roster-player-position-long-short",
            ".sidearm-roster-player-position .text-bold",
            ".sidearm-roster-player-position",
            ".sidearm-roster-list-item-position",
        ],
    ),
    (CanonicalField::Height, &[".sidearm-roster-player-height"]),
    (
        CanonicalField::AcademicYear,
        &[".sidearm-roster-player-academic-year", ".sidearm-roster-list-item-year"],
    ),
    (CanonicalField::Major, &[".sidearm-roster-player-major"]),
    (
        CanonicalField::Hometown,
        &[".sidearm-roster-player-hometown", ".sidearm-roster-list-item-hometown"],
    ),
    (CanonicalField::HighSchool, &[".sidearm-roster-player-highschool"]),
    (
        CanonicalField::PreviousSchool,
        &[".sidearm-roster-player-previous-school"],
    ),
    (
        CanonicalField::ProfileUrl,
        &[
            ".sidearm-roster-player-name a[href]",
            ".sidearm-roster-list-item-name a[href]",
            ".s-person-details__personal-single-line a[href]",
            "h3 a[href]",
        ],
    ),
];

const UNIT_SELECTOR: &str =
    "li.sidearm-roster-player, div.sidearm-roster-list-item, div.s-person-card";

/// Parses card/list layouts where each player is a repeated block with
/// class-labelled children (Sidearm and look-alikes).
pub struct StandardStrategy {
    unit: Selector,
    fields: Vec<(CanonicalField, Vec<Selector>)>,
    // Newer cards render "<span class=sr-only>Position</span> Midfielder" pairs.
    labelled_items: Selector,
    hidden_label: Selector,
    mapper: HeaderMapper,
}

impl StandardStrategy {
    pub fn new() -> Result<Self> {
        let fields = FIELD_SELECTORS
            .iter()
            .map(|(field, css)| {
                let selectors = css.iter().map(|c| parse_selector(c)).collect::<Result<Vec<_>>>()?;
                Ok((*field, selectors))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            unit: parse_selector(UNIT_SELECTOR)?,
            fields,
            labelled_items: parse_selector(".s-person-details__bio-stats-item")?,
            hidden_label: parse_selector(".sr-only")?,
            mapper: HeaderMapper::new(),
        })
    }

    fn read_unit(&self, unit: &ElementRef<'_>) -> RawFields {
        let mut raw = RawFields::default();
        for (field, selectors) in &self.fields {
            for selector in selectors {
                let Some(el) = unit.select(selector).next() else {
                    continue;
                };
                let value = if *field == CanonicalField::ProfileUrl {
                    el.value().attr("href").unwrap_or_default().to_string()
                } else {
                    element_text(&el)
                };
                if !value.is_empty() {
                    raw.set(*field, value);
                    break;
                }
            }
        }

        for item in unit.select(&self.labelled_items) {
            let Some(label_el) = item.select(&self.hidden_label).next() else {
                continue;
            };
            let label = element_text(&label_el);
            let full = element_text(&item);
            let value = full.strip_prefix(label.as_str()).unwrap_or(&full).trim();
            if let Some(field) = self.mapper.map(&label).field() {
                raw.set(field, value);
            }
        }
        raw
    }
}

impl RosterStrategy for StandardStrategy {
    fn name(&self) -> &'static str {
        "standard"
    }

    fn parse(&self, content: &str, team: &Team, season: &Season) -> Result<Extraction> {
        let document = Html::parse_document(content);
        let units: Vec<ElementRef<'_>> = document.select(&self.unit).collect();
        if units.is_empty() {
            return Err(EtlError::structural(format!(
                "no player units matching '{}'",
                UNIT_SELECTOR
            )));
        }

        let mut extraction = Extraction::default();
        for unit in &units {
            let raw = self.read_unit(unit);
            extraction.push(build_record(team, season, &raw, self.name()));
        }
        tracing::debug!(
            "{}: {} player units, {} records",
            team.name,
            units.len(),
            extraction.records.len()
        );
        Ok(extraction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SIDEARM_PAGE: &str = r#"
<html><head><title>2024-25 Men's Soccer Roster - University at Albany</title></head>
<body>
<ul class="sidearm-roster-players">
  <li class="sidearm-roster-player">
    <div class="sidearm-roster-player-jersey"><span class="sidearm-roster-player-jersey-number">1</span></div>
    <div class="sidearm-roster-player-name"><h3><a href="/sports/mens-soccer/roster/alex-keeper/100">Alex Keeper</a></h3></div>
    <div class="sidearm-roster-player-position"><span class="sidearm-roster-player-position-long-short">GK</span>
      <span class="sidearm-roster-player-height">6'3"</span></div>
    <span class="sidearm-roster-player-academic-year">Sr.</span>
    <span class="sidearm-roster-player-major">Business</span>
    <span class="sidearm-roster-player-hometown">Albany, N.Y.</span>
    <span class="sidearm-roster-player-highschool">Shaker HS</span>
  </li>
  <li class="sidearm-roster-player">
    <span class="sidearm-roster-player-jersey-number">10</span>
    <div class="sidearm-roster-player-name"><h3><a href="/sports/mens-soccer/roster/ben-mid/101">Ben Mid</a></h3></div>
    <span class="sidearm-roster-player-position-long-short">M/F</span>
    <span class="sidearm-roster-player-academic-year">R-So.</span>
    <span class="sidearm-roster-player-hometown">Madrid, Spain</span>
    <span class="sidearm-roster-player-previous-school">Syracuse University</span>
  </li>
</ul>
</body></html>"#;

    fn team() -> Team {
        Team::new("14", "Albany", "https://ualbanysports.com/sports/mens-soccer").with_division("I")
    }

    fn season() -> Season {
        Season::parse("2024-25").unwrap()
    }

    #[test]
    fn test_parses_sidearm_units_in_order() {
        let strategy = StandardStrategy::new().unwrap();
        let extraction = strategy.parse(SIDEARM_PAGE, &team(), &season()).unwrap();
        assert_eq!(extraction.records.len(), 2);

        let keeper = &extraction.records[0];
        assert_eq!(keeper.name, "Alex Keeper");
        assert_eq!(keeper.jersey.as_deref(), Some("1"));
        assert_eq!(keeper.position, "GK");
        assert_eq!(keeper.height, "6'3\"");
        assert_eq!(keeper.academic_year, "Senior");
        assert_eq!(keeper.major, "Business");
        assert_eq!(keeper.hometown, "Albany, N.Y.");
        assert_eq!(keeper.high_school, "Shaker HS");
        assert_eq!(
            keeper.url,
            "https://ualbanysports.com/sports/mens-soccer/roster/alex-keeper/100"
        );
        assert_eq!(keeper.strategy, "standard");

        let mid = &extraction.records[1];
        assert_eq!(mid.name, "Ben Mid");
        assert_eq!(mid.position, "M");
        assert_eq!(mid.academic_year, "Redshirt Sophomore");
        assert_eq!(mid.major, "");
        assert_eq!(mid.previous_school, "Syracuse University");
    }

    #[test]
    fn test_nameless_unit_contributes_nothing() {
        let html = r#"<ul><li class="sidearm-roster-player">
            <span class="sidearm-roster-player-jersey-number">4</span>
            <span class="sidearm-roster-player-position-long-short">D</span>
        </li></ul>"#;
        let strategy = StandardStrategy::new().unwrap();
        let extraction = strategy.parse(html, &team(), &season()).unwrap();
        assert!(extraction.records.is_empty());
        assert_eq!(extraction.dropped_blocks, 1);
    }

    #[test]
    fn test_missing_container_is_structural_error() {
        let strategy = StandardStrategy::new().unwrap();
        let result = strategy.parse("<table><tr><td>7</td></tr></table>", &team(), &season());
        assert!(matches!(result, Err(EtlError::StructuralError { .. })));
    }

    #[test]
    fn test_person_card_labelled_stats() {
        let html = r#"<div class="s-person-card">
            <span class="s-stamp__text">22</span>
            <div class="s-person-details__personal-single-line"><a href="/roster/cara-wing/9">Cara Wing</a></div>
            <div class="s-person-details__bio-stats-item"><span class="sr-only">Position</span> Forward</div>
            <div class="s-person-details__bio-stats-item"><span class="sr-only">Academic Year</span> Fr.</div>
            <div class="s-person-details__bio-stats-item"><span class="sr-only">Height</span> 5' 6''</div>
        </div>"#;
        let strategy = StandardStrategy::new().unwrap();
        let extraction = strategy.parse(html, &team(), &season()).unwrap();
        let record = &extraction.records[0];
        assert_eq!(record.name, "Cara Wing");
        assert_eq!(record.jersey.as_deref(), Some("22"));
        assert_eq!(record.position, "F");
        assert_eq!(record.academic_year, "Freshman");
        assert_eq!(record.height, "5'6\"");
        assert_eq!(record.url, "https://ualbanysports.com/roster/cara-wing/9");
    }
}
