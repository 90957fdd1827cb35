use super::{build_record, element_text, RawFields, RosterStrategy};
use crate::core::extractors::clean_text;
use crate::core::headers::{CanonicalField, HeaderMapper, HeaderMapping};
use crate::core::season::{parse_selector, Season};
use crate::domain::model::{Extraction, Team};
use crate::utils::error::{EtlError, Result};
use scraper::{ElementRef, Html, Selector};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableMode {
    /// Column meaning comes from the header row.
    HeaderDriven,
    /// Each cell names its own field (`data-label`, a label span or a class).
    AttributeLabeled,
}

pub struct TableStrategy {
    mode: TableMode,
    mapper: HeaderMapper,
    table: Selector,
    head_row: Selector,
    row: Selector,
    link: Selector,
}

impl TableStrategy {
    pub fn new(mode: TableMode) -> Result<Self> {
        Ok(Self {
            mode,
            mapper: HeaderMapper::new(),
            table: parse_selector("table")?,
            head_row: parse_selector("thead tr")?,
            row: parse_selector("tr")?,
            link: parse_selector("a[href]")?,
        })
    }

    pub fn with_aliases(mut self, aliases: &HashMap<String, String>) -> Self {
        self.mapper = self.mapper.with_aliases(aliases);
        self
    }

    fn first_href(&self, el: &ElementRef<'_>) -> Option<String> {
        el.select(&self.link)
            .next()
            .and_then(|a| a.value().attr("href"))
            .map(str::to_string)
    }

    fn parse_header_driven(&self, document: &Html, team: &Team, season: &Season) -> Result<Extraction> {
        for table in document.select(&self.table) {
            let Some(header_row) = table
                .select(&self.head_row)
                .next()
                .or_else(|| table.select(&self.row).next())
            else {
                continue;
            };
            let labels: Vec<String> = row_cells(&header_row).iter().map(raw_text).collect();
            let mappings = self.mapper.map_all(&labels);
            let has_name_column = mappings.iter().any(|m| {
                matches!(
                    m.field(),
                    Some(CanonicalField::Name | CanonicalField::FirstName | CanonicalField::LastName)
                )
            });
            if !has_name_column {
                continue;
            }

            let mut extraction = Extraction::default();
            extraction.unmapped_headers = mappings
                .iter()
                .filter_map(|m| match m {
                    HeaderMapping::Unmapped(label) if !label.is_empty() => Some(label.clone()),
                    _ => None,
                })
                .collect();

            for row in table.select(&self.row) {
                if row.id() == header_row.id() {
                    continue;
                }
                let cells = row_cells(&row);
                if !cells.iter().any(|c| c.value().name() == "td") {
                    continue;
                }

                let mut raw = RawFields::default();
                for (cell, mapping) in cells.iter().zip(&mappings) {
                    let Some(field) = mapping.field() else {
                        continue;
                    };
                    raw.set(field, element_text(cell));
                    if field == CanonicalField::Name {
                        if let Some(href) = self.first_href(cell) {
                            raw.set(CanonicalField::ProfileUrl, href);
                        }
                    }
                }
                if !raw.has(CanonicalField::ProfileUrl) {
                    if let Some(href) = self.first_href(&row) {
                        raw.set(CanonicalField::ProfileUrl, href);
                    }
                }
                extraction.push(build_record(team, season, &raw, self.name()));
            }
            return Ok(extraction);
        }

        Err(EtlError::structural("no table with a recognizable name column"))
    }

    fn cell_label(&self, cell: &ElementRef<'_>) -> CellLabel {
        if let Some(label) = cell.value().attr("data-label") {
            return match self.mapper.map(label) {
                HeaderMapping::Field(field) => CellLabel::Field(field, element_text(cell)),
                HeaderMapping::Unmapped(label) => CellLabel::Unmapped(label),
            };
        }

        if let Some(first) = cell.children().filter_map(ElementRef::wrap).next() {
            if first.value().name() == "span" {
                // Raw text: the cleaner would strip "Pos.:" style labels outright.
                let label = raw_text(&first);
                match self.mapper.map(&label) {
                    HeaderMapping::Field(field) => {
                        let full = raw_text(cell);
                        let value = full.strip_prefix(label.as_str()).unwrap_or(&full);
                        return CellLabel::Field(field, clean_text(value));
                    }
                    // Only a "Label:" span is a label; other spans wrap the value.
                    HeaderMapping::Unmapped(_) if label.ends_with(':') => {
                        return CellLabel::Unmapped(label.trim_end_matches(':').trim().to_string());
                    }
                    HeaderMapping::Unmapped(_) => {}
                }
            }
        }

        cell.value()
            .classes()
            .find_map(|class| self.mapper.map(&class.replace(['-', '_'], " ")).field())
            .map(|field| CellLabel::Field(field, element_text(cell)))
            .unwrap_or(CellLabel::None)
    }

    fn parse_attribute_labeled(&self, document: &Html, team: &Team, season: &Season) -> Result<Extraction> {
        let mut extraction = Extraction::default();
        let mut labelled_rows = 0usize;

        for row in document.select(&self.row) {
            if in_thead(&row) {
                continue;
            }
            let cells = row_cells(&row);
            if !cells.iter().any(|c| c.value().name() == "td") {
                continue;
            }

            let mut raw = RawFields::default();
            let mut labelled = false;
            for cell in cells {
                let (field, value) = match self.cell_label(&cell) {
                    CellLabel::Field(field, value) => (field, value),
                    CellLabel::Unmapped(label) => {
                        if !label.is_empty() && !extraction.unmapped_headers.contains(&label) {
                            extraction.unmapped_headers.push(label);
                        }
                        continue;
                    }
                    CellLabel::None => continue,
                };
                labelled = true;
                if field == CanonicalField::Name {
                    if let Some(href) = self.first_href(&cell) {
                        raw.set(CanonicalField::ProfileUrl, href);
                    }
                }
                raw.set(field, value);
            }
            if !labelled {
                continue;
            }
            labelled_rows += 1;
            if !raw.has(CanonicalField::ProfileUrl) {
                if let Some(href) = self.first_href(&row) {
                    raw.set(CanonicalField::ProfileUrl, href);
                }
            }
            extraction.push(build_record(team, season, &raw, self.name()));
        }

        if labelled_rows == 0 {
            return Err(EtlError::structural("no table rows with labelled cells"));
        }
        Ok(extraction)
    }
}

/// What a single cell says about itself in attribute-labeled tables.
enum CellLabel {
    Field(CanonicalField, String),
    Unmapped(String),
    None,
}

fn in_thead(row: &ElementRef<'_>) -> bool {
    row.ancestors()
        .filter_map(ElementRef::wrap)
        .any(|el| el.value().name() == "thead")
}

fn raw_text(el: &ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Direct `th`/`td` children, in column order.
fn row_cells<'a>(row: &ElementRef<'a>) -> Vec<ElementRef<'a>> {
    row.children()
        .filter_map(ElementRef::wrap)
        .filter(|el| matches!(el.value().name(), "td" | "th"))
        .collect()
}

impl RosterStrategy for TableStrategy {
    fn name(&self) -> &'static str {
        match self.mode {
            TableMode::HeaderDriven => "table",
            TableMode::AttributeLabeled => "table_labeled",
        }
    }

    fn parse(&self, content: &str, team: &Team, season: &Season) -> Result<Extraction> {
        let document = Html::parse_document(content);
        let extraction = match self.mode {
            TableMode::HeaderDriven => self.parse_header_driven(&document, team, season)?,
            TableMode::AttributeLabeled => self.parse_attribute_labeled(&document, team, season)?,
        };
        if !extraction.unmapped_headers.is_empty() {
            tracing::debug!("{}: unmapped headers {:?}", team.name, extraction.unmapped_headers);
        }
        Ok(extraction)
    }
}
