use crate::core::season::{Season, SeasonForm};
use crate::domain::model::{EntityKind, FormatParams};
use crate::utils::error::{EtlError, Result};

/// Season representation a URL format needs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Needs {
    Form(SeasonForm),
    /// No season in the path; the verifier guards the page instead.
    None,
    /// Several candidates mixing both forms.
    Both,
}

struct BuiltinFormat {
    keys: &'static [&'static str],
    needs: Needs,
    templates: &'static [&'static str],
}

const BUILTIN_FORMATS: &[BuiltinFormat] = &[
    BuiltinFormat {
        keys: &["default"],
        needs: Needs::Form(SeasonForm::Range),
        templates: &["{base}/{entity}/{season}"],
    },
    BuiltinFormat {
        keys: &["single_year", "msoc_plain"],
        needs: Needs::Form(SeasonForm::Single),
        templates: &["{base}/{entity}/{season}"],
    },
    BuiltinFormat {
        keys: &["season_path", "msoc_index"],
        needs: Needs::Form(SeasonForm::Range),
        templates: &["{base}/{season}/{entity}"],
    },
    BuiltinFormat {
        keys: &["current"],
        needs: Needs::None,
        templates: &["{base}/{entity}"],
    },
    BuiltinFormat {
        keys: &["fallback"],
        needs: Needs::Both,
        templates: &[
            "{base}/{entity}",
            "{base}/{entity}/{single}",
            "{base}/{range_long}/{entity}",
        ],
    },
];

/// Candidate URLs for one team page, most likely first.
pub fn build(
    base_url: &str,
    season: &Season,
    format_key: &str,
    entity: EntityKind,
    params: &FormatParams,
) -> Result<Vec<String>> {
    let base = normalize_base(base_url);

    if format_key == "template" {
        let template = params.url_template.as_deref().ok_or_else(|| {
            EtlError::config("url_format 'template' requires params.url_template")
        })?;
        return Ok(vec![expand(template, &base, season, SeasonForm::Range, entity)]);
    }

    let format = BUILTIN_FORMATS
        .iter()
        .find(|f| f.keys.contains(&format_key))
        .ok_or_else(|| EtlError::config(format!("unknown url_format '{}'", format_key)))?;

    let form = match format.needs {
        Needs::Form(form) => form,
        Needs::None | Needs::Both => SeasonForm::Range,
    };
    let urls = format
        .templates
        .iter()
        .map(|t| expand(t, &base, season, form, entity))
        .collect();
    Ok(urls)
}

/// Trailing slashes go, and so does a trailing `/index` page name.
fn normalize_base(base_url: &str) -> String {
    let trimmed = base_url.trim().trim_end_matches('/');
    trimmed
        .strip_suffix("/index")
        .unwrap_or(trimmed)
        .trim_end_matches('/')
        .to_string()
}

fn expand(template: &str, base: &str, season: &Season, form: SeasonForm, entity: EntityKind) -> String {
    template
        .replace("{base}", base)
        .replace("{entity}", entity.path_segment())
        .replace("{season}", &season.render(form))
        .replace("{single}", &season.single())
        .replace("{range}", &season.range())
        .replace("{range_long}", &season.range_long())
}
