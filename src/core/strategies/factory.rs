use super::{DynamicStrategy, KeyTable, RosterStrategy, StandardStrategy, TableMode, TableStrategy};
use crate::domain::model::Team;
use crate::utils::error::{EtlError, Result};

const PLATFORMS: &[&str] = &["standard", "sidearm", "table", "table_labeled", "dynamic"];

/// Builds the strategy a team's `platform` key names, with the team's own
/// header aliases and key table applied.
#[derive(Debug, Default, Clone, Copy)]
pub struct StrategyFactory;

impl StrategyFactory {
    pub fn new() -> Self {
        Self
    }

    pub fn resolve(&self, team: &Team) -> Result<Box<dyn RosterStrategy>> {
        let params = &team.params;
        let strategy: Box<dyn RosterStrategy> = match team.platform.trim().to_ascii_lowercase().as_str() {
            "standard" | "sidearm" => Box::new(StandardStrategy::new()?),
            "table" => Box::new(
                TableStrategy::new(TableMode::HeaderDriven)?.with_aliases(&params.header_aliases),
            ),
            "table_labeled" => Box::new(
                TableStrategy::new(TableMode::AttributeLabeled)?.with_aliases(&params.header_aliases),
            ),
            "dynamic" => Box::new(DynamicStrategy::new(
                KeyTable::default().with_overrides(&params.key_table),
                params.roster_path.clone(),
            )?),
            other => {
                return Err(EtlError::config(format!(
                    "unknown platform '{}' for team {} (expected one of {})",
                    other,
                    team.id,
                    PLATFORMS.join(", ")
                )))
            }
        };
        Ok(strategy)
    }
}
