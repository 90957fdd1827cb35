use clap::Parser;
use roster_etl::core::url_builder;
use roster_etl::utils::error::ErrorSeverity;
use roster_etl::utils::{logger, validation::Validate};
use roster_etl::{
    check_team_urls, CliConfig, ConfigRegistry, EtlEngine, EtlError, HttpFetcher, LocalStorage, RosterManager,
    RosterPipeline, RunConfig, Season,
};
use std::sync::Arc;

fn exit_code(severity: ErrorSeverity) -> i32 {
    match severity {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    }
}

fn fail(context: &str, e: &EtlError) -> ! {
    tracing::error!(
        "❌ {}: {} (Category: {:?}, Severity: {:?})",
        context,
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 {}", e.recovery_suggestion());
    std::process::exit(exit_code(e.severity()).max(1));
}

fn load_config(cli: &CliConfig) -> roster_etl::Result<(RunConfig, Season, ConfigRegistry)> {
    let config = cli.resolve()?;
    config.validate()?;
    let season = config.season()?;
    let registry = config.registry()?;
    Ok((config, season, registry))
}

/// Print the candidate URLs each selected team would be fetched from.
fn print_plan(config: &RunConfig, season: &Season, registry: &ConfigRegistry) {
    let teams = registry.select(&config.filter());
    println!("Season {}: {} teams selected", season, teams.len());
    for team in teams {
        match url_builder::build(&team.base_url, season, &team.url_format, config.run.entity, &team.params) {
            Ok(urls) => println!("{} [{}] ({}): {}", team.name, team.id, team.platform, urls.join(" | ")),
            Err(e) => println!("{} [{}]: {}", team.name, team.id, e),
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = CliConfig::parse();

    if cli.log_json {
        logger::init_json_logger(cli.verbose);
    } else {
        logger::init_cli_logger(cli.verbose);
    }
    tracing::info!("Starting roster-etl");
    if cli.verbose {
        tracing::debug!("CLI config: {:?}", cli);
    }

    let (config, season, registry) = match load_config(&cli) {
        Ok(loaded) => loaded,
        Err(e) => fail("Configuration failed", &e),
    };

    if cli.dry_run {
        print_plan(&config, &season, &registry);
        return Ok(());
    }

    let fetcher = Arc::new(HttpFetcher::new(&config.http)?);
    let storage = LocalStorage::new(&config.output.path);

    if cli.check_urls {
        let teams = registry.select(&config.filter());
        let report = check_team_urls(fetcher, &teams, config.concurrency.workers).await;
        let file = match report.save(&storage).await {
            Ok(file) => file,
            Err(e) => fail("Saving URL check failed", &e),
        };
        println!(
            "🔎 {} teams: {} valid, {} not found, {} errors",
            report.total(),
            report.valid.len(),
            report.not_found.len(),
            report.errors.len()
        );
        println!("📁 Saved to: {}/{}", config.output.path, file);
        return Ok(());
    }

    let manager = RosterManager::new(fetcher, Arc::new(registry), config.run_options());

    let token = manager.cancellation_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received; finishing in-flight teams");
            token.cancel("interrupted");
        }
    });

    let pipeline = RosterPipeline::new(storage, manager, season, config.filter(), config.output.path.clone())
        .with_formats(&config.output.formats);
    let engine = EtlEngine::new(pipeline);

    match engine.run().await {
        Ok(output_path) => {
            tracing::info!("✅ Roster run completed");
            println!("✅ Roster run completed");
            println!("📁 Summary saved to: {}", output_path);
        }
        Err(e) => fail("Roster run failed", &e),
    }

    Ok(())
}
