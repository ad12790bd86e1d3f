use clap::Parser;

use planner::cli::Cli;
use planner::config::Config;
use planner::errors::PlannerResult;
use planner::logging::Logger;
use planner::scheduler::Scheduler;
use planner::sources::{
    CalendarSource, DashboardSource, DictionarySource, InstalledFlowProvider, PhotoSource,
    WeatherSource,
};

const CLIENT_SECRET_FILE: &str = "client_secret.json";
const TOKEN_FILE: &str = "token.json";

fn main() {
    if let Err(e) = run() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

fn run() -> PlannerResult<()> {
    let cli = Cli::parse();

    let config = Config::load(&cli.config)?;
    let logger = config.build_logger();

    logger.info("planner", "starting planner application");
    logger.info(
        "planner",
        &format!("loaded configuration from {}", cli.config),
    );
    config.log_summary(&logger);

    let sources = build_sources(&config, &logger)?;

    if cli.once {
        for source in &sources {
            logger.info("planner", &format!("single {} load", source.name()));
            if let Err(e) = source.refresh() {
                logger.error(
                    source.log_stream(),
                    &format!("{} refresh failed: {}", source.name(), e),
                );
            }
        }
        return Ok(());
    }

    let mut scheduler = Scheduler::new(logger.clone());
    for source in sources {
        logger.info("planner", &format!("launching {} task", source.name()));
        scheduler.spawn(source);
    }

    // Tasks run forever; the process exits only via external signal.
    scheduler.join();
    Ok(())
}

fn build_sources(config: &Config, logger: &Logger) -> PlannerResult<Vec<Box<dyn DashboardSource>>> {
    // Calendar credentials are validated here so a missing client secret
    // fails at startup instead of silently inside a task.
    let provider = InstalledFlowProvider::from_files(CLIENT_SECRET_FILE, TOKEN_FILE)?;

    Ok(vec![
        Box::new(WeatherSource::new(config, logger.clone())),
        Box::new(DictionarySource::new(config, logger.clone())),
        Box::new(PhotoSource::new(config, logger.clone())),
        Box::new(CalendarSource::new(
            config,
            Box::new(provider),
            logger.clone(),
        )),
    ])
}
