//! police-stops: run vehicle-stop enforcement reports from the command line.

mod cli;

use anyhow::Context;
use cli::{Cli, Command};
use police_stops::catalog::Catalog;
use police_stops::config::Config;
use police_stops::db;
use police_stops::error::ReportError;
use police_stops::logging;
use police_stops::output::ReportOutput;
use police_stops::predict::{PredictionStub, StopForm};
use police_stops::report::{ReportExecutor, ReportParams};
use tracing::{debug, error, info};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();

    let cli = Cli::parse_args();
    if cli.log_file {
        logging::init_file_logging();
    } else {
        logging::init_stderr_logging();
    }

    if let Err(e) = run(cli).await {
        match e.downcast_ref::<ReportError>() {
            Some(report_error) => error!("{}: {:#}", report_error.category(), e),
            None => error!("{:#}", e),
        }
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config_path = cli.config_path();
    debug!("Loading config from: {}", config_path.display());
    let mut config = Config::load_from_file(&config_path)?;
    if let Some(table) = &cli.table {
        config.reports.table = table.clone();
    }

    let catalog = Catalog::new(&config.reports.table_name()?)?;
    let output = ReportOutput::new(cli.format);

    // Commands that never touch the database
    match &cli.command {
        Command::List => {
            print!("{}", output.catalog(&catalog));
            return Ok(());
        }
        Command::Predict(args) => {
            let prediction = PredictionStub::new().predict(&StopForm::from(args))?;
            print!("{}", output.prediction(&prediction));
            return Ok(());
        }
        _ => {}
    }

    let connection = cli.resolve_connection(&config)?;
    info!("Connection: {}", connection.display_string());
    let client = db::connect(&connection, &config.reports)
        .await
        .context("could not open the report database")?;
    let executor = ReportExecutor::new(client.as_ref(), &catalog);

    let outcome = match &cli.command {
        Command::Run { key, vehicle } => {
            let params = match vehicle {
                Some(vehicle) => ReportParams::new().contains("vehicle", vehicle),
                None => ReportParams::new(),
            };
            executor
                .run_key(key, &params)
                .await
                .map(|report| print!("{}", output.report(&report)))
        }
        Command::Sections { keys } => {
            let requests: Vec<(&str, ReportParams)> = keys
                .iter()
                .map(|key| (key.as_str(), ReportParams::new()))
                .collect();
            let sections = executor.run_sections(&requests).await;
            print!("{}", output.sections(&sections));
            Ok(())
        }
        Command::Overview => executor
            .overview()
            .await
            .map(|overview| print!("{}", output.overview(&overview))),
        Command::List | Command::Predict(_) => Ok(()),
    };

    client.close().await?;
    outcome.map_err(Into::into)
}
