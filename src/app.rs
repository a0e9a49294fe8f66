//! Main application orchestration and execution

use crate::{
    build_info,
    cli::Cli,
    config::{display_config_summary, load_config, validate_config},
    error::Result,
    executor::SpeedTestEngine,
    logging::LoggerFactory,
    models::{Config, SpeedTestReport},
    output::{OutputCoordinator, OutputFormatterFactory},
};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        Ok(Self { cli })
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        let config = load_config(self.cli.clone())?;

        if config.debug {
            eprintln!("{}", build_info::summary());
            eprintln!("\nConfiguration Summary:");
            eprintln!("{}\n", display_config_summary(&config));
        }

        // Warnings go to stderr so --json output stays parseable
        let warnings = validate_config(&config)?;
        for warning in &warnings {
            eprintln!("{}", warning.format(config.enable_color));
        }

        let output = Arc::new(OutputCoordinator::new(
            OutputFormatterFactory::create_formatter(config.enable_color, config.verbose),
            config.json_output,
        ));

        let report = self.measure(&config, output.clone()).await;
        output.finish_progress();

        let report = report?;
        println!("{}", output.display_report(&report)?);
        Ok(())
    }

    /// Drive the full measurement sequence, aborting on Ctrl-C
    async fn measure(&self, config: &Config, output: Arc<OutputCoordinator>) -> Result<SpeedTestReport> {
        let logger = LoggerFactory::new(config.clone()).create_logger("ENGINE").await;

        let progress = output.clone();
        let engine = Arc::new(
            SpeedTestEngine::from_config(config)?
                .with_logger(Arc::new(logger))
                .with_progress(move |event| progress.display_progress(event)),
        );

        if !config.json_output {
            eprintln!("Testing against {}", config.download_url);
        }

        let interrupted = engine.clone();
        let signal_task = tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                interrupted.abort();
            }
        });

        let result = engine.run_all().await;
        signal_task.abort();

        if let Err(e) = &result {
            if let Some(partial) = e.partial_throughput() {
                output.finish_progress();
                if let Ok(block) = output.formatter().format_throughput(partial) {
                    eprintln!("Partial result before cancellation:\n{}", block);
                }
            }
        }

        result
    }
}
