//! Network Speed Tester - Main CLI Application
//!
//! Measures latency, jitter and download/upload throughput against an HTTP
//! sink and prints a graded report.

use clap::Parser;
use network_speed_tester::{app::App, cli::Cli, error::ErrorReporter};
use std::process;

#[tokio::main]
async fn main() {
    // Set up better panic handling
    std::panic::set_hook(Box::new(|panic_info| {
        eprintln!("Application panic: {}", panic_info);
        eprintln!("Please report this issue at: https://github.com/MaurUppi/network-speed-tester/issues");
        process::exit(99);
    }));

    let cli = Cli::parse();
    let reporter = ErrorReporter::new(cli.use_colors(), cli.verbose || cli.debug);

    let result = match App::new(cli) {
        Ok(app) => app.run().await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        reporter.report_error(&e);
        process::exit(e.exit_code());
    }
}
