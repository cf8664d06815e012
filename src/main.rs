use clap::Parser;
use dealgrid::challenge::{ChallengeSolver, HttpSolver};
use dealgrid::sinks::{CsvSheet, TelegramAlerts};
use dealgrid::{RunOutcome, RunReport, ScrapeConfig, Scraper};

mod args;
use args::Args;

#[tokio::main]
async fn main() {
    // Initialize logging
    env_logger::init();

    // Parse command-line arguments
    let args = Args::parse();

    let mut config = match args.build_config() {
        Ok(config) => config,
        Err(e) => {
            ::log::error!("Failed to build configuration: {}", e);
            return;
        }
    };

    // Challenge solving is gated twice: the toggle and the key. A missing
    // key forces the toggle off so the rest of the run (wait budgets,
    // banner) reflects what will actually happen.
    let solver: Option<Box<dyn ChallengeSolver>> = if config.solve_challenges {
        match std::env::var("SOLVER_API_KEY") {
            Ok(key) if !key.is_empty() => Some(Box::new(HttpSolver::new(&key))),
            _ => {
                ::log::warn!(
                    "solve_challenges is on but SOLVER_API_KEY is not set; solving disabled"
                );
                config.solve_challenges = false;
                None
            }
        }
    } else {
        None
    };

    banner(&config);

    println!("Note: scraping requires a WebDriver server (e.g. chromedriver).");
    println!(
        "Set WEBDRIVER_URL environment variable if not using the default {}",
        config.webdriver_url
    );

    let mut scraper = Scraper::new(&config.target_url);
    if let Some(solver) = solver {
        scraper = scraper.with_solver(solver);
    }
    if config.storage_enabled {
        scraper = scraper.with_storage(Box::new(CsvSheet::new(&args.sheet)));
    }
    if config.alerts_enabled {
        if let Some(alerts) = TelegramAlerts::from_env() {
            scraper = scraper.with_alerts(Box::new(alerts));
        }
    }
    scraper = scraper.with_config(config);

    let start_time = std::time::Instant::now();
    match scraper.run().await {
        Ok(report) => summarize(&report, start_time.elapsed(), &args.out),
        Err(e) => ::log::error!("Failed to start run: {}", e),
    }
}

/// Logs the effective configuration before the run starts.
fn banner(config: &ScrapeConfig) {
    ::log::info!("--- Scraper configuration ---");
    ::log::info!("Target: {}", config.target_url);
    ::log::info!("Max pages: {}", config.max_pages);
    ::log::info!("Use proxy: {}", config.use_proxy);
    ::log::info!("Solve challenges: {}", config.solve_challenges);
    ::log::info!("Storage sink: {}", config.storage_enabled);
    ::log::info!(
        "Alerts: {} (min discount {}%)",
        config.alerts_enabled,
        config.min_alert_discount
    );
}

/// Final status report plus the local JSON artifact.
fn summarize(report: &RunReport, duration: std::time::Duration, out: &std::path::Path) {
    match &report.outcome {
        RunOutcome::Completed => ::log::info!(
            "Scraped {} products across {} page(s) in {:.2}s",
            report.records.len(),
            report.pages_visited,
            duration.as_secs_f64()
        ),
        RunOutcome::Failed(reason) => ::log::warn!(
            "Run ended early ({}); kept {} records from {} page(s)",
            reason,
            report.records.len(),
            report.pages_visited
        ),
    }
    ::log::info!("Dispatched {} alert(s)", report.alerts_sent);

    if report.records.is_empty() {
        ::log::warn!("No product data was collected");
        return;
    }
    match report.write_json(out) {
        Ok(()) => ::log::info!("Data saved to {}", out.display()),
        Err(e) => ::log::error!("Failed to save data to {}: {}", out.display(), e),
    }
}
