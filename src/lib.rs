// Re-export modules
pub mod challenge;
pub mod config;
pub mod crawlers;
pub mod error;
pub mod extract;
pub mod price;
pub mod results;
pub mod selectors;
pub mod session;
pub mod sinks;
pub mod utils;

// Re-export commonly used types for convenience
pub use config::ScrapeConfig;
pub use error::RunError;
pub use results::{ProductRecord, RunOutcome, RunReport};

use challenge::ChallengeSolver;
use crawlers::PaginationController;
use session::Session;
use sinks::{AlertSink, StorageSink};

/// Builder for one scrape run.
///
/// Collaborators (solver, sinks) are injected here rather than read from
/// ambient state, so a run is fully described by what was passed in.
pub struct Scraper {
    config: ScrapeConfig,
    solver: Option<Box<dyn ChallengeSolver>>,
    storage: Option<Box<dyn StorageSink>>,
    alerts: Option<Box<dyn AlertSink>>,
}

impl Scraper {
    /// Create a new Scraper for the given results URL with default
    /// configuration.
    pub fn new(target_url: &str) -> Self {
        Self {
            config: ScrapeConfig::new(target_url),
            solver: None,
            storage: None,
            alerts: None,
        }
    }

    /// Replace the whole configuration (target URL included).
    pub fn with_config(mut self, config: ScrapeConfig) -> Self {
        self.config = config;
        self
    }

    /// Set the page limit for this run.
    pub fn with_max_pages(mut self, max_pages: u32) -> Self {
        self.config.max_pages = max_pages;
        self
    }

    /// Set the minimum discount that triggers an alert.
    pub fn with_alert_threshold(mut self, percent: f64) -> Self {
        self.config.min_alert_discount = percent;
        self
    }

    /// Attach a challenge-solving capability.
    pub fn with_solver(mut self, solver: Box<dyn ChallengeSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Attach the spreadsheet store receiving the full record list.
    pub fn with_storage(mut self, storage: Box<dyn StorageSink>) -> Self {
        self.storage = Some(storage);
        self
    }

    /// Attach the alert channel for qualifying records.
    pub fn with_alerts(mut self, alerts: Box<dyn AlertSink>) -> Self {
        self.alerts = Some(alerts);
        self
    }

    /// Open the browser session and drive the run to completion.
    ///
    /// The only error here is a failed session open; everything after that
    /// point is reported through the returned [`RunReport`], which carries
    /// partial results even when the run fails mid-flight.
    pub async fn run(self) -> Result<RunReport, RunError> {
        let mut config = self.config;

        // Override the WebDriver URL with an environment variable if provided
        if let Ok(webdriver_url) = std::env::var("WEBDRIVER_URL") {
            if !webdriver_url.is_empty() {
                config.webdriver_url = webdriver_url;
            }
        }

        let session = Session::connect(&config).await?;
        let controller =
            PaginationController::new(session, config, self.solver, self.storage, self.alerts);
        Ok(controller.run().await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults() {
        let scraper = Scraper::new("https://www.6pm.com/womens-shoes");
        assert_eq!(scraper.config.target_url, "https://www.6pm.com/womens-shoes");
        assert_eq!(scraper.config.max_pages, 2);
        assert!(scraper.solver.is_none());
        assert!(scraper.storage.is_none());
        assert!(scraper.alerts.is_none());
    }

    #[test]
    fn test_builder_overrides() {
        let scraper = Scraper::new("https://www.6pm.com/x")
            .with_max_pages(7)
            .with_alert_threshold(25.0);
        assert_eq!(scraper.config.max_pages, 7);
        assert_eq!(scraper.config.min_alert_discount, 25.0);
    }

    #[test]
    fn test_with_config_replaces_wholesale() {
        let mut config = ScrapeConfig::new("https://www.6pm.com/y");
        config.solve_challenges = true;
        let scraper = Scraper::new("https://www.6pm.com/x").with_config(config);
        assert_eq!(scraper.config.target_url, "https://www.6pm.com/y");
        assert!(scraper.config.solve_challenges);
    }
}
