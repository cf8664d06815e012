//! The top-level retrieval loop.
//!
//! One controller drives one browser session through the state machine
//!
//! ```text
//! INIT -> LOADING(n) -> READY(n) -> EXTRACTING(n) -> ADVANCING(n) -> LOADING(n+1)
//!                                                                  \-> DONE
//! ```
//!
//! Failure transitions surface as [`RunError`] and are caught once, at the
//! outer boundary in [`PaginationController::run`]: the session is always
//! released, and whatever records were accumulated are always handed to
//! the storage sink. A failed run forwards partial data rather than
//! discarding it.

use crate::challenge::{self, ChallengeSolver};
use crate::config::ScrapeConfig;
use crate::error::{ExtractFault, RunError, is_session_fault};
use crate::extract;
use crate::results::{RunOutcome, RunReport};
use crate::selectors;
use crate::session::Session;
use crate::sinks::{AlertSink, StorageSink};
use crate::utils::screenshot_name;
use fantoccini::Locator;
use fantoccini::error::CmdError;
use std::time::Duration;

/// Bounded scroll sequence per page. Cosmetic load trigger, not
/// correctness-critical.
const SCROLL_ROUNDS: u32 = 3;

/// How long to wait for the pagination strip before concluding the listing
/// has no further pages.
const PAGINATION_WAIT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Loading(u32),
    Ready(u32),
    Extracting(u32),
    Advancing(u32),
    Done,
}

/// Drives the whole run. Owns the browser session exclusively and releases
/// it on every exit path.
pub struct PaginationController {
    session: Session,
    config: ScrapeConfig,
    solver: Option<Box<dyn ChallengeSolver>>,
    storage: Option<Box<dyn StorageSink>>,
    alerts: Option<Box<dyn AlertSink>>,
}

impl PaginationController {
    pub fn new(
        session: Session,
        config: ScrapeConfig,
        solver: Option<Box<dyn ChallengeSolver>>,
        storage: Option<Box<dyn StorageSink>>,
        alerts: Option<Box<dyn AlertSink>>,
    ) -> Self {
        Self {
            session,
            config,
            solver,
            storage,
            alerts,
        }
    }

    /// Runs to DONE or FAILED and returns the report. Never panics or
    /// propagates an error: faults end the run, not the process.
    pub async fn run(mut self) -> RunReport {
        let mut report = RunReport::new();

        match self.drive(&mut report).await {
            Ok(()) => {
                ::log::info!(
                    "Run complete: {} records across {} page(s)",
                    report.records.len(),
                    report.pages_visited
                );
                report.outcome = RunOutcome::Completed;
            }
            Err(e) => {
                ::log::error!("Run failed: {}", e);
                report.outcome = RunOutcome::Failed(e.to_string());
            }
        }

        // Best-effort hand-off happens on both outcomes, so a crash never
        // loses the pages that were already extracted.
        if let Some(storage) = &self.storage {
            storage.append_all(&report.records).await;
        }

        self.session.close().await;
        ::log::info!("Browser session closed");
        report
    }

    async fn drive(&mut self, report: &mut RunReport) -> Result<(), RunError> {
        // INIT: open the target, dwell like a human, check for a challenge.
        self.session
            .goto(&self.config.target_url)
            .await
            .map_err(|e| self.nav_fault(e, 1))?;
        let dwell = self.config.pacing.initial_dwell.sample();
        ::log::info!("Initial page loaded, pausing for {:.2}s", dwell.as_secs_f64());
        tokio::time::sleep(dwell).await;
        self.challenge_check().await;

        let mut state = State::Loading(1);
        loop {
            state = match state {
                State::Loading(page) => self.load(page).await?,
                State::Ready(page) => self.ready(page).await?,
                State::Extracting(page) => {
                    self.extract_page(page, report).await?;
                    State::Advancing(page)
                }
                State::Advancing(page) => self.advance(page).await?,
                State::Done => break,
            };
        }
        Ok(())
    }

    async fn challenge_check(&self) -> bool {
        challenge::check_and_resolve(&self.session, self.solver.as_deref(), &self.config.pacing)
            .await
    }

    /// LOADING(n): wait for the grid or the no-results marker. A timeout
    /// gets exactly one challenge-mediated retry; a second timeout kills
    /// the run, because a dead page cannot self-recover.
    async fn load(&mut self, page: u32) -> Result<State, RunError> {
        ::log::info!("--- Page {} ---", page);
        let wait = self.config.grid_wait();
        ::log::info!("Waiting up to {}s for the product grid...", wait.as_secs());

        match self.session.wait_for(selectors::PAGE_READY, wait).await {
            Ok(_) => Ok(State::Ready(page)),
            Err(CmdError::WaitTimeout) => {
                ::log::warn!("Timed out waiting for page {}, checking for a challenge", page);
                if self.challenge_check().await {
                    ::log::info!("Challenge intervention attempted, retrying wait");
                    match self
                        .session
                        .wait_for(selectors::PAGE_READY, self.config.retry_wait())
                        .await
                    {
                        Ok(_) => Ok(State::Ready(page)),
                        Err(CmdError::WaitTimeout) => self.page_load_failed(page).await,
                        Err(e) => Err(self.load_fault(e, page)),
                    }
                } else {
                    ::log::warn!("No challenge found on the stalled page");
                    self.page_load_failed(page).await
                }
            }
            Err(e) => Err(self.load_fault(e, page)),
        }
    }

    async fn page_load_failed(&self, page: u32) -> Result<State, RunError> {
        self.session
            .save_screenshot(&screenshot_name("timeout", page))
            .await;
        Err(RunError::PageLoad { page })
    }

    /// READY(n): a rendered page showing the no-results marker ends the
    /// run cleanly.
    async fn ready(&mut self, page: u32) -> Result<State, RunError> {
        match self.session.find(selectors::NO_RESULTS).await {
            Ok(marker) => match marker.text().await {
                Ok(text) if text.to_lowercase().contains(selectors::NO_RESULTS_TEXT) => {
                    ::log::info!("'No results found' detected, stopping pagination");
                    Ok(State::Done)
                }
                Ok(_) => Ok(State::Extracting(page)),
                Err(e) if is_session_fault(&e) => Err(RunError::Session { page, source: e }),
                Err(_) => Ok(State::Extracting(page)),
            },
            Err(e) if e.is_no_such_element() => Ok(State::Extracting(page)),
            Err(e) if is_session_fault(&e) => Err(RunError::Session { page, source: e }),
            Err(_) => Ok(State::Extracting(page)),
        }
    }

    /// EXTRACTING(n): scroll, enumerate product nodes, extract each with
    /// pacing, dispatch alerts for qualifying records.
    async fn extract_page(&mut self, page: u32, report: &mut RunReport) -> Result<(), RunError> {
        report.pages_visited = page;

        for _ in 0..SCROLL_ROUNDS {
            if let Err(e) = self.session.scroll_page().await {
                if is_session_fault(&e) {
                    return Err(RunError::Session { page, source: e });
                }
                ::log::debug!("Scroll step failed: {}", e);
                break;
            }
            self.config.pacing.scroll_pause.pause().await;
        }

        let items = match self.session.find_all(selectors::PRODUCT_CARD).await {
            Ok(items) => items,
            Err(e) if is_session_fault(&e) => {
                return Err(RunError::Session { page, source: e });
            }
            Err(e) => {
                ::log::warn!("Failed to enumerate product nodes on page {}: {}", page, e);
                Vec::new()
            }
        };

        let total = items.len();
        ::log::info!("Found {} product containers on page {}", total, page);
        if total == 0 {
            ::log::warn!("Grid was present but no product containers found on page {}", page);
        }

        let mut scraped = 0usize;
        for item in &items {
            self.config.pacing.item_pause.pause().await;

            let record = match extract::extract_product(item).await {
                Ok(record) => record,
                Err(ExtractFault::Stale) => {
                    ::log::warn!("Stale product node on page {}, skipping item", page);
                    continue;
                }
                Err(ExtractFault::Session(e)) => {
                    return Err(RunError::Session { page, source: e });
                }
            };
            scraped += 1;

            if record.discount_percent >= self.config.min_alert_discount {
                if let Some(alerts) = &self.alerts {
                    alerts.alert(&record, self.config.min_alert_discount).await;
                    report.alerts_sent += 1;
                    tokio::time::sleep(Duration::from_millis(
                        self.config.pacing.post_alert_pause_ms,
                    ))
                    .await;
                }
            }

            report.records.push(record);

            if scraped % 20 == 0 || scraped == total {
                ::log::info!("Extracted {}/{} items on page {}", scraped, total, page);
            }
        }

        ::log::info!(
            "Finished page {}. Total records so far: {}",
            page,
            report.records.len()
        );
        Ok(())
    }

    /// ADVANCING(n): stop at the page limit or the natural end of
    /// pagination, otherwise click through and loop.
    async fn advance(&mut self, page: u32) -> Result<State, RunError> {
        if page >= self.config.max_pages {
            ::log::info!("Reached the page limit ({}), stopping", self.config.max_pages);
            return Ok(State::Done);
        }

        let next_selector = selectors::next_page_link(page);
        ::log::info!("Looking for the next page link ({})...", next_selector);

        // The strip is rebuilt client-side after each load; give it a moment.
        let strip = match self
            .session
            .wait_for(selectors::PAGINATION, PAGINATION_WAIT)
            .await
        {
            Ok(el) => el,
            Err(CmdError::WaitTimeout) => {
                ::log::info!("No pagination strip found, reached the last page");
                return Ok(State::Done);
            }
            Err(e) => return Err(self.nav_fault(e, page)),
        };

        let link = match strip.find(Locator::Css(&next_selector)).await {
            Ok(el) => el,
            Err(e) if e.is_no_such_element() => {
                ::log::info!("No next-page link found, reached the end of pagination");
                return Ok(State::Done);
            }
            Err(e) => {
                self.session
                    .save_screenshot(&screenshot_name("next_page_error", page))
                    .await;
                return Err(self.nav_fault(e, page));
            }
        };

        ::log::info!("Next page link found, clicking through to page {}", page + 1);
        if let Err(e) = link.click().await {
            self.session
                .save_screenshot(&screenshot_name("next_page_error", page))
                .await;
            return Err(self.nav_fault(e, page));
        }

        self.config.pacing.navigation_pause.pause().await;
        self.challenge_check().await;
        Ok(State::Loading(page + 1))
    }

    fn nav_fault(&self, e: CmdError, page: u32) -> RunError {
        if is_session_fault(&e) {
            RunError::Session { page, source: e }
        } else {
            RunError::Navigation { page, source: e }
        }
    }

    fn load_fault(&self, e: CmdError, page: u32) -> RunError {
        if is_session_fault(&e) {
            RunError::Session { page, source: e }
        } else {
            ::log::error!("Readiness wait failed on page {}: {}", page, e);
            RunError::PageLoad { page }
        }
    }
}
