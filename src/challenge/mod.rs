//! Bot-challenge detection and resolution.
//!
//! The detector inspects the live page for two kinds of blockage: a
//! browser-check interstitial (recognized by its title) and an embedded
//! challenge widget (recognized by its iframe). Widgets are handed to an
//! external [`ChallengeSolver`]; the returned token is injected into the
//! page's response fields.
//!
//! Nothing in this module is allowed to abort the run. Every failure is
//! logged and degrades to "unresolved"; the caller re-checks page
//! readiness regardless of what is reported here.

pub mod providers;
pub mod solver;

pub use providers::Provider;
pub use solver::{ChallengeSolver, HttpSolver, SolverError};

use crate::session::Session;
use crate::utils::PacingConfig;
use scraper::{Html, Selector};
use serde_json::json;
use std::time::Duration;

/// Title fragments of known browser-check interstitials.
const INTERSTITIAL_PHRASES: [&str; 2] = ["checking your browser", "just a moment"];

/// Widget embeds, regardless of provider, carry "captcha" in the frame src.
const WIDGET_FRAME_CSS: &str = "iframe[src*='captcha']";

/// Drops the solution token into whichever response field the page has.
const INJECT_TOKEN: &str = "\
    var elH = document.getElementsByName('h-captcha-response')[0];\
    var elG = document.getElementById('g-recaptcha-response');\
    if (elH) { elH.innerHTML = arguments[0]; }\
    if (elG) { elG.innerHTML = arguments[0]; }";

/// Submit control some challenge forms expose after the token lands.
const SUBMIT_BUTTON_CSS: &str = "form button[type='submit']";

/// True when a page title reads like a browser-check interstitial.
pub fn is_interstitial(title: &str) -> bool {
    let lower = title.to_lowercase();
    INTERSTITIAL_PHRASES.iter().any(|p| lower.contains(p))
}

/// Probes page source for a challenge widget frame and returns its embed
/// src. Parsing the source instead of querying live elements keeps this
/// safe while the page is mid-challenge and re-rendering.
pub fn find_widget_frame(html: &str) -> Option<String> {
    let doc = Html::parse_document(html);
    let frame_selector = Selector::parse(WIDGET_FRAME_CSS).ok()?;
    doc.select(&frame_selector)
        .find_map(|el| el.value().attr("src").map(|s| s.to_string()))
}

/// Checks the current page for a challenge and attempts to pass it.
///
/// Returns whether an intervention was *attempted*, which is not a
/// guarantee of success: the caller must re-check page readiness
/// afterward. With no solver configured this is a no-op reporting `false`.
pub async fn check_and_resolve(
    session: &Session,
    solver: Option<&dyn ChallengeSolver>,
    pacing: &PacingConfig,
) -> bool {
    let Some(solver) = solver else {
        return false;
    };

    ::log::info!("Checking for challenge...");

    // Interstitial check: these usually clear on their own, so wait out one
    // cooldown and re-inspect rather than involving the solver.
    match session.title().await {
        Ok(title) if is_interstitial(&title) => {
            ::log::warn!("Browser-check interstitial detected, waiting it out");
            tokio::time::sleep(Duration::from_millis(pacing.interstitial_cooldown_ms)).await;
            match session.title().await {
                Ok(title) if is_interstitial(&title) => {
                    ::log::warn!("Interstitial persisted after cooldown");
                }
                Ok(_) => ::log::info!("Interstitial seems to have passed"),
                Err(e) => ::log::warn!("Could not re-read page title: {}", e),
            }
            return true;
        }
        Ok(_) => {}
        Err(e) => {
            ::log::warn!("Could not read page title: {}", e);
            return false;
        }
    }

    // Widget probe.
    let source = match session.source().await {
        Ok(source) => source,
        Err(e) => {
            ::log::warn!("Could not read page source: {}", e);
            return false;
        }
    };
    let Some(embed_src) = find_widget_frame(&source) else {
        ::log::debug!("No challenge widget detected");
        return false;
    };

    let Some((provider, site_key)) = providers::identify(&embed_src) else {
        ::log::warn!(
            "Challenge frame found but provider/site key unidentified: {}",
            embed_src
        );
        return false;
    };

    let page_url = match session.current_url().await {
        Ok(url) => url,
        Err(e) => {
            ::log::warn!("Could not read current URL: {}", e);
            return false;
        }
    };

    ::log::info!("Challenge detected ({}), site key {}", provider, site_key);

    let token = match solver.solve(provider, &site_key, &page_url).await {
        Ok(token) => token,
        Err(e) => {
            ::log::warn!("Challenge solving failed: {}", e);
            return false;
        }
    };

    ::log::info!("Challenge solved, submitting token");
    if let Err(e) = session.execute(INJECT_TOKEN, vec![json!(token)]).await {
        ::log::warn!("Failed to inject solution token: {}", e);
        return false;
    }

    // Some forms need an explicit submit; most fire their own callback.
    match session.find(SUBMIT_BUTTON_CSS).await {
        Ok(button) => match button.click().await {
            Ok(_) => ::log::info!("Clicked challenge form submit button"),
            Err(e) => ::log::debug!("Submit button click failed: {}", e),
        },
        Err(_) => ::log::debug!("No obvious challenge submit button found"),
    }

    tokio::time::sleep(Duration::from_millis(pacing.challenge_settle_ms)).await;
    true
}
