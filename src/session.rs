use crate::config::ScrapeConfig;
use crate::error::RunError;
use fantoccini::elements::Element;
use fantoccini::error::CmdError;
use fantoccini::{Client, ClientBuilder, Locator};
use serde_json::{Value, json};
use std::time::Duration;

/// Exclusive owner of the WebDriver session for one run.
///
/// The wrapper keeps every fantoccini call behind one seam so the
/// controller never touches the client directly, and the session is
/// guaranteed to be released through [`Session::close`] on every exit path.
pub struct Session {
    client: Client,
}

impl Session {
    /// Opens a browser session with the run's evasion capabilities applied.
    pub async fn connect(config: &ScrapeConfig) -> Result<Self, RunError> {
        ::log::info!("Connecting to WebDriver at {}", config.webdriver_url);
        let client = ClientBuilder::native()
            .capabilities(build_capabilities(config))
            .connect(&config.webdriver_url)
            .await?;
        Ok(Self { client })
    }

    pub async fn goto(&self, url: &str) -> Result<(), CmdError> {
        self.client.goto(url).await
    }

    pub async fn title(&self) -> Result<String, CmdError> {
        self.client.title().await
    }

    pub async fn current_url(&self) -> Result<String, CmdError> {
        Ok(self.client.current_url().await?.to_string())
    }

    pub async fn source(&self) -> Result<String, CmdError> {
        self.client.source().await
    }

    /// Waits up to `timeout` for an element matching `css` to appear.
    /// A timeout surfaces as [`CmdError::WaitTimeout`].
    pub async fn wait_for(&self, css: &str, timeout: Duration) -> Result<Element, CmdError> {
        self.client
            .wait()
            .at_most(timeout)
            .for_element(Locator::Css(css))
            .await
    }

    pub async fn find(&self, css: &str) -> Result<Element, CmdError> {
        self.client.find(Locator::Css(css)).await
    }

    pub async fn find_all(&self, css: &str) -> Result<Vec<Element>, CmdError> {
        self.client.find_all(Locator::Css(css)).await
    }

    pub async fn execute(&self, script: &str, args: Vec<Value>) -> Result<Value, CmdError> {
        self.client.execute(script, args).await
    }

    /// Scrolls the viewport down by one window height.
    pub async fn scroll_page(&self) -> Result<(), CmdError> {
        self.client
            .execute("window.scrollBy(0, window.innerHeight);", Vec::new())
            .await?;
        Ok(())
    }

    /// Best-effort diagnostic screenshot. Never fails the caller; a session
    /// that cannot produce a screenshot is usually already dead.
    pub async fn save_screenshot(&self, name: &str) {
        match self.client.screenshot().await {
            Ok(png) => match std::fs::write(name, &png) {
                Ok(()) => ::log::info!("Saved screenshot to {}", name),
                Err(e) => ::log::warn!("Failed to write screenshot {}: {}", name, e),
            },
            Err(e) => ::log::warn!("Could not capture screenshot: {}", e),
        }
    }

    /// Releases the browser session. Close errors are logged, not
    /// propagated; the browser may already be gone.
    pub async fn close(self) {
        if let Err(e) = self.client.close().await {
            ::log::warn!("Failed to close browser session: {}", e);
        }
    }
}

/// Chrome capabilities mirroring the evasion profile: fixed window size,
/// custom user agent, automation fingerprint suppression, and the optional
/// proxy route.
fn build_capabilities(config: &ScrapeConfig) -> serde_json::map::Map<String, Value> {
    let mut args = vec![
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "start-maximized".to_string(),
        "--window-size=1920,1080".to_string(),
        format!("user-agent={}", config.user_agent),
        "--disable-blink-features=AutomationControlled".to_string(),
    ];

    if config.use_proxy {
        match &config.proxy_address {
            Some(address) => {
                ::log::info!("Routing browser traffic through proxy");
                args.push(format!("--proxy-server={}", address));
            }
            None => {
                ::log::warn!("use_proxy is set but no proxy address is configured; no proxy used");
            }
        }
    }

    let mut caps = serde_json::map::Map::new();
    caps.insert(
        "goog:chromeOptions".to_string(),
        json!({
            "args": args,
            "excludeSwitches": ["enable-automation"],
            "useAutomationExtension": false,
        }),
    );
    caps
}

#[cfg(test)]
mod tests {
    use super::*;

    fn arg_list(caps: &serde_json::map::Map<String, Value>) -> Vec<String> {
        caps["goog:chromeOptions"]["args"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_str().unwrap().to_string())
            .collect()
    }

    #[test]
    fn test_capabilities_without_proxy() {
        let config = ScrapeConfig::new("https://www.6pm.com/x");
        let caps = build_capabilities(&config);
        let args = arg_list(&caps);
        assert!(args.iter().any(|a| a == "--no-sandbox"));
        assert!(args.iter().any(|a| a.starts_with("user-agent=")));
        assert!(!args.iter().any(|a| a.starts_with("--proxy-server=")));
    }

    #[test]
    fn test_capabilities_with_proxy() {
        let mut config = ScrapeConfig::new("https://www.6pm.com/x");
        config.use_proxy = true;
        config.proxy_address = Some("http://proxy.example.com:8080".to_string());
        let args = arg_list(&build_capabilities(&config));
        assert!(
            args.iter()
                .any(|a| a == "--proxy-server=http://proxy.example.com:8080")
        );
    }

    #[test]
    fn test_proxy_toggle_without_address_adds_nothing() {
        let mut config = ScrapeConfig::new("https://www.6pm.com/x");
        config.use_proxy = true;
        let args = arg_list(&build_capabilities(&config));
        assert!(!args.iter().any(|a| a.starts_with("--proxy-server=")));
    }
}
