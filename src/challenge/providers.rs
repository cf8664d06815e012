use regex::Regex;

/// Challenge providers this crate knows how to hand to a solver.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    HCaptcha,
    Recaptcha,
}

impl Provider {
    /// Task-type name the solving API expects for this provider.
    pub fn solve_method(&self) -> &'static str {
        match self {
            Provider::HCaptcha => "hcaptcha",
            Provider::Recaptcha => "userrecaptcha",
        }
    }

    /// Query parameter carrying the site key for this provider.
    pub fn key_param(&self) -> &'static str {
        match self {
            Provider::HCaptcha => "sitekey",
            Provider::Recaptcha => "googlekey",
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::HCaptcha => write!(f, "hcaptcha"),
            Provider::Recaptcha => write!(f, "recaptcha"),
        }
    }
}

/// One entry in the provider dispatch table: how to recognize a provider's
/// widget embed and pull the site key out of its `src`.
struct ProviderRule {
    provider: Provider,
    host_marker: &'static str,
    key_pattern: &'static str,
}

/// Adding a provider means adding a row here, nothing else.
const RULES: [ProviderRule; 2] = [
    ProviderRule {
        provider: Provider::HCaptcha,
        host_marker: "hcaptcha.com",
        key_pattern: r"sitekey=([\w-]+)",
    },
    ProviderRule {
        provider: Provider::Recaptcha,
        host_marker: "google.com/recaptcha",
        key_pattern: r"[?&]k=([\w-]+)",
    },
];

/// Identifies the provider of a widget embed `src` and extracts its site
/// key. Returns `None` for unknown providers or when the key cannot be
/// located.
pub fn identify(embed_src: &str) -> Option<(Provider, String)> {
    for rule in &RULES {
        if !embed_src.contains(rule.host_marker) {
            continue;
        }
        let pattern = Regex::new(rule.key_pattern).ok()?;
        let key = pattern
            .captures(embed_src)
            .and_then(|c| c.get(1))
            .map(|m| m.as_str().to_string());
        return key.map(|k| (rule.provider, k));
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify_hcaptcha() {
        let src = "https://newassets.hcaptcha.com/captcha/v1/frame?sitekey=10000000-ffff-ffff-ffff-000000000001&host=www.6pm.com";
        let (provider, key) = identify(src).unwrap();
        assert_eq!(provider, Provider::HCaptcha);
        assert_eq!(key, "10000000-ffff-ffff-ffff-000000000001");
    }

    #[test]
    fn test_identify_recaptcha() {
        let src = "https://www.google.com/recaptcha/api2/anchor?ar=1&k=6LdAbCdEfGhIjKlMnOpQrStUvWxYz&co=aHR0cHM";
        let (provider, key) = identify(src).unwrap();
        assert_eq!(provider, Provider::Recaptcha);
        assert_eq!(key, "6LdAbCdEfGhIjKlMnOpQrStUvWxYz");
    }

    #[test]
    fn test_identify_unknown_provider() {
        assert!(identify("https://challenge.example.net/widget?key=abc").is_none());
    }

    #[test]
    fn test_identify_known_host_without_key() {
        assert!(identify("https://newassets.hcaptcha.com/captcha/v1/frame").is_none());
    }

    #[test]
    fn test_solver_parameter_shapes() {
        assert_eq!(Provider::HCaptcha.solve_method(), "hcaptcha");
        assert_eq!(Provider::HCaptcha.key_param(), "sitekey");
        assert_eq!(Provider::Recaptcha.solve_method(), "userrecaptcha");
        assert_eq!(Provider::Recaptcha.key_param(), "googlekey");
    }
}
