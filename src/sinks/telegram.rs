use super::AlertSink;
use crate::results::ProductRecord;
use async_trait::async_trait;
use serde_json::json;

/// Characters MarkdownV2 treats as syntax; all must be escaped in message
/// text.
const MARKDOWN_RESERVED: &str = r"_*[]()~`>#+-=|{}.!";

/// Deal alerts delivered through the Telegram Bot API.
///
/// The endpoint is built once at construction; both the rich and the
/// plain-text path derive everything they send from the record alone, so
/// the fallback never depends on state from the formatting path.
pub struct TelegramAlerts {
    http: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramAlerts {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            endpoint: format!("https://api.telegram.org/bot{}/sendMessage", bot_token),
            chat_id: chat_id.to_string(),
        }
    }

    /// Builds the sink from `TELEGRAM_BOT_TOKEN` and `TELEGRAM_CHAT_ID`.
    /// Returns `None` (with a warning) when either is unset.
    pub fn from_env() -> Option<Self> {
        let token = std::env::var("TELEGRAM_BOT_TOKEN").ok();
        let chat_id = std::env::var("TELEGRAM_CHAT_ID").ok();
        match (token, chat_id) {
            (Some(token), Some(chat_id)) if !token.is_empty() && !chat_id.is_empty() => {
                Some(Self::new(&token, &chat_id))
            }
            _ => {
                ::log::warn!(
                    "TELEGRAM_BOT_TOKEN or TELEGRAM_CHAT_ID not set, alerts will be skipped"
                );
                None
            }
        }
    }

    /// Sends one message; returns whether delivery succeeded. All failures
    /// are logged here.
    async fn send(&self, text: &str, parse_mode: Option<&str>) -> bool {
        let mut payload = json!({
            "chat_id": self.chat_id,
            "text": text,
            "disable_web_page_preview": false,
        });
        if let Some(mode) = parse_mode {
            payload["parse_mode"] = json!(mode);
        }

        match self.http.post(&self.endpoint).json(&payload).send().await {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                let status = response.status();
                let body = response.text().await.unwrap_or_default();
                ::log::error!("Telegram API rejected alert ({}): {}", status, body);
                false
            }
            Err(e) => {
                ::log::error!("Failed to send Telegram alert: {}", e);
                false
            }
        }
    }
}

#[async_trait]
impl AlertSink for TelegramAlerts {
    async fn alert(&self, record: &ProductRecord, threshold: f64) {
        ::log::info!(
            "Deal alert: '{}' at {}% off (threshold {}%)",
            record.title,
            record.discount_percent,
            threshold
        );

        if let Some(rich) = markdown_message(record) {
            if self.send(&rich, Some("MarkdownV2")).await {
                return;
            }
            ::log::warn!("Rich alert failed, retrying as plain text");
        }
        self.send(&plain_message(record), None).await;
    }
}

/// Escapes MarkdownV2 reserved characters. The escape character itself is
/// handled first so already-present backslashes survive.
pub fn escape_markdown(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.replace('\\', "\\\\").chars() {
        if MARKDOWN_RESERVED.contains(c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Formats the rich MarkdownV2 alert. Returns `None` when the product URL
/// would break the link markup (unbalanced parentheses), in which case the
/// caller sends the plain-text form instead.
fn markdown_message(record: &ProductRecord) -> Option<String> {
    let url = &record.product_url;
    if url.matches('(').count() != url.matches(')').count() {
        ::log::warn!("Product URL has unbalanced parentheses, sending plain alert: {}", url);
        return None;
    }

    Some(format!(
        "*{discount}% OFF* \u{1F525} Deal found on 6pm\\!\n\n\
         *Brand:* {brand}\n\
         *Product:* {title}\n\
         *Price:* *${current}* \\(was ${original}\\)\n\n\
         [View Product]({url})",
        discount = record.discount_percent as i64,
        brand = escape_markdown(&record.brand),
        title = escape_markdown(&record.title),
        current = escape_markdown(&format!("{:.2}", record.current_price)),
        original = escape_markdown(&format!("{:.2}", record.original_price)),
        url = url,
    ))
}

/// Self-contained plain-text fallback; derives every field from the record
/// and shares nothing with the rich path.
fn plain_message(record: &ProductRecord) -> String {
    format!(
        "Deal found: {} - {} - ${:.2} ({}% off) {}",
        record.brand,
        record.title,
        record.current_price,
        record.discount_percent as i64,
        record.product_url
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deal() -> ProductRecord {
        let mut record = ProductRecord::unknown("www.6pm.com");
        record.brand = "Sam Edelman".to_string();
        record.title = "Hazel Pump (Patent)".to_string();
        record.current_price = 59.99;
        record.original_price = 139.95;
        record.discount_percent = 57.13;
        record.product_url = "https://www.6pm.com/p/sam-edelman-hazel/product/8711234".to_string();
        record
    }

    #[test]
    fn test_escape_markdown_reserved_set() {
        assert_eq!(
            escape_markdown("a_b*c[d]e(f)g.h!i-j"),
            "a\\_b\\*c\\[d\\]e\\(f\\)g\\.h\\!i\\-j"
        );
        assert_eq!(escape_markdown("plain text"), "plain text");
        // Backslash escaped first, then the dot
        assert_eq!(escape_markdown(r"a\."), "a\\\\\\.");
    }

    #[test]
    fn test_markdown_message_escapes_fields() {
        let message = markdown_message(&deal()).unwrap();
        assert!(message.contains("*57% OFF*"));
        assert!(message.contains("Hazel Pump \\(Patent\\)"));
        assert!(message.contains("*$59\\.99*"));
        assert!(message.contains("(https://www.6pm.com/p/sam-edelman-hazel/product/8711234)"));
    }

    #[test]
    fn test_unbalanced_url_falls_back() {
        let mut record = deal();
        record.product_url = "https://www.6pm.com/p/bad(paren".to_string();
        assert!(markdown_message(&record).is_none());
    }

    #[test]
    fn test_plain_message_is_self_contained() {
        let text = plain_message(&deal());
        assert!(text.contains("Sam Edelman"));
        assert!(text.contains("Hazel Pump (Patent)"));
        assert!(text.contains("$59.99"));
        assert!(text.contains("57% off"));
        assert!(text.contains("https://www.6pm.com/p/sam-edelman-hazel/product/8711234"));
        // No MarkdownV2 escapes leak into the plain path
        assert!(!text.contains('\\'));
    }
}
