use crate::error::{ScanError, ScanResult};
use crate::types::{Grade, Signal};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

#[derive(Clone)]
struct Credentials {
    token: String,
    chat_id: String,
}

/// Telegram bot sink. Without credentials every send is a logged no-op.
#[derive(Clone)]
pub struct TelegramClient {
    client: Client,
    api_url: String,
    credentials: Option<Credentials>,
}

impl TelegramClient {
    pub fn new(token: Option<&str>, chat_id: Option<&str>, timeout: Duration) -> ScanResult<Self> {
        let credentials = match (token, chat_id) {
            (Some(token), Some(chat_id)) => Some(Credentials {
                token: token.to_string(),
                chat_id: chat_id.to_string(),
            }),
            _ => {
                warn!("[Telegram] TELEGRAM_TOKEN / TELEGRAM_CHAT_ID not set, alerts will only be logged");
                None
            }
        };
        Ok(Self {
            client: Client::builder().timeout(timeout).build()?,
            api_url: "https://api.telegram.org".to_string(),
            credentials,
        })
    }

    pub fn disabled() -> Self {
        Self {
            client: Client::new(),
            api_url: "https://api.telegram.org".to_string(),
            credentials: None,
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.credentials.is_some()
    }

    /// Returns `Ok(false)` when the sink is disabled and nothing was sent.
    pub async fn send_alert(&self, text: &str) -> ScanResult<bool> {
        let Some(creds) = &self.credentials else {
            warn!("[Telegram] Credentials not set. Skipping send_alert.");
            return Ok(false);
        };

        let payload = SendMessage {
            chat_id: &creds.chat_id,
            text,
            parse_mode: "Markdown",
            disable_web_page_preview: true,
        };

        let response = self
            .client
            .post(format!("{}/bot{}/sendMessage", self.api_url, creds.token))
            .json(&payload)
            .send()
            .await?;

        if response.status().is_success() {
            info!("[Telegram] Alert delivered");
            Ok(true)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ScanError::Notify(format!("telegram api error {}: {}", status, body)))
        }
    }
}

fn header_by_grade(grade: Grade, base: &str, side: &str) -> String {
    let line = match grade {
        Grade::VeryStrong => "🟢🟢🟢 *VERY STRONG SIGNAL* 🟢🟢🟢",
        Grade::Strong => "🟧🟧 *STRONG SIGNAL* 🟧🟧",
        Grade::Good => "🔵 *GOOD SIGNAL* 🔵",
        Grade::Weak => "⚪ *WEAK SIGNAL* ⚪",
    };
    format!("{}\n*{}*", line, format!("{} {} signal", base, side).to_uppercase())
}

/// Thousands-separated integer rendering, e.g. `1234567.8` -> `1,234,568`.
fn grouped(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    if rounded < 0.0 {
        format!("-{}", out)
    } else {
        out
    }
}

pub fn format_alert(signal: &Signal, quote_asset: &str) -> String {
    let sym = &signal.symbol;
    let base = signal.base_asset(quote_asset);
    let side = signal.side.to_string();
    let separator = "━━━━━━━━━━━━━━━━━━━━";
    let reasons = signal
        .reasons
        .iter()
        .map(|r| format!("• {}", r))
        .collect::<Vec<_>>()
        .join("\n");

    format!(
        "{header}\n{separator}\n\
         *{base}* (`{sym}`)\n\
         #{base}   ${base}\n\n\
         🧭 *Signal Type:* `{side}`\n\
         📊 *Grade:* {grade}\n\
         💰 *Price:* `{price}`\n\
         💵 *24h Volume:* `{qv}` {quote}\n\
         📉 *RSI 15m:* `{rsi_now:.1}` (Min {rsi_min:.1})\n\
         ⭐ *Score:* `{score}`\n\
         📌 *Pings (24h):* `{pings}`\n\n\
         🔊 *Vol 1m / 5m / 15m / 60m:*\n\
         `{v1}` / `{v5}` / `{v15}` / `{v60}`\n\
         📈 *Net Vol 15m / 60m:* `{n15}` / `{n60}`\n\n\
         *Reasons:*\n{reasons}\n\n\
         [Open chart on TradingView](https://www.tradingview.com/chart/?symbol=BINANCE:{sym})",
        header = header_by_grade(signal.grade, base, &side),
        grade = signal.grade,
        price = signal.price,
        qv = grouped(signal.quote_volume_24h),
        quote = quote_asset,
        rsi_now = signal.rsi_now,
        rsi_min = signal.rsi_min,
        score = signal.score,
        pings = signal.ping_count,
        v1 = grouped(signal.vol_1m),
        v5 = grouped(signal.vol_5m),
        v15 = grouped(signal.vol_15m),
        v60 = grouped(signal.vol_60m),
        n15 = grouped(signal.net_vol_primary),
        n60 = grouped(signal.net_vol_trend),
    )
}
