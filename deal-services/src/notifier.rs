//! Push notifications for surfaced opportunities

use std::time::Duration;

use deal_core::{Opportunity, PushoverSettings};
use reqwest::Client;
use tracing::{info, instrument, warn};

const PUSHOVER_URL: &str = "https://api.pushover.net/1/messages.json";
const PUSHOVER_SOUND: &str = "cashregister";

/// Pushover messages API client
#[derive(Debug, Clone)]
pub struct PushoverNotifier {
    client: Client,
    token: String,
    user: String,
    url: String,
}

impl PushoverNotifier {
    pub fn new(settings: &PushoverSettings) -> Self {
        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
            token: settings.token.clone(),
            user: settings.user.clone(),
            url: PUSHOVER_URL.to_string(),
        }
    }

    /// Send to a different endpoint (e.g. a local mock)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    async fn send(&self, message: &str) -> Result<(), String> {
        let form = [
            ("token", self.token.as_str()),
            ("user", self.user.as_str()),
            ("message", message),
            ("sound", PUSHOVER_SOUND),
        ];

        let response = self
            .client
            .post(&self.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| e.to_string())?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("Pushover error ({}): {}", status, body));
        }
        Ok(())
    }
}

/// Where alerts go
#[derive(Debug, Clone)]
pub enum Notifier {
    Pushover(PushoverNotifier),
    /// Log the alert only
    Log,
}

impl Notifier {
    /// Pushover when credentials are configured, logging otherwise
    pub fn from_settings(settings: Option<&PushoverSettings>) -> Self {
        match settings {
            Some(settings) => Notifier::Pushover(PushoverNotifier::new(settings)),
            None => Notifier::Log,
        }
    }

    /// Send an alert for `opportunity`
    ///
    /// Delivery failures are logged and never returned to the caller.
    #[instrument(skip(self, opportunity), fields(url = %opportunity.deal.url))]
    pub async fn alert(&self, opportunity: &Opportunity) {
        let message = opportunity.alert_message();
        match self {
            Notifier::Pushover(pushover) => match pushover.send(&message).await {
                Ok(()) => info!("Push notification sent"),
                Err(e) => warn!("Failed to send push notification: {}", e),
            },
            Notifier::Log => info!("{}", message),
        }
    }
}
