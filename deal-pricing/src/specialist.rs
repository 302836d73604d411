//! Client for the hosted fine-tuned specialist model

use std::time::Duration;

use deal_core::SpecialistSettings;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::instrument;

use crate::error::{PricingError, Result};

#[derive(Debug, Serialize)]
struct SpecialistRequest<'a> {
    description: &'a str,
}

#[derive(Debug, Deserialize)]
struct SpecialistResponse {
    price: f64,
}

/// Remote fine-tuned model served over HTTP
#[derive(Debug, Clone)]
pub struct SpecialistPricer {
    client: Client,
    url: String,
    token: Option<String>,
}

impl SpecialistPricer {
    pub fn new(settings: &SpecialistSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()?;

        Ok(Self {
            client,
            url: settings.url.clone(),
            token: settings.token.clone(),
        })
    }

    #[instrument(skip(self, description))]
    pub async fn price(&self, description: &str) -> Result<f64> {
        let mut request = self
            .client
            .post(&self.url)
            .json(&SpecialistRequest { description });
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
        }

        let response = request.send().await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(PricingError::api(format!("Specialist error ({}): {}", status, body)));
        }

        let body: SpecialistResponse = response.json().await?;
        Ok(body.price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    fn pricer(server: &mockito::Server, token: Option<&str>) -> SpecialistPricer {
        SpecialistPricer::new(&SpecialistSettings {
            url: format!("{}/price", server.url()),
            token: token.map(str::to_string),
        })
        .unwrap()
    }

    #[tokio::test]
    async fn test_price_posts_description() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/price")
            .match_header("authorization", "Bearer secret")
            .match_body(Matcher::Json(serde_json::json!({"description": "Cast iron skillet"})))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"price": 34.5}"#)
            .create_async()
            .await;

        let price = pricer(&server, Some("secret")).price("Cast iron skillet").await.unwrap();

        assert_eq!(price, 34.5);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_error_surfaces() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/price")
            .with_status(503)
            .with_body("warming up")
            .create_async()
            .await;

        let err = pricer(&server, None).price("anything").await.unwrap_err();

        assert!(matches!(err, PricingError::Api(msg) if msg.contains("503")));
    }
}
