//! HTTP credit balance provider.

use async_trait::async_trait;
use serde::Deserialize;

use atelier_core::error::CoreError;
use atelier_pipeline::CreditBalanceProvider;

use crate::client::ApiClient;

/// [`CreditBalanceProvider`] over the backend's balance endpoint.
pub struct HttpCreditProvider {
    api: ApiClient,
}

#[derive(Deserialize)]
struct BalanceResponse {
    balance: i64,
}

impl HttpCreditProvider {
    pub fn new(api: ApiClient) -> Self {
        Self { api }
    }
}

#[async_trait]
impl CreditBalanceProvider for HttpCreditProvider {
    async fn balance(&self) -> Result<i64, CoreError> {
        let response = self
            .api
            .http()
            .get(self.api.url("credits/balance"))
            .send()
            .await
            .map_err(|e| CoreError::Internal(format!("credit balance fetch failed: {e}")))?;
        let parsed: BalanceResponse = ApiClient::parse_json(response)
            .await
            .map_err(|e| CoreError::Internal(format!("credit balance fetch failed: {e}")))?;
        Ok(parsed.balance)
    }
}
