//! API client for communicating with the prediction service

use anyhow::{Context, Result};
use predictor_lib::{
    BatchPredictionResponse, HealthResponse, MessageResponse, ModelMetadata, NewSavedPrediction,
    PartialBatchResponse, PredictionRequest, PredictionResult, SavedPredictionList,
    SavedPredictionResponse,
};
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;
use url::Url;

/// API client for the prediction service
pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(base_url: &str) -> Result<Self> {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        let base_url = Url::parse(base_url).context("Invalid API URL")?;

        Ok(Self { client, base_url })
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .post(url)
            .json(body)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        let url = self.base_url.join(path).context("Invalid path")?;

        let response = self
            .client
            .delete(url)
            .send()
            .await
            .context("Failed to send request")?;

        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T> {
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error)
                .unwrap_or(body);
            anyhow::bail!("API error ({}): {}", status, message);
        }

        response.json().await.context("Failed to parse response")
    }

    pub async fn health(&self) -> Result<HealthResponse> {
        self.get("health").await
    }

    pub async fn model_info(&self) -> Result<ModelMetadata> {
        self.get("model-info").await
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult> {
        self.post("predict", request).await
    }

    /// All-or-nothing batch prediction
    pub async fn batch_predict(&self, companies: &[Value]) -> Result<BatchPredictionResponse> {
        self.post("batch-predict", &BatchRequest { companies }).await
    }

    /// Batch prediction reporting an outcome per company
    pub async fn batch_predict_partial(&self, companies: &[Value]) -> Result<PartialBatchResponse> {
        self.post("batch-predict?mode=partial", &BatchRequest { companies })
            .await
    }

    pub async fn saved_predictions(&self) -> Result<SavedPredictionList> {
        self.get("predictions").await
    }

    pub async fn save_prediction(
        &self,
        prediction: &NewSavedPrediction,
    ) -> Result<SavedPredictionResponse> {
        self.post("predictions", prediction).await
    }

    pub async fn delete_saved_prediction(&self, id: &str) -> Result<MessageResponse> {
        self.delete(&format!("predictions/{}", id)).await
    }
}

#[derive(Debug, Serialize)]
struct BatchRequest<'a> {
    companies: &'a [Value],
}

/// Error body returned by the service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}
