// src/services/http_gateway.rs
use crate::config::StudioConfig;
use crate::errors::StudioError;
use crate::models::*;
use crate::services::gateway::ImageGateway;
use async_trait::async_trait;
use bytes::Bytes;
use log::{debug, info};
use reqwest::{Client, Response, StatusCode, multipart};

/// [`ImageGateway`] over the studio's JSON/HTTP API.
pub struct HttpGateway {
    api_url: String,
    client: Client,
}

impl HttpGateway {
    pub fn new(config: &StudioConfig) -> Result<Self, StudioError> {
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| StudioError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            api_url: config.api_url.trim_end_matches('/').to_string(),
            client,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/api/{}", self.api_url, path)
    }

    async fn stage_call(
        &self,
        path: String,
        stage: fn(String) -> StudioError,
    ) -> Result<StageResponse, StudioError> {
        let response = self.client.post(self.endpoint(&path)).send().await?;
        let response = ensure_success(response, stage).await?;

        let body: StageResponse = response.json().await?;
        if !body.success {
            return Err(stage(body.message.unwrap_or_else(|| path.clone())));
        }

        debug!("{} succeeded (cached: {})", path, body.cached);
        Ok(body)
    }
}

/// Turns a non-2xx response into `classify(body)`.
async fn ensure_success(
    response: Response,
    classify: fn(String) -> StudioError,
) -> Result<Response, StudioError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_text = response.text().await.unwrap_or_default();
    Err(classify(format!("{}: {}", status, error_text)))
}

#[async_trait]
impl ImageGateway for HttpGateway {
    async fn upload(&self, file: &UploadFile) -> Result<String, StudioError> {
        let part = multipart::Part::bytes(file.data.to_vec())
            .file_name(file.filename.clone())
            .mime_str(&file.content_type)
            .map_err(|e| StudioError::UploadFailed(format!("Invalid content type: {}", e)))?;
        let form = multipart::Form::new().part("file", part);

        let response = self
            .client
            .post(self.endpoint("images"))
            .multipart(form)
            .send()
            .await?;
        let response = ensure_success(response, StudioError::UploadFailed).await?;

        let body: UploadResponse = response.json().await?;
        match (body.success, body.uuid) {
            (true, Some(uuid)) => {
                info!("Uploaded {} as {}", file.filename, uuid);
                Ok(uuid)
            }
            _ => Err(StudioError::UploadFailed(
                body.message
                    .unwrap_or_else(|| "Server did not assign an image id".to_string()),
            )),
        }
    }

    async fn generate_mask(&self, uuid: &str) -> Result<(), StudioError> {
        self.stage_call(format!("proxy-mask/{}", uuid), StudioError::MaskGenerationFailed)
            .await
            .map(|_| ())
    }

    async fn analyze(&self, uuid: &str) -> Result<(), StudioError> {
        self.stage_call(format!("analyze/{}", uuid), StudioError::AnalysisFailed)
            .await
            .map(|_| ())
    }

    async fn image_status(&self, uuid: &str) -> Result<ImageStatus, StudioError> {
        let response = self
            .client
            .get(self.endpoint(&format!("images/{}", uuid)))
            .send()
            .await?;
        let response = ensure_success(response, StudioError::NetworkError).await?;
        Ok(response.json().await?)
    }

    async fn recolor(&self, request: &TransformationRequest) -> Result<(), StudioError> {
        let response = self
            .client
            .post(self.endpoint(&format!("recolor/{}", request.image_uuid)))
            .json(request)
            .send()
            .await?;
        let response = ensure_success(response, StudioError::RecolorFailed).await?;

        let body: RecolorResponse = response.json().await?;
        if !body.success {
            return Err(StudioError::RecolorFailed(
                body.message.unwrap_or_else(|| "Recolor rejected".to_string()),
            ));
        }

        debug!(
            "Recolored {} to {} (server path: {:?})",
            request.image_uuid, request.color, body.image_path
        );
        Ok(())
    }

    fn recolored_url(&self, uuid: &str) -> String {
        self.endpoint(&format!("recolored/{}", uuid))
    }

    async fn fetch_recolored(&self, uuid: &str) -> Result<Bytes, StudioError> {
        let response = self.client.get(self.recolored_url(uuid)).send().await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StudioError::RecolorFailed(format!(
                "No recolored image for {}",
                uuid
            )));
        }
        let response = ensure_success(response, StudioError::NetworkError).await?;
        Ok(response.bytes().await?)
    }

    async fn list_history(&self) -> Result<Vec<HistoryEntry>, StudioError> {
        let response = self.client.get(self.endpoint("history")).send().await?;
        let response = ensure_success(response, StudioError::NetworkError).await?;

        let text = response.text().await?;
        Ok(serde_json::from_str(&text)?)
    }

    async fn create_history(&self, entry: &NewHistoryEntry) -> Result<(), StudioError> {
        let response = self
            .client
            .post(self.endpoint("history"))
            .json(entry)
            .send()
            .await?;
        let response = ensure_success(response, StudioError::HistoryPersistFailed).await?;

        let body: AckResponse = response.json().await?;
        if !body.success {
            return Err(StudioError::HistoryPersistFailed(
                body.message.unwrap_or_else(|| "History entry rejected".to_string()),
            ));
        }
        Ok(())
    }

    async fn delete_history(&self, uuid: &str) -> Result<(), StudioError> {
        let response = self
            .client
            .delete(self.endpoint(&format!("history/{}", uuid)))
            .send()
            .await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(StudioError::HistoryNotFound(uuid.to_string()));
        }
        let response = ensure_success(response, StudioError::NetworkError).await?;

        let body: AckResponse = response.json().await?;
        if !body.success {
            return Err(StudioError::HistoryNotFound(
                body.message.unwrap_or_else(|| uuid.to_string()),
            ));
        }
        Ok(())
    }
}
