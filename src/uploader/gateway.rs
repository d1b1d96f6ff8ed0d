use crate::modules::upload::dto::{
    CompleteUploadResponse, InitUploadResponse, ProcessingStatusResponse, SignPartResponse,
    UploadedPart,
};
use serde::Serialize;
use thiserror::Error;
use url::Url;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("gateway rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("invalid gateway url: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

/// Requests the client sends to the gateway. Serialize-only mirrors of the
/// wire contract; the gateway's own deserializing DTOs live in
/// `modules::upload::dto`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitUploadBody {
    pub file_name: String,
    pub file_id: String,
    pub content_type: String,
    pub total_chunks: i32,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteUploadBody {
    pub upload_id: String,
    pub s3_key: String,
    pub parts: Vec<UploadedPart>,
    pub file_name: String,
    pub file_id: String,
    pub content_type: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AbortUploadBody {
    pub upload_id: String,
    pub s3_key: String,
}

/// The four session operations the orchestrator depends on.
#[allow(async_fn_in_trait)]
pub trait UploadGateway: Send + Sync {
    async fn initialize(&self, req: &InitUploadBody) -> Result<InitUploadResponse, GatewayError>;
    async fn sign_part(
        &self,
        upload_id: &str,
        part_number: i32,
        s3_key: &str,
    ) -> Result<String, GatewayError>;
    async fn complete(
        &self,
        req: &CompleteUploadBody,
    ) -> Result<CompleteUploadResponse, GatewayError>;
    async fn abort(&self, upload_id: &str, s3_key: &str) -> Result<(), GatewayError>;
}

/// Read side used by the processing-readiness poller.
#[allow(async_fn_in_trait)]
pub trait StatusSource: Send + Sync {
    async fn processing_status(
        &self,
        file_id: &str,
    ) -> Result<ProcessingStatusResponse, GatewayError>;
}

/// HTTP gateway client speaking the `/api/*` contract, with an optional
/// bearer token from the session provider.
#[derive(Clone)]
pub struct HttpGateway {
    http: reqwest::Client,
    base: Url,
    bearer_token: Option<String>,
}

impl HttpGateway {
    pub fn new(base: Url, bearer_token: Option<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base,
            bearer_token,
        }
    }

    fn endpoint(&self, path: &str) -> Result<Url, GatewayError> {
        Ok(self.base.join(path)?)
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.bearer_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, GatewayError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let message = match response.json::<serde_json::Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(|m| m.as_str())
                .unwrap_or("unknown gateway error")
                .to_string(),
            Err(_) => "unknown gateway error".to_string(),
        };

        Err(GatewayError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

impl UploadGateway for HttpGateway {
    async fn initialize(&self, req: &InitUploadBody) -> Result<InitUploadResponse, GatewayError> {
        let url = self.endpoint("api/upload-presign")?;
        let response = self.authorize(self.http.post(url)).json(req).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn sign_part(
        &self,
        upload_id: &str,
        part_number: i32,
        s3_key: &str,
    ) -> Result<String, GatewayError> {
        let url = self.endpoint("api/upload-presign")?;
        let response = self
            .authorize(self.http.get(url).query(&[
                ("uploadId", upload_id),
                ("partNumber", &part_number.to_string()),
                ("s3Key", s3_key),
            ]))
            .send()
            .await?;

        let signed: SignPartResponse = Self::check(response).await?.json().await?;
        Ok(signed.presigned_url)
    }

    async fn complete(
        &self,
        req: &CompleteUploadBody,
    ) -> Result<CompleteUploadResponse, GatewayError> {
        let url = self.endpoint("api/complete-upload")?;
        let response = self.authorize(self.http.post(url)).json(req).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }

    async fn abort(&self, upload_id: &str, s3_key: &str) -> Result<(), GatewayError> {
        let url = self.endpoint("api/abort-upload")?;
        let body = AbortUploadBody {
            upload_id: upload_id.to_string(),
            s3_key: s3_key.to_string(),
        };
        let response = self
            .authorize(self.http.post(url))
            .json(&body)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

impl StatusSource for HttpGateway {
    async fn processing_status(
        &self,
        file_id: &str,
    ) -> Result<ProcessingStatusResponse, GatewayError> {
        let url = self.endpoint(&format!("api/processing-status/{}", file_id))?;
        let response = self.authorize(self.http.get(url)).send().await?;
        Ok(Self::check(response).await?.json().await?)
    }
}
