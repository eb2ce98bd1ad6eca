//! REST access to the bulk generation endpoints.
//!
//! [`BulkApi`] is the seam the job board talks to; [`HttpBulkApi`] is the
//! reqwest implementation used outside of tests.

use crate::config::ApiConfig;
use crate::error::{Error, Result};
use common::{
    ApiErrorBody, BulkJob, BulkTemplate, CreateOutlineJobRequest, JobId, Page, PageQuery,
    TemplateDraft,
};
use reqwest::{Method, RequestBuilder, StatusCode, Url};
use serde::de::DeserializeOwned;
use std::future::Future;
use std::time::Duration;

pub const REQUEST_ID_HEADER: &str = "X-Request-Id";

pub trait BulkApi: Send + Sync {
    /// `GET /bulk/jobs?page&page_size`
    fn list_jobs(&self, query: PageQuery) -> impl Future<Output = Result<Page<BulkJob>>> + Send;

    /// `POST /bulk/outline-jobs`
    fn create_outline_job(
        &self,
        request: &CreateOutlineJobRequest,
    ) -> impl Future<Output = Result<BulkJob>> + Send;

    /// `POST /bulk/jobs/{id}/cancel`
    fn cancel_job(&self, id: &JobId) -> impl Future<Output = Result<()>> + Send;

    /// `POST /bulk/jobs/{id}/retry-failed`
    fn retry_failed(&self, id: &JobId) -> impl Future<Output = Result<()>> + Send;

    /// `GET /bulk/templates`
    fn list_templates(&self) -> impl Future<Output = Result<Vec<BulkTemplate>>> + Send;

    /// `POST /bulk/templates`
    fn create_template(
        &self,
        draft: &TemplateDraft,
    ) -> impl Future<Output = Result<BulkTemplate>> + Send;

    /// `PUT /bulk/templates/{id}`
    fn update_template(
        &self,
        id: &str,
        draft: &TemplateDraft,
    ) -> impl Future<Output = Result<BulkTemplate>> + Send;

    /// `DELETE /bulk/templates/{id}`
    fn delete_template(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

#[derive(Debug, Clone)]
pub struct HttpBulkApi {
    client: reqwest::Client,
    base_url: Url,
    token: Option<String>,
}

impl HttpBulkApi {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let base_url = Url::parse(&config.base_url)
            .map_err(|e| Error::InvalidUrl(format!("{}: {}", config.base_url, e)))?;
        if base_url.cannot_be_a_base() {
            return Err(Error::InvalidUrl(config.base_url.clone()));
        }

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(concat!("bulkgen/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url,
            token: config.token.clone(),
        })
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        // cannot_be_a_base was rejected in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn request(&self, method: Method, segments: &[&str]) -> (RequestBuilder, String) {
        let request_id = uuid::Uuid::new_v4().to_string();
        let url = self.endpoint(segments);
        log::debug!("{} {} [{}]", method, url, request_id);

        let mut builder = self
            .client
            .request(method, url)
            .header(REQUEST_ID_HEADER, &request_id);
        if let Some(ref token) = self.token {
            builder = builder.bearer_auth(token);
        }
        (builder, request_id)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder, request_id: &str) -> Result<T> {
        let body = self.send(builder, request_id).await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn send(&self, builder: RequestBuilder, request_id: &str) -> Result<Vec<u8>> {
        let response = builder.send().await?;
        let status = response.status();
        let body = response.bytes().await?;

        if !status.is_success() {
            let err = parse_api_error(status, &body);
            log::warn!("Request {} failed with {}: {}", request_id, status, err);
            return Err(err);
        }
        Ok(body.to_vec())
    }
}

impl BulkApi for HttpBulkApi {
    async fn list_jobs(&self, query: PageQuery) -> Result<Page<BulkJob>> {
        let (builder, id) = self.request(Method::GET, &["bulk", "jobs"]);
        self.send_json(builder.query(&query.to_query_pairs()), &id).await
    }

    async fn create_outline_job(&self, request: &CreateOutlineJobRequest) -> Result<BulkJob> {
        let (builder, id) = self.request(Method::POST, &["bulk", "outline-jobs"]);
        self.send_json(builder.json(request), &id).await
    }

    async fn cancel_job(&self, job_id: &JobId) -> Result<()> {
        let (builder, id) = self.request(Method::POST, &["bulk", "jobs", job_id.0.as_str(), "cancel"]);
        self.send(builder, &id).await.map(|_| ())
    }

    async fn retry_failed(&self, job_id: &JobId) -> Result<()> {
        let (builder, id) = self.request(Method::POST, &["bulk", "jobs", job_id.0.as_str(), "retry-failed"]);
        self.send(builder, &id).await.map(|_| ())
    }

    async fn list_templates(&self) -> Result<Vec<BulkTemplate>> {
        let (builder, id) = self.request(Method::GET, &["bulk", "templates"]);
        self.send_json(builder, &id).await
    }

    async fn create_template(&self, draft: &TemplateDraft) -> Result<BulkTemplate> {
        let (builder, id) = self.request(Method::POST, &["bulk", "templates"]);
        self.send_json(builder.json(draft), &id).await
    }

    async fn update_template(&self, template_id: &str, draft: &TemplateDraft) -> Result<BulkTemplate> {
        let (builder, id) = self.request(Method::PUT, &["bulk", "templates", template_id]);
        self.send_json(builder.json(draft), &id).await
    }

    async fn delete_template(&self, template_id: &str) -> Result<()> {
        let (builder, id) = self.request(Method::DELETE, &["bulk", "templates", template_id]);
        self.send(builder, &id).await.map(|_| ())
    }
}

/// Turn a non-2xx response into `Error::Api` with a user-presentable message.
pub fn parse_api_error(status: StatusCode, body: &[u8]) -> Error {
    let message = serde_json::from_slice::<ApiErrorBody>(body)
        .ok()
        .and_then(ApiErrorBody::into_message)
        .or_else(|| {
            let text = String::from_utf8_lossy(body).trim().to_string();
            // HTML error pages are not worth showing
            (!text.is_empty() && !text.starts_with('<')).then_some(text)
        })
        .unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("Unexpected response")
                .to_string()
        });

    Error::Api {
        status: status.as_u16(),
        message,
    }
}
