use std::time::Duration;

use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::SdkError;
use crate::profile::OciProfile;
use crate::retry::{RetryPolicy, with_retry};
use crate::signer::{RequestSigner, http_date};
use crate::types::ApiErrorBody;

/// Core Services API version all backup endpoints live under.
pub const API_VERSION: &str = "20160918";

const NEXT_PAGE_HEADER: &str = "opc-next-page";
const REQUEST_ID_HEADER: &str = "opc-request-id";

/// Tunables for [`BlockstorageClient`]
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Per-request timeout
    pub timeout: Duration,
    /// `limit` query parameter sent with each list call
    pub page_limit: u32,
    pub retry: RetryPolicy,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(60),
            page_limit: 100,
            retry: RetryPolicy::default(),
        }
    }
}

/// HTTP client for the OCI Block Storage backup API
#[derive(Debug)]
pub struct BlockstorageClient {
    base_url: String,
    signer: RequestSigner,
    http: reqwest::Client,
    retry: RetryPolicy,
    page_limit: u32,
}

/// Public endpoint for `region`, e.g. `https://iaas.us-ashburn-1.oraclecloud.com`.
pub fn endpoint_for_region(region: &str) -> String {
    format!("https://iaas.{region}.oraclecloud.com")
}

impl BlockstorageClient {
    /// Create a client for the profile's region, signing with the profile's key.
    pub fn new(profile: &OciProfile, options: ClientOptions) -> Result<Self, SdkError> {
        let signer = RequestSigner::from_profile(profile)?;
        Self::with_endpoint(&endpoint_for_region(&profile.region), signer, options)
    }

    /// Create a client against an explicit endpoint (scheme, host and optional port).
    pub fn with_endpoint(
        endpoint: &str,
        signer: RequestSigner,
        options: ClientOptions,
    ) -> Result<Self, SdkError> {
        let base_url = format!("{}/{API_VERSION}", endpoint.trim_end_matches('/'));
        // Fail on a bad endpoint now rather than on the first call.
        Url::parse(&base_url)?;

        let http = reqwest::Client::builder()
            .timeout(options.timeout)
            .build()?;

        Ok(Self {
            base_url,
            signer,
            http,
            retry: options.retry,
            page_limit: options.page_limit.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, SdkError> {
        Ok(Url::parse(&format!("{}{path}", self.base_url))?)
    }

    fn signed(&self, method: Method, url: &Url) -> Result<RequestBuilder, SdkError> {
        let date = http_date();
        let authorization = self.signer.authorization(&method, url, &date)?;
        Ok(self
            .http
            .request(method, url.clone())
            .header("date", date)
            .header("authorization", authorization)
            .header("accept", "application/json"))
    }

    async fn send(&self, operation: &str, method: Method, url: &Url) -> Result<Response, SdkError> {
        with_retry(&self.retry, operation, || {
            let request = self.signed(method.clone(), url);
            async move {
                match request {
                    Ok(request) => request.send().await.map_err(SdkError::from),
                    Err(e) => Err(e),
                }
            }
        })
        .await
    }

    /// GET every page of a list endpoint, following `opc-next-page`.
    pub(crate) async fn list_all<T: DeserializeOwned>(
        &self,
        operation: &str,
        path: &str,
        compartment_id: &str,
    ) -> Result<Vec<T>, SdkError> {
        let mut items = Vec::new();
        let mut page: Option<String> = None;

        loop {
            let mut url = self.url(path)?;
            {
                let mut query = url.query_pairs_mut();
                query.append_pair("compartmentId", compartment_id);
                query.append_pair("limit", &self.page_limit.to_string());
                if let Some(token) = &page {
                    query.append_pair("page", token);
                }
            }

            let resp = self.send(operation, Method::GET, &url).await?;
            let resp = check_status(resp).await?;
            let next = resp
                .headers()
                .get(NEXT_PAGE_HEADER)
                .and_then(|v| v.to_str().ok())
                .filter(|v| !v.is_empty())
                .map(str::to_string);

            let body = resp.text().await?;
            let mut batch: Vec<T> = serde_json::from_str(&body)?;
            debug!(operation, page_items = batch.len(), "Fetched page");
            items.append(&mut batch);

            match next {
                Some(token) => page = Some(token),
                None => break,
            }
        }

        Ok(items)
    }

    /// DELETE a single resource, expecting no response body.
    pub(crate) async fn delete(&self, operation: &str, path: &str) -> Result<(), SdkError> {
        let url = self.url(path)?;
        let resp = self.send(operation, Method::DELETE, &url).await?;
        check_status(resp).await?;
        Ok(())
    }
}

async fn check_status(resp: Response) -> Result<Response, SdkError> {
    if resp.status().is_success() {
        return Ok(resp);
    }

    let status = resp.status().as_u16();
    let request_id = resp
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    let text = resp.text().await.unwrap_or_default();
    let (code, message) = match serde_json::from_str::<ApiErrorBody>(&text) {
        Ok(body) => (body.code, body.message),
        Err(_) => (String::new(), text),
    };

    Err(SdkError::Api {
        status,
        code,
        message,
        request_id,
    })
}
