use crate::models::Response;
use crate::transport::{HttpRequest, HttpResponse, ReqwestTransport, Transport};
use crate::VaultError;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, LOCATION};
use reqwest::{Method, Url};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

pub const DEFAULT_API_VERSION: &str = "v1";
const DEFAULT_MAX_REDIRECTS: usize = 1;

/// Extra settings applied to every request.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RequestOptions {
    #[serde(default)]
    pub headers: BTreeMap<String, String>,
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    /// Number of 301/302 hops followed before the redirect is treated as terminal.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_max_redirects() -> usize {
    DEFAULT_MAX_REDIRECTS
}

impl Default for RequestOptions {
    fn default() -> Self {
        Self {
            headers: BTreeMap::new(),
            timeout_ms: None,
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}

impl RequestOptions {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_ms.map(Duration::from_millis)
    }
}

/// Issues requests against `<base url>/<api version>/<path>`.
///
/// Knows nothing about tokens: callers pass the auth header in `headers`.
pub struct RequestExecutor {
    base_url: String,
    api_version: String,
    default_headers: HeaderMap,
    max_redirects: usize,
    transport: Arc<dyn Transport>,
}

impl RequestExecutor {
    pub fn new(
        base_url: &str,
        api_version: &str,
        options: &RequestOptions,
    ) -> Result<Self, VaultError> {
        let transport = Arc::new(ReqwestTransport::new(options.timeout())?);
        Self::with_transport(base_url, api_version, options, transport)
    }

    pub fn with_transport(
        base_url: &str,
        api_version: &str,
        options: &RequestOptions,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, VaultError> {
        Url::parse(base_url).map_err(|e| VaultError::InvalidUrl(format!("{}: {}", base_url, e)))?;

        let mut default_headers = HeaderMap::new();
        default_headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        for (name, value) in &options.headers {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| VaultError::RequestError(format!("invalid header name {}: {}", name, e)))?;
            let value = HeaderValue::from_str(value)
                .map_err(|e| VaultError::RequestError(format!("invalid header value: {}", e)))?;
            default_headers.insert(name, value);
        }

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            api_version: api_version.trim_matches('/').to_string(),
            default_headers,
            max_redirects: options.max_redirects,
            transport,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `path` is a plain path; query parameters go through [`Self::execute_with_query`].
    pub fn url_for(&self, path: &str) -> Result<Url, VaultError> {
        if path.contains(['?', '#']) {
            return Err(VaultError::InvalidUrl(format!(
                "path must not carry a query or fragment: {}",
                path
            )));
        }
        let path = path.trim_start_matches('/');
        let raw = if self.api_version.is_empty() {
            format!("{}/{}", self.base_url, path)
        } else {
            format!("{}/{}/{}", self.base_url, self.api_version, path)
        };
        Url::parse(&raw).map_err(|e| VaultError::InvalidUrl(format!("{}: {}", raw, e)))
    }

    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        body: Option<&serde_json::Value>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, VaultError> {
        self.execute_with_query(method, path, &[], body, headers)
            .await
    }

    /// Like [`Self::execute`], with `query` appended as URL-encoded parameters.
    ///
    /// A JSON `null` body is treated as no body.
    pub async fn execute_with_query(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, &str)],
        body: Option<&serde_json::Value>,
        headers: Option<HeaderMap>,
    ) -> Result<Response, VaultError> {
        let mut url = self.url_for(path)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut request_headers = self.default_headers.clone();
        if let Some(headers) = headers {
            for (name, value) in headers.iter() {
                request_headers.insert(name.clone(), value.clone());
            }
        }

        let mut request = HttpRequest {
            method,
            url,
            headers: request_headers,
            body: body
                .filter(|body| !body.is_null())
                .map(serde_json::to_vec)
                .transpose()?,
        };

        tracing::debug!(method = %request.method, url = %request.url, "making request");
        let mut response = self.transport.send(request.clone()).await?;

        let mut hops = 0;
        while hops < self.max_redirects && is_redirect(response.status) {
            let Some(location) = redirect_location(&request.url, &response) else {
                break;
            };
            tracing::debug!(
                method = %request.method,
                status = response.status,
                location = %location,
                "following redirect"
            );
            request.url = location;
            response = self.transport.send(request.clone()).await?;
            hops += 1;
        }

        let status = response.status;
        if !(200..300).contains(&status) {
            tracing::debug!(method = %request.method, url = %request.url, status, "request failed");
            return Err(VaultError::ClientError {
                status,
                message: String::from_utf8_lossy(&response.body).into_owned(),
                response_data: parse_body(&response.body).ok().flatten(),
            });
        }

        let body = parse_body(&response.body)?;
        if let Some(ref body) = body {
            tracing::debug!(method = %request.method, url = %request.url, body = %body, "response body");
        }

        Ok(Response::new(path.trim_start_matches('/'), status, body))
    }
}

fn is_redirect(status: u16) -> bool {
    status == 301 || status == 302
}

fn redirect_location(current: &Url, response: &HttpResponse) -> Option<Url> {
    let location = response.headers.get(LOCATION)?.to_str().ok()?;
    current.join(location).ok()
}

fn parse_body(body: &[u8]) -> Result<Option<serde_json::Value>, VaultError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(body)?))
}
