use crate::error::{ConsoleError, ConsoleResult};
use crate::session::SessionHolder;
use async_trait::async_trait;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const GENERIC_FAILURE: &str = "Request failed";

#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Raw HTTP seam. Only transport-level failures are errors here; every
/// status code comes back as a response.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> ConsoleResult<HttpResponse>;
}

#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: Client,
}

impl ReqwestTransport {
    pub fn new() -> anyhow::Result<Self> {
        let user_agent = format!("moviemind-console/{}", env!("CARGO_PKG_VERSION"));
        let client = Client::builder()
            .user_agent(user_agent)
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {}", e))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> ConsoleResult<HttpResponse> {
        let mut builder = self.client.request(request.method, &request.url);
        for (name, value) in &request.headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        if let Some(body) = request.body {
            builder = builder.body(body);
        }

        let res = builder
            .send()
            .await
            .map_err(|e| ConsoleError::Transport(e.to_string()))?;
        let status = res.status().as_u16();
        let headers = res
            .headers()
            .iter()
            .filter_map(|(k, v)| v.to_str().ok().map(|v| (k.as_str().to_string(), v.to_string())))
            .collect();
        let body = res
            .bytes()
            .await
            .map_err(|e| ConsoleError::Transport(e.to_string()))?
            .to_vec();
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

#[derive(Debug, Clone)]
pub struct RequestOptions {
    pub method: Method,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn get() -> Self {
        Self::with_method(Method::GET)
    }

    pub fn delete() -> Self {
        Self::with_method(Method::DELETE)
    }

    pub fn post(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::with_method(Method::POST)
        }
    }

    pub fn put(body: Value) -> Self {
        Self {
            body: Some(body),
            ..Self::with_method(Method::PUT)
        }
    }

    pub fn header(mut self, name: &str, value: &str) -> Self {
        self.headers.push((name.to_string(), value.to_string()));
        self
    }

    fn with_method(method: Method) -> Self {
        Self {
            method,
            body: None,
            headers: Vec::new(),
        }
    }
}

/// Thin JSON client in front of the admin backend.
pub struct Gateway {
    base_url: String,
    transport: Arc<dyn Transport>,
    session: Arc<SessionHolder>,
}

impl Gateway {
    pub fn new(base_url: &str, transport: Arc<dyn Transport>, session: Arc<SessionHolder>) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            transport,
            session,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Parsed JSON body of a successful call, envelope included.
    pub async fn request(&self, path: &str, options: RequestOptions) -> ConsoleResult<Value> {
        let res = self.send(path, options).await?;
        let value: Value = serde_json::from_slice(&res.body)
            .map_err(|e| ConsoleError::Decode(format!("{}: {}", path, e)))?;

        if value.get("success").and_then(|v| v.as_bool()) == Some(false) {
            let message = value
                .get("error")
                .or_else(|| value.get("message"))
                .and_then(|v| v.as_str())
                .filter(|s| !s.trim().is_empty())
                .unwrap_or(GENERIC_FAILURE)
                .to_string();
            warn!("{} rejected by backend: {}", path, message);
            return Err(ConsoleError::Rejected(message));
        }
        Ok(value)
    }

    /// Deserializes the envelope's `data` member, or the whole body when the
    /// backend sent no envelope.
    pub async fn request_data<T: DeserializeOwned>(
        &self,
        path: &str,
        options: RequestOptions,
    ) -> ConsoleResult<T> {
        let mut value = self.request(path, options).await?;
        let data = match value.get_mut("data") {
            Some(data) => data.take(),
            None => value,
        };
        serde_json::from_value(data).map_err(|e| ConsoleError::Decode(format!("{}: {}", path, e)))
    }

    /// Authorized GET returning the raw response, for file downloads.
    pub async fn fetch_file(&self, path: &str) -> ConsoleResult<HttpResponse> {
        self.send(path, RequestOptions::get()).await
    }

    async fn send(&self, path: &str, options: RequestOptions) -> ConsoleResult<HttpResponse> {
        let token = self.session.get_token().unwrap_or_default();
        let defaults = vec![
            ("Authorization".to_string(), format!("Bearer {}", token)),
            ("Content-Type".to_string(), "application/json".to_string()),
        ];
        let headers = merge_headers(defaults, options.headers);
        let body = options
            .body
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| ConsoleError::Validation(format!("Unserializable request body: {}", e)))?;

        debug!("{} {}", options.method, path);
        let res = self
            .transport
            .send(HttpRequest {
                method: options.method,
                url: self.url(path),
                headers,
                body,
            })
            .await
            .inspect_err(|e| warn!("{} failed: {}", path, e))?;

        match res.status {
            401 => {
                warn!("{} returned 401, ending session", path);
                self.session.invalidate();
                Err(ConsoleError::Unauthorized)
            }
            403 => Err(ConsoleError::Forbidden(non_empty_or(
                res.text(),
                "You do not have permission to perform this action",
            ))),
            _ if !res.is_success() => Err(ConsoleError::Http {
                status: res.status,
                body: res.text(),
            }),
            _ => Ok(res),
        }
    }
}

/// Case-insensitive, last write wins. Caller headers may replace the defaults
/// but never remove one.
pub fn merge_headers(
    defaults: Vec<(String, String)>,
    overrides: Vec<(String, String)>,
) -> Vec<(String, String)> {
    let mut merged = defaults;
    for (name, value) in overrides {
        merged.retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        merged.push((name, value));
    }
    merged
}

fn non_empty_or(text: String, fallback: &str) -> String {
    if text.trim().is_empty() {
        fallback.to_string()
    } else {
        text
    }
}
