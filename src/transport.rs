//! HTTP access to the bridge's control endpoint.
//!
//! Every control path is relative to `/api/<credential>/`. Credential issuance
//! and the description document are the only unauthenticated calls.

use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use futures::future::BoxFuture;
use log::debug;
use reqwest::{Client, Method};
use serde_json::{Value, json};

use crate::errors::{Error, RemoteError};
use crate::session::SessionRecord;

#[cfg(test)]
pub(crate) mod mock;

type Result<T> = std::result::Result<T, Error>;

/// Request/response access to one bridge under one credential.
pub trait Transport: Send + Sync {
    /// `GET /api/<credential>/<path>`.
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>>;

    /// `PUT /api/<credential>/<path>` with a JSON body.
    fn put<'a>(&'a self, path: &'a str, body: Value) -> BoxFuture<'a, Result<Value>>;

    /// `POST /api/<credential>/<path>` with a JSON body.
    fn post<'a>(&'a self, path: &'a str, body: Value) -> BoxFuture<'a, Result<Value>>;

    /// `DELETE /api/<credential>/<path>`.
    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>>;

    /// Unauthenticated `POST /api/` asking for a new credential.
    fn create_user<'a>(&'a self, device_type: &'a str) -> BoxFuture<'a, Result<Value>>;

    /// Unauthenticated `GET` of a document outside the API root, such as
    /// `/description.xml`.
    fn description<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Builds a [`Transport`] for a bridge address and credential.
pub trait Connector: Send + Sync {
    fn connect(&self, record: &SessionRecord) -> Result<Arc<dyn Transport>>;
}

/// [`Transport`] over plain HTTP using reqwest.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    base_url: String,
    credential: String,
    client: Client,
}

impl HttpTransport {
    /// Default request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Creates a transport for `address` (`host` or `host:port`).
    pub fn new(address: &str, credential: &str, timeout: Duration) -> Result<Self> {
        let base_url = if address.starts_with("http://") {
            address.trim_end_matches('/').to_string()
        } else {
            format!("http://{address}")
        };

        let client = Client::builder().timeout(timeout).build()?;

        Ok(HttpTransport {
            base_url,
            credential: credential.to_string(),
            client,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn api_url(&self, path: &str) -> String {
        format!("{}/api/{}/{}", self.base_url, self.credential, path)
    }

    async fn send(&self, method: Method, url: String, body: Option<Value>) -> Result<Value> {
        debug!("{method} {url} {body:?}");

        let mut request = self.client.request(method, &url);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(Error::HttpStatus {
                status: status.as_u16(),
                path: url,
            });
        }

        let text = response.text().await?;
        debug!("HTTP response: {text}");
        serde_json::from_str(&text).map_err(Error::JsonLoad)
    }
}

impl Transport for HttpTransport {
    fn get<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>> {
        self.send(Method::GET, self.api_url(path), None).boxed()
    }

    fn put<'a>(&'a self, path: &'a str, body: Value) -> BoxFuture<'a, Result<Value>> {
        self.send(Method::PUT, self.api_url(path), Some(body)).boxed()
    }

    fn post<'a>(&'a self, path: &'a str, body: Value) -> BoxFuture<'a, Result<Value>> {
        self.send(Method::POST, self.api_url(path), Some(body)).boxed()
    }

    fn delete<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<Value>> {
        self.send(Method::DELETE, self.api_url(path), None).boxed()
    }

    fn create_user<'a>(&'a self, device_type: &'a str) -> BoxFuture<'a, Result<Value>> {
        let url = format!("{}/api/", self.base_url);
        let body = json!({ "devicetype": device_type });
        self.send(Method::POST, url, Some(body)).boxed()
    }

    fn description<'a>(&'a self, path: &'a str) -> BoxFuture<'a, Result<String>> {
        async move {
            let url = format!("{}{}", self.base_url, path);
            debug!("GET {url}");
            let response = self.client.get(&url).send().await?;
            let status = response.status();
            if !status.is_success() {
                return Err(Error::HttpStatus {
                    status: status.as_u16(),
                    path: url,
                });
            }
            Ok(response.text().await?)
        }
        .boxed()
    }
}

/// Connects over plain HTTP with a fixed request timeout.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(timeout: Duration) -> Self {
        HttpConnector { timeout }
    }
}

impl Default for HttpConnector {
    fn default() -> Self {
        Self::new(HttpTransport::DEFAULT_TIMEOUT)
    }
}

impl Connector for HttpConnector {
    fn connect(&self, record: &SessionRecord) -> Result<Arc<dyn Transport>> {
        let transport = HttpTransport::new(record.address(), record.credential(), self.timeout)?;
        Ok(Arc::new(transport))
    }
}

/// Reads the first entry of a `[{"success": ...}]` / `[{"error": ...}]` reply.
///
/// Returns the `success` value, or the bridge's error as [`Error::Remote`].
pub(crate) fn first_outcome(reply: &Value) -> Result<Value> {
    let first = reply
        .as_array()
        .and_then(|entries| entries.first())
        .ok_or_else(|| Error::UnexpectedResponse(format!("expected outcome list, got {reply}")))?;

    if let Some(success) = first.get("success") {
        return Ok(success.clone());
    }
    Err(remote_error(first)?)
}

/// Fails with the first error entry of an outcome list, if there is one.
///
/// Write replies carry one entry per attribute written.
pub(crate) fn check_outcomes(reply: &Value) -> Result<()> {
    let Some(entries) = reply.as_array() else {
        return Err(Error::UnexpectedResponse(format!(
            "expected outcome list, got {reply}"
        )));
    };

    match entries.iter().find(|entry| entry.get("error").is_some()) {
        Some(entry) => Err(remote_error(entry)?),
        None => Ok(()),
    }
}

/// Whether a reply to a privileged read signals an invalid credential.
///
/// The bridge answers a valid read with an object and an unauthorized one with
/// a list of error objects.
pub(crate) fn is_unauthorized(reply: &Value) -> bool {
    reply.is_array()
}

fn remote_error(entry: &Value) -> Result<Error> {
    let error = entry
        .get("error")
        .ok_or_else(|| Error::UnexpectedResponse(format!("unrecognised outcome {entry}")))?;
    let remote: RemoteError = serde_json::from_value(error.clone()).map_err(Error::JsonLoad)?;
    Ok(Error::Remote(remote))
}
