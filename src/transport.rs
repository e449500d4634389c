use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;

use crate::error::ScrapeError;

/// Status and raw body of one POST.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub body: String,
}

impl Response {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The only network seam of the collector.
pub trait Transport {
    fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<Response, ScrapeError>;
}

/// Blocking reqwest client. Connection and timeout failures surface as
/// [`ScrapeError::Transport`].
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self, ScrapeError> {
        let client = Client::builder().build()?;
        Ok(HttpTransport { client })
    }
}

impl Transport for HttpTransport {
    fn post(
        &self,
        url: &str,
        headers: &[(String, String)],
        body: &Value,
        timeout: Duration,
    ) -> Result<Response, ScrapeError> {
        let mut req = self.client.post(url).timeout(timeout);
        for (name, value) in headers {
            req = req.header(name.as_str(), value.as_str());
        }
        let resp = req.json(body).send()?;
        let status = resp.status().as_u16();
        let body = resp.text()?;
        Ok(Response { status, body })
    }
}
