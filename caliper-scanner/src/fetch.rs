use crate::error::Result;
use crate::result::{FetchRequest, FetchResponse, Headers};
use reqwest::header::{CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, LAST_MODIFIED, LOCATION};
use reqwest::{Client, redirect};
use std::time::Duration;
use tracing::debug;

pub const USER_AGENT: &str = concat!("Caliper/", env!("CARGO_PKG_VERSION"));

/// HTTP transport. Redirects are never followed here; the engine decides.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
}

impl Fetcher {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs((timeout_secs / 2).max(1)))
            .pool_max_idle_per_host(50) // Connection pooling
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .redirect(redirect::Policy::none())
            .build()?;

        Ok(Self { client })
    }

    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResponse> {
        debug!("Fetching {}", request.url);

        let mut builder = self.client.get(request.url.as_str());
        if let Some(ref referrer) = request.referrer {
            builder = builder.header(reqwest::header::REFERER, referrer.as_str());
        }

        let response = builder.send().await?;
        let status_code = response.status().as_u16();
        let headers = typed_headers(response.headers());
        let body = response.bytes().await?.to_vec();

        Ok(FetchResponse::new(request, status_code, headers, body))
    }
}

fn typed_headers(map: &HeaderMap) -> Headers {
    Headers {
        content_type: header_text(map, &CONTENT_TYPE),
        last_modified: header_text(map, &LAST_MODIFIED),
        content_length: header_text(map, &CONTENT_LENGTH).and_then(|v| v.trim().parse().ok()),
        location: header_text(map, &LOCATION),
    }
}

fn header_text(map: &HeaderMap, name: &HeaderName) -> Option<String> {
    map.get(name)
        .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
}
