#![allow(dead_code)]
use crate::core::{FsError, Result};
use crate::http::HttpConfig;
use ahash::{HashMap, HashMapExt};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug)]
pub struct HttpResponse {
    pub data: Vec<u8>,
    pub status: u16,
    pub content_length: Option<u64>,
    /// (start, end, total) parsed from `Content-Range: bytes start-end/total`.
    /// `total` is `None` when the server sends `*` for an unknown length.
    pub content_range: Option<(u64, u64, Option<u64>)>,
}

impl HttpResponse {
    pub fn new(
        data: Vec<u8>,
        status: u16,
        content_length: Option<u64>,
        content_range: Option<(u64, u64, Option<u64>)>,
    ) -> Self {
        Self {
            data,
            status,
            content_length,
            content_range,
        }
    }
}

/// internal blocking transport trait.
pub trait BlockingHttp: Send + Sync {
    fn get_content_length(&self, url: &str) -> Result<Option<u64>>;
    fn get_range(&self, url: &str, start: u64, end: u64) -> Result<HttpResponse>;
}

#[cfg(all(not(feature = "reqwest"), not(feature = "curl")))]
compile_error!("Enable either `curl` (default) or `reqwest` feature.");

pub(crate) fn build_default_transport(config: &HttpConfig) -> Arc<dyn BlockingHttp> {
    #[cfg(feature = "reqwest")]
    {
        Arc::new(ReqwestBlockingTransport::new(config))
    }
    #[cfg(all(not(feature = "reqwest"), feature = "curl"))]
    {
        Arc::new(CurlBlockingTransport::new(config))
    }
}

/// The pieces of `scheme://host[:port]/path` the transports need to
/// validate before they hand a URL to curl/reqwest. Both backends parse
/// the URL again internally for the actual request; this is purely the
/// precondition check spec'd for the range client (host, port, and path
/// must all be resolvable before a connection is attempted).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlParts {
    pub scheme: String,
    pub host: String,
    pub port: u16,
    pub path: String,
}

/// Split a URL into scheme/host/port/path, applying the scheme's default
/// port and forcing TLS's canonical port 443 for `https`.
pub fn parse_url(url: &str) -> Result<UrlParts> {
    if url.is_empty() {
        return Err(FsError::EmptyUrl);
    }

    let (scheme, remainder) = url.split_once("://").ok_or(FsError::EmptyUrl)?;
    if scheme != "http" && scheme != "https" {
        return Err(FsError::UnsupportedProtocol(scheme.to_string()));
    }

    let (authority, path) = match remainder.find('/') {
        Some(idx) => (&remainder[..idx], &remainder[idx..]),
        None => (remainder, "/"),
    };

    if authority.is_empty() {
        return Err(FsError::EmptyUrl);
    }
    if path.is_empty() {
        return Err(FsError::EmptyPath);
    }

    let (host, explicit_port) = match authority.rsplit_once(':') {
        Some((h, p)) if !h.is_empty() => {
            let port: u16 = p.parse().map_err(|_| FsError::EmptyPort)?;
            (h.to_string(), Some(port))
        }
        _ => (authority.to_string(), None),
    };

    if host.is_empty() {
        return Err(FsError::EmptyUrl);
    }

    let port = if scheme == "https" {
        443
    } else {
        explicit_port.unwrap_or(80)
    };

    Ok(UrlParts {
        scheme: scheme.to_string(),
        host,
        port,
        path: path.to_string(),
    })
}

fn parse_content_range(header: &str) -> Option<(u64, u64, Option<u64>)> {
    let parts: Vec<&str> = header.split_whitespace().collect();
    if parts.len() < 2 || parts[0] != "bytes" {
        return None;
    }

    let mut range_and_total = parts[1].splitn(2, '/');
    let range_part = range_and_total.next()?;
    let total_part = range_and_total.next();

    let mut range_iter = range_part.split('-');
    let start = range_iter.next()?.parse::<u64>().ok()?;
    let end = range_iter.next()?.parse::<u64>().ok()?;

    let total = match total_part {
        Some("*") | None => None,
        Some(t) => t.parse::<u64>().ok(),
    };

    Some((start, end, total))
}

#[cfg(feature = "reqwest")]
struct ReqwestBlockingTransport {
    client: reqwest::blocking::Client,
}

#[cfg(feature = "reqwest")]
impl ReqwestBlockingTransport {
    fn new(config: &HttpConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(config.read_timeout)
            .connect_timeout(config.connect_timeout)
            .pool_idle_timeout(config.idle_timeout)
            .build()
            .expect("Failed to create HTTP client");

        Self { client }
    }
}

#[cfg(feature = "reqwest")]
impl BlockingHttp for ReqwestBlockingTransport {
    fn get_content_length(&self, url: &str) -> Result<Option<u64>> {
        parse_url(url)?;

        let response = self
            .client
            .head(url)
            .send()
            .map_err(|e| FsError::ConnectFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Ok(None);
        }

        Ok(response.content_length())
    }

    fn get_range(&self, url: &str, start: u64, end: u64) -> Result<HttpResponse> {
        parse_url(url)?;
        let range_header = format!("bytes={}-{}", start, end);

        let response = self
            .client
            .get(url)
            .header("connection", "keep-alive")
            .header("Range", range_header)
            .send()
            .map_err(|e| FsError::ConnectFailed(e.to_string()))?;

        let status = response.status().as_u16();
        if status == 0 {
            return Err(FsError::NoResponse);
        }
        let content_length = response.content_length();

        let content_range = match response.headers().get("content-range") {
            Some(v) => {
                let text = v
                    .to_str()
                    .map_err(|e| FsError::ReadHeaders(e.to_string()))?;
                parse_content_range(text)
            }
            None => None,
        };

        if !(200..300).contains(&status) {
            return Err(FsError::HttpStatus(status));
        }

        // A 206 must echo back the start we asked for; a plain 200 means
        // the server ignored the Range header and sent the whole body
        // instead, which is still success per spec, just not partial.
        if status == 206
            && let Some((resp_start, _, _)) = content_range
            && resp_start != start
        {
            return Err(FsError::Protocol(
                "Server returned incorrect range start".into(),
            ));
        }

        let data = response
            .bytes()
            .map_err(|e| FsError::Network(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            data,
            status,
            content_length,
            content_range,
        })
    }
}

#[cfg(all(not(feature = "reqwest"), feature = "curl"))]
struct CurlBlockingTransport {
    connect_timeout: Duration,
    read_timeout: Duration,
}

#[cfg(all(not(feature = "reqwest"), feature = "curl"))]
impl CurlBlockingTransport {
    fn new(config: &HttpConfig) -> Self {
        Self {
            connect_timeout: config.connect_timeout,
            read_timeout: config.read_timeout,
        }
    }

    fn request(
        &self,
        url: &str,
        head_only: bool,
        range: Option<(u64, u64)>,
    ) -> Result<HttpResponse> {
        parse_url(url)?;

        let mut easy = curl::easy::Easy::new();
        easy.url(url).map_err(|e| FsError::ConnectFailed(e.to_string()))?;
        easy.connect_timeout(self.connect_timeout)
            .map_err(|e| FsError::ConnectFailed(e.to_string()))?;
        easy.timeout(self.read_timeout)
            .map_err(|e| FsError::ConnectFailed(e.to_string()))?;
        easy.follow_location(true)
            .map_err(|e| FsError::ConnectFailed(e.to_string()))?;

        let mut headers = curl::easy::List::new();
        headers
            .append("connection: keep-alive")
            .map_err(|e| FsError::ConnectFailed(e.to_string()))?;
        easy.http_headers(headers)
            .map_err(|e| FsError::ConnectFailed(e.to_string()))?;

        if head_only {
            easy.nobody(true)
                .map_err(|e| FsError::ConnectFailed(e.to_string()))?;
            easy.custom_request("HEAD")
                .map_err(|e| FsError::ConnectFailed(e.to_string()))?;
        }

        if let Some((start, end)) = range {
            easy.range(&format!("{start}-{end}"))
                .map_err(|e| FsError::ConnectFailed(e.to_string()))?;
        }

        let mut data = Vec::new();
        let mut resp_headers = HashMap::<String, String>::new();

        {
            let mut transfer = easy.transfer();
            transfer
                .write_function(|chunk| {
                    data.extend_from_slice(chunk);
                    Ok(chunk.len())
                })
                .map_err(|e| FsError::Network(e.to_string()))?;

            transfer
                .header_function(|header| {
                    if let Ok(line) = std::str::from_utf8(header) {
                        let line = line.trim();
                        if let Some((name, value)) = line.split_once(':') {
                            resp_headers.insert(name.trim().to_ascii_lowercase(), value.trim().into());
                        }
                    }
                    true
                })
                .map_err(|e| FsError::Network(e.to_string()))?;

            transfer
                .perform()
                .map_err(|e| FsError::Network(e.to_string()))?;
        }

        let status = easy
            .response_code()
            .map_err(|e| FsError::ReadHeaders(e.to_string()))? as u16;
        if status == 0 {
            return Err(FsError::NoResponse);
        }

        let content_length = resp_headers
            .get("content-length")
            .and_then(|v| v.parse::<u64>().ok());
        let content_range = resp_headers
            .get("content-range")
            .and_then(|value| parse_content_range(value));

        Ok(HttpResponse {
            data,
            status,
            content_length,
            content_range,
        })
    }
}

#[cfg(all(not(feature = "reqwest"), feature = "curl"))]
impl BlockingHttp for CurlBlockingTransport {
    fn get_content_length(&self, url: &str) -> Result<Option<u64>> {
        let response = self.request(url, true, None)?;
        if (200..300).contains(&response.status) {
            return Ok(response.content_length);
        }
        Ok(None)
    }

    fn get_range(&self, url: &str, start: u64, end: u64) -> Result<HttpResponse> {
        let response = self.request(url, false, Some((start, end)))?;

        if !(200..300).contains(&response.status) {
            return Err(FsError::HttpStatus(response.status));
        }

        if response.status == 206
            && let Some((resp_start, _, _)) = response.content_range
            && resp_start != start
        {
            return Err(FsError::Protocol(
                "Server returned incorrect range start".into(),
            ));
        }

        Ok(response)
    }
}
