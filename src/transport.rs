use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use std::error::Error as StdError;
use std::fmt;
use std::io::{self, Read};
use std::time::Duration;
use url::Url;

use crate::error::{Error, Result};

const MAX_PREALLOC: u64 = 16 * 1024 * 1024;

/// Raw outcome of an HTTP GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpReply {
    pub status: u16,
    pub body: Vec<u8>,
}

impl HttpReply {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The HTTP collaborator the gateway talks through.
///
/// Implementations report timeouts as [`Error::Timeout`] and any other
/// failure to get a reply as [`Error::Unreachable`].
pub trait Transport: Send + Sync + fmt::Debug {
    fn get(&self, url: &Url, query: &[(&str, String)]) -> Result<HttpReply>;
}

/// Blocking `reqwest` transport.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    http: HttpClient,
    progress: bool,
}

impl HttpTransport {
    pub fn new(timeout: Duration, verify: bool, progress: bool) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("hapi-client-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("hapi-client-rs")),
        );

        let mut builder = HttpClient::builder()
            .default_headers(default_headers)
            .timeout(timeout);

        if !verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        let http = builder.build().context("failed to build HTTP client")?;
        Ok(Self { http, progress })
    }

    fn read_body(&self, mut resp: Response, url: &Url) -> Result<Vec<u8>> {
        let total = resp.content_length();
        let pb = match (self.progress, total) {
            (true, Some(len)) => {
                let pb = ProgressBar::new(len);
                if let Ok(style) = ProgressStyle::with_template(
                    "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
                ) {
                    pb.set_style(style.progress_chars("=>-"));
                }
                Some(pb)
            }
            _ => None,
        };

        let mut body = Vec::with_capacity(total.unwrap_or(0).min(MAX_PREALLOC) as usize);
        let mut buf = [0u8; 64 * 1024];
        loop {
            let n = resp.read(&mut buf).map_err(|e| {
                if read_timed_out(&e) {
                    Error::Timeout {
                        url: url.to_string(),
                    }
                } else {
                    Error::Unreachable {
                        url: url.to_string(),
                        reason: format!("body read interrupted: {e}"),
                    }
                }
            })?;
            if n == 0 {
                break;
            }
            body.extend_from_slice(&buf[..n]);
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }
        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        Ok(body)
    }
}

impl Transport for HttpTransport {
    fn get(&self, url: &Url, query: &[(&str, String)]) -> Result<HttpReply> {
        let resp = self
            .http
            .get(url.clone())
            .query(query)
            .send()
            .map_err(|e| map_send_error(url, e))?;

        let status = resp.status().as_u16();
        let body = self.read_body(resp, url)?;
        Ok(HttpReply { status, body })
    }
}

// reqwest reports a stalled body as an `Other` io error wrapping its own timeout.
fn read_timed_out(e: &io::Error) -> bool {
    if e.kind() == io::ErrorKind::TimedOut {
        return true;
    }
    let mut source = e.get_ref().map(|inner| inner as &(dyn StdError + 'static));
    while let Some(err) = source {
        if err
            .downcast_ref::<reqwest::Error>()
            .is_some_and(reqwest::Error::is_timeout)
        {
            return true;
        }
        if err
            .downcast_ref::<io::Error>()
            .is_some_and(|inner| inner.kind() == io::ErrorKind::TimedOut)
        {
            return true;
        }
        source = err.source();
    }
    false
}

fn map_send_error(url: &Url, e: reqwest::Error) -> Error {
    if e.is_timeout() {
        Error::Timeout {
            url: url.to_string(),
        }
    } else {
        Error::Unreachable {
            url: url.to_string(),
            reason: e.to_string(),
        }
    }
}
