use std::fmt;

use crate::error::{Error, Result};
use crate::parsers::Decoder;
use crate::transport::Transport;
use crate::util::build_url;

/// The HAPI endpoints, each mapped to its fixed path segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Catalog,
    Capabilities,
    Info,
    Data,
}

impl Endpoint {
    pub fn path(self) -> &'static str {
        match self {
            Endpoint::Catalog => "catalog",
            Endpoint::Capabilities => "capabilities",
            Endpoint::Info => "info",
            Endpoint::Data => "data",
        }
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// GETs `endpoint` under `base_url` and decodes the body.
///
/// A base URL that cannot form a valid request URL is an error. A transport
/// that cannot reach the host, a non-success status and a body the decoder
/// rejects all come back as `Ok(None)`. Timeouts are errors.
pub fn get_from_endpoint<T>(
    transport: &dyn Transport,
    base_url: &str,
    endpoint: Endpoint,
    parameters: &[(&str, String)],
    decoder: Decoder<T>,
) -> Result<Option<T>> {
    let url = build_url(base_url, endpoint.path()).ok_or_else(|| Error::InvalidUrl {
        url: base_url.to_string(),
        endpoint: endpoint.path().to_string(),
    })?;

    tracing::debug!(%url, %endpoint, ?parameters, "new request");
    let reply = match transport.get(&url, parameters) {
        Ok(reply) => reply,
        Err(Error::Unreachable { url, reason }) => {
            tracing::warn!(%url, %reason, "HAPI server unreachable");
            return Ok(None);
        }
        Err(e) => return Err(e),
    };

    if !reply.is_success() {
        tracing::warn!(%url, status = reply.status, "request failed");
        return Ok(None);
    }

    let decoded = decoder(&reply.body);
    if decoded.is_none() {
        tracing::debug!(%url, bytes = reply.body.len(), "response decoded to nothing");
    }
    Ok(decoded)
}
