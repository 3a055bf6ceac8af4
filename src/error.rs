use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Failures surfaced to callers.
///
/// A server that answers with a non-success HTTP status, a non-HAPI body or an
/// error envelope is not an error: those outcomes are reported as `Ok(None)`.
#[derive(Debug, Error)]
pub enum Error {
    /// The base URL does not join with the endpoint into an absolute http(s) URL.
    #[error("given HAPI url seems invalid: `{url}` (endpoint `{endpoint}`)")]
    InvalidUrl { url: String, endpoint: String },

    /// A data request named parameters the dataset does not advertise.
    #[error("dataset `{dataset}` has no parameter(s): {}", .unknown.join(", "))]
    UnknownParameters { dataset: String, unknown: Vec<String> },

    /// A model object could not be built from the decoded payload.
    #[error("failed to build {kind} from server payload: {source}")]
    Construction {
        kind: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("invalid time value `{0}`")]
    InvalidTime(String),

    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("could not reach {url}: {reason}")]
    Unreachable { url: String, reason: String },

    #[error(transparent)]
    Config(#[from] anyhow::Error),
}

impl Error {
    pub(crate) fn construction(kind: &'static str, source: serde_json::Error) -> Self {
        Self::Construction { kind, source }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_parameters_lists_every_name() {
        let err = Error::UnknownParameters {
            dataset: "ACE_MAG".to_string(),
            unknown: vec!["Bx".to_string(), "By".to_string()],
        };
        assert_eq!(err.to_string(), "dataset `ACE_MAG` has no parameter(s): Bx, By");
    }

    #[test]
    fn invalid_url_names_url_and_endpoint() {
        let err = Error::InvalidUrl {
            url: "not/a/server".to_string(),
            endpoint: "catalog".to_string(),
        };
        let msg = err.to_string();
        assert!(msg.contains("not/a/server"));
        assert!(msg.contains("catalog"));
    }
}
