use serde_json::{Map, Value};

pub const SUCCESS_CODE: i64 = 1200;
pub const SUCCESS_MESSAGE: &str = "OK";

/// The `status` object every HAPI JSON response carries.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize)]
pub struct HapiStatus {
    pub code: i64,
    pub message: String,
}

impl HapiStatus {
    pub fn from_envelope(response: &Map<String, Value>) -> Option<Self> {
        serde_json::from_value(response.get("status")?.clone()).ok()
    }

    pub fn is_ok(&self) -> bool {
        self.code == SUCCESS_CODE && self.message == SUCCESS_MESSAGE
    }
}

/// True when the envelope reports `1200 OK`, compared exactly.
pub fn is_ok(response: &Map<String, Value>) -> bool {
    HapiStatus::from_envelope(response).is_some_and(|s| s.is_ok())
}

/// Strips `status` and `HAPI` from a successful envelope and returns the rest.
///
/// Anything else, including a body without the `HAPI` marker, yields `None`.
pub fn parse_status(mut response: Map<String, Value>) -> Option<Map<String, Value>> {
    if !is_ok(&response) {
        if let Some(status) = HapiStatus::from_envelope(&response) {
            tracing::debug!(code = status.code, message = %status.message, "HAPI error status");
        }
        return None;
    }
    response.remove("HAPI")?;
    response.remove("status");
    Some(response)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn envelope(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn success_envelope_is_stripped() {
        let response = envelope(json!({
            "HAPI": "2.0",
            "status": {"code": 1200, "message": "OK"},
            "data": 2
        }));
        let payload = parse_status(response).unwrap();
        assert_eq!(Value::Object(payload), json!({"data": 2}));
    }

    #[test]
    fn wrong_code_or_message_is_absent() {
        let bad_code = envelope(json!({
            "HAPI": "2.0",
            "status": {"code": 1400, "message": "OK"},
            "data": 2
        }));
        let bad_message = envelope(json!({
            "HAPI": "2.0",
            "status": {"code": 1200, "message": "NOK"},
            "data": 2
        }));
        assert!(parse_status(bad_code).is_none());
        assert!(parse_status(bad_message).is_none());
    }

    #[test]
    fn message_match_is_exact() {
        let lower = envelope(json!({
            "HAPI": "2.0",
            "status": {"code": 1200, "message": "ok"}
        }));
        let prefixed = envelope(json!({
            "HAPI": "2.0",
            "status": {"code": 1200, "message": "OK, partial"}
        }));
        assert!(!is_ok(&lower));
        assert!(!is_ok(&prefixed));
    }

    #[test]
    fn non_hapi_bodies_are_absent() {
        assert!(parse_status(envelope(json!({"data": 2}))).is_none());
        assert!(parse_status(envelope(json!({"status": "fine"}))).is_none());
        assert!(
            parse_status(envelope(json!({"status": {"code": 1200, "message": "OK"}}))).is_none()
        );
    }
}
