//! Payload decoders.
//!
//! Every decoder turns a raw response body into a value, or `None` when the
//! body is empty, malformed, or not a successful HAPI response. They share one
//! signature so the gateway can take any of them.

use serde_json::{Map, Value};

use crate::status::parse_status;
use crate::time::parse_time;
use crate::timeseries::{Cell, TimeSeries};

pub type Decoder<T> = fn(&[u8]) -> Option<T>;

/// Decodes a JSON envelope and returns its payload without `status`/`HAPI`.
pub fn json_response(body: &[u8]) -> Option<Map<String, Value>> {
    match serde_json::from_slice::<Value>(body) {
        Ok(Value::Object(map)) => parse_status(map),
        Ok(_) => {
            tracing::debug!("JSON response is not an object");
            None
        }
        Err(e) => {
            tracing::debug!(error = %e, "response is not JSON");
            None
        }
    }
}

/// Decodes a headerless CSV table whose first column is the time index.
///
/// Data fields are kept as raw text; blank ones are [`Cell::Missing`]. An empty
/// body means no data and yields `None`, as does any row with an unparseable
/// timestamp or a width differing from the first row.
pub fn csv(body: &[u8]) -> Option<TimeSeries> {
    if body.is_empty() {
        return None;
    }
    let text = match std::str::from_utf8(body) {
        Ok(t) => t,
        Err(e) => {
            tracing::warn!(error = %e, "CSV response is not UTF-8");
            return None;
        }
    };

    let mut index = Vec::new();
    let mut rows = Vec::new();
    let mut width: Option<usize> = None;

    for (lineno, line) in text.lines().enumerate() {
        let line = line.trim_end_matches('\r');
        if line.trim().is_empty() {
            continue;
        }
        let mut fields = split_record(line).into_iter();
        let stamp = fields.next().unwrap_or_default();
        let Some(t) = parse_time(&stamp) else {
            tracing::warn!(line = lineno + 1, value = %stamp, "bad timestamp in CSV response");
            return None;
        };
        let row: Vec<Cell> = fields.map(|f| Cell::parse(&f)).collect();
        match width {
            None => width = Some(row.len()),
            Some(w) if w != row.len() => {
                tracing::warn!(line = lineno + 1, expected = w, got = row.len(), "ragged CSV row");
                return None;
            }
            Some(_) => {}
        }
        index.push(t);
        rows.push(row);
    }

    if index.is_empty() {
        return None;
    }
    Some(TimeSeries::from_rows(index, rows))
}

// Quoted fields may contain commas; `""` inside quotes is a literal quote.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    let mut chars = line.chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if quoted && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => quoted = !quoted,
            ',' if !quoted => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}
