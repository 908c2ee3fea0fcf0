//! CEF/VES event envelope.
//!
//! An inbound event is a JSON document of the shape
//! `{"event": {"commonEventHeader": {...}, <body sections>...}}`. Header
//! fields may be absent; absence is represented as `None` and judged by the
//! stage that needs the field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::error::EnvelopeError;

const EVENT_KEY: &str = "event";
const HEADER_KEY: &str = "commonEventHeader";
const ABSOLUTE_PREFIX: &str = "$.";

/// The common event header of an envelope.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommonEventHeader {
    /// Coarse event category such as `fault` or `heartbeat`.
    pub domain: Option<String>,
    /// Type of network function that emitted the event.
    pub functional_role: Option<String>,
    /// Event start time in microseconds since the epoch.
    pub start_epoch_microsec: Option<i64>,
    /// Identifier of the event source.
    pub source_id: Option<String>,
}

impl CommonEventHeader {
    fn from_object(header: &Map<String, Value>) -> Self {
        let text = |key: &str| header.get(key).and_then(Value::as_str).map(str::to_string);

        Self {
            domain: text("domain"),
            functional_role: text("functionalRole"),
            start_epoch_microsec: header.get("startEpochMicrosec").and_then(as_epoch),
            source_id: text("sourceId"),
        }
    }
}

/// A parsed event: its header plus the full JSON document for field lookups.
#[derive(Debug, Clone, PartialEq)]
pub struct EventEnvelope {
    header: CommonEventHeader,
    document: Value,
}

impl EventEnvelope {
    /// Parses raw event text into an envelope.
    ///
    /// # Errors
    ///
    /// Returns an [`EnvelopeError`] if the text is empty, not JSON, or lacks
    /// the `event.commonEventHeader` object.
    pub fn parse(raw: &str) -> Result<Self, EnvelopeError> {
        if raw.trim().is_empty() {
            return Err(EnvelopeError::Empty);
        }

        let document: Value =
            serde_json::from_str(raw).map_err(|e| EnvelopeError::InvalidJson(e.to_string()))?;

        let event = document
            .get(EVENT_KEY)
            .and_then(Value::as_object)
            .ok_or(EnvelopeError::MissingEvent)?;

        let header = event
            .get(HEADER_KEY)
            .and_then(Value::as_object)
            .ok_or(EnvelopeError::MissingCommonEventHeader)?;

        Ok(Self {
            header: CommonEventHeader::from_object(header),
            document,
        })
    }

    /// Returns the common event header.
    #[must_use]
    pub const fn header(&self) -> &CommonEventHeader {
        &self.header
    }

    /// Returns the header domain, if present.
    #[must_use]
    pub fn domain(&self) -> Option<&str> {
        self.header.domain.as_deref()
    }

    /// Returns the header functional role, if present.
    #[must_use]
    pub fn functional_role(&self) -> Option<&str> {
        self.header.functional_role.as_deref()
    }

    /// Resolves a field path to a numeric value.
    ///
    /// A `$.`-prefixed path is absolute from the document root. Any other
    /// path is relative to the event body. Segments are dot separated and
    /// may carry array indices, e.g. `vNicUsageArray[0].bytesIn`. Numbers
    /// and numeric strings resolve; anything else returns `None`.
    #[must_use]
    pub fn resolve_number(&self, field_path: &str) -> Option<f64> {
        let (root, path) = match field_path.strip_prefix(ABSOLUTE_PREFIX) {
            Some(rest) => (&self.document, rest),
            None => {
                let first = field_path.split(['.', '[']).next().unwrap_or_default();
                if first == HEADER_KEY {
                    return None;
                }
                (self.document.get(EVENT_KEY)?, field_path)
            }
        };

        let mut current = root;
        for segment in path.split('.') {
            current = step(current, segment)?;
        }

        let number = as_number(current);
        if number.is_none() && !current.is_null() {
            warn!(field_path, "metric value is not numeric");
        }
        number
    }
}

/// Applies one path segment such as `name`, `name[2]` or `name[2][0]`.
fn step<'a>(value: &'a Value, segment: &str) -> Option<&'a Value> {
    let (name, mut indices) = match segment.find('[') {
        Some(pos) => (&segment[..pos], &segment[pos..]),
        None => (segment, ""),
    };

    if name.is_empty() && indices.is_empty() {
        return None;
    }

    let mut current = if name.is_empty() {
        value
    } else {
        value.get(name)?
    };

    while !indices.is_empty() {
        let rest = indices.strip_prefix('[')?;
        let end = rest.find(']')?;
        let index: usize = rest[..end].trim().parse().ok()?;
        current = current.get(index)?;
        indices = &rest[end + 1..];
    }

    Some(current)
}

fn as_number(value: &Value) -> Option<f64> {
    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    };
    number.filter(|v| v.is_finite())
}

fn as_epoch(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}
