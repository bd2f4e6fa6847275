use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

pub const SCHEMA_VERSION: &str = "catalog.v1";

/// Where the envelope's data came from and how long producing it took.
#[derive(Debug, Clone, Serialize, Default, PartialEq)]
pub struct Meta {
    /// Listing endpoint for `fetch`, snapshot location for the readers.
    pub source: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub snapshot: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u128>,
}

impl Meta {
    pub fn from_source(source: impl Into<String>) -> Self {
        Meta { source: source.into(), ..Meta::default() }
    }

    pub fn with_snapshot(mut self, path: impl Into<String>) -> Self {
        self.snapshot = Some(path.into());
        self
    }

    pub fn timed(mut self, started: Instant) -> Self {
        self.duration_ms = Some(started.elapsed().as_millis());
        self
    }
}

/// A plan describes what `--apply` would do; a result reports what was done.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Body {
    Plan(Value),
    Result(Value),
}

#[derive(Debug, Clone, Serialize)]
pub struct Envelope {
    pub schema_version: &'static str,
    pub time: DateTime<Utc>,
    pub request_id: Uuid,
    pub op: &'static str,
    pub apply: bool,
    #[serde(flatten)]
    pub body: Body,
    pub meta: Meta,
}

impl Envelope {
    fn new(op: &'static str, body: Body, meta: Meta) -> Self {
        Envelope {
            schema_version: SCHEMA_VERSION,
            time: Utc::now(),
            request_id: Uuid::new_v4(),
            op,
            apply: matches!(body, Body::Result(_)),
            body,
            meta,
        }
    }

    pub fn plan<T: Serialize>(op: &'static str, plan: &T, meta: Meta) -> Result<Self, serde_json::Error> {
        Ok(Self::new(op, Body::Plan(serde_json::to_value(plan)?), meta))
    }

    pub fn result<T: Serialize>(op: &'static str, result: &T, meta: Meta) -> Result<Self, serde_json::Error> {
        Ok(Self::new(op, Body::Result(serde_json::to_value(result)?), meta))
    }

    /// "Plan" or "Result", for text headers.
    pub fn kind(&self) -> &'static str {
        match self.body { Body::Plan(_) => "Plan", Body::Result(_) => "Result" }
    }

    pub fn payload(&self) -> &Value {
        match &self.body { Body::Plan(v) | Body::Result(v) => v }
    }
}
