//! Shared fixtures for the end-to-end tests.

#![allow(dead_code)]

use std::sync::Arc;

use tca_pipeline::{
    FixedClock, MemoryStatusSink, ProcessingContext, ProcessorChain, StatusPersister, StatusSink,
};
use tca_policy::Policy;

/// Policy of the reference scenarios: domain `fault`, role `vFW`, `cpu > 80`.
pub const SCENARIO_POLICY: &str = r#"{
    "domains": ["fault"],
    "functionalRoles": {
        "vFW": [
            {"fieldPath": "cpu", "direction": "GREATER_THAN", "severity": "CRITICAL",
             "thresholdValue": 80, "controlLoopName": "ControlLoop-vFW"}
        ]
    }
}"#;

/// Loads the scenario policy.
pub fn scenario_policy() -> Arc<Policy> {
    Arc::new(Policy::from_json(SCENARIO_POLICY).unwrap())
}

/// A policy for `fault`/`vFW` with the given thresholds document fragment.
pub fn policy_with_thresholds(thresholds: &str) -> Arc<Policy> {
    let doc = format!(r#"{{"domains": ["fault"], "functionalRoles": {{"vFW": [{thresholds}]}}}}"#);
    Arc::new(Policy::from_json(&doc).unwrap())
}

/// A VES event with the given header fields and a `cpu` body metric.
pub fn event(domain: Option<&str>, role: Option<&str>, cpu: Option<f64>) -> String {
    let mut header = serde_json::Map::new();
    if let Some(domain) = domain {
        header.insert("domain".into(), domain.into());
    }
    if let Some(role) = role {
        header.insert("functionalRole".into(), role.into());
    }
    header.insert("startEpochMicrosec".into(), 1_500_000_000_000_000_i64.into());
    header.insert("sourceId".into(), "vfw-e2e".into());

    let mut body = serde_json::Map::new();
    body.insert("commonEventHeader".into(), header.into());
    if let Some(cpu) = cpu {
        body.insert("cpu".into(), cpu.into());
    }
    serde_json::json!({ "event": body }).to_string()
}

/// Runs the standard chain over one raw event.
pub fn run_chain(policy: &Arc<Policy>, raw: &str) -> ProcessingContext {
    ProcessorChain::standard().run(ProcessingContext::new(raw, Arc::clone(policy)))
}

/// A persister writing to `sink` at a fixed time.
pub fn persister_at(
    policy: &Arc<Policy>,
    sink: Arc<dyn StatusSink>,
    instance_id: u32,
    millis: i64,
) -> StatusPersister {
    StatusPersister::new(Arc::clone(policy), sink, instance_id).with_clock(Arc::new(FixedClock(millis)))
}

/// A fresh in-memory sink.
pub fn memory_sink() -> Arc<MemoryStatusSink> {
    Arc::new(MemoryStatusSink::new())
}
