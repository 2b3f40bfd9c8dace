/// PM Simulator Kernel v1: Canonical Hashing
///
/// Deterministic canonical serialization + SHA-256 hashing.
/// Produces byte-identical output across platforms.
///
/// Rules:
///   - Stakeholders sorted by id, risks sorted by id (UTF-8 byte order)
///   - Phase table sorted by phase order
///   - Months written as fixed-point integers
///   - UTF-8 JSON, no whitespace, no float

use serde_json::{Map, Value};
use sha2::{Digest, Sha256};

use crate::domain::{ProjectState, ScenarioConstants};
use crate::KERNEL_VERSION;

/// Canonical serialization of ProjectState to UTF-8 JSON bytes.
/// Includes kernel_version as the first field for identity binding.
pub fn canonical_serialize(state: &ProjectState) -> Vec<u8> {
    // A tree of strings, integers and bools always serializes.
    build_canonical_value(state).to_string().into_bytes()
}

/// SHA-256 of canonical serialization. Lowercase hex string.
pub fn canonical_hash(state: &ProjectState) -> String {
    let bytes = canonical_serialize(state);
    let digest = Sha256::digest(&bytes);
    digest.iter().map(|b| format!("{:02x}", b)).collect::<String>()
}

fn int(value: i64) -> Value {
    Value::Number(value.into())
}

fn string(value: &str) -> Value {
    Value::String(value.to_string())
}

/// Field order: kernel_version, planned_budget, actual_cost, earned_value,
/// planned_value, total_months, elapsed_months, quality, stakeholders,
/// risks, constants
fn build_canonical_value(state: &ProjectState) -> Value {
    // -- quality ---
    let mut quality = Map::new();
    quality.insert("defects_found".to_string(), int(state.quality.defects_found));
    quality.insert("defects_resolved".to_string(), int(state.quality.defects_resolved));
    quality.insert("reviews_skipped".to_string(), int(state.quality.reviews_skipped));
    quality.insert(
        "test_coverage".to_string(),
        string(state.quality.test_coverage.as_str()),
    );

    // -- stakeholders (sorted by id) ---
    let mut stakeholders: Vec<_> = state.stakeholders.iter().collect();
    stakeholders.sort_by(|a, b| a.id.cmp(&b.id));
    let stakeholders_list: Vec<Value> = stakeholders
        .into_iter()
        .map(|s| {
            let mut m = Map::new();
            m.insert("id".to_string(), string(&s.id));
            m.insert("name".to_string(), string(&s.name));
            m.insert("satisfaction".to_string(), int(s.satisfaction as i64));
            m.insert(
                "engagement".to_string(),
                serde_json::to_value(s.engagement).unwrap_or(Value::Null),
            );
            Value::Object(m)
        })
        .collect();

    // -- risks (sorted by id) ---
    let mut risks: Vec<_> = state.risks.iter().collect();
    risks.sort_by(|a, b| a.id.cmp(&b.id));
    let risks_list: Vec<Value> = risks
        .into_iter()
        .map(|r| {
            let mut m = Map::new();
            m.insert("id".to_string(), string(&r.id));
            m.insert("description".to_string(), string(&r.description));
            m.insert("probability".to_string(), string(r.probability.as_str()));
            m.insert("impact".to_string(), string(r.impact.as_str()));
            m.insert("status".to_string(), string(r.status.as_str()));
            m.insert(
                "response".to_string(),
                r.response.as_deref().map(string).unwrap_or(Value::Null),
            );
            m.insert("source".to_string(), string(&r.source));
            Value::Object(m)
        })
        .collect();

    // -- top-level (strict field order) ---
    // kernel_version MUST be first: it is part of the kernel identity.
    let mut root = Map::new();
    root.insert("kernel_version".to_string(), int(KERNEL_VERSION as i64));
    root.insert("planned_budget".to_string(), int(state.planned_budget));
    root.insert("actual_cost".to_string(), int(state.actual_cost));
    root.insert("earned_value".to_string(), int(state.earned_value));
    root.insert("planned_value".to_string(), int(state.planned_value));
    root.insert("total_months".to_string(), int(state.total_months.raw()));
    root.insert("elapsed_months".to_string(), int(state.elapsed_months.raw()));
    root.insert("quality".to_string(), Value::Object(quality));
    root.insert("stakeholders".to_string(), Value::Array(stakeholders_list));
    root.insert("risks".to_string(), Value::Array(risks_list));
    root.insert("constants".to_string(), canonical_constants(&state.constants));

    Value::Object(root)
}

fn canonical_constants(constants: &ScenarioConstants) -> Value {
    let mut phases: Vec<_> = constants.phases.iter().collect();
    phases.sort_by_key(|p| p.phase);
    let phases_list: Vec<Value> = phases
        .into_iter()
        .map(|p| {
            let mut m = Map::new();
            m.insert("phase".to_string(), string(p.phase.as_str()));
            m.insert("pv_per_event".to_string(), int(p.pv_per_event));
            m.insert("event_count".to_string(), int(p.event_count as i64));
            m.insert("pre_baseline".to_string(), Value::Bool(p.pre_baseline));
            Value::Object(m)
        })
        .collect();

    let mut m = Map::new();
    m.insert("phases".to_string(), Value::Array(phases_list));
    m.insert(
        "baseline_elapsed_months".to_string(),
        int(constants.baseline_elapsed_months.raw()),
    );
    m.insert(
        "document_types_total".to_string(),
        int(constants.document_types_total as i64),
    );
    m.insert("sponsor_id".to_string(), string(&constants.sponsor_id));
    Value::Object(m)
}
