//! # Facet Normalization
//!
//! Solr reports facets under `facet_counts`, split by kind and keyed by field
//! name:
//!
//! ```text
//! facet_counts.facet_fields  {field: [value, count, value, count, ...]}
//! facet_counts.facet_ranges  {field: {counts: [...], start, end, gap}}
//! facet_counts.facet_dates   {field: {date: count, ..., start, end, gap}}
//! ```
//!
//! The search page wants one ordered list instead, addressed by the uuids an
//! admin assigned in the core's [`FacetSettings`]. [`augment_solr_response`]
//! builds that list and attaches it to the response as `normalized_facets`.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::HashMap;

use crate::settings::{FacetKind, FacetSettings};

/// Keys of a date facet that carry parameters rather than buckets.
const DATE_PARAMETER_KEYS: [&str; 3] = ["start", "end", "gap"];

/// One facet of a search response, ready for display.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FacetDescriptor {
    pub field: String,
    #[serde(rename = "type")]
    pub kind: FacetKind,
    pub label: String,
    pub counts: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gap: Option<Value>,
}

/// A Solr response with its facets normalized.
///
/// Serializes as the original response object plus a `normalized_facets` array.
#[derive(Debug, Clone, Default, Serialize)]
pub struct AugmentedResponse {
    #[serde(flatten)]
    pub raw: Map<String, Value>,
    pub normalized_facets: Vec<FacetDescriptor>,
}

/// Display label of a facet: the label of the last configured entry of that
/// kind reading `field`, or the field name itself.
pub fn facet_field_label(field: &str, kind: FacetKind, facets: &FacetSettings) -> String {
    facets
        .entries(kind)
        .iter()
        .rev()
        .find(|entry| entry.field == field)
        .map(|entry| entry.label.clone())
        .unwrap_or_else(|| field.to_string())
}

/// Uuid of a facet: the uuid of the last configured entry of that kind reading
/// `field`, or the empty string.
pub fn facet_field_uuid(field: &str, kind: FacetKind, facets: &FacetSettings) -> String {
    facets
        .entries(kind)
        .iter()
        .rev()
        .find(|entry| entry.field == field)
        .map(|entry| entry.uuid.clone())
        .unwrap_or_default()
}

fn describe(
    field: &str,
    kind: FacetKind,
    facets: &FacetSettings,
    counts: Value,
) -> FacetDescriptor {
    FacetDescriptor {
        field: field.to_string(),
        kind,
        label: facet_field_label(field, kind, facets),
        counts,
        start: None,
        end: None,
        gap: None,
    }
}

/// Flattens date buckets into `[date, count, date, count, ...]`, ascending by
/// bucket key.
fn flatten_date_counts(buckets: &Map<String, Value>) -> Value {
    let mut dates: Vec<(&String, &Value)> = buckets
        .iter()
        .filter(|(key, _)| !DATE_PARAMETER_KEYS.contains(&key.as_str()))
        .collect();
    dates.sort_by(|a, b| a.0.cmp(b.0));

    let mut counts = Vec::with_capacity(dates.len() * 2);
    for (date, count) in dates {
        counts.push(Value::String(date.clone()));
        counts.push(count.clone());
    }
    Value::Array(counts)
}

fn facets_of_kind<'a>(
    facet_counts: &'a Value,
    key: &str,
) -> impl Iterator<Item = (&'a String, &'a Value)> {
    facet_counts
        .get(key)
        .and_then(Value::as_object)
        .into_iter()
        .flat_map(|facets| facets.iter())
}

/// Builds the ordered facet list of a raw Solr response.
///
/// Facets are keyed by the uuid their field resolves to, with later kinds
/// replacing earlier ones on a uuid clash, then emitted in `facets.order`.
/// Order entries without a matching facet are skipped.
pub fn normalize_facets(response: &Value, facets: &FacetSettings) -> Vec<FacetDescriptor> {
    let Some(facet_counts) = response.get("facet_counts").filter(|v| v.is_object()) else {
        return Vec::new();
    };

    let mut by_uuid: HashMap<String, FacetDescriptor> = HashMap::new();

    for (field, counts) in facets_of_kind(facet_counts, "facet_fields") {
        let facet = describe(field, FacetKind::Field, facets, counts.clone());
        by_uuid.insert(facet_field_uuid(field, FacetKind::Field, facets), facet);
    }

    for (field, range) in facets_of_kind(facet_counts, "facet_ranges") {
        let counts = range
            .get("counts")
            .cloned()
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let mut facet = describe(field, FacetKind::Range, facets, counts);
        facet.start = range.get("start").cloned();
        facet.end = range.get("end").cloned();
        facet.gap = range.get("gap").cloned();
        by_uuid.insert(facet_field_uuid(field, FacetKind::Range, facets), facet);
    }

    for (field, date) in facets_of_kind(facet_counts, "facet_dates") {
        let counts = date
            .as_object()
            .map(flatten_date_counts)
            .unwrap_or_else(|| Value::Array(Vec::new()));
        let mut facet = describe(field, FacetKind::Date, facets, counts);
        facet.start = date.get("start").cloned();
        facet.end = date.get("end").cloned();
        facet.gap = date.get("gap").cloned();
        by_uuid.insert(facet_field_uuid(field, FacetKind::Date, facets), facet);
    }

    let mut normalized = Vec::with_capacity(facets.order.len());
    for uuid in &facets.order {
        if let Some(facet) = by_uuid.get(uuid) {
            normalized.push(facet.clone());
        }
    }
    normalized
}

/// Attaches `normalized_facets` to a raw Solr response.
///
/// A response that is not a JSON object (for instance the empty response of a
/// failed query) is treated as an empty object.
pub fn augment_solr_response(response: Value, facets: &FacetSettings) -> AugmentedResponse {
    let normalized_facets = normalize_facets(&response, facets);
    let mut raw = match response {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    raw.remove("normalized_facets");

    AugmentedResponse {
        raw,
        normalized_facets,
    }
}
