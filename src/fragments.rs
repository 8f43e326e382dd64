//! HTML fragments returned to the admin pages' AJAX calls.

use askama::Template;
use serde_json::{Map, Value};

use crate::settings::Core;

struct PropertyRow {
    key: String,
    value: String,
}

/// A nested object of the core status, such as `index`.
struct PropertySection {
    name: String,
    rows: Vec<PropertyRow>,
}

#[derive(Template)]
#[template(
    source = r#"{% if found -%}
<h3>{{ label }} <small>{{ name }}</small></h3>
<table class="table table-condensed">
{% for row in rows -%}
<tr><th>{{ row.key }}</th><td>{{ row.value }}</td></tr>
{% endfor -%}
</table>
{% for section in sections -%}
<h4>{{ section.name }}</h4>
<table class="table table-condensed">
{% for row in section.rows -%}
<tr><th>{{ row.key }}</th><td>{{ row.value }}</td></tr>
{% endfor -%}
</table>
{% endfor -%}
{% else -%}
<div class="alert">Solr reported no status for core <strong>{{ name }}</strong>.</div>
{% endif %}"#,
    ext = "html"
)]
struct CorePropertiesTemplate<'a> {
    label: &'a str,
    name: &'a str,
    found: bool,
    rows: Vec<PropertyRow>,
    sections: Vec<PropertySection>,
}

#[derive(Template)]
#[template(
    source = r#"<h3>{{ label }} <small>schema.xml</small></h3>
<pre class="schema">{{ schema }}</pre>
"#,
    ext = "html"
)]
struct SchemaTemplate<'a> {
    label: &'a str,
    schema: &'a str,
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

fn property_rows(properties: &Map<String, Value>) -> Vec<PropertyRow> {
    properties
        .iter()
        .filter(|(_, value)| !value.is_object())
        .map(|(key, value)| PropertyRow {
            key: key.clone(),
            value: display_value(value),
        })
        .collect()
}

/// Table of the status Solr reports for one core, as returned by the core
/// admin STATUS call. Nested sections such as `index` get their own table.
pub fn render_core_properties(solr_core: &Value, core: &Core) -> askama::Result<String> {
    let status = solr_core
        .get("status")
        .and_then(|s| s.get(&core.name))
        .and_then(Value::as_object);

    let (rows, sections) = match status {
        Some(status) => (
            property_rows(status),
            status
                .iter()
                .filter_map(|(name, value)| {
                    value.as_object().map(|properties| PropertySection {
                        name: name.clone(),
                        rows: property_rows(properties),
                    })
                })
                .collect(),
        ),
        None => (Vec::new(), Vec::new()),
    };

    CorePropertiesTemplate {
        label: &core.label,
        name: &core.name,
        found: status.is_some(),
        rows,
        sections,
    }
    .render()
}

/// The core's schema document, shown verbatim.
pub fn render_schema(schema: &str, core: &Core) -> askama::Result<String> {
    SchemaTemplate {
        label: &core.label,
        schema,
    }
    .render()
}
