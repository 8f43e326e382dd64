//! # Form Validation
//!
//! Turns raw query-string and form parameters into validated values. Field
//! errors are collected per field name, in the shape the UI shows next to
//! each input.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sort applied when the search form does not name one.
pub const DEFAULT_SORT: &str = "score desc";
/// Page size applied when the search form does not name one.
pub const DEFAULT_ROWS: u32 = 15;
/// Rows fetched to preview a core's documents on the template page.
pub const SAMPLE_ROWS: u32 = 5;

const MAX_LABEL_LENGTH: usize = 100;

/// Field name → error messages.
pub type FormErrors = BTreeMap<String, Vec<String>>;

fn add_error(errors: &mut FormErrors, field: &str, message: impl Into<String>) {
    errors
        .entry(field.to_string())
        .or_default()
        .push(message.into());
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn parse_number(
    errors: &mut FormErrors,
    field: &str,
    value: &Option<String>,
    default: u32,
) -> u32 {
    match non_empty(value) {
        None => default,
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            add_error(errors, field, "Enter a whole number.");
            default
        }),
    }
}

/// Parameters of the search page.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryForm {
    #[serde(default)]
    pub cores: Option<String>,
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default)]
    pub fq: Option<String>,
    #[serde(default)]
    pub sort: Option<String>,
    #[serde(default)]
    pub rows: Option<String>,
    #[serde(default)]
    pub start: Option<String>,
    #[serde(default)]
    pub facets: Option<String>,
}

impl QueryForm {
    /// True when the request carried no search parameters at all, i.e. the
    /// page was opened rather than submitted.
    pub fn is_empty(&self) -> bool {
        self.cores.is_none()
            && self.query.is_none()
            && self.fq.is_none()
            && self.sort.is_none()
            && self.rows.is_none()
            && self.start.is_none()
            && self.facets.is_none()
    }

    /// Validates the form and fills in defaults for empty optional fields.
    pub fn validate(&self) -> Result<SolrQuery, FormErrors> {
        let mut errors = FormErrors::new();

        let core = match non_empty(&self.cores) {
            Some(core) => core.to_string(),
            None => {
                add_error(&mut errors, "cores", "This field is required.");
                String::new()
            }
        };
        let rows = parse_number(&mut errors, "rows", &self.rows, DEFAULT_ROWS);
        let start = parse_number(&mut errors, "start", &self.start, 0);
        let facets = parse_number(&mut errors, "facets", &self.facets, 1);

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(SolrQuery {
            core,
            q: self.query.clone().unwrap_or_default(),
            fq: self.fq.clone().unwrap_or_default(),
            sort: non_empty(&self.sort).unwrap_or(DEFAULT_SORT).to_string(),
            rows,
            start,
            facets,
        })
    }

    /// Validates the form and also requires the core to be one of `available`.
    pub fn validate_against(&self, available: &[String]) -> Result<SolrQuery, FormErrors> {
        let query = self.validate()?;
        if available.iter().any(|core| *core == query.core) {
            return Ok(query);
        }

        let mut errors = FormErrors::new();
        add_error(
            &mut errors,
            "cores",
            format!(
                "Select a valid choice. {} is not one of the available choices.",
                query.core
            ),
        );
        Err(errors)
    }
}

/// A validated query against one core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SolrQuery {
    pub core: String,
    pub q: String,
    /// Filter queries, separated by `|`
    pub fq: String,
    /// Empty means Solr's default ordering
    pub sort: String,
    pub rows: u32,
    pub start: u32,
    /// Facets are requested only when this is 1
    pub facets: u32,
}

impl SolrQuery {
    /// Unfiltered, unfaceted query returning a handful of documents.
    pub fn sample(core: &str) -> Self {
        Self {
            core: core.to_string(),
            q: String::new(),
            fq: String::new(),
            sort: String::new(),
            rows: SAMPLE_ROWS,
            start: 0,
            facets: 0,
        }
    }

    /// Query carrying only the text typed so far, for the suggest endpoint.
    pub fn suggestion(core: &str, q: &str) -> Self {
        Self {
            q: q.to_string(),
            ..Self::sample(core)
        }
    }

    pub fn facets_requested(&self) -> bool {
        self.facets == 1
    }

    pub fn filter_queries(&self) -> impl Iterator<Item = &str> {
        self.fq.split('|').map(str::trim).filter(|fq| !fq.is_empty())
    }
}

/// Editable properties of a core.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CoreForm {
    #[serde(default)]
    pub label: Option<String>,
    /// HTML checkbox: present when ticked
    #[serde(default)]
    pub enabled: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoreProperties {
    pub label: String,
    pub enabled: bool,
}

impl CoreForm {
    pub fn validate(&self) -> Result<CoreProperties, FormErrors> {
        let mut errors = FormErrors::new();

        let label = non_empty(&self.label).unwrap_or_default().to_string();
        if label.is_empty() {
            add_error(&mut errors, "label", "This field is required.");
        } else if label.chars().count() > MAX_LABEL_LENGTH {
            add_error(
                &mut errors,
                "label",
                format!("Ensure this value has at most {} characters.", MAX_LABEL_LENGTH),
            );
        }

        let enabled = matches!(
            non_empty(&self.enabled).map(str::to_ascii_lowercase).as_deref(),
            Some("on" | "true" | "1")
        );

        if errors.is_empty() {
            Ok(CoreProperties { label, enabled })
        } else {
            Err(errors)
        }
    }
}
