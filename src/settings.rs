//! # Core Settings
//!
//! Per-core UI configuration: which facets to request and how to label and order
//! them, how results are rendered and highlighted, and which sort options the UI
//! offers. Admin pages post these settings back as form fields whose values are
//! JSON documents; [`FacetSettings::update_from_post`] and friends apply them.

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Template used for result documents until an admin sets one.
pub const DEFAULT_RESULT_TEMPLATE: &str = "<div class=\"result\">{{id}}</div>";

/// Error raised when a posted settings field does not hold the expected JSON.
#[derive(Debug, Error)]
#[error("Invalid value for '{field}': {source}")]
pub struct SettingsError {
    pub field: String,
    #[source]
    pub source: serde_json::Error,
}

fn parse_posted<T: DeserializeOwned>(
    data: &HashMap<String, String>,
    key: &str,
) -> Result<Option<T>, SettingsError> {
    match data.get(key) {
        Some(raw) => serde_json::from_str(raw)
            .map(Some)
            .map_err(|source| SettingsError {
                field: key.to_string(),
                source,
            }),
        None => Ok(None),
    }
}

fn new_uuid() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// The three kinds of facets Solr computes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FacetKind {
    Field,
    Range,
    Date,
}


/// A configured facet: the Solr field it reads, its display label and the
/// stable identifier the UI addresses it by.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FacetEntry {
    #[serde(default = "new_uuid")]
    pub uuid: String,
    pub field: String,
    #[serde(default)]
    pub label: String,
    /// Range and date facets only: lower bound sent as `facet.{range,date}.start`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gap: Option<serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FacetProperties {
    pub is_enabled: bool,
    pub limit: u32,
    pub mincount: u32,
    pub sort: String,
}

impl Default for FacetProperties {
    fn default() -> Self {
        Self {
            is_enabled: true,
            limit: 10,
            mincount: 1,
            sort: "count".to_string(),
        }
    }
}

/// Facet configuration of a core.
///
/// `order` lists facet uuids in display order; facets whose uuid is not in
/// `order` are computed by Solr but never shown.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetSettings {
    #[serde(default)]
    pub properties: FacetProperties,
    #[serde(default)]
    pub fields: Vec<FacetEntry>,
    #[serde(default)]
    pub ranges: Vec<FacetEntry>,
    #[serde(default)]
    pub dates: Vec<FacetEntry>,
    #[serde(default)]
    pub order: Vec<String>,
}

impl FacetSettings {
    /// Configured entries for one facet kind.
    pub fn entries(&self, kind: FacetKind) -> &[FacetEntry] {
        match kind {
            FacetKind::Field => &self.fields,
            FacetKind::Range => &self.ranges,
            FacetKind::Date => &self.dates,
        }
    }

    /// Applies the posted `properties`, `fields`, `ranges`, `dates` and `order`
    /// fields. Nothing is changed if any of them fails to parse.
    pub fn update_from_post(
        &mut self,
        data: &HashMap<String, String>,
    ) -> Result<(), SettingsError> {
        let properties = parse_posted(data, "properties")?;
        let fields = parse_posted(data, "fields")?;
        let ranges = parse_posted(data, "ranges")?;
        let dates = parse_posted(data, "dates")?;
        let order = parse_posted(data, "order")?;

        if let Some(properties) = properties {
            self.properties = properties;
        }
        if let Some(fields) = fields {
            self.fields = fields;
        }
        if let Some(ranges) = ranges {
            self.ranges = ranges;
        }
        if let Some(dates) = dates {
            self.dates = dates;
        }
        if let Some(order) = order {
            self.order = order;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ResultProperties {
    #[serde(default)]
    pub highlighting_enabled: bool,
}

/// How result documents are rendered and highlighted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultSettings {
    pub template: String,
    /// Fields sent to Solr as `hl.fl`
    #[serde(default)]
    pub highlighting: Vec<String>,
    #[serde(default)]
    pub properties: ResultProperties,
}

impl Default for ResultSettings {
    fn default() -> Self {
        Self {
            template: DEFAULT_RESULT_TEMPLATE.to_string(),
            highlighting: Vec::new(),
            properties: ResultProperties::default(),
        }
    }
}

impl ResultSettings {
    /// Highlighting only applies when it is switched on and has fields to work on.
    pub fn highlighting_active(&self) -> bool {
        self.properties.highlighting_enabled && !self.highlighting.is_empty()
    }

    /// Applies the posted `template` (raw text), `highlighting` and `properties`
    /// fields. Nothing is changed if any of them fails to parse.
    pub fn update_from_post(
        &mut self,
        data: &HashMap<String, String>,
    ) -> Result<(), SettingsError> {
        let highlighting = parse_posted(data, "highlighting")?;
        let properties = parse_posted(data, "properties")?;

        if let Some(template) = data.get("template") {
            self.template = template.clone();
        }
        if let Some(highlighting) = highlighting {
            self.highlighting = highlighting;
        }
        if let Some(properties) = properties {
            self.properties = properties;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortField {
    pub field: String,
    #[serde(default)]
    pub label: String,
    #[serde(default = "default_true")]
    pub asc: bool,
    #[serde(default = "default_true")]
    pub include: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortingProperties {
    #[serde(default)]
    pub is_enabled: bool,
}

/// Sort options offered by the search page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortingSettings {
    #[serde(default)]
    pub properties: SortingProperties,
    #[serde(default)]
    pub fields: Vec<SortField>,
}

impl SortingSettings {
    pub fn update_from_post(
        &mut self,
        data: &HashMap<String, String>,
    ) -> Result<(), SettingsError> {
        let properties = parse_posted(data, "properties")?;
        let fields = parse_posted(data, "fields")?;

        if let Some(properties) = properties {
            self.properties = properties;
        }
        if let Some(fields) = fields {
            self.fields = fields;
        }
        Ok(())
    }
}

/// UI configuration of one Solr core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Core {
    pub name: String,
    pub label: String,
    pub enabled: bool,
    pub facets: FacetSettings,
    pub result: ResultSettings,
    pub sorting: SortingSettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Core {
    pub fn new(name: &str) -> Self {
        let now = Utc::now();
        Self {
            name: name.to_string(),
            label: name.to_string(),
            enabled: true,
            facets: FacetSettings::default(),
            result: ResultSettings::default(),
            sorting: SortingSettings::default(),
            created_at: now,
            updated_at: now,
        }
    }
}

/// Name and label of a core, as listed in page navigation.
#[derive(Debug, Clone, Serialize)]
pub struct CoreSummary {
    pub name: String,
    pub label: String,
    pub enabled: bool,
}

impl From<&Core> for CoreSummary {
    fn from(core: &Core) -> Self {
        Self {
            name: core.name.clone(),
            label: core.label.clone(),
            enabled: core.enabled,
        }
    }
}
