//! # Solr Client
//!
//! This module talks to the Solr HTTP API: core administration, schema
//! retrieval, select queries and suggestions. Responses are returned as
//! untyped JSON since their shape depends on each core's schema.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use solr_search_ui::{Config, SolrApi};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env()?);
//!     let solr = SolrApi::new(config)?;
//!
//!     let cores = solr.cores().await?;
//!     println!("{:?}", SolrApi::core_names(&cores));
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info};
use url::Url;

use crate::forms::SolrQuery;
use crate::settings::Core;
use crate::Config;

/// Renders a facet parameter taken from the settings as a query-string value.
fn param_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub struct SolrApi {
    client: Client,
    config: Arc<Config>,
    base_url: Url,
}

impl SolrApi {
    pub fn new(config: Arc<Config>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.application.user_agent)
            .timeout(Duration::from_secs(config.solr.request_timeout_secs))
            .build()
            .context("Failed to create HTTP client")?;
        let base_url = config.solr_base_url()?;

        Ok(Self {
            client,
            config,
            base_url,
        })
    }

    /// Builds `{base}/{segments...}`, escaping each segment.
    fn url(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| anyhow::anyhow!("Solr URL '{}' cannot be a base", self.base_url))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn send(&self, url: &Url, params: &[(String, String)]) -> Result<reqwest::Response> {
        debug!("📡 SOLR: GET {} ({} params)", url, params.len());

        let start_time = std::time::Instant::now();
        let response = self
            .client
            .get(url.clone())
            .query(params)
            .send()
            .await
            .with_context(|| format!("Failed to send request to Solr at {}", url))?;

        let elapsed = start_time.elapsed();
        let status = response.status();

        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            error!(
                "❌ SOLR FAILED: {} returned status {} in {}ms - {}",
                url,
                status,
                elapsed.as_millis(),
                error_text
            );
            return Err(anyhow::anyhow!(
                "Solr request failed with status {}: {}",
                status,
                error_text
            ));
        }

        debug!(
            "✅ SOLR RESPONSE: {} answered {} in {}ms",
            url,
            status,
            elapsed.as_millis()
        );
        Ok(response)
    }

    async fn get_json(&self, url: Url, params: &[(String, String)]) -> Result<Value> {
        self.send(&url, params)
            .await?
            .json()
            .await
            .context("Failed to parse Solr response")
    }

    /// Status of every core known to Solr.
    pub async fn cores(&self) -> Result<Value> {
        let url = self.url(&["admin", "cores"])?;
        let params = vec![
            ("wt".to_string(), "json".to_string()),
            ("action".to_string(), "STATUS".to_string()),
        ];
        self.get_json(url, &params).await
    }

    /// Core names in a [`SolrApi::cores`] response, sorted.
    pub fn core_names(cores: &Value) -> Vec<String> {
        let mut names: Vec<String> = cores
            .get("status")
            .and_then(Value::as_object)
            .map(|status| status.keys().cloned().collect())
            .unwrap_or_default();
        names.sort();
        names
    }

    /// Status of a single core.
    pub async fn core(&self, name: &str) -> Result<Value> {
        let url = self.url(&["admin", "cores"])?;
        let params = vec![
            ("wt".to_string(), "json".to_string()),
            ("action".to_string(), "STATUS".to_string()),
            ("core".to_string(), name.to_string()),
        ];
        self.get_json(url, &params).await
    }

    /// The core's `schema.xml`, as text.
    pub async fn schema(&self, name: &str) -> Result<String> {
        let url = self.url(&[name, "admin", "file"])?;
        let params = vec![("file".to_string(), "schema.xml".to_string())];
        self.send(&url, &params)
            .await?
            .text()
            .await
            .context("Failed to read Solr schema")
    }

    /// Query-string parameters of a select request.
    ///
    /// Facet parameters are added only when the query asks for facets and the
    /// core has faceting enabled; highlighting only when the core's result
    /// settings turn it on.
    pub fn query_params(&self, query: &SolrQuery, core: &Core) -> Vec<(String, String)> {
        let q = if query.q.trim().is_empty() {
            self.config.solr.empty_query.clone()
        } else {
            query.q.clone()
        };

        let mut params = vec![
            ("q".to_string(), q),
            ("wt".to_string(), "json".to_string()),
            ("rows".to_string(), query.rows.to_string()),
            ("start".to_string(), query.start.to_string()),
        ];

        for fq in query.filter_queries() {
            params.push(("fq".to_string(), fq.to_string()));
        }

        if !query.sort.is_empty() {
            params.push(("sort".to_string(), query.sort.clone()));
        }

        let facets = &core.facets;
        if query.facets_requested() && facets.properties.is_enabled {
            params.push(("facet".to_string(), "true".to_string()));
            params.push(("facet.limit".to_string(), facets.properties.limit.to_string()));
            params.push((
                "facet.mincount".to_string(),
                facets.properties.mincount.to_string(),
            ));
            params.push(("facet.sort".to_string(), facets.properties.sort.clone()));

            for entry in &facets.fields {
                params.push(("facet.field".to_string(), entry.field.clone()));
            }

            for (kind, entries) in [("range", &facets.ranges), ("date", &facets.dates)] {
                for entry in entries {
                    params.push((format!("facet.{}", kind), entry.field.clone()));
                    for (name, value) in [
                        ("start", &entry.start),
                        ("end", &entry.end),
                        ("gap", &entry.gap),
                    ] {
                        if let Some(value) = value {
                            params.push((
                                format!("f.{}.facet.{}.{}", entry.field, kind, name),
                                param_value(value),
                            ));
                        }
                    }
                }
            }
        }

        if core.result.highlighting_active() {
            params.push(("hl".to_string(), "true".to_string()));
            params.push(("hl.fl".to_string(), core.result.highlighting.join(",")));
        }

        params
    }

    /// Runs a select query against the core.
    pub async fn query(&self, query: &SolrQuery, core: &Core) -> Result<Value> {
        info!(
            "🔍 SEARCH REQUEST: core='{}', q='{}', rows={}, start={}",
            query.core, query.q, query.rows, query.start
        );

        let url = self.url(&[query.core.as_str(), "select"])?;
        let params = self.query_params(query, core);
        let response = self.get_json(url, &params).await?;

        let found = response
            .pointer("/response/numFound")
            .and_then(Value::as_u64)
            .unwrap_or(0);
        info!(
            "🎯 SEARCH COMPLETE: core='{}', q='{}' matched {} documents",
            query.core, query.q, found
        );
        Ok(response)
    }

    /// Asks the core's suggest handler for completions of `query.q`.
    pub async fn suggest(&self, query: &SolrQuery, core: &Core) -> Result<Value> {
        debug!("💡 SUGGEST: core='{}' ({}), q='{}'", query.core, core.label, query.q);

        let url = self.url(&[query.core.as_str(), "suggest"])?;
        let params = vec![
            ("q".to_string(), query.q.clone()),
            ("wt".to_string(), "json".to_string()),
        ];
        self.get_json(url, &params).await
    }
}
