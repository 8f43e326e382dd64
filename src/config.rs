//! # Configuration Management
//!
//! This module handles application configuration loading from environment variables
//! and provides structured configuration for the Solr connection, the core settings
//! store and application settings.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use url::Url;

/// Main application configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Environment name (e.g., "development", "production")
    pub environment: String,
    /// Search engine connection settings
    pub solr: SolrConfig,
    /// Core settings store configuration
    pub storage: StorageConfig,
    /// Application-specific configuration
    pub application: ApplicationConfig,
}

/// Solr connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SolrConfig {
    /// Base URL of the Solr web application, e.g. `http://localhost:8983/solr/`
    pub url: String,
    /// Query sent to Solr when the user leaves the search box empty
    pub empty_query: String,
    /// Timeout applied to every request sent to Solr, in seconds
    pub request_timeout_secs: u64,
}

/// Core settings store configuration.
///
/// When `cosmos` is `None` the store keeps core settings in memory only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub cosmos: Option<CosmosConfig>,
}

/// Azure Cosmos DB credentials and location of the core settings container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CosmosConfig {
    /// CosmosDB account endpoint URL
    pub endpoint: String,
    /// CosmosDB primary access key
    pub key: String,
    /// CosmosDB database name
    pub database_name: String,
    /// CosmosDB container holding core records
    pub container_name: String,
}

/// Application-specific configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApplicationConfig {
    /// User-Agent string for requests sent to Solr
    pub user_agent: String,
    /// API key required for admin endpoints
    pub admin_api_key: String,
}

impl Config {
    /// Creates a new configuration instance from environment variables.
    ///
    /// # Environment Variables
    ///
    /// ## Optional (with defaults)
    /// - `ENVIRONMENT`: Environment name (default: "development")
    /// - `SOLR_URL`: Solr base URL (default: "http://localhost:8983/solr/")
    /// - `SOLR_EMPTY_QUERY`: Query used for an empty search box (default: "*:*")
    /// - `SOLR_REQUEST_TIMEOUT_SECS`: Solr request timeout (default: 30)
    /// - `USER_AGENT`: HTTP User-Agent (default: "SolrSearchUi/0.1.0")
    /// - `ADMIN_API_KEY`: API key for admin endpoints (default: "admin-key-change-me")
    ///
    /// ## Core settings persistence
    /// - `AZURE_COSMOS_ENDPOINT` and `AZURE_COSMOS_KEY`: enable Cosmos DB persistence
    ///   when both are set
    /// - `AZURE_COSMOS_DATABASE_NAME`: Database name (default: "search-ui")
    /// - `AZURE_COSMOS_CONTAINER_NAME`: Container name (default: "cores")
    ///
    /// # Errors
    /// Returns an error if a numeric variable cannot be parsed or `SOLR_URL` is not a URL.
    pub fn from_env() -> Result<Self> {
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let solr_url =
            env::var("SOLR_URL").unwrap_or_else(|_| "http://localhost:8983/solr/".to_string());
        Url::parse(&solr_url).context("SOLR_URL must be a valid URL")?;

        let solr = SolrConfig {
            url: solr_url,
            empty_query: env::var("SOLR_EMPTY_QUERY").unwrap_or_else(|_| "*:*".to_string()),
            request_timeout_secs: env::var("SOLR_REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()
                .context("SOLR_REQUEST_TIMEOUT_SECS must be a valid number")?,
        };

        let cosmos = match (
            env::var("AZURE_COSMOS_ENDPOINT"),
            env::var("AZURE_COSMOS_KEY"),
        ) {
            (Ok(endpoint), Ok(key)) => Some(CosmosConfig {
                endpoint,
                key,
                database_name: env::var("AZURE_COSMOS_DATABASE_NAME")
                    .unwrap_or_else(|_| "search-ui".to_string()),
                container_name: env::var("AZURE_COSMOS_CONTAINER_NAME")
                    .unwrap_or_else(|_| "cores".to_string()),
            }),
            _ => None,
        };

        let application = ApplicationConfig {
            user_agent: env::var("USER_AGENT")
                .unwrap_or_else(|_| "SolrSearchUi/0.1.0".to_string()),
            admin_api_key: env::var("ADMIN_API_KEY")
                .unwrap_or_else(|_| "admin-key-change-me".to_string()),
        };

        Ok(Config {
            environment,
            solr,
            storage: StorageConfig { cosmos },
            application,
        })
    }

    /// Checks if the application is running in production environment.
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    /// Returns the Solr base URL with a guaranteed trailing slash, so that
    /// core paths can be joined onto it.
    ///
    /// # Errors
    /// Returns an error if the configured URL does not parse.
    pub fn solr_base_url(&self) -> Result<Url> {
        let mut raw = self.solr.url.clone();
        if !raw.ends_with('/') {
            raw.push('/');
        }
        Url::parse(&raw).with_context(|| format!("Invalid Solr URL '{}'", self.solr.url))
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn create_test_config(solr_url: &str) -> Config {
        Config {
            environment: "test".to_string(),
            solr: SolrConfig {
                url: solr_url.to_string(),
                empty_query: "*:*".to_string(),
                request_timeout_secs: 5,
            },
            storage: StorageConfig { cosmos: None },
            application: ApplicationConfig {
                user_agent: "test".to_string(),
                admin_api_key: "test-admin-key".to_string(),
            },
        }
    }

    #[test]
    fn test_solr_base_url_adds_trailing_slash() {
        let config = create_test_config("http://localhost:8983/solr");
        let base = config.solr_base_url().unwrap();
        assert_eq!(base.as_str(), "http://localhost:8983/solr/");

        let joined = base.join("collection1/select").unwrap();
        assert_eq!(joined.as_str(), "http://localhost:8983/solr/collection1/select");
    }

    #[test]
    fn test_solr_base_url_keeps_existing_slash() {
        let config = create_test_config("http://search.internal:8080/solr/");
        assert_eq!(
            config.solr_base_url().unwrap().as_str(),
            "http://search.internal:8080/solr/"
        );
    }

    #[test]
    fn test_invalid_solr_url_is_rejected() {
        let config = create_test_config("not a url");
        assert!(config.solr_base_url().is_err());
    }

    #[test]
    fn test_environment_checks() {
        let mut config = create_test_config("http://localhost:8983/solr/");
        assert!(!config.is_production());

        config.environment = "production".to_string();
        assert!(config.is_production());
    }
}
