//! # Storage Service
//!
//! This module stores the per-core UI settings. All cores are held in memory
//! and served from there; when Azure CosmosDB is configured every change is
//! written through to a container, and the container is read back at startup.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use solr_search_ui::{Config, StorageService};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Arc::new(Config::from_env()?);
//!     let storage = StorageService::new(config).await?;
//!
//!     let core = storage.get_or_create("collection1").await?;
//!     println!("{} is labelled '{}'", core.name, core.label);
//!     Ok(())
//! }
//! ```

use anyhow::{Context, Result};
use azure_data_cosmos::{
    models::{ContainerProperties, PartitionKeyDefinition},
    CosmosClient, PartitionKey, Query, QueryOptions, QueryPartitionStrategy,
};
use chrono::Utc;
use futures_util::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};

use crate::config::CosmosConfig;
use crate::settings::Core;
use crate::Config;

/// Every core document lives in this partition so they can be listed with a
/// single-partition query.
const CORE_PARTITION: &str = "core";

/// A core as stored in CosmosDB.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CoreDocument {
    id: String,
    kind: String,
    #[serde(flatten)]
    core: Core,
}

impl From<&Core> for CoreDocument {
    fn from(core: &Core) -> Self {
        Self {
            id: core.name.clone(),
            kind: CORE_PARTITION.to_string(),
            core: core.clone(),
        }
    }
}

/// CosmosDB container holding core documents.
struct CosmosStore {
    client: CosmosClient,
    database_name: String,
    container_name: String,
}

impl CosmosStore {
    /// Create Azure Cosmos DB SDK client with master key authentication
    fn connect(config: &CosmosConfig) -> Result<Self> {
        info!("Creating Cosmos client with master key authentication");

        let client = CosmosClient::with_key(&config.endpoint, config.key.clone().into(), None)
            .context("Failed to create Cosmos client with master key")?;

        Ok(Self {
            client,
            database_name: config.database_name.clone(),
            container_name: config.container_name.clone(),
        })
    }

    async fn ensure_database_exists(&self) -> Result<()> {
        match self.client.create_database(&self.database_name, None).await {
            Ok(_) => {
                info!("Database '{}' created", self.database_name);
                Ok(())
            }
            Err(e) => {
                let error_string = format!("{:?}", e);
                if error_string.contains("409") || error_string.contains("Conflict") {
                    debug!("Database '{}' already exists", self.database_name);
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "Failed to ensure database '{}' exists: {}",
                        self.database_name,
                        e
                    ))
                }
            }
        }
    }

    async fn ensure_container_exists(&self) -> Result<()> {
        let db_client = self.client.database_client(&self.database_name);

        let container_properties = ContainerProperties {
            id: self.container_name.clone().into(),
            partition_key: PartitionKeyDefinition::new(vec!["/kind".to_string()]),
            ..Default::default()
        };

        match db_client.create_container(container_properties, None).await {
            Ok(_) => {
                info!("Container '{}' created", self.container_name);
                Ok(())
            }
            Err(e) => {
                let error_string = format!("{:?}", e);
                if error_string.contains("409") || error_string.contains("Conflict") {
                    debug!("Container '{}' already exists", self.container_name);
                    Ok(())
                } else {
                    Err(anyhow::anyhow!(
                        "Failed to ensure container '{}' exists: {}",
                        self.container_name,
                        e
                    ))
                }
            }
        }
    }

    async fn load_cores(&self) -> Result<Vec<Core>> {
        let container_client = self
            .client
            .database_client(&self.database_name)
            .container_client(&self.container_name);

        let query = Query::from("SELECT * FROM c WHERE c.kind = @kind")
            .with_parameter("@kind", CORE_PARTITION)
            .map_err(|e| anyhow::anyhow!("Failed to add parameter to query: {}", e))?;

        let mut pager = container_client
            .query_items::<CoreDocument>(
                query,
                QueryPartitionStrategy::SinglePartition(PartitionKey::from(CORE_PARTITION)),
                Some(QueryOptions {
                    ..Default::default()
                }),
            )
            .context("Failed to query stored cores")?;

        let mut cores = Vec::new();
        while let Some(page) = pager
            .try_next()
            .await
            .context("Failed to read page of stored cores")?
        {
            cores.extend(page.into_items().into_iter().map(|document| document.core));
        }
        Ok(cores)
    }

    async fn upsert_core(&self, core: &Core) -> Result<()> {
        let container_client = self
            .client
            .database_client(&self.database_name)
            .container_client(&self.container_name);

        let document = CoreDocument::from(core);
        container_client
            .upsert_item(PartitionKey::from(CORE_PARTITION), document, None)
            .await
            .with_context(|| format!("Failed to store core '{}'", core.name))?;

        debug!("Stored core '{}' in CosmosDB", core.name);
        Ok(())
    }
}

/// Store for per-core UI settings.
///
/// Writers are serialized by `writes`; the map itself is only write-locked for
/// the insert, so readers never wait on a CosmosDB round trip.
pub struct StorageService {
    cores: RwLock<BTreeMap<String, Core>>,
    writes: Mutex<()>,
    cosmos: Option<CosmosStore>,
}

impl StorageService {
    /// Creates a new StorageService instance.
    ///
    /// With CosmosDB configured, ensures the database and container exist and
    /// loads the stored cores. Otherwise the store starts empty and keeps
    /// settings for the lifetime of the process only.
    ///
    /// # Errors
    /// Returns an error if the Cosmos client cannot be created, the database or
    /// container cannot be ensured, or stored cores cannot be read.
    pub async fn new(config: Arc<Config>) -> Result<Self> {
        let Some(cosmos_config) = &config.storage.cosmos else {
            warn!("⚠️ STORAGE: CosmosDB is not configured, core settings will not survive a restart");
            return Ok(Self::in_memory());
        };

        info!("🚀 STORAGE: Initializing Azure Cosmos DB SDK client");
        let cosmos = CosmosStore::connect(cosmos_config)?;
        cosmos.ensure_database_exists().await?;
        cosmos.ensure_container_exists().await?;

        let cores = cosmos.load_cores().await?;
        info!(
            "✅ STORAGE: Loaded {} cores from '{}/{}'",
            cores.len(),
            cosmos.database_name,
            cosmos.container_name
        );

        Ok(Self {
            cores: RwLock::new(
                cores
                    .into_iter()
                    .map(|core| (core.name.clone(), core))
                    .collect(),
            ),
            writes: Mutex::new(()),
            cosmos: Some(cosmos),
        })
    }

    /// Creates a store without persistence.
    pub fn in_memory() -> Self {
        Self {
            cores: RwLock::new(BTreeMap::new()),
            writes: Mutex::new(()),
            cosmos: None,
        }
    }

    pub async fn get(&self, name: &str) -> Option<Core> {
        self.cores.read().await.get(name).cloned()
    }

    /// Returns the named core, creating it with default settings first if the
    /// store does not know it yet.
    pub async fn get_or_create(&self, name: &str) -> Result<Core> {
        if let Some(core) = self.get(name).await {
            return Ok(core);
        }

        let _writer = self.writes.lock().await;
        if let Some(core) = self.get(name).await {
            return Ok(core);
        }

        let core = Core::new(name);
        if let Some(cosmos) = &self.cosmos {
            cosmos.upsert_core(&core).await?;
        }
        info!("🆕 STORAGE: Created settings for core '{}'", name);
        self.cores
            .write()
            .await
            .insert(name.to_string(), core.clone());
        Ok(core)
    }

    /// All stored cores, ordered by name.
    pub async fn all(&self) -> Vec<Core> {
        self.cores.read().await.values().cloned().collect()
    }

    /// Stores the core, replacing any previous version, and returns it with its
    /// modification time updated. The in-memory copy only changes once the
    /// write to CosmosDB succeeded.
    pub async fn save(&self, mut core: Core) -> Result<Core> {
        core.updated_at = Utc::now();

        let _writer = self.writes.lock().await;
        if let Some(cosmos) = &self.cosmos {
            cosmos.upsert_core(&core).await?;
        }
        self.cores
            .write()
            .await
            .insert(core.name.clone(), core.clone());

        debug!("Saved settings for core '{}'", core.name);
        Ok(core)
    }

    /// True when settings are written through to CosmosDB.
    pub fn is_persistent(&self) -> bool {
        self.cosmos.is_some()
    }
}
