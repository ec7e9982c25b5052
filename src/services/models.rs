//! Models service.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;

use crate::auth::AuthProvider;
use crate::errors::{ChattyError, ChattyResult};
use crate::transport::{HttpRequest, HttpTransport};
use crate::types::models::{default_catalog, ModelInfo, ModelList};

#[derive(Debug)]
struct CatalogState {
    models: Vec<ModelInfo>,
    selected: String,
}

/// Shared model catalog and the currently selected model id.
///
/// Cloning is cheap; clones observe the same catalog.
#[derive(Debug, Clone)]
pub struct ModelCatalog {
    inner: Arc<RwLock<CatalogState>>,
}

impl ModelCatalog {
    /// Creates a catalog with the given models and selection.
    pub fn new(models: Vec<ModelInfo>, selected: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(RwLock::new(CatalogState {
                models,
                selected: selected.into(),
            })),
        }
    }

    /// Creates a catalog seeded with [`default_catalog`].
    pub fn with_defaults(selected: impl Into<String>) -> Self {
        Self::new(default_catalog(), selected)
    }

    /// Returns a snapshot of the models.
    pub fn models(&self) -> Vec<ModelInfo> {
        self.inner.read().models.clone()
    }

    /// Returns the number of models.
    pub fn len(&self) -> usize {
        self.inner.read().models.len()
    }

    /// Returns true if the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.inner.read().models.is_empty()
    }

    /// Looks up a model by id.
    pub fn get(&self, id: &str) -> Option<ModelInfo> {
        self.inner.read().models.iter().find(|m| m.id == id).cloned()
    }

    /// Returns the selected model id.
    pub fn selected(&self) -> String {
        self.inner.read().selected.clone()
    }

    /// Changes the selected model id. The id does not need to be in the catalog.
    pub fn select(&self, id: impl Into<String>) {
        self.inner.write().selected = id.into();
    }

    /// Returns the descriptor of the selected model, if known.
    pub fn current(&self) -> Option<ModelInfo> {
        let state = self.inner.read();
        state.models.iter().find(|m| m.id == state.selected).cloned()
    }

    /// Replaces the models, keeping the selection.
    pub fn replace(&self, models: Vec<ModelInfo>) {
        self.inner.write().models = models;
    }
}

/// Models service for listing and retrieving model information.
pub struct ModelsService {
    transport: Arc<dyn HttpTransport>,
    auth: Arc<dyn AuthProvider>,
    catalog: ModelCatalog,
}

impl ModelsService {
    /// Creates a new models service.
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        auth: Arc<dyn AuthProvider>,
        catalog: ModelCatalog,
    ) -> Self {
        Self {
            transport,
            auth,
            catalog,
        }
    }

    /// Fetches `/models` and replaces the catalog, returning the new count.
    ///
    /// On any failure the catalog is left as it was.
    #[instrument(skip(self))]
    pub async fn refresh(&self) -> ChattyResult<usize> {
        if let Err(e) = self.auth.validate() {
            tracing::warn!("Cannot refresh models: API key not set");
            return Err(e);
        }

        let mut headers = HashMap::new();
        headers.insert("Accept".to_string(), "application/json".to_string());
        self.auth.apply_auth(&mut headers);

        let mut request = HttpRequest::get("models");
        request.headers = headers;

        let response = self.transport.send(request).await?;

        if !response.is_success() {
            let retry_after = response
                .headers
                .get("retry-after")
                .and_then(|s| s.parse::<u64>().ok())
                .map(std::time::Duration::from_secs);
            let error = ChattyError::from_status(response.status, &response.body, retry_after);
            tracing::warn!(status = response.status, error = %error, "Model refresh failed");
            return Err(error);
        }

        let list: ModelList = response.json()?;
        let models = list.into_models();
        let count = models.len();

        self.catalog.replace(models);
        tracing::info!(count, "Model catalog refreshed");

        Ok(count)
    }

    /// Returns a snapshot of the catalog.
    pub fn models(&self) -> Vec<ModelInfo> {
        self.catalog.models()
    }

    /// Looks up a model by id.
    pub fn get(&self, id: &str) -> Option<ModelInfo> {
        self.catalog.get(id)
    }

    /// Returns the descriptor of the configured model, if known.
    pub fn current(&self) -> Option<ModelInfo> {
        self.catalog.current()
    }

    /// Returns the shared catalog.
    pub fn catalog(&self) -> &ModelCatalog {
        &self.catalog
    }
}

impl std::fmt::Debug for ModelsService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ModelsService")
            .field("catalog_len", &self.catalog.len())
            .finish()
    }
}
