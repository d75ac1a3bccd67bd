//! Binds each design type to its structured-store operations.

use async_trait::async_trait;
use layerhub_core::design::{Component, Design, Project, Template};
use layerhub_core::error::StoreError;
use layerhub_core::filter::Filter;
use layerhub_core::store::DesignStore;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// A design the orchestrator can save, load, list and delete.
#[async_trait]
pub trait StoredDesign: Design + Serialize + DeserializeOwned + Send + Sync + Sized {
    /// Filter used by `get` to find the summary for `id`.
    fn lookup(id: &str) -> Filter {
        Filter::by_id_or_short_id(id).with_limit(1)
    }

    async fn put(store: &dyn DesignStore, design: &Self) -> Result<(), StoreError>;
    async fn find(store: &dyn DesignStore, filter: &Filter) -> Result<Vec<Self>, StoreError>;
    async fn count(store: &dyn DesignStore, filter: &Filter) -> Result<i64, StoreError>;
    async fn delete(store: &dyn DesignStore, id: &str) -> Result<bool, StoreError>;
}

#[async_trait]
impl StoredDesign for Template {
    async fn put(store: &dyn DesignStore, design: &Self) -> Result<(), StoreError> {
        store.put_template(design).await
    }

    async fn find(store: &dyn DesignStore, filter: &Filter) -> Result<Vec<Self>, StoreError> {
        store.find_templates(filter).await
    }

    async fn count(store: &dyn DesignStore, filter: &Filter) -> Result<i64, StoreError> {
        store.count_templates(filter).await
    }

    async fn delete(store: &dyn DesignStore, id: &str) -> Result<bool, StoreError> {
        store.delete_template(id).await
    }
}

#[async_trait]
impl StoredDesign for Project {
    async fn put(store: &dyn DesignStore, design: &Self) -> Result<(), StoreError> {
        store.put_project(design).await
    }

    async fn find(store: &dyn DesignStore, filter: &Filter) -> Result<Vec<Self>, StoreError> {
        store.find_projects(filter).await
    }

    async fn count(store: &dyn DesignStore, filter: &Filter) -> Result<i64, StoreError> {
        store.count_projects(filter).await
    }

    async fn delete(store: &dyn DesignStore, id: &str) -> Result<bool, StoreError> {
        store.delete_project(id).await
    }
}

#[async_trait]
impl StoredDesign for Component {
    async fn put(store: &dyn DesignStore, design: &Self) -> Result<(), StoreError> {
        store.put_component(design).await
    }

    async fn find(store: &dyn DesignStore, filter: &Filter) -> Result<Vec<Self>, StoreError> {
        store.find_components(filter).await
    }

    async fn count(store: &dyn DesignStore, filter: &Filter) -> Result<i64, StoreError> {
        store.count_components(filter).await
    }

    async fn delete(store: &dyn DesignStore, id: &str) -> Result<bool, StoreError> {
        store.delete_component(id).await
    }
}
