//! In-memory collaborators for `DesignService` tests. Each one counts the
//! calls made to it.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use layerhub_core::blob::BlobStore;
use layerhub_core::design::{Component, Frame, Project, Template};
use layerhub_core::error::{BlobError, RenderError, ResourceError, StoreError};
use layerhub_core::filter::Filter;
use layerhub_core::layer::{BaseLayer, Layer, LayerKind, Payload, StaticImageProps};
use layerhub_core::render::{RenderParams, Renderer};
use layerhub_core::resource::ResourceFetcher;
use layerhub_core::store::DesignStore;
use layerhub_pipeline::{
    DesignService, DocumentWriter, DocumentWriterConfig, FeedDomains, ResourcePersister,
    WriterHandle,
};
use serde_json::Value;

pub const BLOB_BASE: &str = "https://blobs.layerhub.test/";
pub const PNG: &[u8] = b"\x89PNG\r\n\x1a\nfake";

// ---------------------------------------------------------------------------
// Structured store
// ---------------------------------------------------------------------------

/// Keeps summaries only: layers are dropped on write, as the relational
/// store does.
#[derive(Default)]
pub struct MemoryStore {
    templates: Mutex<Vec<Template>>,
    projects: Mutex<Vec<Project>>,
    components: Mutex<Vec<Component>>,
    frames: Mutex<Vec<Frame>>,
    pub writes: AtomicUsize,
}

fn selected(filter: &Filter, id: &str, short_id: &str, user_id: Option<&str>) -> bool {
    if filter.id.as_deref().is_some_and(|want| want != id) {
        return false;
    }
    if filter.short_id.as_deref().is_some_and(|want| want != short_id) {
        return false;
    }
    if filter
        .regular_or_short_id
        .as_deref()
        .is_some_and(|want| want != id && want != short_id)
    {
        return false;
    }
    if let (Some(want), Some(owner)) = (filter.user_id.as_deref(), user_id) {
        if owner != want && !owner.is_empty() {
            return false;
        }
    }
    true
}

fn page<T: Clone>(items: impl Iterator<Item = T>, filter: &Filter) -> Vec<T> {
    let offset = filter.offset.unwrap_or(0).max(0) as usize;
    let limit = filter.limit.map_or(usize::MAX, |l| l.max(0) as usize);
    items.skip(offset).take(limit).collect()
}

fn upsert<T: Clone>(rows: &Mutex<Vec<T>>, row: T, same: impl Fn(&T) -> bool) {
    let mut rows = rows.lock().unwrap();
    match rows.iter_mut().find(|existing| same(existing)) {
        Some(existing) => *existing = row,
        None => rows.push(row),
    }
}

fn remove<T>(rows: &Mutex<Vec<T>>, same: impl Fn(&T) -> bool) -> bool {
    let mut rows = rows.lock().unwrap();
    let before = rows.len();
    rows.retain(|row| !same(row));
    rows.len() != before
}

impl MemoryStore {
    pub fn template_count(&self) -> usize {
        self.templates.lock().unwrap().len()
    }

    pub fn project_count(&self) -> usize {
        self.projects.lock().unwrap().len()
    }
}

#[async_trait]
impl DesignStore for MemoryStore {
    async fn put_template(&self, template: &Template) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let summary = Template {
            layers: Vec::new(),
            ..template.clone()
        };
        upsert(&self.templates, summary, |t| t.id == template.id);
        Ok(())
    }

    async fn find_templates(&self, filter: &Filter) -> Result<Vec<Template>, StoreError> {
        let rows = self.templates.lock().unwrap();
        Ok(page(
            rows.iter()
                .filter(|t| selected(filter, &t.id, &t.short_id, None))
                .cloned(),
            filter,
        ))
    }

    async fn count_templates(&self, filter: &Filter) -> Result<i64, StoreError> {
        Ok(self.find_templates(filter).await?.len() as i64)
    }

    async fn delete_template(&self, id: &str) -> Result<bool, StoreError> {
        Ok(remove(&self.templates, |t| t.id == id))
    }

    async fn put_project(&self, project: &Project) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let summary = Project {
            layers: Vec::new(),
            ..project.clone()
        };
        upsert(&self.projects, summary, |p| p.id == project.id);
        Ok(())
    }

    async fn find_projects(&self, filter: &Filter) -> Result<Vec<Project>, StoreError> {
        let rows = self.projects.lock().unwrap();
        Ok(page(
            rows.iter()
                .filter(|p| selected(filter, &p.id, &p.short_id, Some(&p.user_id)))
                .cloned(),
            filter,
        ))
    }

    async fn count_projects(&self, filter: &Filter) -> Result<i64, StoreError> {
        Ok(self.find_projects(filter).await?.len() as i64)
    }

    async fn delete_project(&self, id: &str) -> Result<bool, StoreError> {
        Ok(remove(&self.projects, |p| p.id == id))
    }

    async fn put_component(&self, component: &Component) -> Result<(), StoreError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let summary = Component {
            layers: Vec::new(),
            ..component.clone()
        };
        upsert(&self.components, summary, |c| c.id == component.id);
        Ok(())
    }

    async fn find_components(&self, filter: &Filter) -> Result<Vec<Component>, StoreError> {
        let rows = self.components.lock().unwrap();
        Ok(page(
            rows.iter()
                .filter(|c| selected(filter, &c.id, &c.short_id, Some(&c.user_id)))
                .cloned(),
            filter,
        ))
    }

    async fn count_components(&self, filter: &Filter) -> Result<i64, StoreError> {
        Ok(self.find_components(filter).await?.len() as i64)
    }

    async fn delete_component(&self, id: &str) -> Result<bool, StoreError> {
        Ok(remove(&self.components, |c| c.id == id))
    }

    async fn put_frame(&self, frame: &Frame) -> Result<(), StoreError> {
        upsert(&self.frames, frame.clone(), |f| f.id == frame.id);
        Ok(())
    }

    async fn find_frames(&self, filter: &Filter) -> Result<Vec<Frame>, StoreError> {
        let rows = self.frames.lock().unwrap();
        Ok(page(
            rows.iter()
                .filter(|f| selected(filter, &f.id, "", None))
                .filter(|f| filter.visibility.is_none() || f.visibility == filter.visibility)
                .cloned(),
            filter,
        ))
    }

    async fn count_frames(&self, filter: &Filter) -> Result<i64, StoreError> {
        Ok(self.find_frames(filter).await?.len() as i64)
    }

    async fn delete_frame(&self, id: &str) -> Result<bool, StoreError> {
        Ok(remove(&self.frames, |f| f.id == id))
    }
}

// ---------------------------------------------------------------------------
// Blob storage
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct MemoryBlobStore {
    objects: Mutex<HashMap<String, Vec<u8>>>,
    /// Fail every put of a design document (`*.layerhub`).
    pub fail_documents: AtomicBool,
    pub puts: AtomicUsize,
    pub gets: AtomicUsize,
    pub deletes: AtomicUsize,
}

impl MemoryBlobStore {
    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects.lock().unwrap().get(key).cloned()
    }

    pub fn insert(&self, key: &str, bytes: Vec<u8>) {
        self.objects.lock().unwrap().insert(key.to_string(), bytes);
    }

    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<_> = self.objects.lock().unwrap().keys().cloned().collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, bytes: Vec<u8>) -> Result<String, BlobError> {
        self.puts.fetch_add(1, Ordering::SeqCst);
        if key.ends_with(".layerhub") && self.fail_documents.load(Ordering::SeqCst) {
            return Err(BlobError::Backend("bucket unavailable".into()));
        }
        self.insert(key, bytes);
        Ok(format!("{BLOB_BASE}{key}"))
    }

    async fn get(&self, key: &str) -> Result<Vec<u8>, BlobError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        self.object(key)
            .ok_or_else(|| BlobError::NotFound(key.to_string()))
    }

    async fn delete(&self, key: &str) -> Result<(), BlobError> {
        self.deletes.fetch_add(1, Ordering::SeqCst);
        self.objects.lock().unwrap().remove(key);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Renderer
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeRenderer {
    pub renders: AtomicUsize,
    pub documents: Mutex<Vec<Value>>,
    pub params: Mutex<Vec<RenderParams>>,
    failure: Mutex<Option<String>>,
}

impl FakeRenderer {
    pub fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    fn record(&self, document: &Value, params: &RenderParams) -> Result<(), RenderError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        self.documents.lock().unwrap().push(document.clone());
        self.params.lock().unwrap().push(params.clone());
        match self.failure.lock().unwrap().clone() {
            Some(message) => Err(RenderError::Renderer(message)),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn render(&self, document: &Value, params: &RenderParams) -> Result<String, RenderError> {
        self.record(document, params)?;
        let n = self.renders.load(Ordering::SeqCst);
        Ok(format!("{BLOB_BASE}preview_{n}.png"))
    }

    async fn raw_render(
        &self,
        document: &Value,
        params: &RenderParams,
    ) -> Result<Vec<u8>, RenderError> {
        self.record(document, params)?;
        Ok(PNG.to_vec())
    }
}

// ---------------------------------------------------------------------------
// Resource fetcher
// ---------------------------------------------------------------------------

#[derive(Default)]
pub struct FakeFetcher {
    pub fetched: Mutex<Vec<String>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl ResourceFetcher for FakeFetcher {
    async fn fetch(&self, url: &str) -> Result<Vec<u8>, ResourceError> {
        self.fetched.lock().unwrap().push(url.to_string());
        if self.fail.load(Ordering::SeqCst) {
            return Err(ResourceError::Fetch {
                url: url.to_string(),
                message: "HTTP 503".into(),
            });
        }
        Ok(format!("bytes of {url}").into_bytes())
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub service: DesignService,
    pub store: Arc<MemoryStore>,
    pub blobs: Arc<MemoryBlobStore>,
    pub renderer: Arc<FakeRenderer>,
    pub fetcher: Arc<FakeFetcher>,
    pub writer: WriterHandle,
}

/// Must be called inside a tokio runtime.
pub fn harness() -> Harness {
    harness_with_writer(DocumentWriterConfig {
        retry_delays: vec![Duration::from_millis(1)],
        max_concurrent_uploads: 4,
        shutdown_timeout: Duration::from_secs(5),
    })
}

pub fn harness_with_writer(writer_config: DocumentWriterConfig) -> Harness {
    let store = Arc::new(MemoryStore::default());
    let blobs = Arc::new(MemoryBlobStore::default());
    let renderer = Arc::new(FakeRenderer::default());
    let fetcher = Arc::new(FakeFetcher::default());

    let resources = ResourcePersister::new(fetcher.clone(), blobs.clone(), FeedDomains::default());
    let (writer, handle) = DocumentWriter::spawn(blobs.clone(), writer_config);

    let service = DesignService::new(
        store.clone(),
        blobs.clone(),
        renderer.clone(),
        resources,
        writer,
    );

    Harness {
        service,
        store,
        blobs,
        renderer,
        fetcher,
        writer: handle,
    }
}

// ---------------------------------------------------------------------------
// Layers
// ---------------------------------------------------------------------------

pub fn image_layer(id: &str, src: &str) -> Layer {
    Layer::with_payload(
        BaseLayer {
            id: id.to_string(),
            width: 400.0,
            height: 300.0,
            ..Default::default()
        },
        Payload::StaticImage(StaticImageProps {
            src: src.to_string(),
            ..Default::default()
        }),
    )
}

pub fn text_layer(id: &str, text: &str) -> Layer {
    let mut layer = Layer::new(
        BaseLayer {
            id: id.to_string(),
            width: 320.0,
            height: 40.0,
            ..Default::default()
        },
        LayerKind::StaticText,
    );
    if let Payload::StaticText(props) = &mut layer.payload {
        props.text = text.to_string();
    }
    layer
}

pub fn background_layer() -> Layer {
    Layer::new(
        BaseLayer {
            id: "background".into(),
            width: 1080.0,
            height: 1080.0,
            ..Default::default()
        },
        LayerKind::Background,
    )
}

/// Source URL of the first static image at the top level.
pub fn image_src(layers: &[Layer]) -> String {
    layers
        .iter()
        .find_map(|layer| match &layer.payload {
            Payload::StaticImage(props) => Some(props.src.clone()),
            _ => None,
        })
        .unwrap_or_default()
}
