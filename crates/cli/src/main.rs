mod config;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context as _;
use clap::{Parser, Subcommand};
use layerhub_cloud::{LocalBlobStore, S3BlobStore};
use layerhub_core::blob::BlobStore;
use layerhub_core::design::{Component, Design, Template};
use layerhub_core::filter::Filter;
use layerhub_core::ids::is_short_id;
use layerhub_core::render::{RenderParams, Renderer};
use layerhub_db::PgDesignStore;
use layerhub_pipeline::{
    DesignService, DocumentWriter, DocumentWriterConfig, HttpFetcher, ResourcePersister,
    WriterHandle,
};
use layerhub_renderer::{RendererProcess, SocketRenderer};
use serde_json::Value;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use config::{AppConfig, BlobBackend};

#[derive(Parser, Debug)]
#[command(name = "layerhub", version, about = "Store and render layered designs")]
struct Cli {
    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a design file to PNG without storing anything.
    Render(RenderArgs),
    #[command(flatten)]
    Store(StoreCommand),
}

/// Commands backed by the structured store.
#[derive(Subcommand, Debug)]
enum StoreCommand {
    /// Save a template: rehost feed images, render its preview, store it.
    PutTemplate(PutArgs),
    /// Print a stored template with its layers.
    GetTemplate(IdArgs),
    /// Print template summaries and the total count.
    ListTemplates(ListArgs),
    /// Delete a template and its stored document.
    DeleteTemplate(IdArgs),
}

#[derive(Parser, Debug)]
struct RenderArgs {
    /// Input design JSON (template, project or component).
    #[arg(long = "in")]
    in_path: PathBuf,

    /// Output PNG path.
    #[arg(long)]
    out: PathBuf,

    /// Render parameter as `key=value`; repeatable.
    #[arg(long = "param", value_parser = parse_param)]
    params: Vec<(String, String)>,
}

#[derive(Parser, Debug)]
struct PutArgs {
    /// Input template JSON. A template without an id gets a new one.
    #[arg(long = "in")]
    in_path: PathBuf,
}

#[derive(Parser, Debug)]
struct IdArgs {
    /// Regular or short id.
    id: String,
}

#[derive(Parser, Debug)]
struct ListArgs {
    #[arg(long, default_value_t = 20)]
    limit: i64,

    #[arg(long, default_value_t = 0)]
    offset: i64,
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((key, value)) if !key.is_empty() => Ok((key.to_string(), value.to_string())),
        _ => Err(format!("expected key=value, got '{raw}'")),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "layerhub=info,layerhub_pipeline=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    // --- Configuration ---
    let config = AppConfig::from_env()?;
    tracing::debug!(?config, "Loaded configuration");

    // --- Renderer process ---
    let process = match config.renderer_process() {
        Some(process_config) => Some(RendererProcess::spawn(&process_config?).await?),
        None => None,
    };

    let result = run(cli.cmd, &config).await;

    if let Some(process) = process {
        if let Err(e) = process.shutdown().await {
            tracing::warn!(error = %e, "Failed to stop renderer");
        }
    }
    result
}

async fn run(cmd: Command, config: &AppConfig) -> anyhow::Result<()> {
    let blobs = connect_blobs(config).await?;
    let renderer = Arc::new(SocketRenderer::new(config.renderer(), blobs.clone()));

    match cmd {
        Command::Render(args) => cmd_render(args, renderer.as_ref()).await,
        Command::Store(cmd) => {
            let (service, writer) = connect_service(config, blobs, renderer).await?;
            let result = run_store(cmd, &service).await;

            // Let queued documents reach blob storage before exiting.
            writer.shutdown().await;
            result
        }
    }
}

async fn run_store(cmd: StoreCommand, service: &DesignService) -> anyhow::Result<()> {
    match cmd {
        StoreCommand::PutTemplate(args) => cmd_put_template(service, &args.in_path).await,
        StoreCommand::GetTemplate(args) => {
            let template = service.get_template(&args.id).await?;
            print_json(&template)
        }
        StoreCommand::ListTemplates(args) => {
            let filter = Filter::default()
                .with_limit(args.limit)
                .with_offset(args.offset);
            let (items, total) = service.find_templates(&filter).await?;
            print_json(&serde_json::json!({ "items": items, "total": total }))
        }
        StoreCommand::DeleteTemplate(args) => {
            service.delete_template(&args.id).await?;
            print_json(&serde_json::json!({ "deleted": args.id }))
        }
    }
}

async fn connect_blobs(config: &AppConfig) -> anyhow::Result<Arc<dyn BlobStore>> {
    let blobs: Arc<dyn BlobStore> = match &config.blob {
        BlobBackend::Local { dir, base_url } => {
            let store = match base_url {
                Some(base_url) => LocalBlobStore::new(dir, base_url.as_str()),
                None => LocalBlobStore::with_file_urls(dir),
            };
            tracing::info!(dir = %dir.display(), "Using local blob storage");
            Arc::new(store)
        }
        BlobBackend::S3 {
            region,
            bucket,
            cdn_base,
        } => {
            let store = S3BlobStore::connect(region, bucket, cdn_base.as_deref()).await?;
            tracing::info!(region = %region, bucket = %bucket, "Using S3 blob storage");
            Arc::new(store)
        }
    };
    Ok(blobs)
}

async fn connect_service(
    config: &AppConfig,
    blobs: Arc<dyn BlobStore>,
    renderer: Arc<SocketRenderer>,
) -> anyhow::Result<(DesignService, WriterHandle)> {
    // --- Database ---
    let pool = layerhub_db::create_pool(config.database_url()?, config.database_max_connections)
        .await
        .context("Failed to connect to database")?;
    layerhub_db::health_check(&pool)
        .await
        .context("Database health check failed")?;
    layerhub_db::run_migrations(&pool)
        .await
        .context("Failed to run database migrations")?;
    tracing::info!("Database ready");

    // --- Pipeline ---
    let fetcher = Arc::new(HttpFetcher::new(config.fetch_timeout)?);
    let resources = ResourcePersister::new(fetcher, blobs.clone(), config.feed_domains.clone());
    let (writer, handle) = DocumentWriter::spawn(
        blobs.clone(),
        DocumentWriterConfig::with_retries(config.document_write_retries),
    );

    let service = DesignService::new(
        Arc::new(PgDesignStore::new(pool)),
        blobs,
        renderer,
        resources,
        writer,
    );
    Ok((service, handle))
}

async fn cmd_render(args: RenderArgs, renderer: &dyn Renderer) -> anyhow::Result<()> {
    let document = read_render_document(&args.in_path)?;
    let params: RenderParams = args
        .params
        .into_iter()
        .map(|(key, value)| (key, Value::String(value)))
        .collect();

    let png = renderer.raw_render(&document, &params).await?;

    if let Some(parent) = args.out.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("create output dir '{}'", parent.display()))?;
    }
    std::fs::write(&args.out, &png)
        .with_context(|| format!("write png '{}'", args.out.display()))?;

    eprintln!("wrote {}", args.out.display());
    Ok(())
}

/// Decode the input through the design types so unknown layer kinds are
/// rejected before anything reaches the renderer. Files without a frame
/// are treated as components.
fn read_render_document(path: &Path) -> anyhow::Result<Value> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read design '{}'", path.display()))?;
    let raw: Value = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse design '{}'", path.display()))?;

    let document = if raw.get("frame").is_some() {
        serde_json::from_value::<Template>(raw)?.render_document()?
    } else {
        serde_json::from_value::<Component>(raw)?.render_document()?
    };
    Ok(document)
}

async fn cmd_put_template(service: &DesignService, path: &Path) -> anyhow::Result<()> {
    let bytes =
        std::fs::read(path).with_context(|| format!("read template '{}'", path.display()))?;
    let mut template: Template = serde_json::from_slice(&bytes)
        .with_context(|| format!("parse template '{}'", path.display()))?;
    assign_identity(&mut template);

    service.put_template(&mut template).await?;
    print_json(&serde_json::json!({
        "id": template.id,
        "short_id": template.short_id,
        "preview": template.preview,
    }))
}

/// Give a template read from a file the identity a new design gets: a
/// fresh id and timestamps when it has no id, a fresh short id when its
/// short id is missing or malformed.
fn assign_identity(template: &mut Template) {
    let fresh = Template::new();
    if template.id.is_empty() {
        template.id = fresh.id;
        template.created_at = fresh.created_at;
        template.updated_at = fresh.updated_at;
    }
    if !is_short_id(&template.short_id) {
        template.short_id = fresh.short_id;
    }
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
