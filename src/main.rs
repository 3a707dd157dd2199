/// Version injected at compile time via TGCP_VERSION env var (set by CI/CD),
/// or "dev" for local builds.
pub const VERSION: &str = match option_env!("TGCP_VERSION") {
    Some(v) => v,
    None => "dev",
};

use anyhow::{bail, Context, Result};
use clap::{Parser, ValueEnum};
use futures::future::join_all;
use std::path::PathBuf;
use tgcp_inventory::collection::{Collection, Service};
use tgcp_inventory::config::{Config, SyncConfig};
use tgcp_inventory::gcp::auth::Credentials;
use tgcp_inventory::gcp::client::{Endpoints, GcpClient};
use tgcp_inventory::gcp::http::format_gcp_error;
use tgcp_inventory::graph::{Graph, ResourceType};
use tgcp_inventory::{ApiError, FetchError};
use tracing::Level;
use tracing_subscriber::fmt::writer::MakeWriterExt;

/// Resource graph inventory for GCP
#[derive(Parser, Debug)]
#[command(name = "tgcp-inventory", version, about, long_about = None)]
struct Args {
    /// GCP project to inventory
    #[arg(short, long)]
    project: Option<String>,

    /// GCP region to inventory
    #[arg(short, long)]
    region: Option<String>,

    /// Service to fetch; repeat for several (default: all)
    #[arg(short, long = "service", value_parser = parse_service)]
    services: Vec<Service>,

    /// Fetch a single resource kind of the given service, without relations
    #[arg(short, long, value_parser = parse_kind)]
    kind: Option<ResourceType>,

    /// Disable a service or resource kind for this run (`storage`, `compute.disk`)
    #[arg(long)]
    skip: Vec<String>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "json")]
    format: Format,

    /// Send every API call to this base URL instead of googleapis.com
    #[arg(long)]
    endpoint: Option<String>,

    /// OAuth access token to use instead of Application Default Credentials
    #[arg(long)]
    token: Option<String>,

    /// Remember the project and region as defaults
    #[arg(long)]
    save: bool,

    /// Log level for debugging
    #[arg(long, value_enum, default_value = "off")]
    log_level: LogLevel,
}

fn parse_service(name: &str) -> Result<Service, String> {
    Service::from_name(name).ok_or_else(|| {
        let known: Vec<&str> = Service::ALL.iter().map(|s| s.name()).collect();
        format!("unknown service '{}' (expected one of {})", name, known.join(", "))
    })
}

fn parse_kind(name: &str) -> Result<ResourceType, String> {
    ResourceType::from_name(name)
        .filter(|kind| *kind != ResourceType::Region)
        .ok_or_else(|| format!("unknown resource kind '{}'", name))
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Format {
    Json,
    Yaml,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogLevel {
    Off,
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    fn to_tracing_level(self) -> Option<Level> {
        match self {
            LogLevel::Off => None,
            LogLevel::Error => Some(Level::ERROR),
            LogLevel::Warn => Some(Level::WARN),
            LogLevel::Info => Some(Level::INFO),
            LogLevel::Debug => Some(Level::DEBUG),
            LogLevel::Trace => Some(Level::TRACE),
        }
    }
}

fn setup_logging(level: LogLevel) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let tracing_level = level.to_tracing_level()?;

    let log_path = get_log_path();

    if let Some(parent) = log_path.parent() {
        let _ = std::fs::create_dir_all(parent);
    }

    let file = match std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
    {
        Ok(file) => file,
        Err(e) => {
            eprintln!("Warning: cannot open log file {:?}: {}", log_path, e);
            return None;
        }
    };

    let (non_blocking, guard) = tracing_appender::non_blocking(file);

    tracing_subscriber::fmt()
        .with_max_level(tracing_level)
        .with_writer(non_blocking.with_max_level(tracing_level))
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(true)
        .with_line_number(true)
        .init();

    tracing::info!("tgcp-inventory {} started with log level: {:?}", VERSION, level);
    tracing::info!("Log file: {:?}", log_path);

    Some(guard)
}

fn get_log_path() -> PathBuf {
    if let Some(config_dir) = dirs::config_dir() {
        return config_dir.join("tgcp-inventory").join("tgcp-inventory.log");
    }
    if let Some(home) = dirs::home_dir() {
        return home.join(".tgcp-inventory").join("tgcp-inventory.log");
    }
    PathBuf::from("tgcp-inventory.log")
}

/// `storage` names a service toggle, `compute.disk` a kind toggle
fn skip_key(spec: &str) -> String {
    match spec.split_once('.') {
        Some((service, kind)) => SyncConfig::kind_key(service, kind),
        None => SyncConfig::service_key(spec),
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    let _log_guard = setup_logging(args.log_level);

    if let Err(err) = run(args).await {
        tracing::error!("{:#}", err);
        eprintln!("Error: {:#}", err);
        if let Some(api) = api_error(&err) {
            eprintln!("Hint: {}", format_gcp_error(api));
        }
        std::process::exit(1);
    }
}

/// Provider failure at the root of `err`, if any
fn api_error(err: &anyhow::Error) -> Option<&ApiError> {
    err.chain().find_map(|e| {
        e.downcast_ref::<ApiError>()
            .or_else(|| e.downcast_ref::<FetchError>().and_then(FetchError::api_error))
    })
}

async fn run(args: Args) -> Result<()> {
    let mut config = Config::load();
    let project = args
        .project
        .clone()
        .or_else(|| config.effective_project())
        .context("No GCP project configured. Set GOOGLE_CLOUD_PROJECT or use --project flag")?;
    let region = args
        .region
        .clone()
        .unwrap_or_else(|| config.effective_region());

    tracing::info!("Using project: {}, region: {}", project, region);

    if args.save {
        config.project_id = Some(project.clone());
        config.region = Some(region.clone());
        config.save()?;
    }

    let endpoints = match &args.endpoint {
        Some(base) => {
            Endpoints::single(base).with_context(|| format!("Invalid endpoint '{}'", base))?
        }
        None => Endpoints::default(),
    };
    let client = match &args.token {
        Some(token) => GcpClient::with_credentials(
            &project,
            &region,
            endpoints,
            Credentials::fixed(token.clone()),
        )?,
        None => GcpClient::new(&project, &region, endpoints).await?,
    };

    let mut sync = config.sync.clone();
    for spec in &args.skip {
        sync.set(skip_key(spec), false);
    }

    let services = if args.services.is_empty() {
        Service::ALL.to_vec()
    } else {
        args.services.clone()
    };

    let graph = match &args.kind {
        Some(kind) => {
            let [service] = services.as_slice() else {
                bail!("--kind needs exactly one --service");
            };
            Collection::new(*service, client, sync)
                .fetch_by_type(kind.as_str())
                .await?
        }
        None => fetch_services(&client, &sync, &services).await?,
    };

    print_graph(&graph, args.format)
}

/// Fetch services concurrently; a service the account may not read is
/// reported and left out
async fn fetch_services(
    client: &GcpClient,
    sync: &SyncConfig,
    services: &[Service],
) -> Result<Graph> {
    let results = join_all(services.iter().map(|service| {
        let collection = Collection::new(*service, client.clone(), sync.clone());
        async move { (collection.service(), collection.fetch_resources().await) }
    }))
    .await;

    let graph = Graph::new();
    for (service, result) in results {
        match result {
            Ok(fetched) => graph.add_graph(fetched),
            Err(err) if err.is_access_denied() => {
                tracing::warn!("{}", err);
                eprintln!("Warning: {}. Skipping it.", err);
            }
            Err(err) => return Err(err).with_context(|| format!("Failed to fetch {}", service)),
        }
    }
    Ok(graph)
}

fn print_graph(graph: &Graph, format: Format) -> Result<()> {
    let snapshot = graph.snapshot();
    let output = match format {
        Format::Json => serde_json::to_string_pretty(&snapshot)?,
        Format::Yaml => serde_yaml::to_string(&snapshot)?,
    };
    println!("{}", output);
    Ok(())
}
