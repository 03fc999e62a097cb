//! kdd - Kubernetes datastore command line
//!
//! Initializes the datastore and reads entries through the same dispatch the
//! library exposes, printing them as YAML.

use anyhow::{bail, Context};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::IpAddr;
use std::path::PathBuf;
use tracing::{info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use kdd_datastore::{ClientConfig, Key, KeyKind, KubeDatastore, ListQuery};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Kubernetes-backed datastore for network policy data
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Kubeconfig file (in-cluster or default discovery when unset)
    #[arg(long, env = "KUBECONFIG")]
    kubeconfig: Option<PathBuf>,

    /// Override of the API server URL
    #[arg(long, env = "K8S_API_ENDPOINT")]
    api_endpoint: Option<String>,

    /// Client certificate file
    #[arg(long, env = "K8S_CERT_FILE")]
    cert_file: Option<PathBuf>,

    /// Client private key file
    #[arg(long, env = "K8S_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// PEM bundle of trusted certificate authorities
    #[arg(long, env = "K8S_CA_FILE")]
    ca_file: Option<PathBuf>,

    /// Bearer token for the API server
    #[arg(long, env = "K8S_API_TOKEN", hide_env_values = true)]
    api_token: Option<String>,

    /// Skip TLS certificate verification
    #[arg(long, env = "K8S_INSECURE_SKIP_TLS_VERIFY")]
    insecure_skip_tls_verify: bool,

    /// Leave node-derived kinds out of sync snapshots
    #[arg(long, env = "K8S_DISABLE_NODE_POLL")]
    disable_node_poll: bool,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON")]
    log_json: bool,

    /// Print operation metrics after the command
    #[arg(long)]
    print_metrics: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Register custom resource kinds and mark the cluster type
    Init,

    /// Read one entry
    Get {
        kind: Kind,
        /// Name components of the key, e.g. `<node> <peer-ip>` for node BGP peers
        names: Vec<String>,
    },

    /// Read every entry of a kind
    List { kind: Kind },
}

/// Kinds readable from the command line
#[derive(ValueEnum, Clone, Copy, Debug)]
enum Kind {
    GlobalConfig,
    IpPool,
    Node,
    GlobalBgpPeer,
    NodeBgpPeer,
    Profile,
    WorkloadEndpoint,
    Policy,
    HostConfig,
    ReadyFlag,
}

impl From<Kind> for KeyKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::GlobalConfig => KeyKind::GlobalConfig,
            Kind::IpPool => KeyKind::IpPool,
            Kind::Node => KeyKind::Node,
            Kind::GlobalBgpPeer => KeyKind::GlobalBgpPeer,
            Kind::NodeBgpPeer => KeyKind::NodeBgpPeer,
            Kind::Profile => KeyKind::Profile,
            Kind::WorkloadEndpoint => KeyKind::WorkloadEndpoint,
            Kind::Policy => KeyKind::Policy,
            Kind::HostConfig => KeyKind::HostConfig,
            Kind::ReadyFlag => KeyKind::ReadyFlag,
        }
    }
}

impl Args {
    fn client_config(&self) -> ClientConfig {
        ClientConfig {
            kubeconfig: self.kubeconfig.clone(),
            api_endpoint: self.api_endpoint.clone(),
            cert_file: self.cert_file.clone(),
            key_file: self.key_file.clone(),
            ca_file: self.ca_file.clone(),
            api_token: self.api_token.clone(),
            insecure_skip_tls_verify: self.insecure_skip_tls_verify,
            disable_node_poll: self.disable_node_poll,
        }
    }
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    init_logging(&args);
    info!(version = kdd_datastore::VERSION, "Starting kdd");

    let datastore = KubeDatastore::new(&args.client_config())
        .await
        .context("failed to create datastore client")?;

    match &args.command {
        Command::Init => {
            datastore.ensure_initialized().await?;
            info!("Datastore initialized");
        }
        Command::Get { kind, names } => {
            let key = parse_key(*kind, names)?;
            let kvp = datastore.get(&key).await?;
            print!("{}", serde_yaml::to_string(&kvp)?);
        }
        Command::List { kind } => {
            let kvps = datastore.list(&ListQuery::all((*kind).into())).await?;
            print!("{}", serde_yaml::to_string(&kvps)?);
        }
    }

    if args.print_metrics {
        if let Some(metrics) = kdd_datastore::metrics::metrics() {
            eprint!("{}", metrics.gather_text()?);
        }
    }
    Ok(())
}

/// Build a key from its kind and positional name components.
fn parse_key(kind: Kind, names: &[String]) -> anyhow::Result<Key> {
    let names: Vec<&str> = names.iter().map(String::as_str).collect();
    let key = match (kind, names.as_slice()) {
        (Kind::GlobalConfig, [name]) => Key::global_config(*name),
        (Kind::IpPool, [cidr]) => Key::IpPool {
            cidr: cidr.to_string(),
        },
        (Kind::Node, [hostname]) => Key::Node {
            hostname: hostname.to_string(),
        },
        (Kind::GlobalBgpPeer, [ip]) => Key::GlobalBgpPeer {
            peer_ip: parse_ip(ip)?,
        },
        (Kind::NodeBgpPeer, [nodename, ip]) => Key::NodeBgpPeer {
            nodename: nodename.to_string(),
            peer_ip: parse_ip(ip)?,
        },
        (Kind::Profile, [name]) => Key::profile(*name),
        (Kind::WorkloadEndpoint, [workload_id]) => Key::workload(*workload_id),
        (Kind::Policy, [name]) => Key::policy(*name),
        (Kind::HostConfig, [hostname, name]) => Key::host_config(*hostname, *name),
        (Kind::ReadyFlag, []) => Key::ReadyFlag,
        (kind, names) => bail!(
            "wrong number of names for {}: got {}",
            KeyKind::from(kind),
            names.len()
        ),
    };
    Ok(key)
}

fn parse_ip(ip: &str) -> anyhow::Result<IpAddr> {
    ip.parse()
        .with_context(|| format!("invalid IP address {:?}", ip))
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(args: &Args) {
    let level = match args.log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "{},kube=info,hyper=warn,tower=warn",
            level.as_str().to_lowercase()
        ))
    });

    // stdout carries command output
    if args.log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
}
