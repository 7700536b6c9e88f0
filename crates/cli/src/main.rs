use std::str::FromStr;

use anyhow::{anyhow, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use kdash_api::{parse_data_select_query, Config, DataSelectParams, InProcApi, ListApi, ResourceListValue};
use kdash_core::{Metric, ResourceKind};
use tracing::{error, info};

#[derive(Parser, Debug)]
#[command(name = "kdashctl", version, about = "kdash CLI")]
struct Cli {
    /// Output format
    #[arg(short = 'o', long = "output", value_enum, global = true, default_value_t = Output::Human)]
    output: Output,

    /// Kubernetes namespace (default: all namespaces)
    #[arg(long = "ns", global = true)]
    namespace: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum Output { Human, Json }

#[derive(Subcommand, Debug)]
enum Commands {
    /// Print the resource kinds `ls` understands
    Kinds,
    /// List one kind, sorted, filtered and paged
    Ls {
        /// Kind, e.g. "deployment" or "pods"
        kind: String,
        /// Order/property pairs, e.g. "d,creationTimestamp,a,name"
        #[arg(long = "sort")]
        sort: Option<String>,
        /// Property/value pairs, e.g. "name,web"
        #[arg(long = "filter")]
        filter: Option<String>,
        /// Page size; 0 lists everything (default: KDASH_DEFAULT_ITEMS_PER_PAGE)
        #[arg(long = "items-per-page")]
        items_per_page: Option<i64>,
        /// 1-based page number
        #[arg(long = "page", default_value_t = 1)]
        page: i64,
        /// Comma-separated metric names, e.g. "cpu/usage_rate,memory/usage"
        #[arg(long = "metrics")]
        metrics: Option<String>,
        /// Comma-separated aggregation modes, e.g. "sum,max"
        #[arg(long = "aggregations")]
        aggregations: Option<String>,
    },
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::from_str(&config.log_filter)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(true).with_writer(std::io::stderr).init();
}

fn init_metrics(config: &Config) {
    if let Some(addr) = config.metrics_addr.as_deref() {
        if let Ok(sock) = addr.parse::<std::net::SocketAddr>() {
            let builder = metrics_exporter_prometheus::PrometheusBuilder::new();
            match builder.with_http_listener(sock).install() {
                Ok(_) => tracing::info!(addr = %addr, "Prometheus metrics exporter listening"),
                Err(e) => tracing::warn!(error = %e, "failed to install metrics exporter"),
            }
        } else {
            tracing::warn!(addr = %addr, "invalid KDASH_METRICS_ADDR; expected host:port");
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env();
    init_tracing(&config);
    init_metrics(&config);
    let cli = Cli::parse();

    match cli.command {
        Commands::Kinds => {
            for k in ResourceKind::ALL {
                println!("{}", k);
            }
        }
        Commands::Ls { kind, sort, filter, items_per_page, page, metrics, aggregations } => {
            let kind = ResourceKind::from_str(&kind).map_err(|e| anyhow!(e))?;
            let ns = cli.namespace.as_deref();
            let params = DataSelectParams {
                items_per_page: items_per_page.or(config.default_items_per_page).map(|n| n.to_string()),
                page: Some(page.to_string()),
                sort_by: sort,
                filter_by: filter,
                metric_names: metrics,
                aggregations,
            };
            let query = parse_data_select_query(&params);
            info!(kind = %kind, ns = ?ns, "ls invoked");
            let api = InProcApi::try_default(&config).await.context("connecting to cluster")?;
            let list = match api.list(kind, ns, &query).await {
                Ok(l) => l,
                Err(e) => {
                    error!(error = %e, "ls failed");
                    return Err(e.into());
                }
            };
            match cli.output {
                Output::Human => print_human(&list),
                Output::Json => println!("{}", serde_json::to_string_pretty(&list)?),
            }
        }
    }
    Ok(())
}

fn print_human(list: &ResourceListValue) {
    println!("{:<20} {:<40} {}", "NAMESPACE", "NAME", "AGE");
    for item in list.items.iter() {
        let meta = item.get("metadata");
        let field = |k: &str| meta.and_then(|m| m.get(k)).and_then(|v| v.as_str());
        let created = field("creationTimestamp")
            .and_then(|s| chrono::DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.timestamp())
            .unwrap_or(0);
        println!("{:<20} {:<40} {}", field("namespace").unwrap_or("-"), field("name").unwrap_or(""), render_age(created));
    }
    println!("total: {}", list.list_meta.total_items);
    for m in list.cumulative_metrics.iter() {
        println!("{}", render_metric(m));
    }
    for e in list.errors.iter() {
        eprintln!("warning: {}", e);
    }
}

/// `cpu/usage_rate (sum): 160 @ 1704067260`, latest point only.
fn render_metric(m: &Metric) -> String {
    let mode = m.aggregate.as_ref().map(|a| a.to_string()).unwrap_or_else(|| "-".to_string());
    match m.data_points.last() {
        Some(p) => format!("{} ({}): {} @ {}", m.metric_name, mode, p.y, p.x),
        None => format!("{} ({}): no data", m.metric_name, mode),
    }
}

fn render_age(creation_ts: i64) -> String {
    if creation_ts <= 0 { return "-".to_string(); }
    let now = chrono::Utc::now().timestamp();
    let mut secs = (now - creation_ts).max(0) as u64;
    let days = secs / 86_400; secs %= 86_400;
    let hours = secs / 3600; secs %= 3600;
    let mins = secs / 60; secs %= 60;
    if days > 0 { format!("{}d{}h", days, hours) }
    else if hours > 0 { format!("{}h{}m", hours, mins) }
    else if mins > 0 { format!("{}m", mins) }
    else { format!("{}s", secs) }
}
