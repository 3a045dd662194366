use anyhow::Context;
use anyhow::Result;
use clap::Parser;
use nps_sheet::analyze;
use nps_sheet::cache::ResultCache;
use nps_sheet::config::CacheConfig;
use nps_sheet::config::DiscoveryOptions;
use nps_sheet::config::InsightConfig;
use nps_sheet::config::API_KEY_ENV;
use nps_sheet::discovery::events::TracingSink;
use nps_sheet::helpers::reader::HttpWorksheetSource;
use nps_sheet::report::insights::ChatCompletionClient;
use nps_sheet::spreadsheet::handle::WorksheetHandle;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "nps-sheet")]
#[command(version, about = "Discover NPS survey worksheets in a shared spreadsheet and report their scores")]
struct Cli {
    /// Share URL of the spreadsheet
    url: String,

    /// Worksheet to try first: numeric id, legacy id (od6) or tab name. Repeatable.
    #[arg(long = "gid", value_name = "ID")]
    gids: Vec<String>,

    /// Store name shown in the report
    #[arg(long)]
    store: Option<String>,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,

    /// Neither read nor write the result cache
    #[arg(long)]
    no_cache: bool,

    /// Result cache directory
    #[arg(long, value_name = "DIR", default_value = "cache")]
    cache_dir: PathBuf,

    /// Text-generation API key
    #[arg(long, env = API_KEY_ENV, hide_env_values = true)]
    api_key: Option<String>,

    /// Base URL of the OpenAI-compatible API
    #[arg(long, value_name = "URL")]
    llm_endpoint: Option<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let options = DiscoveryOptions {
        explicit_handles: cli.gids.iter().map(|gid| WorksheetHandle::from(gid.as_str())).collect(),
        ..DiscoveryOptions::default()
    };
    let source = HttpWorksheetSource::new(&options.base_url, &options.user_agent);

    let mut insight_config = InsightConfig::default();
    insight_config.api_key = cli.api_key.filter(|key| !key.trim().is_empty());
    if let Some(endpoint) = cli.llm_endpoint {
        insight_config.endpoint = endpoint;
    }
    let insights = ChatCompletionClient::new(insight_config);

    let cache = (!cli.no_cache).then(|| ResultCache::new(CacheConfig { directory: cli.cache_dir, ..CacheConfig::default() }));

    let report = analyze(&cli.url, cli.store.as_deref(), &options, &source, &TracingSink, &insights, cache.as_ref())
        .context("NPS analysis failed")?;

    if cli.json {
        let json = serde_json::to_string_pretty(&report).context("Failed to serialize report")?;
        println!("{json}");
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}
