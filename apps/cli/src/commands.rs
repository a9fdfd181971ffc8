//! CLI command definitions, routing, and tracing setup.

use clap::{Parser, Subcommand};
use color_eyre::eyre::{Result, eyre};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;
use url::Url;

use sitesage_core::locks::SiteLocks;
use sitesage_core::pipeline::{self, ProcessOutcome, ProgressReporter};
use sitesage_core::{publish, qa};
use sitesage_kb::{KbClient, MessageRole};
use sitesage_shared::{
    AppConfig, CrawlConfig, init_config, load_config, registry_db_path, validate_api_key,
};
use sitesage_storage::SiteRegistry;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// SiteSage — turn a site into a knowledge base you can talk to.
#[derive(Parser)]
#[command(
    name = "sitesage",
    version,
    about = "Crawl a site, publish it as a knowledge base, and ask it questions.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv, -vvv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl a site's sitemap and publish its knowledge base.
    Process {
        /// Root URL of the site (its sitemap must live at /sitemap.xml).
        url: String,
    },

    /// Capture a single page and print its sections.
    Page {
        /// Page URL to capture.
        url: String,

        /// Print the capture as JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Ask a question about a published site.
    Ask {
        /// The question to ask.
        question: String,

        /// Root URL of the published site.
        #[arg(short, long)]
        site: String,

        /// Thread id from a previous answer, to continue that conversation.
        #[arg(long)]
        thread: Option<String>,
    },

    /// Delete a knowledge base and unbind every site pointing at it.
    Delete {
        /// Knowledge-base id, as shown by `sites`.
        kb_id: String,
    },

    /// List published sites and their knowledge bases.
    Sites,

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "sitesage=info",
        1 => "sitesage=debug",
        _ => "sitesage=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt().with_env_filter(env_filter).with_target(false).init();
        }
        LogFormat::Json => {
            fmt().json().with_env_filter(env_filter).init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Process { url } => cmd_process(&url).await,
        Command::Page { url, json } => cmd_page(&url, json).await,
        Command::Ask {
            question,
            site,
            thread,
        } => cmd_ask(&question, &site, thread.as_deref()).await,
        Command::Delete { kb_id } => cmd_delete(&kb_id).await,
        Command::Sites => cmd_sites().await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init().await,
            ConfigAction::Show => cmd_config_show().await,
        },
    }
}

// ---------------------------------------------------------------------------
// URL handling
// ---------------------------------------------------------------------------

fn parse_url(url: &str) -> Result<Url> {
    let parsed = Url::parse(url).map_err(|e| eyre!("invalid URL '{url}': {e}"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        return Err(eyre!(
            "unsupported scheme '{}': expected http or https",
            parsed.scheme()
        ));
    }
    Ok(parsed)
}

/// Registry key for a site root. `process` and `ask --site` must agree
/// on this, so both strip the trailing slash.
fn site_key(url: &str) -> Result<String> {
    parse_url(url)?;
    Ok(url.trim_end_matches('/').to_string())
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_process(url: &str) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;
    let site_url = site_key(url)?;

    let registry = SiteRegistry::open(&registry_db_path()?).await?;
    let kb = KbClient::new(&config.kb_service)?;
    let locks = SiteLocks::new();
    let crawl_config = CrawlConfig::from(&config);

    info!(site_url = %site_url, "processing site");

    let reporter = CliProgress::new();
    let outcome = pipeline::process_site(
        &registry,
        &kb,
        &locks,
        &crawl_config,
        &site_url,
        &reporter,
    )
    .await?;

    println!();
    println!("  Site published successfully!");
    println!(
        "  Knowledge base: {} ({})",
        outcome.kb_id,
        if outcome.created { "created" } else { "updated" }
    );
    println!("  Pages:    {}/{}", outcome.pages, outcome.total_urls);
    println!("  Sections: {}", outcome.sections);
    if outcome.failed > 0 {
        println!("  Failed:   {}", outcome.failed);
    }
    println!("  Time:     {:.1}s", outcome.elapsed.as_secs_f64());
    println!();

    Ok(())
}

async fn cmd_page(url: &str, json: bool) -> Result<()> {
    let config = load_config()?;
    let parsed = parse_url(url)?;
    let crawl_config = CrawlConfig::from(&config);

    let page = pipeline::process_page(&crawl_config, parsed.as_str()).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
        return Ok(());
    }

    println!("{}", page.url);
    if page.sections.is_empty() {
        println!("  (no sections captured)");
    }
    for section in &page.sections {
        println!();
        println!("## {}", section.title);
        if !section.content.is_empty() {
            println!("{}", section.content);
        }
    }

    Ok(())
}

async fn cmd_ask(question: &str, site: &str, thread: Option<&str>) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;
    let site_url = site_key(site)?;

    let registry = SiteRegistry::open(&registry_db_path()?).await?;
    let kb = KbClient::new(&config.kb_service)?;

    let spinner = new_spinner();
    spinner.set_message("Waiting for the answer");
    let result = qa::ask(&registry, &kb, &config.qa, &site_url, question, thread).await;
    spinner.finish_and_clear();
    let outcome = result?;

    match outcome
        .messages
        .iter()
        .find(|m| m.role == MessageRole::Assistant)
    {
        Some(answer) => {
            println!();
            println!("{}", answer.content);
        }
        None => println!("The run completed but no answer came back."),
    }
    println!();
    println!(
        "  Thread: {} (use --thread to continue this conversation)",
        outcome.thread_id
    );
    println!();

    Ok(())
}

async fn cmd_delete(kb_id: &str) -> Result<()> {
    let config = load_config()?;
    validate_api_key(&config)?;

    let registry = SiteRegistry::open(&registry_db_path()?).await?;
    let kb = KbClient::new(&config.kb_service)?;

    info!(kb_id, "deleting knowledge base");
    let unbound = publish::delete_kb(&registry, &kb, kb_id).await?;

    println!("Knowledge base {kb_id} deleted.");
    for site in &unbound {
        println!("  unbound: {site}");
    }

    Ok(())
}

async fn cmd_sites() -> Result<()> {
    let registry = SiteRegistry::open(&registry_db_path()?).await?;
    let bindings = registry.list_sites().await?;

    if bindings.is_empty() {
        println!("No sites published yet. Run `sitesage process <url>` first.");
        return Ok(());
    }

    for binding in &bindings {
        println!("{}", binding.site_url);
        println!(
            "  kb: {}  pages: {}  updated: {}",
            binding.kb_id, binding.page_count, binding.updated_at
        );
    }

    Ok(())
}

async fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

async fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

fn new_spinner() -> ProgressBar {
    let spinner = ProgressBar::new_spinner();
    spinner.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap()
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
    );
    spinner.enable_steady_tick(std::time::Duration::from_millis(80));
    spinner
}

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Self {
        Self {
            spinner: new_spinner(),
        }
    }
}

impl ProgressReporter for CliProgress {
    fn phase(&self, name: &str) {
        self.spinner.set_message(name.to_string());
    }

    fn done(&self, _outcome: &ProcessOutcome) {
        self.spinner.finish_and_clear();
    }
}
