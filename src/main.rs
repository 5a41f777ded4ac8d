use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand, ValueEnum};
use console::style;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use fleetcmp::config::{self, Config};
use fleetcmp::exit_codes::exit_code_for_anyhow;
use fleetcmp::fetch::HttpFetcher;
use fleetcmp::fleet::{self, Constraints, FleetSize, NetworkSpeed, ReservationPlan, SortKey};
use fleetcmp::freshness::{CatalogLoader, RefreshFlags};
use fleetcmp::pipeline::{self, PricingSources};
use fleetcmp::render;
use fleetcmp::retry::ExponentialBackoffPolicy;
use fleetcmp::store::FsBlobStore;

#[derive(Parser)]
#[command(name = "fleetcmp")]
#[command(
    about = "Find the cheapest EC2 instance or fleet for your CPU, memory and network needs",
    long_about = "fleetcmp compares EC2 on-demand, reserved and spot prices.\n\nGiven per-instance minimums and aggregate fleet targets it sizes a fleet\nfor every matching instance type and ranks them by monthly cost.\n\nPrice documents are cached in ~/.ec2FleetCompare (on-demand for a day,\nspot for 30 minutes)."
)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    #[command(flatten)]
    search: SearchArgs,

    /// Configuration file path
    #[arg(long, global = true, env = "FLEETCMP_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output format
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

#[derive(Subcommand)]
enum Commands {
    /// Write a default configuration file
    Init {
        /// Output path for config file
        #[arg(short, long, default_value = ".fleetcmp.toml")]
        output: PathBuf,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
}

#[derive(Args)]
struct SearchArgs {
    /// Exact number of instances (skips fleet sizing)
    #[arg(short, long)]
    num: Option<u32>,

    /// Minimum number of instances in the fleet
    #[arg(long, default_value_t = 1)]
    min: u32,

    /// Region code, substring match
    #[arg(short, long, default_value = "us-east-1")]
    region: String,

    /// Instance type, substring match
    #[arg(short, long, default_value = "any")]
    instance: String,

    /// Minimum vCPUs per instance
    #[arg(short, long, default_value_t = 2)]
    cpu: u32,

    /// Minimum memory per instance (GiB)
    #[arg(short, long, default_value_t = 2.0)]
    mem: f64,

    /// Total vCPUs across the fleet
    #[arg(long, default_value_t = 2)]
    fleet_cpu: u32,

    /// Total memory across the fleet (GiB)
    #[arg(long, default_value_t = 2.0)]
    fleet_mem: f64,

    /// Minimum network performance
    #[arg(long, value_enum, default_value_t = NetworkSpeed::Low)]
    network: NetworkSpeed,

    /// Minimum instance store size (GB)
    #[arg(short, long, default_value_t = 0)]
    disk: u64,

    /// Instance store type (EBS, HDD, SSD or any)
    #[arg(long, default_value = "any")]
    disk_type: String,

    /// Operating system, substring match
    #[arg(long, default_value = "linux")]
    os: String,

    /// Monthly cost to rank by
    #[arg(short, long, value_enum, default_value_t = SortKey::Demand)]
    sort: SortKey,

    /// Number of rows to show
    #[arg(short, long, default_value_t = 20)]
    output_size: usize,

    /// Reserved instance plan for the RI column
    #[arg(long, value_enum, default_value_t = ReservationPlan::Partial1)]
    ri: ReservationPlan,

    /// Download fresh price documents even if the cache is current
    #[arg(short, long)]
    force: bool,

    /// Never download; use cached price documents only
    #[arg(long)]
    skip: bool,

    /// Ignore spot prices entirely
    #[arg(long)]
    no_spot: bool,
}

impl SearchArgs {
    fn constraints(&self) -> Constraints {
        let fleet = match self.num {
            Some(count) => FleetSize::Exact(count),
            None => FleetSize::Targets {
                cpu: self.fleet_cpu,
                memory_gib: self.fleet_mem,
            },
        };
        Constraints {
            region: self.region.clone(),
            instance_type: self.instance.clone(),
            os: self.os.clone(),
            min_cpu: self.cpu,
            min_memory_gib: self.mem,
            min_disk_gib: self.disk,
            network: self.network,
            disk_type: self.disk_type.clone(),
            fleet,
            min_count: self.min,
            plan: self.ri,
            sort: self.sort,
            limit: self.output_size,
        }
    }

    fn refresh_flags(&self) -> RefreshFlags {
        RefreshFlags {
            force_download: self.force,
            skip_download: self.skip,
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    let cli = Cli::parse();

    // Warnings and errors only unless asked; logs go to stderr so JSON stays clean
    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);
    if cli.format == OutputFormat::Json {
        subscriber.json().init();
    } else {
        subscriber.init();
    }

    if let Err(err) = run(cli).await {
        print_error_block(&err);
        std::process::exit(exit_code_for_anyhow(&err));
    }
}

async fn run(cli: Cli) -> Result<()> {
    if let Some(Commands::Init { output }) = &cli.command {
        return config::init_config(output);
    }

    let config = Config::load(cli.config.as_deref())?;
    let constraints = cli.search.constraints();
    constraints.validate()?;

    let store = FsBlobStore::new(config.cache.resolve_dir()?);
    let mut fetcher = HttpFetcher::new(ExponentialBackoffPolicy::new(config.download.max_attempts));
    if cli.format == OutputFormat::Json {
        fetcher = fetcher.quiet();
    }

    let loader = CatalogLoader::new(&fetcher, &store, cli.search.refresh_flags());
    let sources = PricingSources::from_config(&config);
    let catalog = pipeline::load_enriched_catalog(&loader, &sources, !cli.search.no_spot)
        .await
        .with_context(|| format!("Failed to load EC2 prices (cache: {})", store.dir().display()))?;

    let candidates = fleet::search(&catalog, &constraints)?;
    match cli.format {
        OutputFormat::Text => println!("{}", render::render_text(&candidates, &constraints)),
        OutputFormat::Json => println!("{}", render::render_json(&candidates)?),
    }

    Ok(())
}

fn print_error_block(err: &anyhow::Error) {
    let banner = style("**************** ERROR ****************").red().bold();
    eprintln!("{}", banner);
    eprintln!("ERROR: {}", err);
    for cause in err.chain().skip(1) {
        eprintln!("  caused by: {}", cause);
    }
    eprintln!("{}", banner);
}
