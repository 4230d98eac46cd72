use anyhow::Result;
use clap::{Parser, Subcommand, ValueEnum};
use hostpulse_core::{topic_for_host, SenderConfig};
use hostpulse_services::{resolve_hostname, GpuMonitor, MetricsPayload, Services};
use std::io::{self, Write};
use std::time::Duration;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hostpulse")]
#[command(about = "HostPulse - host and GPU telemetry sender", long_about = None)]
struct Cli {
    /// Host key for the topic and payload (overrides SENDER_HOSTNAME)
    #[arg(long, global = true)]
    hostname: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Acquire GPU telemetry once and report which source answered
    Gpu {
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,
    },

    /// Sample on an interval and write one payload line per tick
    Run {
        /// Sample twice, print the second payload, and exit
        #[arg(long)]
        oneshot: bool,

        /// Seconds between ticks (overrides SEND_INTERVAL_SEC)
        #[arg(short, long)]
        interval: Option<f64>,
    },

    /// Print the topic for this host
    Topic,

    /// Show effective configuration and GPU source health
    Status,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Table,
    Json,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let mut config = SenderConfig::from_env();
    if cli.hostname.is_some() {
        config.hostname = cli.hostname;
    }

    match cli.command {
        Some(Commands::Gpu { output }) => cmd_gpu(&config, output)?,
        Some(Commands::Run { oneshot, interval }) => {
            if let Some(secs) = interval {
                if !config.set_interval_sec(secs) {
                    warn!(secs, "Ignoring unusable --interval");
                }
            }
            cmd_run(&config, oneshot).await?
        }
        Some(Commands::Topic) => cmd_topic(&config),
        Some(Commands::Status) => cmd_status(&config),
        None => cmd_run(&config, false).await?,
    }

    Ok(())
}

fn cmd_gpu(config: &SenderConfig, output: OutputFormat) -> Result<()> {
    let acquisition = GpuMonitor::new(config.gpu.clone()).acquire();

    match output {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&acquisition)?);
        }
        OutputFormat::Table => {
            let t = &acquisition.telemetry;
            let source = acquisition.source.map_or("none", |s| s.label());
            println!();
            println!("GPU Telemetry:");
            println!("{:-<40}", "");
            println!("  Source:        {}", source);
            println!("  Usage:         {:.1} %", t.usage);
            println!("  Edge Temp:     {:.1} °C", t.temp_edge);
            println!("  VRAM Used:     {:.1} %", t.mem_used_pct);
            println!("  Hotspot Temp:  {:.1} °C", t.temp_hotspot);
            println!("  Memory Temp:   {:.1} °C", t.temp_memory);
            println!();
        }
    }

    Ok(())
}

async fn cmd_run(config: &SenderConfig, oneshot: bool) -> Result<()> {
    let period = config.interval();
    let mut services = Services::from_config(config);
    info!(
        host = services.hostname(),
        topic = %topic_for_host(services.hostname()),
        interval_sec = period.as_secs_f64(),
        "Sampling started"
    );

    if oneshot {
        tick(&mut services);
        tokio::time::sleep(period.min(Duration::from_secs(1))).await;
        return emit(&tick(&mut services));
    }

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => emit(&tick(&mut services))?,
            _ = tokio::signal::ctrl_c() => {
                info!("Interrupted, stopping");
                break;
            }
        }
    }

    Ok(())
}

/// Sampling shells out to vendor tools, so keep it off the async workers
fn tick(services: &mut Services) -> MetricsPayload {
    let snapshot = tokio::task::block_in_place(|| services.tick());
    MetricsPayload::from_snapshot(&snapshot)
}

fn emit(payload: &MetricsPayload) -> Result<()> {
    let line = payload.to_json()?;
    let mut stdout = io::stdout().lock();
    writeln!(stdout, "{}", line)?;
    stdout.flush()?;
    Ok(())
}

fn cmd_topic(config: &SenderConfig) {
    println!("{}", topic_for_host(&resolve_hostname(config.hostname.as_deref())));
}

fn cmd_status(config: &SenderConfig) {
    let hostname = resolve_hostname(config.hostname.as_deref());

    println!("System Status:");
    println!("{:-<40}", "");
    println!("  Host:       {}", hostname);
    println!("  Topic:      {}", topic_for_host(&hostname));
    println!("  Interval:   {:.1} s", config.interval().as_secs_f64());
    println!("  procfs:     {}", config.proc_root.display());
    println!("  DRM root:   {}", config.gpu.drm_root.display());
    println!();
    println!("GPU Sources:");
    println!("{:-<40}", "");

    for (source, result) in GpuMonitor::new(config.gpu.clone()).probe() {
        match result {
            Ok(t) => println!("  {:<10} ok ({:?})", source.label(), t.to_wire()),
            Err(e) => println!("  {:<10} unavailable ({})", source.label(), e),
        }
    }
}
