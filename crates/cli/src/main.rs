use clap::Parser;
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "slipmux")]
#[command(version, about = "Bridge a slipmux serial device to a UDP socket", long_about = None)]
struct Cli {
    /// UDP address to listen on (e.g. [::1]:5683)
    #[arg(value_name = "ADDR")]
    addr: String,

    /// Serial device path (e.g. /dev/ttyUSB0)
    #[arg(value_name = "PATH")]
    path: String,

    /// Config file path (default: MUXGATE_CONFIG_PATH or ~/.muxgate/config.json)
    #[arg(long, short, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Serial baud rate (default from config or 115200)
    #[arg(long, short)]
    baud_rate: Option<u32>,

    /// Write to the device at full speed instead of in paced bursts
    #[arg(long)]
    no_pacing: bool,
}

#[tokio::main]
async fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = run(cli).await {
        log::error!("{:#}", e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let (mut config, path) = muxgate::config::load_config(cli.config)?;
    if let Some(baud) = cli.baud_rate {
        config.serial.baud_rate = baud;
    }
    if cli.no_pacing {
        config.pacing.enabled = false;
    }
    log::info!(
        "starting gateway udp {} <-> serial {} (config {})",
        cli.addr,
        cli.path,
        path.display()
    );
    muxgate::gateway::run_gateway(config, &cli.addr, &cli.path).await
}
