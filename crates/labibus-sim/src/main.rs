//! `labibus`: run simulated Labibus nodes and talk to them.

use std::net::IpAddr;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use labibus_codec::RequestKind;
use labibus_master::{encode_request, Reply};
use labibus_sim::{load_config, BusClient, NodeConfig, SimError, SimNode, SimResult, UartBridge};
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Labibus RS485 sensor bus simulator.
#[derive(Parser, Debug)]
#[command(name = "labibus")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Command {
    /// Run a simulated node and expose its UART over TCP.
    Serve {
        /// Node file (YAML).
        #[arg(short, long)]
        config: PathBuf,
        /// Address to bind to.
        #[arg(long, default_value = "127.0.0.1")]
        bind: IpAddr,
        /// Port to bind to.
        #[arg(short, long, default_value_t = 4850)]
        port: u16,
        /// Apply configured sensor drift every this many seconds.
        #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
        update_secs: Option<u64>,
    },
    /// Ask a device to describe itself.
    Discover {
        /// Bridged bus address (host:port).
        #[arg(short, long, default_value = "127.0.0.1:4850")]
        addr: String,
        /// Device id (decimal, or hex with 0x).
        #[arg(short, long, value_parser = parse_device_id)]
        id: u8,
        /// Reply timeout in milliseconds.
        #[arg(long, default_value_t = 500)]
        timeout_ms: u64,
    },
    /// Ask a device for its latest reading.
    Poll {
        /// Bridged bus address (host:port).
        #[arg(short, long, default_value = "127.0.0.1:4850")]
        addr: String,
        /// Device id (decimal, or hex with 0x).
        #[arg(short, long, value_parser = parse_device_id)]
        id: u8,
        /// Reply timeout in milliseconds.
        #[arg(long, default_value_t = 500)]
        timeout_ms: u64,
    },
    /// Print a request line.
    Frame {
        /// Device id (decimal, or hex with 0x).
        #[arg(short, long, value_parser = parse_device_id)]
        id: u8,
        /// Request kind.
        #[arg(short, long, value_enum)]
        kind: Kind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum Kind {
    Discover,
    Poll,
}

impl From<Kind> for RequestKind {
    fn from(kind: Kind) -> Self {
        match kind {
            Kind::Discover => RequestKind::Discover,
            Kind::Poll => RequestKind::Poll,
        }
    }
}

fn parse_device_id(s: &str) -> Result<u8, String> {
    let id = match s.strip_prefix("0x").or_else(|| s.strip_prefix("0X")) {
        Some(hex) => u8::from_str_radix(hex, 16),
        None => s.parse(),
    }
    .map_err(|e| format!("invalid device id '{}': {}", s, e))?;
    if id > 0x7f {
        return Err(format!("device id 0x{:02x} out of range 0..=0x7f", id));
    }
    Ok(id)
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let result = match args.command {
        Command::Serve {
            config,
            bind,
            port,
            update_secs,
        } => serve(config, bind, port, update_secs.map(Duration::from_secs)),
        Command::Discover {
            addr,
            id,
            timeout_ms,
        } => query(&addr, id, RequestKind::Discover, timeout_ms),
        Command::Poll {
            addr,
            id,
            timeout_ms,
        } => query(&addr, id, RequestKind::Poll, timeout_ms),
        Command::Frame { id, kind } => {
            let line = encode_request(id, kind.into());
            print!("{}", String::from_utf8_lossy(&line));
            Ok(())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn serve(config: PathBuf, bind: IpAddr, port: u16, update: Option<Duration>) -> SimResult<()> {
    let config = load_config(&config)?;
    let node = SimNode::from_config(&config)?;

    let stop = Arc::new(AtomicBool::new(false));
    let handler_stop = stop.clone();
    ctrlc::set_handler(move || handler_stop.store(true, Ordering::SeqCst))?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    let served = runtime.block_on(run_bridge(&node, &config, (bind, port), &stop, update));

    // Waits for the transmit pump before the node goes away.
    drop(runtime);
    node.shutdown()?;
    served
}

async fn run_bridge(
    node: &SimNode,
    config: &NodeConfig,
    addr: (IpAddr, u16),
    stop: &AtomicBool,
    update: Option<Duration>,
) -> SimResult<()> {
    let bridge = UartBridge::bind(addr, node.link()).await?;
    info!(
        node = %config.name,
        devices = config.devices.len(),
        "serving UART on {}",
        bridge.local_addr()?
    );
    for device in &config.devices {
        info!(
            "  0x{:02x}  {} [{}] every {} s",
            device.id, device.description, device.unit, device.poll_interval
        );
    }

    let mut server = tokio::spawn(bridge.run());
    let mut stop_check = tokio::time::interval(Duration::from_millis(100));
    let period = update.unwrap_or(Duration::from_secs(1));
    let mut drift = tokio::time::interval_at(tokio::time::Instant::now() + period, period);

    let result = loop {
        tokio::select! {
            joined = &mut server => {
                break match joined {
                    Ok(served) => served.map_err(SimError::from),
                    Err(e) => Err(std::io::Error::new(std::io::ErrorKind::Other, e).into()),
                };
            }
            _ = stop_check.tick() => {
                if stop.load(Ordering::SeqCst) {
                    info!("stopping");
                    break Ok(());
                }
            }
            _ = drift.tick(), if update.is_some() => {
                node.apply_drift(config);
            }
        }
    };
    server.abort();
    result
}

fn query(addr: &str, id: u8, kind: RequestKind, timeout_ms: u64) -> SimResult<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let reply = runtime.block_on(request_once(addr, id, kind, Duration::from_millis(timeout_ms)))?;

    match reply {
        Some(Reply::Discovery(d)) => println!(
            "0x{:02x}  {} [{}] every {} s",
            d.device_id, d.description, d.unit, d.poll_interval
        ),
        Some(Reply::Poll(p)) => println!("0x{:02x}  {}", p.device_id, p.text),
        None => println!("0x{:02x}  no reply", id),
    }
    Ok(())
}

async fn request_once(
    addr: &str,
    id: u8,
    kind: RequestKind,
    timeout: Duration,
) -> SimResult<Option<Reply>> {
    let mut client = BusClient::connect(addr).await?;
    client.request(id, kind, timeout).await
}
