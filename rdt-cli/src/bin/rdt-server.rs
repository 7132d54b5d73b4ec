//! RDT Server - serve one file reliably over UDP
//!
//! Waits for a client request, then streams the input file using either a
//! fixed send window or Reno congestion control.

use anyhow::Context;
use clap::Parser;
use rdt::io::RdtSocket;
use rdt::Server;
use rdt_cli::{display_send_report, init_logging, Config, WindowMode};
use std::fs::File;
use std::io::BufReader;
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rdt-server")]
#[command(about = "Reliable UDP file server", long_about = None)]
struct Args {
    /// Listen address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// File to serve
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Window mode
    #[arg(short, long, value_enum)]
    mode: Option<WindowMode>,

    /// Send window in bytes (fixed mode)
    #[arg(long)]
    sws: Option<u32>,

    /// Initial slow-start threshold in bytes (congestion mode)
    #[arg(long)]
    ssthresh: Option<u32>,

    /// TOML configuration file; flags override its [server] section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Keep serving clients instead of exiting after the first transfer
    #[arg(long)]
    forever: bool,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut section = Config::load(args.config.as_deref())
        .context("failed to load configuration")?
        .server;
    if let Some(bind) = args.bind {
        section.bind = bind;
    }
    if let Some(input) = args.input {
        section.input = Some(input);
    }
    if let Some(mode) = args.mode {
        section.mode = mode;
    }
    if let Some(sws) = args.sws {
        section.sws = sws;
    }
    if let Some(ssthresh) = args.ssthresh {
        section.ssthresh = ssthresh;
    }

    let input = section
        .input
        .clone()
        .context("no input file given (use --input or [server].input)")?;
    let config = section.server_config()?;

    let socket = RdtSocket::bind(section.bind)
        .with_context(|| format!("failed to bind {}", section.bind))?;
    let server = Server::new(socket, config);

    tracing::info!(
        "RDT server listening on {} (mode: {:?}, input: {})",
        server.local_addr()?,
        section.mode,
        input.display()
    );

    loop {
        let peer = server.accept()?;
        let file = File::open(&input)
            .with_context(|| format!("failed to open {}", input.display()))?;

        let report = server.serve(peer, BufReader::new(file))?;
        display_send_report(&report);

        if !args.forever {
            break;
        }
    }

    Ok(())
}
