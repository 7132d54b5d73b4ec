//! RDT Client - download a file from an RDT server
//!
//! Sends the connection request, writes the received stream to a file (or
//! stdout) and acknowledges every segment.

use anyhow::Context;
use clap::Parser;
use rdt::io::RdtSocket;
use rdt::Client;
use rdt_cli::{display_receive_report, init_logging, Config};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::net::SocketAddr;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rdt-client")]
#[command(about = "Reliable UDP file client", long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long)]
    server: Option<SocketAddr>,

    /// Output file (use '-' for stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Local bind address
    #[arg(short, long)]
    bind: Option<SocketAddr>,

    /// TOML configuration file; flags override its [client] section
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_logging(args.verbose);

    let mut section = Config::load(args.config.as_deref())
        .context("failed to load configuration")?
        .client;
    if let Some(server) = args.server {
        section.server = Some(server);
    }
    if let Some(output) = args.output {
        section.output = Some(output);
    }
    if let Some(bind) = args.bind {
        section.bind = bind;
    }

    let server = section
        .server
        .context("no server address given (use --server or [client].server)")?;
    let output = section
        .output
        .clone()
        .context("no output file given (use --output or [client].output)")?;
    let config = section.client_config()?;

    let socket = RdtSocket::bind(section.bind)
        .with_context(|| format!("failed to bind {}", section.bind))?;
    let client = Client::new(socket, config);

    tracing::info!("Requesting stream from {}", server);

    let sink: Box<dyn Write> = if output.as_os_str() == "-" {
        tracing::info!("Writing to stdout");
        Box::new(BufWriter::new(io::stdout()))
    } else {
        tracing::info!("Writing to file: {}", output.display());
        let file = File::create(&output)
            .with_context(|| format!("failed to create {}", output.display()))?;
        Box::new(BufWriter::new(file))
    };

    let (_sink, report) = client.download(server, sink)?;
    if output.as_os_str() != "-" {
        display_receive_report(&report);
    }

    Ok(())
}
