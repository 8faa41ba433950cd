//! Entry point for `reliable-udp`.
//!
//! Bridges stdin/stdout to a remote peer over UDP.  All protocol work is
//! delegated to library modules; `main.rs` owns only process setup (logging,
//! argument parsing, and the stdin/stdout pumps).

use std::io::Read;
use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;

use reliable_udp::config::Config;
use reliable_udp::conn::Output;
use reliable_udp::host::{self, HostConfig};
use reliable_udp::socket::Socket;

/// Reliable in-order byte stream over UDP.
#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Local address to bind (e.g. 0.0.0.0:9000).
    #[arg(short, long, default_value = "0.0.0.0:9000")]
    bind: SocketAddr,

    /// Remote peer address (e.g. 127.0.0.1:9001).
    #[arg(short, long)]
    peer: SocketAddr,

    /// Maximum number of packets in flight.
    #[arg(short, long, default_value_t = 1)]
    window: usize,

    /// Retransmission timeout in milliseconds.
    #[arg(short, long, default_value_t = 2000)]
    timeout: u64,

    /// Retransmission sweep interval in milliseconds [default: timeout / 5].
    #[arg(long)]
    tick: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Logs go to stderr; stdout carries the received stream.
    env_logger::init();

    let cli = Cli::parse();
    let session = Config::new(cli.window, Duration::from_millis(cli.timeout))
        .context("invalid protocol configuration")?;
    let tick = Duration::from_millis(cli.tick.unwrap_or(cli.timeout / 5).max(1));

    let socket = Socket::bind(cli.bind)
        .await
        .with_context(|| format!("binding {}", cli.bind))?;

    let (input_tx, input_rx) = mpsc::channel(64);
    let (output_tx, output_rx) = mpsc::unbounded_channel();

    // Blocking stdin reader on a detached thread; it must not keep the
    // process alive once the session is over.
    std::thread::spawn(move || {
        if let Err(e) = pump_stdin(input_tx) {
            log::error!("stdin: {e}");
        }
    });
    let writer = tokio::spawn(pump_stdout(output_rx));

    let config = HostConfig {
        peer: cli.peer,
        session,
        tick,
    };
    host::run(socket, config, input_rx, output_tx)
        .await
        .context("transport failed")?;

    writer.await?.context("writing stdout")?;
    Ok(())
}

fn pump_stdin(tx: mpsc::Sender<Vec<u8>>) -> std::io::Result<()> {
    let mut stdin = std::io::stdin().lock();
    let mut buf = vec![0u8; 4096];
    loop {
        let n = stdin.read(&mut buf)?;
        if n == 0 || tx.blocking_send(buf[..n].to_vec()).is_err() {
            return Ok(());
        }
    }
}

async fn pump_stdout(mut rx: mpsc::UnboundedReceiver<Output>) -> std::io::Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(output) = rx.recv().await {
        match output {
            Output::Data(bytes) => {
                stdout.write_all(&bytes).await?;
                stdout.flush().await?;
            }
            Output::Eof => break,
        }
    }
    stdout.flush().await
}
