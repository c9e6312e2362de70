// voicelink Linux daemon: one resilient duplex link, stdin in, stdout out.

mod config;

use std::io::Write as _;
use std::sync::Arc;
use std::time::Duration;

use log::info;
use tokio::io::{AsyncBufReadExt, BufReader};
use voicelink_core::{LinkConfig, LinkEvents, LinkService, TcpTransport};

const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Relay link events to the terminal: payloads to stdout, state to the log.
struct StdioEvents;

impl LinkEvents for StdioEvents {
    fn on_connected(&self, peer: &str) {
        info!("connected to {peer}");
    }

    fn on_disconnected(&self) {
        info!("disconnected, listening again");
    }

    fn on_message(&self, payload: &[u8]) {
        let mut out = std::io::stdout().lock();
        let _ = out.write_all(payload);
        let _ = out.flush();
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    for arg in std::env::args().skip(1) {
        if arg == "--version" || arg == "-V" {
            println!("voicelink-linux {}", VERSION);
            return Ok(());
        }
    }

    env_logger::init();
    let cfg = config::load();
    let link_config = LinkConfig {
        dial_backoff: Duration::from_millis(cfg.dial_backoff_ms),
        redial_on_drop: cfg.redial_on_drop,
        ..LinkConfig::default()
    };

    let bind: std::net::SocketAddr = format!("0.0.0.0:{}", cfg.listen_port).parse()?;
    info!("voicelink-linux {} starting, listen addr {}", VERSION, bind);

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(async {
        let service = LinkService::new(TcpTransport::new(bind), link_config, Arc::new(StdioEvents));
        service.start();
        if let Some(peer) = cfg.peer.as_deref() {
            service.connect(peer);
        }

        let writer = service.clone();
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let mut payload = line.into_bytes();
                payload.push(b'\n');
                writer.write(payload);
            }
        });

        shutdown_signal().await?;
        service.stop();
        Ok::<(), Box<dyn std::error::Error>>(())
    })?;
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM (Unix). On shutdown the service cancels its
/// loops and the runtime drops the stdin task.
async fn shutdown_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm = signal(SignalKind::terminate())
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {}
            _ = sigterm.recv() => {}
        }
    }
    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
    }
    Ok(())
}
