#![forbid(unsafe_code)]
#![warn(missing_docs)]

//! Originchain node entrypoint (systemd-friendly).
//! Listens for inbound encounters, optionally dials peers once at startup.

use std::path::PathBuf;
use std::sync::Arc;

use tracing::{info, warn};

use originchain::core::chain::repository::{OriginChainRepo, SledChainStore};
use originchain::core::packer::Packer;
use originchain::core::security::hasher::Sha256Provider;
use originchain::core::security::signer::{Ed25519Signer, Signer};
use originchain::core::types::{BoundWitness, NodeConfig};
use originchain::monitoring::http::spawn_metrics_http;
use originchain::monitoring::metrics::Metrics;
use originchain::networking::handler::{
    BoundWitnessHandler, Role, StandardPayloadProvider, SuccessListener,
};
use originchain::networking::pipe::FramedPipe;

fn env(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

/// Logs every completed block; durable bridging hangs off this hook.
struct LogListener;

impl SuccessListener for LogListener {
    fn on_bound_witness_success(&self, block: &BoundWitness) {
        info!(participants = block.participants(), "bound witness completed");
    }
}

#[tokio::main]
async fn main() {
    let _ = tracing_subscriber::fmt()
        .with_target(false)
        .with_level(true)
        .compact()
        .try_init();

    let cfg_path = env("ORIGINCHAIN_CONFIG", "originchain.toml");
    let cfg = match std::fs::read_to_string(&cfg_path) {
        Ok(raw) => match NodeConfig::from_toml_str(&raw) {
            Ok(cfg) => cfg,
            Err(e) => {
                eprintln!("bad config {cfg_path}: {e}");
                std::process::exit(1);
            }
        },
        Err(_) => NodeConfig::default(),
    };

    let data_dir = PathBuf::from(&cfg.node.data_dir);
    if let Err(e) = std::fs::create_dir_all(&data_dir) {
        eprintln!("cannot create data dir {}: {e}", data_dir.display());
        std::process::exit(1);
    }

    if cfg!(feature = "production") && std::env::var("ORIGINCHAIN_KEY_PASSPHRASE").is_err() {
        eprintln!("production builds require ORIGINCHAIN_KEY_PASSPHRASE for key-at-rest encryption");
        std::process::exit(1);
    }

    let signer = match Ed25519Signer::load_or_create(&data_dir.join("node.key")) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("keystore open failed: {e}");
            std::process::exit(1);
        }
    };
    let signer: Arc<dyn Signer> = Arc::new(signer);
    info!(
        node = %cfg.node.name,
        public_key = %hex::encode(&signer.public_key().bytes),
        "originchain node starting"
    );

    let packer = Arc::new(Packer::with_defaults().expect("codec registration failed"));
    let store = SledChainStore::open(
        data_dir
            .join("chain")
            .to_str()
            .expect("data dir is not valid utf-8"),
    )
    .expect("chain store open failed");
    let repo = Arc::new(
        OriginChainRepo::open(vec![signer], Some(Arc::new(store)))
            .expect("chain state restore failed"),
    );

    let metrics = Arc::new(Metrics::new().expect("metrics init failed"));
    metrics
        .origin_height
        .set(i64::try_from(repo.get_index()).unwrap_or(i64::MAX));
    if let Some(addr) = cfg.metrics.listen_addr.clone() {
        spawn_metrics_http(addr, metrics.clone());
    }

    let mut handler = BoundWitnessHandler::new(
        packer,
        repo,
        Arc::new(Sha256Provider),
        Arc::new(StandardPayloadProvider::new()),
        metrics,
    );
    handler.add_listener(Arc::new(LogListener));
    let handler = Arc::new(handler);

    // One session mutates the chain at a time; later sessions see the
    // advanced state.
    let session_guard = Arc::new(tokio::sync::Mutex::new(()));
    let max_frame = cfg.network.max_frame_bytes;

    for addr in cfg.network.dial.clone() {
        let handler = handler.clone();
        let guard = session_guard.clone();
        tokio::spawn(async move {
            match tokio::net::TcpStream::connect(&addr).await {
                Ok(stream) => {
                    let _g = guard.lock().await;
                    let pipe = FramedPipe::new(stream, max_frame);
                    let _ = handler.handle(pipe, Role::Initiator).await;
                }
                Err(e) => warn!(error = %e, peer = %addr, "dial failed"),
            }
        });
    }

    let listener = match tokio::net::TcpListener::bind(&cfg.network.listen_addr).await {
        Ok(l) => l,
        Err(e) => {
            eprintln!("listen on {} failed: {e}", cfg.network.listen_addr);
            std::process::exit(1);
        }
    };
    info!(addr = %cfg.network.listen_addr, "listening for encounters");

    loop {
        tokio::select! {
            accepted = listener.accept() => {
                match accepted {
                    Ok((stream, peer)) => {
                        let handler = handler.clone();
                        let guard = session_guard.clone();
                        tokio::spawn(async move {
                            let _g = guard.lock().await;
                            let pipe = FramedPipe::new(stream, max_frame);
                            if handler.handle(pipe, Role::Responder).await.is_ok() {
                                info!(peer = %peer, "encounter recorded");
                            }
                        });
                    }
                    Err(e) => warn!(error = %e, "accept failed"),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutting down");
                break;
            }
        }
    }
}
