use std::{net::SocketAddr, path::PathBuf, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use tokio::sync::broadcast;

use ticketing_viewer::{
    app::TicketingApp,
    build_router,
    chain::AlgodClient,
    config::{
        parse_app_id, resolve_port, AlgodConfig, KmdConfig, DEFAULT_ALGOD_PORT,
        DEFAULT_ALGOD_SERVER, DEFAULT_KMD_PORT, DEFAULT_KMD_WALLET, LOCALNET_TOKEN,
    },
    render::render,
    state::AppState,
    viewer::ContractViewer,
    wallet::{KmdProvider, LocalKeyProvider, WalletManager, WalletProvider},
};

#[derive(Debug, Parser)]
#[command(name = "ticketing-viewer")]
#[command(about = "Read-only viewer for an Algorand event-ticketing application")]
struct Cli {
    /// Application (contract) id. `0` or unset means not configured.
    #[arg(long, env = "EVENT_TICKETING_APP_ID")]
    app_id: Option<String>,

    /// algod server URL.
    #[arg(long, env = "ALGOD_SERVER", default_value = DEFAULT_ALGOD_SERVER)]
    algod_server: String,

    /// algod port. Ignored when the server URL already has one; `none` or
    /// empty uses the URL as given.
    #[arg(long, env = "ALGOD_PORT", default_value = DEFAULT_ALGOD_PORT)]
    algod_port: String,

    /// algod API token.
    #[arg(long, env = "ALGOD_TOKEN", default_value = LOCALNET_TOKEN, hide_default_value = true)]
    algod_token: String,

    /// KMD server URL. Registers a KMD wallet provider when set.
    #[arg(long, env = "KMD_SERVER")]
    kmd_server: Option<String>,

    /// KMD port, resolved the same way as `--algod-port`.
    #[arg(long, env = "KMD_PORT", default_value = DEFAULT_KMD_PORT)]
    kmd_port: String,

    #[arg(long, env = "KMD_TOKEN", default_value = LOCALNET_TOKEN, hide_default_value = true)]
    kmd_token: String,

    /// Name of the KMD wallet to open.
    #[arg(long, env = "KMD_WALLET", default_value = DEFAULT_KMD_WALLET)]
    kmd_wallet: String,

    #[arg(long, env = "KMD_PASSWORD", default_value = "", hide_default_value = true)]
    kmd_password: String,

    /// File holding a hex-encoded 32-byte Ed25519 seed. Registers a local key provider.
    #[arg(long, env = "WALLET_KEY_FILE")]
    key_file: Option<PathBuf>,

    /// Connect the first wallet provider before rendering.
    #[arg(long)]
    connect: bool,

    /// Serve the view over HTTP/WebSocket instead of printing it once.
    #[arg(long)]
    serve: bool,

    /// Port to listen on with `--serve`.
    #[arg(long, default_value = "3000")]
    port: u16,
}

impl Cli {
    fn algod_config(&self) -> Result<AlgodConfig> {
        let port = resolve_port(&self.algod_server, &self.algod_port)
            .context("invalid algod configuration")?;
        Ok(AlgodConfig::new(&self.algod_server, port, &self.algod_token))
    }

    fn kmd_config(&self) -> Result<Option<KmdConfig>> {
        let Some(ref server) = self.kmd_server else {
            return Ok(None);
        };
        let port = resolve_port(server, &self.kmd_port).context("invalid KMD configuration")?;
        Ok(Some(KmdConfig {
            server: server.clone(),
            port,
            token: self.kmd_token.clone(),
            wallet_name: self.kmd_wallet.clone(),
            wallet_password: self.kmd_password.clone(),
        }))
    }

    fn providers(&self) -> Result<Vec<Arc<dyn WalletProvider>>> {
        let mut providers: Vec<Arc<dyn WalletProvider>> = Vec::new();
        if let Some(kmd) = self.kmd_config()? {
            providers.push(Arc::new(KmdProvider::new(&kmd)));
        }
        if let Some(ref path) = self.key_file {
            providers.push(Arc::new(LocalKeyProvider::new(path)));
        }
        Ok(providers)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr so the rendered view on stdout stays clean.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "ticketing_viewer=info,tower_http=info".into()),
        )
        .init();

    let cli = Cli::parse();

    let algod_config = cli.algod_config()?;
    let algod = Arc::new(AlgodClient::new(&algod_config));
    tracing::info!(algod = %algod.base_url(), "algod endpoint configured");

    let providers = cli.providers()?;
    for provider in &providers {
        tracing::info!(id = provider.id(), name = provider.name(), "wallet provider registered");
    }

    let app_id = parse_app_id(cli.app_id.as_deref());

    let (event_tx, _) = broadcast::channel::<String>(64);
    let app = TicketingApp::new(
        ContractViewer::new(algod).with_events(event_tx.clone()),
        WalletManager::new(providers).with_events(event_tx.clone()),
    );

    if cli.serve {
        return serve(app, event_tx, app_id, cli.port).await;
    }

    app.viewer.sync(app_id).await;
    if cli.connect {
        // The failure is recorded on the view and rendered below.
        let _ = app.connect_wallet().await;
    }

    let (session, view) = app.snapshot().await;
    print!("{}", render(&session, &view));

    if cli.connect {
        app.disconnect_wallet().await;
    }
    Ok(())
}

async fn serve(
    app: TicketingApp,
    event_tx: broadcast::Sender<String>,
    app_id: Option<u64>,
    port: u16,
) -> Result<()> {
    let state = Arc::new(AppState { app, event_tx });

    // Initial read runs in the background so the server is reachable while loading.
    {
        let state = state.clone();
        tokio::spawn(async move {
            state.app.viewer.sync(app_id).await;
        });
    }

    let router = build_router(state);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    tracing::info!(%addr, "server listening");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind to {}", addr))?;

    axum::serve(listener, router)
        .await
        .context("server error")?;

    Ok(())
}
