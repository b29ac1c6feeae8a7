//! OAuth 2.0 Grants - Entry Point
//!
//! Runs the authorization server, the resource server, both together, or the
//! client flow driver.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use oauth_grants::client::{ClientConfig, FlowDriver};
use oauth_grants::config::{self, Config, defaults};
use oauth_grants::server::OAuthServer;
use oauth_grants::server::oauth::{
    ClientCredentials, FileTokenStore, MemoryTokenStore, TokenStore,
};

#[derive(Parser, Debug)]
#[command(name = "oauth-grants")]
#[command(about = "OAuth 2.0 password and client credentials grants with a bearer-token resource server")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Token lifetime in seconds (default: 30 days)
    #[arg(long, env = config::ENV_TOKEN_TTL, global = true, value_parser = config::parse_ttl)]
    token_ttl: Option<Duration>,

    /// JSON registry of clients and resource owners (default: built-in demo registry)
    #[arg(long, env = config::ENV_REGISTRY_FILE, global = true)]
    registry: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the authorization server (token endpoint)
    AuthServer {
        #[arg(long, default_value_t = defaults::AUTH_SERVER_PORT, env = "PORT")]
        port: u16,

        /// Base URL for metadata announcements
        #[arg(long, env = "BASE_URL")]
        base_url: Option<String>,

        /// Token store backend
        #[arg(long, default_value = "file")]
        store: StoreKind,

        /// Token store file (file backend)
        #[arg(long, default_value = defaults::STORE_FILE)]
        store_file: PathBuf,
    },

    /// Run the protected resource server
    ResourceServer {
        #[arg(long, default_value_t = defaults::RESOURCE_SERVER_PORT, env = "PORT")]
        port: u16,

        /// Base URL for metadata announcements
        #[arg(long, env = "BASE_URL")]
        base_url: Option<String>,

        /// Authorization server advertised in resource metadata
        #[arg(long, default_value = "http://localhost:9001")]
        authorization_server: String,

        /// Token store file written by the authorization server
        #[arg(long, default_value = defaults::STORE_FILE)]
        store_file: PathBuf,
    },

    /// Run both servers in one process
    Combined {
        #[arg(long, default_value_t = defaults::AUTH_SERVER_PORT, env = "PORT")]
        port: u16,

        /// Base URL for metadata announcements
        #[arg(long, env = "BASE_URL")]
        base_url: Option<String>,

        /// Token store backend
        #[arg(long, default_value = "memory")]
        store: StoreKind,

        /// Token store file (file backend)
        #[arg(long, default_value = defaults::STORE_FILE)]
        store_file: PathBuf,
    },

    /// Obtain a token and fetch the protected resource
    Client {
        /// Grant to use
        #[arg(long, default_value = "password")]
        grant: GrantKind,

        #[arg(long, default_value = "takusou")]
        client_id: String,

        #[arg(long, default_value = "takusou-secret", env = "OAUTH_CLIENT_SECRET")]
        client_secret: String,

        /// Space-delimited scope to request
        #[arg(long, default_value = "foo bar")]
        scope: String,

        /// Resource owner (password grant)
        #[arg(long, default_value = "komori")]
        username: String,

        /// Resource owner password (password grant)
        #[arg(long, default_value = "password", env = "OAUTH_PASSWORD")]
        password: String,

        #[arg(long, default_value = "http://localhost:9001/")]
        auth_server: String,

        #[arg(long, default_value = "http://localhost:3002/")]
        resource_server: String,
    },
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum StoreKind {
    /// In-process map (single process only)
    #[default]
    Memory,
    /// JSON-lines file shared between processes
    File,
}

#[derive(Debug, Clone, Copy, Default, clap::ValueEnum)]
enum GrantKind {
    /// Resource Owner Password Credentials
    #[default]
    Password,
    /// Client Credentials
    ClientCredentials,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    if json {
        subscriber.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        subscriber.with(tracing_subscriber::fmt::layer().compact()).init();
    }
}

fn build_config(cli: &Cli) -> anyhow::Result<Config> {
    Ok(Config::load(cli.token_ttl, cli.registry.as_deref())?)
}

fn build_store(kind: StoreKind, path: PathBuf) -> Arc<dyn TokenStore> {
    match kind {
        StoreKind::Memory => Arc::new(MemoryTokenStore::new()),
        StoreKind::File => {
            tracing::info!(path = %path.display(), "Using file token store");
            Arc::new(FileTokenStore::new(path))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting oauth-grants");

    let config = build_config(&cli)?;

    match cli.command {
        Command::AuthServer { port, base_url, store, store_file } => {
            let server = OAuthServer::new(config, build_store(store, store_file));
            server.run_auth(port, base_url).await?;
        }
        Command::ResourceServer { port, base_url, authorization_server, store_file } => {
            let server = OAuthServer::new(config, build_store(StoreKind::File, store_file));
            server.run_resource(port, base_url, authorization_server).await?;
        }
        Command::Combined { port, base_url, store, store_file } => {
            let server = OAuthServer::new(config, build_store(store, store_file));
            server.run_combined(port, base_url).await?;
        }
        Command::Client {
            grant,
            client_id,
            client_secret,
            scope,
            username,
            password,
            auth_server,
            resource_server,
        } => {
            let client_config = ClientConfig::new(
                ClientCredentials::new(client_id, client_secret),
                scope,
                &auth_server,
                &resource_server,
            )?;
            let driver = FlowDriver::new(client_config)?;

            let token = match grant {
                GrantKind::Password => driver.password_grant(&username, &password).await?,
                GrantKind::ClientCredentials => driver.client_credentials_grant().await?,
            };
            tracing::info!(scope = %token.scope, expires_in = token.expires_in, "Token obtained");

            let resource = driver.fetch_resource().await?;
            println!("{}", serde_json::to_string_pretty(&resource)?);
        }
    }

    Ok(())
}
