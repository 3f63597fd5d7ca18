use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use chrono::{Duration, Utc};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tokenmint::authz::{Authorizer, SystemAuthorizer};
use tokenmint::cli::{Cli, Commands, SessionCommands, TokenCommands};
use tokenmint::config::{self, Config};
use tokenmint::controller::{Controller, CreateTokenInput, IssuancePolicy};
use tokenmint::models::grant::AccessGrant;
use tokenmint::models::principal::Session;
use tokenmint::store::postgres::PgStore;
use tokenmint::store::{PrincipalDirectory, TokenStore};
use tokenmint::token::jwt::{HsSigner, SessionClaims, Signer};
use tokenmint::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "tokenmint=debug,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cfg = config::load()?;
    let args = Cli::parse();

    match args.command {
        Some(Commands::Serve { port }) => run_server(cfg, port).await,
        Some(Commands::Token { command }) => handle_token_command(cfg, command).await,
        Some(Commands::Session { command }) => handle_session_command(cfg, command),
        None => run_server(cfg, None).await,
    }
}

fn build_controller(store: Arc<PgStore>, signer: Arc<HsSigner>, cfg: &Config, privileged: bool) -> Controller {
    let authorizer: Arc<dyn Authorizer> = if privileged {
        Arc::new(SystemAuthorizer)
    } else {
        store.clone()
    };
    Controller::new(
        store.clone() as Arc<dyn PrincipalDirectory>,
        authorizer,
        store as Arc<dyn TokenStore>,
        signer as Arc<dyn Signer>,
        IssuancePolicy {
            max_lifetime: cfg.max_lifetime(),
            allow_privileged_default: if privileged {
                true
            } else {
                cfg.allow_privileged_default
            },
        },
    )
}

async fn run_server(cfg: Config, port: Option<u16>) -> anyhow::Result<()> {
    let store = Arc::new(PgStore::connect(&cfg.database_url).await?);
    store.migrate().await.context("running migrations")?;

    let signer = Arc::new(HsSigner::new(&cfg.signing_key));
    let controller = build_controller(store, signer.clone(), &cfg, false);

    let port = port.unwrap_or(cfg.port);
    let state = Arc::new(AppState {
        controller,
        sessions: signer,
    });

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!(%addr, "tokenmint listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, tokenmint::api::router(state)).await?;
    Ok(())
}

/// Session used by operator CLI flows. Row id 0 is reserved for the system
/// principal and never appears in the memberships table.
fn system_session() -> Session {
    Session {
        principal_id: 0,
        principal_uid: "system".into(),
    }
}

async fn handle_token_command(cfg: Config, command: TokenCommands) -> anyhow::Result<()> {
    let store = Arc::new(PgStore::connect(&cfg.database_url).await?);
    let signer = Arc::new(HsSigner::new(&cfg.signing_key));
    let controller = build_controller(store, signer, &cfg, true);
    let session = system_session();

    match command {
        TokenCommands::Issue {
            account,
            uid,
            lifetime_hours,
            grants,
        } => {
            let grants = AccessGrant::parse(&grants)
                .context("unknown grant name; use e.g. \"repo:read,repo:push\" or \"all\"")?;
            let lifetime_secs = lifetime_hours
                .checked_mul(3600)
                .context("lifetime is out of range")?;
            let input = CreateTokenInput {
                uid,
                lifetime_secs,
                grants,
            };
            let response = controller.create_token(&session, &account, &input).await?;
            println!("token uid:    {}", response.token.uid);
            println!("expires at:   {}", response.token.expires_at);
            println!("access token: {}", response.access_token);
            println!("The access token is shown once and cannot be recovered.");
        }
        TokenCommands::List { account } => {
            let tokens = controller.list_tokens(&session, &account).await?;
            for t in tokens {
                println!(
                    "{}\tgrants={:#x}\texpires={}\tissued_by={}",
                    t.uid, t.grants.0, t.expires_at, t.issued_by
                );
            }
        }
        TokenCommands::Revoke { account, uid } => {
            controller.delete_token(&session, &account, &uid).await?;
            println!("revoked {}", uid);
        }
    }
    Ok(())
}

fn handle_session_command(cfg: Config, command: SessionCommands) -> anyhow::Result<()> {
    let signer = HsSigner::new(&cfg.signing_key);
    match command {
        SessionCommands::Issue {
            principal_id,
            principal_uid,
            lifetime_hours,
        } => {
            let lifetime = Duration::try_hours(lifetime_hours).context("lifetime is out of range")?;
            let claims = SessionClaims {
                sub: principal_uid,
                pid: principal_id,
                exp: (Utc::now() + lifetime).timestamp(),
            };
            println!("{}", signer.sign_session(&claims)?);
        }
    }
    Ok(())
}
