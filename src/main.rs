//! Content tokens CLI entry point

mod cli;

use crate::cli::{Cli, CollectionCommands, Commands};
use anyhow::{Context, Result};
use clap::Parser;
use content_tokens::auth::{
    AccessKey, PermissionMode, PermissionSlot, ResourceToken, ANONYMOUS_USER_ID,
};
use content_tokens::config::{parse_header_name, ServiceConfig};
use content_tokens::issuer::{SelectionRule, TokenIssuer};
use content_tokens::server::run_http_server;
use content_tokens::storage::{
    Locator, PermissionStore, PostgresConfig, PostgresStore, UserLookup,
};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    // Resolved lazily, only the commands that touch the store need it
    let get_db_config = || -> Result<PostgresConfig> {
        if let Some(url) = &cli.database_url {
            PostgresConfig::from_url(url).context("Invalid DATABASE_URL")
        } else {
            PostgresConfig::from_env().context("DATABASE_URL not set")
        }
    };
    let get_key = || -> Result<AccessKey> {
        cli.store_key
            .clone()
            .map(AccessKey::new)
            .context("CONTENT_STORE_KEY or --store-key required")
    };
    let open_store = || -> Result<PostgresStore> {
        Ok(PostgresStore::new(get_db_config()?, get_key()?)?)
    };

    match cli.command {
        Commands::Serve { bind, identity_header, selection } => {
            let bind_addr = bind.parse().context("Invalid bind address")?;
            // Store problems surface on the first token request, not here
            let mut config =
                ServiceConfig::new(bind_addr, get_db_config().ok(), get_key().ok());
            config.database_id = cli.database_id.clone();
            config.identity_header =
                parse_header_name(&identity_header).map_err(|e| anyhow::anyhow!(e))?;
            config.selection = selection;
            serve(config).await
        }
        Commands::Issue { collection, user, slot, mode, selection } => {
            issue(open_store()?, &cli.database_id, &collection, user, slot, mode, selection).await
        }
        Commands::Collection(CollectionCommands::Add { id }) => {
            let store = open_store()?;
            let link = store.create_collection(&cli.database_id, &id).await?;
            println!("Registered collection {}", link);
            Ok(())
        }
        Commands::Permissions { user } => permissions(open_store()?, &cli.database_id, &user).await,
        Commands::Inspect { token } => inspect(get_key()?, &token),
        Commands::Init => init(open_store()?).await,
        Commands::Status => status(open_store()?).await,
    }
}

async fn serve(config: ServiceConfig) -> Result<()> {
    let state = config.http_state(config.service_store().await);

    info!("Starting content token server...");
    run_http_server(config.bind_addr, state, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn issue(
    store: PostgresStore,
    database_id: &str,
    collection: &str,
    user: Option<String>,
    slot: PermissionSlot,
    mode: PermissionMode,
    selection: SelectionRule,
) -> Result<()> {
    let user_id = user.unwrap_or_else(|| ANONYMOUS_USER_ID.to_string());

    let issuer = TokenIssuer::new(Arc::new(store))
        .with_database_id(database_id)
        .with_selection(selection);

    let token = issuer
        .issue_token(&user_id, collection, slot, mode)
        .await
        .with_context(|| format!("Failed to issue token for {} on {}", user_id, collection))?;

    match token {
        Some(token) => println!("{}", token),
        None => println!("No token: user {} has no permissions", user_id),
    }

    Ok(())
}

async fn permissions(store: PostgresStore, database_id: &str, user_id: &str) -> Result<()> {
    let user = match store.read_user(database_id, user_id).await? {
        UserLookup::Found(user) => user,
        UserLookup::NotFound => {
            println!("User not found: {}", user_id);
            return Ok(());
        }
    };

    let link = user
        .permissions_link
        .unwrap_or_else(|| Locator::permissions_of(&Locator::user(database_id, user_id)));
    let permissions = store.list_permissions(&link).await?;

    println!("User: {}", user_id);
    println!("Permissions:");
    if permissions.is_empty() {
        println!("  (none)");
    } else {
        for perm in permissions {
            println!("  {} {} {}", perm.id, perm.mode, perm.resource_link);
            println!("    {}", perm.token);
        }
    }

    Ok(())
}

fn inspect(key: AccessKey, token: &str) -> Result<()> {
    let claims = ResourceToken::verify(token, &key).context("Invalid token")?;

    println!("User: {}", claims.user_id);
    println!("Slot: {}", claims.permission_id);
    println!("Mode: {}", claims.mode);
    println!("Resource: {}", claims.resource_link);

    Ok(())
}

async fn init(store: PostgresStore) -> Result<()> {
    store.ensure_schema().await?;
    println!("Database schema initialized successfully");
    Ok(())
}

async fn status(store: PostgresStore) -> Result<()> {
    let counts = store.counts().await?;

    println!("Content Tokens Status");
    println!("=====================");
    println!("Database: Connected");
    println!("Collections: {}", counts.collections);
    println!("Users: {}", counts.users);
    println!("Permissions: {}", counts.permissions);

    Ok(())
}
