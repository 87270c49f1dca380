//! CLI command definitions

use clap::{Parser, Subcommand};
use content_tokens::auth::{PermissionMode, PermissionSlot};
use content_tokens::issuer::SelectionRule;
use content_tokens::storage::DEFAULT_DATABASE_ID;

#[derive(Parser)]
#[command(name = "content-tokens")]
#[command(about = "Scoped access tokens for content collections", long_about = None)]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Database URL (store endpoint)
    #[arg(long, env = "DATABASE_URL", global = true)]
    pub database_url: Option<String>,

    /// Store access key, used to sign and verify tokens
    #[arg(long, env = "CONTENT_STORE_KEY", global = true, hide_env_values = true)]
    pub store_key: Option<String>,

    /// Database namespace for collections and users
    #[arg(long, env = "CONTENT_DATABASE_ID", default_value = DEFAULT_DATABASE_ID, global = true)]
    pub database_id: String,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run the token HTTP server in the foreground
    Serve {
        /// Address to bind to
        #[arg(short, long, default_value = "0.0.0.0:8080", env = "CONTENT_TOKENS_BIND")]
        bind: String,

        /// Header carrying the verified user id
        #[arg(long, default_value = "x-authenticated-user", env = "CONTENT_IDENTITY_HEADER")]
        identity_header: String,

        /// Token selection rule: first or matching-slot
        #[arg(long, default_value = "first", env = "CONTENT_SELECTION")]
        selection: SelectionRule,
    },

    /// Issue (or fetch) a token, provisioning the user on first use
    ///
    /// Examples:
    ///   content-tokens issue articles --slot anonymous_read
    ///   content-tokens issue articles --user sid:123 --slot user_write --mode all
    Issue {
        /// Collection to scope the token to
        collection: String,

        /// User id (defaults to the anonymous user)
        #[arg(long)]
        user: Option<String>,

        /// Permission slot: anonymous_read, user_read, or user_write
        #[arg(long)]
        slot: PermissionSlot,

        /// Access mode used if the permission is created: read or all
        #[arg(long, default_value = "read")]
        mode: PermissionMode,

        /// Token selection rule: first or matching-slot
        #[arg(long, default_value = "first")]
        selection: SelectionRule,
    },

    /// Manage collections
    #[command(subcommand)]
    Collection(CollectionCommands),

    /// List a user's permissions and tokens
    Permissions {
        /// User id
        user: String,
    },

    /// Verify a token against the store key and show what it grants
    Inspect {
        /// Resource token (res-xxx)
        token: String,
    },

    /// Initialize the database schema
    Init,

    /// Show database status
    Status,
}

#[derive(Subcommand)]
pub enum CollectionCommands {
    /// Register a collection tokens can be issued for
    Add {
        /// Collection id
        id: String,
    },
}
