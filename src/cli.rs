use clap::{Parser, Subcommand};

/// tokenmint — scoped, time-bounded access tokens for service accounts
#[derive(Parser)]
#[command(name = "tokenmintd", version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Start the issuance server
    Serve {
        /// Port to bind
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Manage service account tokens
    Token {
        #[command(subcommand)]
        command: TokenCommands,
    },

    /// Mint caller session credentials (operator bootstrap)
    Session {
        #[command(subcommand)]
        command: SessionCommands,
    },
}

#[derive(Subcommand)]
pub enum TokenCommands {
    /// Issue a token for a service account
    Issue {
        /// Service account uid
        #[arg(long)]
        account: String,
        /// Token identifier, unique per account
        #[arg(long)]
        uid: String,
        /// Lifetime in hours
        #[arg(long, default_value = "24")]
        lifetime_hours: i64,
        /// Comma-separated grant names (e.g. "repo:read,repo:push"), or "all"
        #[arg(long, default_value = "all")]
        grants: String,
    },
    /// List tokens for a service account
    List {
        #[arg(long)]
        account: String,
    },
    /// Revoke a token
    Revoke {
        #[arg(long)]
        account: String,
        #[arg(long)]
        uid: String,
    },
}

#[derive(Subcommand)]
pub enum SessionCommands {
    /// Print a signed session credential for a principal
    Issue {
        #[arg(long)]
        principal_id: i64,
        #[arg(long)]
        principal_uid: String,
        /// Lifetime in hours
        #[arg(long, default_value = "8")]
        lifetime_hours: i64,
    },
}
