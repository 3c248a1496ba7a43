//! White Label Shop CLI - Database migrations and management tools.
//!
//! # Usage
//!
//! ```bash
//! # Run database migrations
//! wl-cli migrate
//!
//! # Seed store settings and sample products
//! wl-cli seed
//!
//! # Compute the signature a subscriber should expect for a payload
//! wl-cli webhook sign --secret <hex> --body '{"event":"order.created"}'
//!
//! # Check a signature received by a subscriber
//! wl-cli webhook verify --secret <hex> --signature <hex> --file payload.json
//! ```

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "wl-cli")]
#[command(author, version, about = "White Label Shop CLI tools")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run database migrations
    Migrate,
    /// Seed store settings and sample products
    Seed {
        /// Insert the sample products even if the catalog is not empty
        #[arg(long)]
        force: bool,
    },
    /// Webhook signature tools
    Webhook {
        #[command(subcommand)]
        action: WebhookAction,
    },
}

#[derive(Subcommand)]
enum WebhookAction {
    /// Print the hex HMAC-SHA256 signature of a payload
    Sign {
        /// Subscription secret
        #[arg(short, long)]
        secret: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },
    /// Check a signature against a payload
    Verify {
        /// Subscription secret
        #[arg(short, long)]
        secret: String,

        /// Value of the `X-Webhook-Signature` header
        #[arg(long)]
        signature: String,

        #[command(flatten)]
        payload: PayloadArgs,
    },
}

#[derive(Args)]
#[group(required = true, multiple = false)]
struct PayloadArgs {
    /// Raw request body
    #[arg(short, long)]
    body: Option<String>,

    /// File containing the raw request body
    #[arg(short, long)]
    file: Option<PathBuf>,
}

impl PayloadArgs {
    fn into_source(self) -> commands::webhook::PayloadSource {
        match (self.body, self.file) {
            (Some(body), _) => commands::webhook::PayloadSource::Inline(body),
            (None, Some(path)) => commands::webhook::PayloadSource::File(path),
            (None, None) => commands::webhook::PayloadSource::Inline(String::new()),
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    match cli.command {
        Commands::Migrate => commands::migrate::run().await?,
        Commands::Seed { force } => commands::seed::run(force).await?,
        Commands::Webhook { action } => match action {
            WebhookAction::Sign { secret, payload } => {
                commands::webhook::sign(&secret, &payload.into_source()).await?;
            }
            WebhookAction::Verify {
                secret,
                signature,
                payload,
            } => {
                commands::webhook::verify(&secret, &signature, &payload.into_source()).await?;
            }
        },
    }
    Ok(())
}
