//! Apex CLI - command-line front-end for the Apex storefront.
//!
//! # Usage
//!
//! ```bash
//! # Log in (password from the flag or APEX_PASSWORD)
//! apex login -e ada@example.com -p secret123
//!
//! # Create an account
//! apex register --first-name Ada --last-name Lovelace -e ada@example.com -p secret123
//!
//! # Show the header for the current session
//! apex whoami
//!
//! # Add a product to the cart and list it
//! apex cart add --id 42 --name "Coffee Mug" --price 12.50 --quantity 2
//! apex cart list
//!
//! # Forget the current user and the backend session cookie
//! apex logout
//! ```
//!
//! # Commands
//!
//! - `login` / `register` - Submit the auth forms
//! - `logout` - Clear the user and stored cookies
//! - `whoami` - Print the header greeting and cart badge
//! - `cart add` / `cart list` - Manage the locally persisted cart

#![cfg_attr(not(test), forbid(unsafe_code))]

use apex_core::Price;
use apex_storefront::config::StorefrontConfig;
use apex_storefront::state::Storefront;
use clap::{Parser, Subcommand};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

use commands::CommandError;

#[derive(Parser)]
#[command(name = "apex")]
#[command(author, version, about = "Apex storefront CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Log in with email and password
    Login {
        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "APEX_PASSWORD", hide_env_values = true)]
        password: String,
    },
    /// Create a new account
    Register {
        /// Given name
        #[arg(long)]
        first_name: String,

        /// Family name
        #[arg(long)]
        last_name: String,

        /// Account email address
        #[arg(short, long)]
        email: String,

        /// Account password
        #[arg(short, long, env = "APEX_PASSWORD", hide_env_values = true)]
        password: String,

        /// Password confirmation (defaults to the password)
        #[arg(long, env = "APEX_CONFIRM_PASSWORD", hide_env_values = true)]
        confirm_password: Option<String>,
    },
    /// Forget the current user and the backend session
    Logout,
    /// Show who is logged in and the cart badge
    Whoami,
    /// Manage the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Append a line to the cart
    Add {
        /// Product identifier
        #[arg(long)]
        id: String,

        /// Product name
        #[arg(long)]
        name: String,

        /// Unit price (e.g. `12.50` or `$12.50`)
        #[arg(long)]
        price: Price,

        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// List the cart lines and subtotal
    List,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::debug!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

#[tokio::main]
async fn main() {
    // Load .env before parsing so clap's `env` fallbacks see it
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    let config = StorefrontConfig::from_env();

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = config.as_ref().ok().and_then(init_sentry);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "apex_storefront=info,apex_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let result = match config {
        Ok(config) => run(cli, config).await,
        Err(e) => Err(CommandError::from(apex_storefront::error::AppError::from(e))),
    };

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), CommandError> {
    let storefront = Storefront::start(config).await?;

    match cli.command {
        Commands::Login { email, password } => {
            commands::auth::login(&storefront, email, password).await?;
        }
        Commands::Register {
            first_name,
            last_name,
            email,
            password,
            confirm_password,
        } => {
            let confirm_password = confirm_password.unwrap_or_else(|| password.clone());
            commands::auth::register(
                &storefront,
                commands::auth::Registration {
                    first_name,
                    last_name,
                    email,
                    password,
                    confirm_password,
                },
            )
            .await?;
        }
        Commands::Logout => commands::auth::logout(&storefront),
        Commands::Whoami => commands::auth::whoami(&storefront),
        Commands::Cart { action } => match action {
            CartAction::Add {
                id,
                name,
                price,
                quantity,
            } => commands::cart::add(&storefront, id, name, price, quantity)?,
            CartAction::List => commands::cart::list(&storefront),
        },
    }
    Ok(())
}
