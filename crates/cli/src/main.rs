//! Marketstall CLI - browse, fill the cart and check out from a terminal.
//!
//! # Usage
//!
//! ```bash
//! # Sign in with a token issued by the marketplace
//! mst session login --user-id 65f0c0ffee --token "$TOKEN" --email an@example.com
//!
//! # Browse and fill the cart
//! mst products list --search lamp
//! mst cart add 65f1deadbeef --quantity 2
//!
//! # Check out with express shipping and a discount code
//! mst checkout --express --discount SAVE10
//!
//! # Complete payment after approving it with the processor
//! mst payment capture 5O190127TN364715T 7E7MGXCWTTKK2
//! ```
//!
//! # Commands
//!
//! - `products` - List, search and show catalog products
//! - `cart` - Show and change the cart
//! - `checkout` - Price the cart, place the order and start payment
//! - `payment` - Capture or confirm an approved payment
//! - `session` - Show, store or clear the signed-in session

#![cfg_attr(not(test), forbid(unsafe_code))]
// Command results are written to the terminal.
#![allow(clippy::print_stdout, clippy::print_stderr)]

use clap::{Args, Parser, Subcommand};
use marketstall_storefront::{SessionStore, Storefront, StorefrontConfig};
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;

#[derive(Parser)]
#[command(name = "mst")]
#[command(author, version, about = "Marketstall command-line storefront")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse the product catalog
    Products {
        #[command(subcommand)]
        action: ProductsAction,
    },
    /// Show and change the cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
    /// Price the cart, place the order and start payment
    Checkout(CheckoutArgs),
    /// Complete an approved payment
    Payment {
        #[command(subcommand)]
        action: PaymentAction,
    },
    /// Manage the signed-in session
    Session {
        #[command(subcommand)]
        action: SessionAction,
    },
}

#[derive(Subcommand)]
enum ProductsAction {
    /// List products, optionally filtered by title
    List {
        /// Case-insensitive title filter
        #[arg(short, long)]
        search: Option<String>,
    },
    /// Show one product
    Show {
        /// Product ID
        id: String,
    },
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart with its subtotal
    Show,
    /// Add a product to the cart
    Add {
        /// Product ID
        id: String,

        /// Number of units
        #[arg(short, long, default_value_t = 1)]
        quantity: i64,
    },
    /// Set a product's quantity
    Update {
        /// Product ID
        id: String,

        /// New quantity (at least 1)
        quantity: i64,
    },
    /// Remove a product from the cart
    Remove {
        /// Product ID
        id: String,
    },
}

/// Options for placing an order.
#[derive(Args)]
pub struct CheckoutArgs {
    /// Use express shipping
    #[arg(long)]
    pub express: bool,

    /// Discount code to apply
    #[arg(short, long)]
    pub discount: Option<String>,

    /// Recipient name (used when no address is stored)
    #[arg(long)]
    pub name: Option<String>,

    /// Phone number, 10-11 digits
    #[arg(long)]
    pub phone: Option<String>,

    /// Street address
    #[arg(long)]
    pub address: Option<String>,

    /// Country
    #[arg(long)]
    pub country: Option<String>,

    /// Replace the stored address with the one given by the flags
    #[arg(long)]
    pub update_address: bool,

    /// Only show the price summary; do not place the order
    #[arg(long)]
    pub dry_run: bool,
}

#[derive(Subcommand)]
enum PaymentAction {
    /// Capture an approved payment
    Capture {
        /// Processor order ID
        order_id: String,

        /// Payer ID returned by the processor
        payer_id: String,
    },
    /// Confirm a payment from the processor's return parameters
    Confirm {
        /// `orderID` query parameter
        order_id: Option<String>,

        /// `PayerID` query parameter
        payer_id: Option<String>,
    },
}

#[derive(Subcommand)]
enum SessionAction {
    /// Show who is signed in
    Show,
    /// Store a session issued by the marketplace
    Login {
        /// User ID
        #[arg(long)]
        user_id: String,

        /// Bearer token
        #[arg(long, env = "MARKETSTALL_TOKEN", hide_env_values = true)]
        token: String,

        /// Full name
        #[arg(short, long)]
        name: Option<String>,

        /// Username
        #[arg(short, long)]
        username: Option<String>,

        /// Email for order confirmations
        #[arg(short, long)]
        email: Option<String>,
    },
    /// Sign out
    Clear,
}

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &StorefrontConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry.dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry
                .environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
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

fn init_tracing() {
    // Defaults to info level for our crates if RUST_LOG is not set
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "marketstall_storefront=info,marketstall_cli=info".into());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    // Configuration is needed before Sentry and tracing exist
    let config = match StorefrontConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {e}");
            std::process::exit(1);
        }
    };

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);
    init_tracing();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli, config).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli, config: StorefrontConfig) -> Result<(), Box<dyn std::error::Error>> {
    let sessions = SessionStore::new(config.session_path.clone());
    let currency = config.currency;

    // Session commands never touch the network
    if let Commands::Session { action } = &cli.command {
        match action {
            SessionAction::Show => commands::session::show(&sessions)?,
            SessionAction::Login {
                user_id,
                token,
                name,
                username,
                email,
            } => commands::session::login(
                &sessions,
                user_id,
                token,
                name.clone(),
                username.clone(),
                email.as_deref(),
            )?,
            SessionAction::Clear => commands::session::clear(&sessions)?,
        }
        return Ok(());
    }

    let storefront = Storefront::new(config)?;
    let session = sessions.load()?;
    if let Some(session) = &session {
        marketstall_storefront::error::set_sentry_user(
            &session.user.id,
            session.user.email.as_ref().map(|e| e.as_str()),
        );
    }

    match cli.command {
        Commands::Products { action } => match action {
            ProductsAction::List { search } => {
                commands::products::list(&storefront, search.as_deref()).await?;
            }
            ProductsAction::Show { id } => commands::products::show(&storefront, &id).await?,
        },
        Commands::Cart { action } => {
            let session = commands::require_session(session.as_ref())?;
            match action {
                CartAction::Show => commands::cart::show(&storefront, session).await?,
                CartAction::Add { id, quantity } => {
                    commands::cart::add(&storefront, session, &id, quantity).await?;
                }
                CartAction::Update { id, quantity } => {
                    commands::cart::update(&storefront, session, &id, quantity).await?;
                }
                CartAction::Remove { id } => {
                    commands::cart::remove(&storefront, session, &id).await?;
                }
            }
        }
        Commands::Checkout(args) => {
            commands::checkout::run(&storefront, session.as_ref(), &args, currency).await?;
        }
        Commands::Payment { action } => match action {
            PaymentAction::Capture { order_id, payer_id } => {
                commands::payment::capture(&storefront, &order_id, &payer_id).await?;
            }
            PaymentAction::Confirm { order_id, payer_id } => {
                commands::payment::confirm(&storefront, order_id.as_deref(), payer_id.as_deref())
                    .await?;
            }
        },
        Commands::Session { .. } => {}
    }
    Ok(())
}
