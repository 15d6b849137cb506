//! EazyBuy CLI - browse the catalog and manage a cart from the terminal.
//!
//! # Usage
//!
//! ```bash
//! # Browse products
//! eazybuy products list --search watch --sort price_asc
//! eazybuy products show 3
//!
//! # Load the sample catalog into a fresh shop
//! eazybuy products seed
//!
//! # Work with the cart
//! eazybuy cart add 3 --quantity 2
//! eazybuy cart update 3 5
//! eazybuy cart show
//! eazybuy cart clear
//! ```
//!
//! The cart session (token and API cookie) is kept in a JSON state file so
//! consecutive invocations share one cart.
//!
//! # Environment Variables
//!
//! - `EAZYBUY_API_URL` - API root (default `http://localhost:8000/api`)
//! - `EAZYBUY_API_TOKEN` - optional API token
//! - `EAZYBUY_STATE_FILE` - session state file (default `.eazybuy-session.json`)
//! - `RUST_LOG` - log filter (logs go to stderr)

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use eazybuy_core::{ProductId, ProductSort};
use eazybuy_storefront::config::{ApiConfig, parse_api_url};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "eazybuy")]
#[command(author, version, about = "EazyBuy shop and cart client")]
struct Cli {
    /// API root, overriding `EAZYBUY_API_URL`
    #[arg(long, global = true)]
    api_url: Option<String>,

    /// File holding the cart session between runs
    #[arg(
        long,
        global = true,
        env = "EAZYBUY_STATE_FILE",
        default_value = ".eazybuy-session.json"
    )]
    state: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Browse and seed the catalog
    Products {
        #[command(subcommand)]
        action: ProductAction,
    },
    /// Manage the session cart
    Cart {
        #[command(subcommand)]
        action: CartAction,
    },
}

#[derive(Subcommand)]
enum ProductAction {
    /// List products
    List {
        /// Case-insensitive name search
        #[arg(short, long)]
        search: Option<String>,

        /// Sort order (`newest`, `price_asc`, `price_desc`, `name`)
        #[arg(long, default_value = "newest")]
        sort: ProductSort,
    },
    /// Show one product
    Show {
        /// Product ID
        id: ProductId,
    },
    /// List the featured selection
    Popular,
    /// Create the sample catalog (existing names are skipped)
    Seed,
}

#[derive(Subcommand)]
enum CartAction {
    /// Show the cart
    Show,
    /// Add units of a product
    Add {
        /// Product ID
        product_id: ProductId,

        /// Units to add (at least 1)
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Set the quantity of a line (values below 1 become 1)
    Update {
        /// Product ID
        product_id: ProductId,

        /// New quantity
        #[arg(allow_negative_numbers = true)]
        quantity: i64,
    },
    /// Remove a product's line
    Remove {
        /// Product ID
        product_id: ProductId,
    },
    /// Empty the cart
    Clear,
    /// Print the number of units in the cart
    Count,
}

#[tokio::main]
async fn main() {
    // Load .env before clap reads env-backed arguments
    dotenvy::dotenv().ok();

    // Logs go to stderr so command output stays pipeable
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "eazybuy=warn,eazybuy_storefront=warn".into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result: Result<(), Box<dyn std::error::Error>> = run(cli).await;

    if let Err(e) = result {
        tracing::error!("Command failed: {e}");
        output::failure(&e.to_string());
        std::process::exit(1);
    }
}

fn api_config(api_url: Option<&str>) -> Result<ApiConfig, Box<dyn std::error::Error>> {
    let mut config = ApiConfig::from_env()?;
    if let Some(url) = api_url {
        config.base_url = parse_api_url(url).map_err(|e| format!("Invalid --api-url: {e}"))?;
    }
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let config = api_config(cli.api_url.as_deref())?;

    match cli.command {
        Commands::Products { action } => match action {
            ProductAction::List { search, sort } => {
                commands::products::list(&config, search, sort).await?;
            }
            ProductAction::Show { id } => commands::products::show(&config, id).await?,
            ProductAction::Popular => commands::products::popular(&config).await?,
            ProductAction::Seed => commands::products::seed(&config).await?,
        },
        Commands::Cart { action } => {
            let cart = commands::cart::CartCommand::new(&config, &cli.state);
            match action {
                CartAction::Show => cart.show().await?,
                CartAction::Add {
                    product_id,
                    quantity,
                } => cart.add(product_id, quantity).await?,
                CartAction::Update {
                    product_id,
                    quantity,
                } => cart.update(product_id, quantity).await?,
                CartAction::Remove { product_id } => cart.remove(product_id).await?,
                CartAction::Clear => cart.clear().await?,
                CartAction::Count => cart.count().await?,
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_cart_update_allows_zero_and_negative() {
        let cli = Cli::try_parse_from(["eazybuy", "cart", "update", "3", "-2"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Cart {
                action: CartAction::Update { quantity: -2, .. }
            }
        ));
    }

    #[test]
    fn test_parse_product_sort() {
        let cli = Cli::try_parse_from(["eazybuy", "products", "list", "--sort", "price_desc"])
            .unwrap_or_else(|e| panic!("{e}"));
        assert!(matches!(
            cli.command,
            Commands::Products {
                action: ProductAction::List {
                    sort: ProductSort::PriceDesc,
                    ..
                }
            }
        ));

        assert!(Cli::try_parse_from(["eazybuy", "products", "list", "--sort", "bogus"]).is_err());
    }

    #[test]
    fn test_api_url_override() {
        let config = api_config(Some("https://shop.example.com/api")).unwrap_or_else(|e| panic!("{e}"));
        assert_eq!(config.base_url.as_str(), "https://shop.example.com/api/");

        assert!(api_config(Some("ftp://shop.example.com")).is_err());
    }
}
