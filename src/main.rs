// src/main.rs

//! # Coupon Issuer - Command Line Driver
//!
//! Thin wrapper around the `coupon_issuer` library that reads files and
//! environment, and turns typed errors into exit codes.
//!
//! ## Commands
//! - `keygen`: generate an issuer key and print its address
//! - `issue`: sign coupons for an allow-list and write the distribution JSON
//! - `verify`: check one actor's coupon from a distribution JSON
//!
//! ## Environment Variables
//! - `COUPON_SIGNER_PRIVATE_KEY`: issuer private key (required for `issue`)
//! - `COUPON_COUPON_CLASS`: default class, number or name (default: Presale)
//! - `COUPON_WORKERS`: signing workers (default: available CPUs)
//! - `COUPON_ISSUER_ADDRESS`: trusted issuer for `verify` (default: derived from key)

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use coupon_issuer::services::coupon_issuer::parse_allow_list;
use coupon_issuer::settings::Settings;
use coupon_issuer::utils::serialization::{distribution_json, parse_distribution};
use coupon_issuer::{ActorIdentifier, CouponClass, CouponIssuer, CouponPayload, IssuerKey, PhasePolicy, Verdict, Verifier};
use dotenv::dotenv;
use log::info;
use serde_json::json;
use std::path::PathBuf;

/// Issue and check signed allow-list coupons.
#[derive(Parser, Debug)]
#[command(name = "coupon-issuer", version, about, long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Generate a fresh issuer key
    Keygen,

    /// Sign one coupon per allow-listed actor
    Issue {
        /// File with one actor identifier per line
        #[arg(long)]
        actors: PathBuf,

        /// Coupon class (0/1/2 or Genesis/Author/Presale)
        #[arg(long)]
        class: Option<String>,

        /// Where to write the distribution JSON (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Check the coupon distributed to one actor
    Verify {
        /// Distribution JSON produced by `issue`
        #[arg(long)]
        coupons: PathBuf,

        /// Actor presenting the coupon
        #[arg(long)]
        actor: String,

        /// Coupon class (0/1/2 or Genesis/Author/Presale)
        #[arg(long)]
        class: Option<String>,

        /// Trusted issuer address (overrides configuration)
        #[arg(long)]
        issuer: Option<String>,
    },
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose { "coupon_issuer=debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();
}

fn resolve_class(flag: Option<&str>, settings: &Settings) -> Result<CouponClass> {
    match flag {
        Some(text) => text.parse().context("invalid --class"),
        None => settings.coupon_class().map_err(Into::into),
    }
}

/// Main application entry point
///
/// # Initialization Sequence
/// 1. Load `.env` and configuration
/// 2. Initialize logging
/// 3. Dispatch the subcommand
#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Commands::Keygen => {
            let key = IssuerKey::generate();
            let output = json!({
                "signerAddress": key.identity().to_checksum(),
                "privateKey": key.secret_hex(),
            });
            println!("{}", serde_json::to_string_pretty(&output)?);
        }

        Commands::Issue { actors, class, output } => {
            let settings = Settings::load(cli.config.as_deref())?;
            let class = resolve_class(class.as_deref(), &settings)?;
            let issuer = CouponIssuer::new(settings.issuer_config()?);

            let text = std::fs::read_to_string(&actors)
                .with_context(|| format!("failed to read allow-list {}", actors.display()))?;
            let allow_list = parse_allow_list(&text);

            let book = issuer.issue_all_concurrent(&allow_list, class).await?;
            let document = distribution_json(&book)?;

            match output {
                Some(path) => {
                    std::fs::write(&path, document)
                        .with_context(|| format!("failed to write {}", path.display()))?;
                    info!("wrote {} coupons to {}", book.len(), path.display());
                }
                None => println!("{}", document),
            }
        }

        Commands::Verify { coupons, actor, class, issuer } => {
            let mut settings = Settings::load(cli.config.as_deref())?;
            if issuer.is_some() {
                settings.issuer_address = issuer;
            }
            let class = resolve_class(class.as_deref(), &settings)?;
            let actor = ActorIdentifier::parse(&actor)?;

            let text = std::fs::read_to_string(&coupons)
                .with_context(|| format!("failed to read {}", coupons.display()))?;
            let book = parse_distribution(&text)?;
            let coupon = book
                .get(&actor)
                .with_context(|| format!("no coupon for {} in {}", actor.to_checksum(), coupons.display()))?;

            let verifier = Verifier::new(settings.verifier_config()?, PhasePolicy::with_active([class]));
            let payload = CouponPayload::new(class, actor);
            match verifier.verify(&payload, coupon)? {
                Verdict::Granted => println!("granted: {} coupon for {}", class, actor.to_checksum()),
                Verdict::Denied(reason) => bail!("denied: {:?}", reason),
            }
        }
    }

    Ok(())
}
