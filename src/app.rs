/*
 * Responsibility
 * - Parse arguments, load Config, build the client
 * - Send one request through the pipeline and print the outcome
 */
use std::{panic, process, sync::Arc};

use anyhow::{Context, Result};
use clap::Parser;
use reqwest::Method;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::realm::Realm;
use crate::request::RequestDescriptor;
use crate::services::session::{Principal, RealmSessionProvider};
use crate::services::{build_client, navigation::MemoryNavigator};

/// Send one request to the declarations API with dual-realm authorization.
#[derive(Parser, Debug)]
#[command(name = "realm-client", version, about)]
pub struct Args {
    /// HTTP method e.g. GET/POST/PUT
    #[arg(long, default_value = "GET")]
    method: String,

    /// Path relative to API_BASE_URL (e.g. /irpf-declarations/2024/transactions)
    #[arg(long)]
    path: String,

    /// JSON request body
    #[arg(long)]
    json: Option<String>,

    /// Page the request is issued from (login redirects are skipped on login pages)
    #[arg(long, default_value = "/")]
    location: String,

    /// Print only the response body
    #[arg(long, default_value_t = false)]
    quiet: bool,
}

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,realm_client=debug cargo run -- --path /clients
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // Surface panics via tracing so they don't get lost.
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    let args = Args::parse();
    init_tracing();

    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        base_url = %config.api_base_url,
        env = ?config.app_env,
        "starting request"
    );

    let navigator = Arc::new(MemoryNavigator::new(args.location.clone()));
    let client = build_client(&config, navigator.clone())?;

    for realm in [Realm::EndUser, Realm::Backoffice] {
        let provider = client.sessions().provider(realm);
        provider.ready().await;
        match provider.current() {
            Some(principal) => tracing::info!(%realm, uid = %principal.uid(), "session ready"),
            None => tracing::info!(%realm, "signed out"),
        }
    }

    let method = Method::from_bytes(args.method.to_ascii_uppercase().as_bytes())
        .with_context(|| format!("invalid method {:?}", args.method))?;
    let mut request = RequestDescriptor::new(method, args.path);
    if let Some(raw) = args.json.as_deref() {
        let body: serde_json::Value =
            serde_json::from_str(raw).context("--json is not valid JSON")?;
        request = request.json(&body)?;
    }

    match client.execute(request).await {
        Ok(response) => {
            if !args.quiet {
                println!("status: {}", response.status);
            }
            println!("{}", response.text());
            Ok(())
        }
        Err(err) => {
            if let Some(body) = err.body_text().filter(|b| !b.is_empty()) {
                eprintln!("{body}");
            }
            if let Some(target) = navigator.history().last() {
                eprintln!("redirected to {target}");
            }
            Err(err.into())
        }
    }
}
