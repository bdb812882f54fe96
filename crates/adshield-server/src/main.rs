use adshield_feed::CsvFeed;
use adshield_meta::MetaClient;
use adshield_notify::email::DigestMailer;
use adshield_notify::slack::WebhookSender;
use adshield_storage::{CompanyRow, Store};
use anyhow::Result;
use chrono::Utc;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tokio::time::{interval, Duration};
use tracing_subscriber::EnvFilter;

use adshield_server::app;
use adshield_server::config::{self, SeedFile};
use adshield_server::scheduler::{DigestScheduler, SpendScheduler};
use adshield_server::state::AppState;

#[allow(clippy::print_stderr)]
fn print_usage() {
    eprintln!("Usage:");
    eprintln!("  adshield-server [config.toml]                    Start the server");
    eprintln!("  adshield-server seed <config.toml> <seed.json>   Create companies from a seed file");
}

#[tokio::main]
async fn main() -> Result<()> {
    adshield_common::id::init(1, 1);

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("adshield=info".parse()?))
        .init();

    let args: Vec<String> = std::env::args().collect();

    match args.get(1).map(|s| s.as_str()) {
        Some("seed") => {
            let config_path = args.get(2).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("seed requires <config.toml> and <seed.json> arguments")
            })?;
            let seed_path = args.get(3).ok_or_else(|| {
                print_usage();
                anyhow::anyhow!("seed requires <seed.json> argument")
            })?;
            run_seed(config_path, seed_path).await
        }
        Some("--help" | "-h") => {
            print_usage();
            Ok(())
        }
        _ => {
            let config_path = args
                .get(1)
                .map(|s| s.as_str())
                .unwrap_or("config/server.toml");
            run_server(config_path).await
        }
    }
}

/// Create companies (with brands, ad accounts, and digest recipients) from a
/// JSON seed file. Companies whose name already exists are skipped.
async fn run_seed(config_path: &str, seed_path: &str) -> Result<()> {
    let config = config::ServerConfig::load_or_default(config_path)?;
    let store = Store::new(&config.database.url).await?;

    let seed_content = std::fs::read_to_string(seed_path)
        .map_err(|e| anyhow::anyhow!("Failed to read seed file '{}': {}", seed_path, e))?;
    let seed: SeedFile = serde_json::from_str(&seed_content)
        .map_err(|e| anyhow::anyhow!("Failed to parse seed file '{}': {}", seed_path, e))?;

    let existing_names: std::collections::HashSet<String> = store
        .list_all_companies()
        .await?
        .into_iter()
        .map(|c| c.name)
        .collect();

    let mut created = 0u32;
    let mut skipped = 0u32;

    for sc in &seed.companies {
        if existing_names.contains(&sc.name) {
            tracing::warn!(name = %sc.name, "Company already exists, skipping");
            skipped += 1;
            continue;
        }

        let row = CompanyRow {
            id: adshield_common::id::next_id(),
            name: sc.name.clone(),
            timezone: sc.timezone.clone(),
            currency_code: sc.currency_code.to_uppercase(),
            min_severity: sc.min_severity.to_uppercase(),
            quiet_hours_start: sc.quiet_hours_start.clone(),
            quiet_hours_end: sc.quiet_hours_end.clone(),
            digest_hour_local: sc.digest_hour_local,
            slack_webhook_url: sc.slack_webhook_url.clone(),
            summary_webhook_url: sc.summary_webhook_url.clone(),
            brand_webhook_urls: sc.brand_webhook_urls.as_ref().map(|v| v.to_string()),
            daily_meta_cap: sc.daily_meta_cap,
            alerts_csv_url: sc.alerts_csv_url.clone(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let company = match store.insert_company(&row).await {
            Ok(company) => {
                tracing::info!(name = %company.name, id = %company.id, "Company created");
                created += 1;
                company
            }
            Err(e) => {
                tracing::error!(name = %sc.name, error = %e, "Failed to create company");
                continue;
            }
        };

        for email in &sc.users {
            if let Err(e) = store.insert_user(email, Some(&company.id)).await {
                tracing::warn!(email = %email, error = %e, "Failed to create user");
            }
        }

        for sb in &sc.brands {
            let brand = adshield_storage::BrandRow {
                id: adshield_common::id::next_id(),
                company_id: company.id.clone(),
                name: sb.name.clone(),
                currency_code: sb
                    .currency_code
                    .clone()
                    .unwrap_or_else(|| company.currency_code.clone())
                    .to_uppercase(),
                created_at: Utc::now(),
                updated_at: Utc::now(),
            };
            let brand = match store.insert_brand(&brand).await {
                Ok(brand) => brand,
                Err(e) => {
                    tracing::warn!(brand = %sb.name, error = %e, "Failed to create brand");
                    continue;
                }
            };
            for sa in &sb.ad_accounts {
                if let Err(e) = store
                    .attach_ad_account(&brand.id, &sa.provider, &sa.external_id)
                    .await
                {
                    tracing::warn!(
                        brand = %brand.name,
                        external_id = %sa.external_id,
                        error = %e,
                        "Failed to attach ad account"
                    );
                }
            }
        }

        if sc.brands.is_empty() {
            if let Err(e) = store
                .ensure_default_brand(&company.id, &company.name, &company.currency_code)
                .await
            {
                tracing::warn!(name = %company.name, error = %e, "Failed to bootstrap default brand");
            }
        }
    }

    tracing::info!(created, skipped, "seed completed");
    Ok(())
}

async fn run_server(config_path: &str) -> Result<()> {
    let config = config::ServerConfig::load_or_default(config_path)?;

    tracing::info!(
        http_port = config.http_port,
        db = %config.database.redacted_url(),
        "adshield-server starting"
    );

    let store = Arc::new(Store::new(&config.database.url).await?);

    let meta = config.meta.access_token.as_deref().map(|token| {
        Arc::new(MetaClient::with_base_url(token, &config.meta.graph_base_url))
    });
    if meta.is_none() {
        tracing::info!("No Graph API token configured; spend features disabled");
    }

    let mailer = match &config.smtp.host {
        Some(host) => match DigestMailer::new(
            host,
            config.smtp.port,
            config.smtp.username.as_deref(),
            config.smtp.password.as_deref(),
            &config.smtp.from,
        ) {
            Ok(mailer) => Some(Arc::new(mailer)),
            Err(e) => {
                tracing::error!(error = %e, "Failed to build SMTP transport; digest email disabled");
                None
            }
        },
        None => {
            tracing::info!("No SMTP host configured; digest email disabled");
            None
        }
    };

    if config.cron.secret.is_none() {
        tracing::warn!(
            "No cron secret configured. Trigger/admin routes accept only the x-cron header; set [cron].secret for production use."
        );
    }

    let state = AppState {
        store: store.clone(),
        sender: Arc::new(WebhookSender::new()),
        feed: Arc::new(CsvFeed::new()),
        meta,
        mailer,
        config: Arc::new(config.clone()),
        start_time: Utc::now(),
    };

    // HTTP server
    let http_addr: SocketAddr = format!("0.0.0.0:{}", config.http_port).parse()?;
    let app = app::build_http_app(state.clone());
    let http_listener = tokio::net::TcpListener::bind(http_addr).await?;
    let http_server = axum::serve(http_listener, app);

    // Hourly audit-log retention sweep
    let retention_days = config.database.notification_log_retention_days;
    let cleanup_store = store.clone();
    let cleanup_handle = tokio::spawn(async move {
        let mut tick = interval(Duration::from_secs(3600));
        loop {
            tick.tick().await;
            match cleanup_store.cleanup_notification_logs(retention_days).await {
                Ok(removed) if removed > 0 => {
                    tracing::info!(removed, "Cleaned up expired notification logs")
                }
                Err(e) => tracing::error!(error = %e, "Notification log cleanup failed"),
                _ => {}
            }
        }
    });

    let digest_handle = if config.digest.scheduler_enabled {
        let scheduler = DigestScheduler::new(state.clone(), config.digest.tick_secs);
        Some(tokio::spawn(async move { scheduler.run().await }))
    } else {
        tracing::info!("Digest scheduler disabled");
        None
    };

    let spend_handle = if config.spend.scheduler_enabled && state.meta.is_some() {
        let scheduler = SpendScheduler::new(state.clone(), config.spend.tick_secs);
        Some(tokio::spawn(async move { scheduler.run().await }))
    } else {
        tracing::info!("Spend scheduler disabled");
        None
    };

    tracing::info!(http = %http_addr, "Server started");

    tokio::select! {
        result = http_server.with_graceful_shutdown(async { signal::ctrl_c().await.ok(); }) => {
            if let Err(e) = result {
                tracing::error!(error = %e, "HTTP server error");
            }
        }
        _ = signal::ctrl_c() => {
            tracing::info!("Shutting down gracefully");
        }
    }

    cleanup_handle.abort();
    if let Some(h) = digest_handle {
        h.abort();
    }
    if let Some(h) = spend_handle {
        h.abort();
    }
    tracing::info!("Server stopped");

    Ok(())
}
