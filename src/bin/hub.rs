use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use netwatch::{
    actors::monitor::MonitorContext,
    channel::{ConnectionState, WebhookChannel},
    clock::SystemClock,
    config::{Config, read_config_file},
    cooldown::CooldownTracker,
    dispatcher::NotificationDispatcher,
    registry::{DEFAULT_DASHBOARD_TIMEOUT, MonitorRegistry},
    util::{get_broadcast_delay_ms, get_log_level},
};
use tracing::{debug, error, info, trace, warn};
use tracing_subscriber::{filter, layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Clone, Parser)]
struct Args {
    /// Config file
    #[arg(short)]
    file: String,
}

fn init() {
    let level = get_log_level();
    let filter = filter::Targets::new().with_targets(vec![
        ("netwatch", level),
        ("netwatch_hub", level),
        ("tower_http", level),
    ]);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .compact()
                .with_ansi(false),
        )
        .with(filter)
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    init();
    let args = Args::parse();
    trace!("started with args: {args:?}");

    let config = read_config_file(&args.file)?;

    let (dispatcher, webhook) = notification_stack(&config).await?;

    let dashboard_timeout = config
        .api
        .as_ref()
        .map_or(DEFAULT_DASHBOARD_TIMEOUT, |api| {
            Duration::from_secs(api.dashboard_timeout_secs)
        });

    let registry = Arc::new(
        MonitorRegistry::new(MonitorContext {
            cooldown: Arc::new(CooldownTracker::new()),
            dispatcher,
            clock: Arc::new(SystemClock),
        })
        .with_dashboard_timeout(dashboard_timeout),
    );

    register_targets(&config, &registry).await;

    #[cfg(feature = "api")]
    spawn_api(&config, registry.clone()).await?;

    tokio::signal::ctrl_c().await?;
    info!("shutting down");

    registry.stop_all().await;
    registry.shutdown_all().await;
    if let Some(webhook) = webhook {
        webhook.disconnect();
    }

    Ok(())
}

async fn notification_stack(
    config: &Config,
) -> anyhow::Result<(Option<NotificationDispatcher>, Option<Arc<WebhookChannel>>)> {
    let Some(notification) = &config.notification else {
        warn!("no notification channel configured, alerts will only be logged");
        return Ok((None, None));
    };

    let webhook = Arc::new(WebhookChannel::new(&notification.webhook)?);

    match webhook.connect().await {
        ConnectionState::Ready => info!("notification channel ready"),
        state => warn!("notification channel is not ready ({state}), alerts will fail until it is"),
    }

    let delay = Duration::from_millis(get_broadcast_delay_ms(notification.broadcast_delay_ms));
    debug!("inter-message delay: {}ms", delay.as_millis());

    let dispatcher = NotificationDispatcher::new(webhook.clone(), Arc::new(SystemClock), delay);

    Ok((Some(dispatcher), Some(webhook)))
}

async fn register_targets(config: &Config, registry: &MonitorRegistry) {
    for target in &config.targets {
        let (resolved, collector) = match target.resolve() {
            Ok(resolved) => resolved,
            Err(e) => {
                error!("skipping target: {e}");
                continue;
            }
        };

        let autostart = resolved.autostart;
        let handle = match registry.register(resolved, collector).await {
            Ok(handle) => handle,
            Err(e) => {
                error!("{e}");
                continue;
            }
        };

        if autostart {
            if let Err(e) = handle.start().await {
                error!("cannot start {}: {e}", handle.target_id());
            }
        }
    }

    info!("{} target(s) registered", registry.targets().await.len());
}

#[cfg(feature = "api")]
async fn spawn_api(config: &Config, registry: Arc<MonitorRegistry>) -> anyhow::Result<()> {
    use netwatch::{
        api::{ApiConfig, ApiState, spawn_api_server},
        util::{get_api_addr, get_api_port, get_api_token},
    };
    use std::net::SocketAddr;

    let settings = config.api.as_ref();
    let addr = get_api_addr(settings.and_then(|api| api.addr));
    let port = get_api_port(settings.and_then(|api| api.port));
    let token = get_api_token(settings.and_then(|api| api.token.clone()));

    if token.is_none() {
        warn!("API token not set, endpoints are unauthenticated");
    }

    spawn_api_server(
        ApiConfig {
            bind_addr: SocketAddr::new(addr, port),
            auth_token: token,
            enable_cors: true,
        },
        ApiState::new(registry),
    )
    .await?;

    Ok(())
}
