//! DUB Session Client
//!
//! 터미널에서 세션 하나를 돌림:
//! connect → 상태 로그 → (Ctrl-C) → disconnect
//!
//! ```text
//! DUB_USER_ID=user_... cargo run --bin dub-client -- telegram desktop
//! ```
//!
//! 인자로 준 태스크(extension / telegram / desktop)는 연결 직후 완료 처리

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use dub_share_api::{
    services::{HttpAccountClient, HttpMiningClient, SessionController, TASKS},
    ClientConfig,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| "dub_share_api=info,dub_client=info".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ClientConfig::from_env()?;
    tracing::info!("📋 Mining server: {}", config.mining_api_url);

    let mining = Arc::new(HttpMiningClient::new(&config.mining_api_url));

    let controller = match &config.user_id {
        Some(user_id) => {
            let accounts = Arc::new(HttpAccountClient::new(&config.account_api_url));
            SessionController::with_sync(
                mining,
                config.poll_settings(),
                accounts,
                user_id,
                config.sync_interval,
            )
            .await?
        }
        None => {
            tracing::warn!("DUB_USER_ID not set, earnings will not be synced");
            SessionController::new(mining, config.poll_settings())
        }
    };

    // 상태 변경 로그
    let mut updates = controller.subscribe();
    tokio::spawn(async move {
        while updates.changed().await.is_ok() {
            let state = updates.borrow_and_update().clone();
            tracing::info!(
                "[{}] {} | {}",
                state.connection_label(),
                state.earnings_display(),
                state.status_text
            );
            if let Some(message) = &state.message {
                tracing::warn!("{}", message);
            }
        }
    });

    controller.connect().await?;

    for task in std::env::args().skip(1) {
        if !TASKS.contains(&task.as_str()) {
            tracing::warn!("Unknown task '{}', expected one of {:?}", task, TASKS);
            continue;
        }
        match controller.complete_task(&task).await {
            Ok(Some(message)) => tracing::info!("🎁 {}", message),
            Ok(None) => {}
            Err(err) => tracing::warn!("Task '{}' failed: {}", task, err),
        }
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutting down");

    if let Err(err) = controller.disconnect().await {
        tracing::warn!("Disconnect request failed: {}", err);
    }

    if let Some(ledger) = controller.ledger().await {
        tracing::info!(
            "💰 Total earnings {:.2} $DUB, {:.1} MB shared",
            ledger.earnings(),
            ledger.bandwidth_shared()
        );
    }

    Ok(())
}
