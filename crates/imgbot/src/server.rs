//! Webhook HTTP server.

use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, State},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use teloxide::types::Update;
use tracing::{debug, error, info, warn};

use imgbot_core::{bot::ImageBot, config::Config, config::WEBHOOK_PATH};

pub const HEALTH_BODY: &str = "Bot is running";
pub const ACK_BODY: &str = "OK";

#[derive(Clone)]
pub(crate) struct AppState {
    bot: Arc<ImageBot>,
    /// Acknowledge before the flow finishes instead of after.
    async_dispatch: bool,
    /// Our `@username`; commands addressed to other bots are skipped.
    bot_username: Option<String>,
}

impl AppState {
    pub(crate) fn new(
        bot: Arc<ImageBot>,
        async_dispatch: bool,
        bot_username: Option<String>,
    ) -> Self {
        Self {
            bot,
            async_dispatch,
            bot_username,
        }
    }
}

pub(crate) fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(health_handler))
        .route(WEBHOOK_PATH, post(webhook_handler))
        .with_state(state)
}

async fn health_handler() -> &'static str {
    HEALTH_BODY
}

async fn webhook_handler(
    State(state): State<AppState>,
    payload: Result<Json<Update>, JsonRejection>,
) -> Response {
    let update = match payload {
        Ok(Json(update)) => update,
        Err(rejection) => {
            warn!("rejected webhook payload: {rejection}");
            return rejection.into_response();
        }
    };

    let Some(incoming) = imgbot_telegram::to_incoming(&update, state.bot_username.as_deref())
    else {
        debug!(update_id = update.id, "ignoring update");
        return ACK_BODY.into_response();
    };

    // Both replies of one update are sent from the same task, so their order
    // holds in either mode.
    let bot = state.bot.clone();
    let run = async move {
        let chat_id = incoming.chat_id().0;
        if let Err(e) = bot.handle(incoming).await {
            error!(chat_id, "failed to handle update: {e}");
        }
    };

    if state.async_dispatch {
        tokio::spawn(run);
    } else {
        run.await;
    }

    ACK_BODY.into_response()
}

pub async fn serve(
    cfg: &Config,
    bot: Arc<ImageBot>,
    bot_username: Option<String>,
) -> anyhow::Result<()> {
    let app = create_router(AppState::new(bot, cfg.webhook_async, bot_username));

    let addr = cfg.socket_addr()?;
    info!("Starting server on http://{addr}");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("failed to listen for ctrl-c: {e}");
        std::future::pending::<()>().await;
    }
}
