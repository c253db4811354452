use std::sync::Arc;

use tracing::{debug, error, info, warn};

use imgbot_core::{bot::ImageBot, config::Config, messaging::port::MessagingPort};
use imgbot_hf::HfInferenceClient;
use imgbot_telegram::TelegramMessenger;

mod server;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    imgbot_core::logging::init("imgbot")?;

    let cfg = Arc::new(Config::load()?);
    debug!("loaded {cfg:?}");

    let messenger = Arc::new(TelegramMessenger::from_token(
        cfg.telegram_bot_token.clone(),
    ));
    let inference = Arc::new(HfInferenceClient::from_config(&cfg)?);
    let bot = Arc::new(ImageBot::new(&cfg, messenger.clone(), inference));

    if cfg.skip_webhook_registration {
        info!("Skipping webhook registration");
    } else if let Err(e) = messenger.set_webhook(&cfg.webhook_url()).await {
        // The server stays useful with a webhook registered out of band.
        error!("Failed to set webhook: {e}");
    }

    let bot_username = match messenger.username().await {
        Ok(name) => {
            info!("Running as @{name}");
            Some(name)
        }
        Err(e) => {
            warn!("Could not fetch bot username, accepting commands for any bot: {e}");
            None
        }
    };

    server::serve(&cfg, bot, bot_username).await
}
