use std::sync::Arc;

use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use fetchbot::cleanup::CleanupQueue;
use fetchbot::config::Config;
use fetchbot::engines::EngineSet;
use fetchbot::notify::TelegramNotifier;
use fetchbot::pipeline::Pipeline;
use fetchbot::queue::Scheduler;
use fetchbot::server::{self, AppState};
use fetchbot::store::JobStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let config = Config::from_env();
    if config.bot_token.is_empty() || config.chat_id.is_empty() {
        warn!("TELEGRAM_BOT_TOKEN / TELEGRAM_CHAT_ID not set; deliveries will fail");
    }

    std::fs::create_dir_all(&config.output_dir).expect("cannot create output directory");
    info!(
        dir = %config.output_dir.display(),
        concurrency = config.max_concurrent,
        "starting"
    );

    let store = Arc::new(JobStore::new());
    let notifier = Arc::new(TelegramNotifier::new(
        config.bot_token.clone(),
        config.chat_id.clone(),
    ));
    let cleanup = CleanupQueue::new(store.clone(), config.cleanup_minutes);
    let engines = EngineSet::from_config(&config, store.clone());
    let pipeline = Arc::new(Pipeline::new(store.clone(), engines, notifier, cleanup));
    let scheduler = Scheduler::new(config.max_concurrent, pipeline);

    let state = AppState { store, scheduler };
    server::serve(state, config.port)
        .await
        .expect("server failed");
}
