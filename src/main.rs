//! Entry point: switches through the locales given on the command line and
//! logs every resulting text.

use std::sync::Arc;

use locale_sync::LocaleSync;
use locale_sync::config::ConfigManager;
use locale_sync::error::InitError;
use locale_sync::store::JsonFileStore;
use locale_sync::translator::PseudoTranslator;
use locale_sync::types::Locale;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), InitError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let workspace_root = std::env::current_dir().map_err(locale_sync::config::ConfigError::from)?;
    let mut config_manager = ConfigManager::new();
    config_manager.load_settings(Some(workspace_root))?;

    let store_dir = config_manager.resolve_path(&config_manager.get_settings().store_dir);
    let engine = LocaleSync::from_settings(
        &config_manager,
        Arc::new(JsonFileStore::new(store_dir)),
        Arc::new(PseudoTranslator),
    )?;

    engine.subscribe(|locale| tracing::info!(locale = %locale, "Locale changed"));

    for code in std::env::args().skip(1) {
        engine.set_locale(Locale::new(code.clone(), code)).await;
        engine.settle().await;

        for key in engine.registry().iter() {
            tracing::info!(key = %key, text = %engine.get(key).value());
        }
    }

    engine.shutdown();
    engine.settle().await;
    Ok(())
}
