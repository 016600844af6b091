//! Machine translation service consumed by backfill.

mod pseudo;

use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

pub use pseudo::PseudoTranslator;

use crate::types::Locale;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("Translation service unavailable: {0}")]
    Unavailable(String),

    #[error("Unsupported target locale: {0}")]
    UnsupportedLocale(String),

    #[error("Translation timed out after {0:?}")]
    Timeout(Duration),
}

/// Translates baseline text into another locale.
///
/// The engine imposes no retry policy; a failure leaves the baseline text on
/// screen.
#[async_trait]
pub trait TranslationService: Send + Sync {
    async fn translate(
        &self,
        text: &str,
        from: &Locale,
        to: &Locale,
    ) -> Result<String, TranslationError>;
}
