//! Offline pseudo-localization.

use async_trait::async_trait;

use super::{
    TranslationError,
    TranslationService,
};
use crate::types::Locale;

/// Renders `"[code] text"` without contacting any service.
///
/// Useful for spotting untranslated UI text and for running the engine
/// without network access.
#[derive(Debug, Clone, Copy, Default)]
pub struct PseudoTranslator;

#[async_trait]
impl TranslationService for PseudoTranslator {
    async fn translate(
        &self,
        text: &str,
        from: &Locale,
        to: &Locale,
    ) -> Result<String, TranslationError> {
        if from == to {
            return Err(TranslationError::UnsupportedLocale(to.code.clone()));
        }
        Ok(format!("[{}] {text}", to.code))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use googletest::prelude::*;

    use super::*;

    #[tokio::test]
    async fn prefixes_target_code() {
        let result = PseudoTranslator
            .translate("Hello", &Locale::new("en", "English"), &Locale::new("fr", "French"))
            .await;

        assert_that!(result, ok(eq("[fr] Hello")));
    }

    #[tokio::test]
    async fn rejects_same_locale() {
        let english = Locale::new("en", "English");

        let result = PseudoTranslator.translate("Hello", &english, &english).await;

        assert_eq!(result, Err(TranslationError::UnsupportedLocale("en".to_string())));
    }
}
