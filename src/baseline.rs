//! Baseline (default language) text store
//!
//! 全てのバックフィル翻訳の元になるテキストを保持します。
//! エンジンが何らかのリクエストを受け付ける前に、レジストリの全キーについて
//! 値が揃っている必要があります。

use std::collections::HashMap;
use std::path::Path;

use serde_json::Value;
use thiserror::Error;

use crate::types::{
    KeyRegistry,
    Locale,
    TranslationKey,
};

/// Baseline の読み込みエラー
#[derive(Error, Debug)]
pub enum BaselineError {
    #[error("Failed to read baseline file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse baseline JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Baseline root must be a JSON object")]
    NotAnObject,
}

/// Baseline locale のテキスト
///
/// 生成後は不変。欠落または空のキーはキー名そのもので埋められるため、
/// `get` が空文字列を返すことはありません。
#[derive(Debug, Clone)]
pub struct Baseline {
    /// Baseline の言語
    locale: Locale,
    /// キー → テキスト
    entries: HashMap<TranslationKey, String>,
}

impl Baseline {
    /// 読み込み済みのテキストから Baseline を作成
    ///
    /// `registry` の全キーに対して必ずエントリを作ります。
    /// `texts` に存在しないキーや空文字列のキーはキー名で代替します。
    #[must_use]
    pub fn new(locale: Locale, registry: &KeyRegistry, texts: &HashMap<String, String>) -> Self {
        let entries = registry
            .iter()
            .map(|key| {
                let text = match texts.get(key.name()) {
                    Some(text) if !text.is_empty() => text.clone(),
                    _ => {
                        tracing::warn!(key = %key, "Baseline text missing, using key name");
                        key.name().to_string()
                    }
                };
                (key.clone(), text)
            })
            .collect();

        Self { locale, entries }
    }

    /// JSON ファイルから Baseline を読み込み、キーレジストリも同時に構築する
    ///
    /// ネストしたオブジェクトは `separator` で平坦化されます。
    ///
    /// # Errors
    /// - ファイル読み込みエラー
    /// - JSON パースエラー
    /// - ルートがオブジェクトでない
    pub fn load_file(
        locale: Locale,
        file_path: &Path,
        separator: &str,
    ) -> Result<(Self, KeyRegistry), BaselineError> {
        tracing::debug!(file = %file_path.display(), locale = %locale, "Loading baseline");

        let content = std::fs::read_to_string(file_path)?;
        let json: Value = serde_json::from_str(&content)?;
        if !json.is_object() {
            return Err(BaselineError::NotAnObject);
        }

        let texts = flatten_json(&json, separator, None);
        let registry = KeyRegistry::from_keys(texts.keys());
        let baseline = Self::new(locale, &registry, &texts);

        tracing::debug!(keys = registry.len(), "Baseline loaded");
        Ok((baseline, registry))
    }

    /// キーの Baseline テキストを取得（未登録キーはキー名）
    #[must_use]
    pub fn get<'a>(&'a self, key: &'a TranslationKey) -> &'a str {
        self.entries.get(key).map_or_else(|| key.name(), String::as_str)
    }

    #[must_use]
    pub const fn locale(&self) -> &Locale {
        &self.locale
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Flatten nested JSON object into a separator-joined key map.
///
/// # Examples
/// ```
/// use serde_json::json;
/// use locale_sync::baseline::flatten_json;
///
/// let json = json!({
///     "common": {
///         "hello": "Hello",
///         "goodbye": "Goodbye"
///     }
/// });
///
/// let flattened = flatten_json(&json, ".", None);
/// assert_eq!(flattened.get("common.hello"), Some(&"Hello".to_string()));
/// assert_eq!(flattened.get("common.goodbye"), Some(&"Goodbye".to_string()));
/// ```
#[must_use]
pub fn flatten_json(
    json: &Value,
    separator: &str,
    prefix: Option<&str>,
) -> HashMap<String, String> {
    let mut result = HashMap::new();
    flatten_json_value(json, separator, prefix, &mut result);
    result
}

/// `flatten_json` の再帰本体
fn flatten_json_value(
    json: &Value,
    separator: &str,
    prefix: Option<&str>,
    result: &mut HashMap<String, String>,
) {
    match json {
        Value::Object(map) => {
            for (key, value) in map {
                let full_key =
                    prefix.map_or_else(|| key.clone(), |p| format!("{p}{separator}{key}"));
                flatten_json_value(value, separator, Some(&full_key), result);
            }
        }
        Value::String(s) => {
            if let Some(key) = prefix {
                result.insert(key.to_string(), s.clone());
            }
        }
        // 配列や数値は UI テキストとして扱わない
        Value::Array(_) | Value::Number(_) | Value::Bool(_) | Value::Null => {
            if let Some(key) = prefix {
                tracing::debug!(key, "Skipping non-string baseline value");
            }
        }
    }
}
