//! locale-sync
//!
//! 言語切り替えをまたいで UI 向けの翻訳テキストキャッシュを一貫した状態に保ち、
//! 欠けている翻訳をバックグラウンドで機械翻訳サービスから補完するエンジン

pub mod baseline;
pub mod cache;
pub mod config;
pub mod engine;
pub mod error;
pub mod observable;
pub mod store;
pub mod translator;
pub mod types;

#[cfg(test)]
mod test_utils;

// エンジンを再エクスポート
pub use engine::LocaleSync;
