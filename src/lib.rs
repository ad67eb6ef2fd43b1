//! catalog-ai-rust
//!
//! 卸売カタログの商品レコードをAIで補完し、価格内訳を付けて出力する。

pub mod ai_provider;
pub mod cli;
pub mod config;
pub mod enricher;
pub mod error;
pub mod loader;
pub mod output;
pub mod pipeline;
pub mod rates;
