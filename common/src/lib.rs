//! Catalog AI Common Library
//!
//! CLIとパイプラインで共有される型・価格計算・AIレスポンス検証

pub mod types;
pub mod categories;
pub mod error;
pub mod prompts;
pub mod parser;
pub mod pricing;
pub mod heuristic;
pub mod assembler;

pub use types::{EnrichmentResult, PriceBreakdown, ProcessedProduct, RawProductRecord, RunStats, EnrichmentSource};
pub use categories::{CategoryRateTables, PRODUCT_CATEGORIES, DEFAULT_CATEGORY, LICENSED_CATEGORY};
pub use error::{Error, Result};
pub use prompts::{ProductSummary, build_single_prompt, build_batch_prompt, batch_max_tokens, MAX_OUTPUT_TOKENS};
pub use parser::{strip_code_fence, parse_single_response, parse_batch_response, BatchParse, RejectedEntry, REQUIRED_FIELDS};
pub use pricing::{compute_prices, extract_max_price, normalize_pack_size};
pub use heuristic::heuristic_enrichment;
pub use assembler::{assemble_product, decide_category, upgrade_image_url, AssemblyError, CategoryDecision};
