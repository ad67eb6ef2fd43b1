use thiserror::Error;

#[derive(Error, Debug)]
pub enum CatalogAiError {
    #[error("設定エラー: {0}")]
    Config(String),

    #[error("APIキーが設定されていません。`catalog-ai config --set-api-key YOUR_KEY` で設定してください")]
    MissingApiKey,

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("商品が見つかりません: {0}")]
    NoProductsFound(String),

    #[error("API呼び出しエラー: {0}")]
    ApiCall(String),

    #[error("JSON解析エラー: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] catalog_ai_common::Error),

    #[error("CLI実行エラー: {0}")]
    CliExecution(String),

    #[error("処理スレッドエラー: {0}")]
    Worker(String),
}

pub type Result<T> = std::result::Result<T, CatalogAiError>;
