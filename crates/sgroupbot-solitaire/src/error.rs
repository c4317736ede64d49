//! 成语接龙相关的错误类型

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SolitaireError {
    /// 读取词库失败
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// 词库格式错误
    #[error("Dictionary format error: {0}")]
    Json(#[from] serde_json::Error),

    /// 词库中没有任何可以被接上的成语，无法开局
    #[error("Dictionary has no continuable phrase to start a game")]
    NoContinuablePhrase,
}

pub type SolitaireResult<T> = std::result::Result<T, SolitaireError>;
