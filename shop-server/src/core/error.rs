//! 服务器启动/运行错误
//!
//! 请求级别的错误使用 [`crate::utils::AppError`]，这里只覆盖进程级失败。

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error("端口绑定失败 {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    #[error("HTTP 服务异常退出: {0}")]
    Serve(#[source] std::io::Error),

    #[error("内部服务器错误")]
    Internal(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;
