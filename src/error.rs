//! # 统一错误处理模块
//!
//! 定义 ppeval 的所有错误类型，使用 `thiserror` 派生。
//!
//! 注意：截断能不收敛、求解器运行不完整 **不是** 错误，
//! 它们是 `convergence::Evaluation` 的正常分支。这里只放
//! I/O 错误、解析错误和前置条件违例。
//!
//! ## 依赖关系
//! - 被所有其他模块使用
//! - 无外部模块依赖

use thiserror::Error;

/// ppeval 统一错误类型
#[derive(Error, Debug)]
pub enum PpevalError {
    // ─────────────────────────────────────────────────────────────
    // I/O 错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to read file: {path}")]
    FileReadError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file: {path}")]
    FileWriteError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Directory not found: {path}")]
    DirectoryNotFound { path: String },

    #[error("File not found: {path}")]
    FileNotFound { path: String },

    #[error("Refusing to overwrite existing path: {path}")]
    AlreadyExists { path: String },

    // ─────────────────────────────────────────────────────────────
    // 解析错误
    // ─────────────────────────────────────────────────────────────
    #[error("Failed to parse {format} file: {path}\nReason: {reason}")]
    ParseError {
        format: String,
        path: String,
        reason: String,
    },

    #[error("Shape mismatch: {0}")]
    ShapeMismatch(String),

    // ─────────────────────────────────────────────────────────────
    // 运行错误
    // ─────────────────────────────────────────────────────────────
    #[error("Run at gcut {cutoff} has not been staged")]
    NotStaged { cutoff: f64 },

    #[error("External command '{command}' not found in PATH")]
    CommandNotFound { command: String },

    #[error("External command failed: {command}\n{stderr}")]
    CommandFailed { command: String, stderr: String },

    // ─────────────────────────────────────────────────────────────
    // 参数错误
    // ─────────────────────────────────────────────────────────────
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // ─────────────────────────────────────────────────────────────
    // CSV 错误
    // ─────────────────────────────────────────────────────────────
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    // ─────────────────────────────────────────────────────────────
    // 其他
    // ─────────────────────────────────────────────────────────────
    #[error("{0}")]
    Other(String),
}

impl PpevalError {
    /// 读文件错误的简写
    pub fn read(path: &std::path::Path, source: std::io::Error) -> Self {
        PpevalError::FileReadError {
            path: path.display().to_string(),
            source,
        }
    }

    /// 写文件错误的简写
    pub fn write(path: &std::path::Path, source: std::io::Error) -> Self {
        PpevalError::FileWriteError {
            path: path.display().to_string(),
            source,
        }
    }
}

/// Result 类型别名
pub type Result<T> = std::result::Result<T, PpevalError>;
