//! # 命令执行模块
//!
//! 实现各子命令的业务逻辑。
//!
//! ## 依赖关系
//! - 被 `main.rs` 调用
//! - 使用 `cli/`, `convergence/`, `parsers/`, `utils/`
//! - 子模块: evaluate, extract

pub mod evaluate;
pub mod extract;

use crate::cli::Commands;
use crate::error::Result;

/// 执行命令
pub fn run(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Evaluate(args) => evaluate::execute(args),
        Commands::Extract(args) => extract::execute(args),
    }
}
