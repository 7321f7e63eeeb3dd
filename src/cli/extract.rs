//! # extract 子命令 CLI 定义
//!
//! 读取单个求解器输出文件
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/extract.rs`

use clap::Args;
use std::path::PathBuf;

/// extract 子命令参数
#[derive(Args, Debug)]
pub struct ExtractArgs {
    /// Solver output file (diaryf) or the run directory containing it
    pub path: PathBuf,

    /// Expected number of atoms in the force block
    #[arg(long)]
    pub atoms: Option<usize>,
}
