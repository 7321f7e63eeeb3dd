//! # CLI 模块
//!
//! 使用 `clap` 定义命令行参数和子命令。
//!
//! ## 命令结构
//! - `evaluate`: 截断能收敛扫描并计算目标函数
//! - `extract`: 从单个求解器输出中读取能量和力
//!
//! ## 依赖关系
//! - 被 `main.rs` 使用
//! - 子模块: evaluate, extract

pub mod evaluate;
pub mod extract;

use clap::{Parser, Subcommand};

/// ppeval - 赝势截断能收敛评估
#[derive(Parser)]
#[command(name = "ppeval")]
#[command(author = "Changjiang Wu")]
#[command(version)]
#[command(about = "Cutoff-convergence evaluation of generated PAW pseudopotentials", long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 可用的子命令
#[derive(Subcommand)]
pub enum Commands {
    /// Run the cutoff-convergence sweep and compute accuracy/work objectives
    Evaluate(evaluate::EvaluateArgs),

    /// Read energy and forces from a single solver output file
    Extract(extract::ExtractArgs),
}
