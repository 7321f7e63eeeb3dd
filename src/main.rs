//! # ppeval - 赝势截断能收敛评估
//!
//! 对一组原子构型在递增的截断能下运行外部 DFT 求解器，
//! 能量收敛后计算力的精度和计算量两个目标函数，供外层优化器使用。
//!
//! ## 子命令
//! - `evaluate` - 截断能收敛扫描并输出目标函数
//! - `extract`  - 检查单个求解器输出 (diaryf) 中的能量和力
//!
//! ## 依赖关系
//! ```text
//! main.rs
//!   ├── cli/          (命令行参数定义)
//!   ├── commands/     (命令执行逻辑)
//!   │     └── convergence/ (收敛控制与目标函数)
//!   │           ├── batch/   (并发运行一个批次)
//!   │           ├── dft/     (单次运行：输入、进程、结果)
//!   │           ├── parsers/ (diaryf 与矩阵解析)
//!   │           └── models/  (数据模型)
//!   ├── utils/        (工具函数)
//!   └── error.rs      (错误处理)
//! ```

mod batch;
mod cli;
mod commands;
mod convergence;
mod dft;
mod error;
mod models;
mod parsers;
mod utils;

use clap::Parser;
use cli::Cli;

fn main() {
    // Initialize colored output for Windows compatibility
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let cli = Cli::parse();

    if let Err(e) = commands::run(cli.command) {
        utils::output::print_error(&format!("{}", e));
        std::process::exit(1);
    }
}
