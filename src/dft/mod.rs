//! # 单次 DFT 运行模块
//!
//! 一次外部求解器调用的全部内容：输入文件渲染、赝势链接、进程启动、
//! 结果读取。所有函数都显式接收工作目录路径，从不依赖进程当前目录，
//! 因此多个运行可以真正并发。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`, `convergence/` 使用
//! - 使用 `parsers/diaryf.rs`, `models/`
//! - 子模块: command, staging, run, extract

pub mod command;
pub mod extract;
pub mod run;
pub mod staging;

pub use command::ExternalCommand;
pub use extract::extract_cutoff_result;
pub use run::{RunDescriptor, RunInputs, RunStatus};
