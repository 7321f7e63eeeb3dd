//! # 批量运行模块
//!
//! 一个截断能下的所有构型作为一个批次并发运行。
//!
//! ## 功能
//! - 每个构型 stage 到独立子目录
//! - 并行启动求解器进程
//! - 等待全部结束（带批次时限）
//!
//! ## 依赖关系
//! - 被 `convergence/controller.rs` 使用
//! - 使用 `rayon` 进行并行等待
//! - 使用 `indicatif` 显示进度

pub mod runner;

pub use runner::PositionSweep;
