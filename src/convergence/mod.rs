//! # 截断能收敛模块
//!
//! 驱动截断能扫描、判断收敛，并计算最终目标函数。
//!
//! ## 依赖关系
//! - 被 `commands/evaluate.rs` 使用
//! - 使用 `batch/`, `dft/`, `models/`
//! - 子模块: controller, objectives, export

pub mod controller;
pub mod export;
pub mod objectives;

pub use controller::{ConvergenceController, Evaluation, EvaluationSettings, Penalties};
