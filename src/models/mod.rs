//! # 数据模型模块
//!
//! 定义原子构型、截断能扫描结果和目标函数的数据模型。
//!
//! ## 依赖关系
//! - 被 `parsers/`, `dft/`, `batch/`, `convergence/` 使用
//! - 子模块: configuration, result

pub mod configuration;
pub mod result;

pub use configuration::{AtomicConfiguration, ForceMatrix, ForceTable};
pub use result::{ConvergenceHistory, CutoffResult, Objectives};
