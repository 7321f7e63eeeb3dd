//! # 解析器模块
//!
//! 提供求解器输出和文本矩阵的解析器。
//!
//! ## 依赖关系
//! - 被 `dft/`, `commands/` 模块使用
//! - 使用 `models/` 数据模型
//! - 子模块: diaryf, table

pub mod diaryf;
pub mod table;
