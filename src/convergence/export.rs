//! # 评估结果导出
//!
//! - 收敛历史 CSV：每个 gcut 一行，每个构型一列能量
//! - 目标函数 CSV：状态、gcut、accuracy、work
//! - 收敛力：与参考力表相同的文本矩阵
//!
//! ## 依赖关系
//! - 被 `commands/evaluate.rs` 调用
//! - 使用 `csv` 库写入 CSV 文件

use super::controller::{Evaluation, Penalties};
use crate::error::{PpevalError, Result};
use crate::models::{ConvergenceHistory, ForceTable};
use crate::parsers::table::to_matrix_string;

use serde::Serialize;
use std::fs;
use std::path::Path;

/// 目标函数记录
#[derive(Debug, Serialize)]
struct ObjectivesRecord<'a> {
    status: &'a str,
    cutoff: Option<f64>,
    accuracy: f64,
    work: f64,
}

/// 导出收敛历史为 CSV（缺失能量留空）
pub fn history_to_csv(history: &ConvergenceHistory, output_path: &Path) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    let num_configs = history.latest().map_or(0, |r| r.num_configs());
    let mut header = vec!["gcut".to_string()];
    header.extend((0..num_configs).map(|i| format!("energy_config_{}", i)));
    wtr.write_record(&header)?;

    for result in history.entries() {
        let mut record = vec![format!("{}", result.cutoff())];
        record.extend(
            result
                .energies()
                .iter()
                .map(|e| e.map(|v| format!("{:.10}", v)).unwrap_or_default()),
        );
        wtr.write_record(&record)?;
    }

    wtr.flush().map_err(|e| PpevalError::write(output_path, e))?;
    Ok(())
}

/// 导出目标函数（失败时为惩罚值）
pub fn objectives_to_csv(
    evaluation: &Evaluation,
    penalties: &Penalties,
    output_path: &Path,
) -> Result<()> {
    let mut wtr = csv::Writer::from_path(output_path)?;

    let objectives = evaluation.objectives(penalties);
    let cutoff = match evaluation {
        Evaluation::Converged { cutoff, .. } | Evaluation::IncompleteRun { cutoff, .. } => {
            Some(*cutoff)
        }
        Evaluation::NotConverged { .. } => None,
    };

    wtr.serialize(ObjectivesRecord {
        status: evaluation.status(),
        cutoff,
        accuracy: objectives.accuracy,
        work: objectives.work,
    })?;

    wtr.flush().map_err(|e| PpevalError::write(output_path, e))?;
    Ok(())
}

/// 导出收敛 gcut 的力矩阵；没有完整结果时返回 `Ok(false)`
pub fn converged_forces_to_file(evaluation: &Evaluation, output_path: &Path) -> Result<bool> {
    let Evaluation::Converged { history, .. } = evaluation else {
        return Ok(false);
    };
    let Some(forces) = history.latest().and_then(|r| r.complete_forces()) else {
        return Ok(false);
    };

    let table = ForceTable::from_matrices(&forces);
    fs::write(output_path, to_matrix_string(&table))
        .map_err(|e| PpevalError::write(output_path, e))?;
    Ok(true)
}
