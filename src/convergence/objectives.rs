//! # 目标函数计算
//!
//! - accuracy：计算力与参考力的 RMSD，
//!   `sqrt( sum((F - F_ref)^2) / 构型数 / 原子数 )`
//! - work：在每个运行目录中调用计算量估计工具，取 stdout 最后一个字段求和
//!
//! ## 依赖关系
//! - 被 `convergence/controller.rs` 使用
//! - 使用 `dft/run.rs`, `models/`

use crate::dft::{ExternalCommand, RunDescriptor};
use crate::error::{PpevalError, Result};
use crate::models::{CutoffResult, ForceMatrix, ForceTable, Objectives};

use log::debug;

/// 检查参考力表与构型数、原子数是否匹配
pub fn check_reference_shape(
    reference: &ForceTable,
    num_configs: usize,
    num_atoms: usize,
) -> Result<()> {
    if reference.row_len() % 3 != 0 {
        return Err(PpevalError::ShapeMismatch(format!(
            "reference force rows have {} columns, not a multiple of 3",
            reference.row_len()
        )));
    }
    if reference.num_configs() != num_configs || reference.row_len() != 3 * num_atoms {
        return Err(PpevalError::ShapeMismatch(format!(
            "reference forces are {}x{}, expected {}x{} ({} configurations, {} atoms)",
            reference.num_configs(),
            reference.row_len(),
            num_configs,
            3 * num_atoms,
            num_configs,
            num_atoms
        )));
    }
    if num_configs == 0 || num_atoms == 0 {
        return Err(PpevalError::ShapeMismatch(
            "reference forces are empty".to_string(),
        ));
    }
    Ok(())
}

/// 力 RMSD（accuracy 目标）
pub fn accuracy_objective(forces: &[ForceMatrix], reference: &ForceTable) -> Result<f64> {
    let num_configs = reference.num_configs();
    let num_atoms = reference.row_len() / 3;
    check_reference_shape(reference, forces.len(), forces.first().map_or(0, |f| f.len()))?;

    let mut sum_sq = 0.0;
    for (computed, expected) in forces.iter().zip(reference.rows()) {
        if computed.len() * 3 != expected.len() {
            return Err(PpevalError::ShapeMismatch(format!(
                "force matrix has {} atoms, reference row has {} components",
                computed.len(),
                expected.len()
            )));
        }
        for (f, r) in computed.iter().flat_map(|v| v.iter()).zip(expected) {
            sum_sq += (f - r).powi(2);
        }
    }

    Ok((sum_sq / num_configs as f64 / num_atoms as f64).sqrt())
}

/// 取 stdout 最后一个字段作为计算量估计
pub fn parse_cost_estimate(stdout: &str) -> Option<f64> {
    stdout.split_whitespace().last()?.parse().ok()
}

/// 在运行目录中调用计算量估计工具
pub fn estimate_cost(run: &RunDescriptor, cost_tool: &ExternalCommand) -> Result<f64> {
    let work_dir = run.work_dir().ok_or(PpevalError::NotStaged {
        cutoff: run.cutoff(),
    })?;

    let output = cost_tool
        .command_in(work_dir)
        .output()
        .map_err(|e| cost_tool.spawn_error(e))?;

    if !output.status.success() {
        return Err(PpevalError::CommandFailed {
            command: cost_tool.to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        });
    }

    let stdout = String::from_utf8_lossy(&output.stdout);
    let cost = parse_cost_estimate(&stdout).ok_or_else(|| PpevalError::CommandFailed {
        command: cost_tool.to_string(),
        stderr: format!("no numeric cost estimate in output: {:?}", stdout.trim()),
    })?;

    debug!("cost estimate {} in {}", cost, work_dir.display());
    Ok(cost)
}

/// 所有运行计算量之和（work 目标）
pub fn work_objective(runs: &[RunDescriptor], cost_tool: &ExternalCommand) -> Result<f64> {
    runs.iter().map(|run| estimate_cost(run, cost_tool)).sum()
}

/// 由收敛截断能的结果计算两个目标
pub fn compute_objectives(
    result: &CutoffResult,
    runs: &[RunDescriptor],
    reference: &ForceTable,
    cost_tool: &ExternalCommand,
) -> Result<Objectives> {
    let forces = result.complete_forces().ok_or_else(|| {
        PpevalError::Other(format!(
            "cannot compute objectives from incomplete gcut {} results",
            result.cutoff()
        ))
    })?;

    let accuracy = accuracy_objective(&forces, reference)?;
    let work = work_objective(runs, cost_tool)?;
    Ok(Objectives::new(accuracy, work))
}
