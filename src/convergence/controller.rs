//! # 截断能收敛控制器
//!
//! 按升序遍历截断能列表：每个 gcut 对所有构型运行一个批次，
//! 结果追加到收敛历史，比较最近两个 gcut 的能量。
//!
//! 状态：
//! - 任一运行缺少能量或力 → `Evaluation::IncompleteRun`（立即终止）
//! - 最近两个 gcut 的每个构型能量差都不超过容差 → `Evaluation::Converged`
//! - 截断能列表用尽 → `Evaluation::NotConverged`
//!
//! ## 依赖关系
//! - 被 `commands/evaluate.rs` 调用
//! - 使用 `batch/runner.rs` 运行批次
//! - 使用 `dft/extract.rs` 汇总结果
//! - 使用 `convergence/objectives.rs` 计算目标

use super::objectives::{check_reference_shape, compute_objectives};
use crate::batch::PositionSweep;
use crate::dft::staging::{create_fresh_dir, format_decimal};
use crate::dft::{extract_cutoff_result, ExternalCommand, RunDescriptor, RunInputs};
use crate::error::{PpevalError, Result};
use crate::models::{AtomicConfiguration, ConvergenceHistory, ForceTable, Objectives};

use log::{info, warn};
use std::fs;
use std::path::PathBuf;
use std::time::Duration;

/// 扫描设置
#[derive(Debug, Clone)]
pub struct EvaluationSettings {
    /// 截断能列表（严格升序）
    pub cutoffs: Vec<f64>,
    /// 绝对能量容差
    pub tolerance: f64,
    /// 所有 gcut 目录的根目录
    pub work_dir: PathBuf,
    /// 赝势和模板
    pub inputs: RunInputs,
    /// 求解器命令
    pub solver: ExternalCommand,
    /// 计算量估计工具
    pub cost_tool: ExternalCommand,
    /// 每个批次的时限
    pub timeout: Option<Duration>,
}

/// 失败时返回给优化器的固定惩罚值
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Penalties {
    /// 求解器运行不完整
    pub solver_failure: f64,
    /// 截断能不收敛
    pub not_converged: f64,
}

impl Default for Penalties {
    fn default() -> Self {
        Penalties {
            solver_failure: 100.0,
            not_converged: 95.0,
        }
    }
}

/// 一次评估的结果
#[derive(Debug, Clone)]
pub enum Evaluation {
    /// 在 `cutoff` 处收敛
    Converged {
        cutoff: f64,
        objectives: Objectives,
        history: ConvergenceHistory,
    },
    /// `cutoff` 批次中有运行未产出能量或力
    IncompleteRun {
        cutoff: f64,
        failed_configs: Vec<usize>,
        history: ConvergenceHistory,
    },
    /// 截断能列表用尽仍未收敛
    NotConverged { history: ConvergenceHistory },
}

impl Evaluation {
    pub fn history(&self) -> &ConvergenceHistory {
        match self {
            Evaluation::Converged { history, .. }
            | Evaluation::IncompleteRun { history, .. }
            | Evaluation::NotConverged { history } => history,
        }
    }

    pub fn is_converged(&self) -> bool {
        matches!(self, Evaluation::Converged { .. })
    }

    /// 返回给优化器的目标；失败分支映射为对应惩罚
    pub fn objectives(&self, penalties: &Penalties) -> Objectives {
        match self {
            Evaluation::Converged { objectives, .. } => *objectives,
            Evaluation::IncompleteRun { .. } => Objectives::penalty(penalties.solver_failure),
            Evaluation::NotConverged { .. } => Objectives::penalty(penalties.not_converged),
        }
    }

    /// 简短状态名
    pub fn status(&self) -> &'static str {
        match self {
            Evaluation::Converged { .. } => "converged",
            Evaluation::IncompleteRun { .. } => "incomplete_run",
            Evaluation::NotConverged { .. } => "not_converged",
        }
    }
}

/// 两组能量逐构型比较：`|E_latest - E_previous| <= tolerance`
pub fn energies_agree(previous: &[f64], latest: &[f64], tolerance: f64) -> bool {
    previous.len() == latest.len()
        && previous
            .iter()
            .zip(latest)
            .all(|(p, l)| (l - p).abs() <= tolerance)
}

/// 收敛判断：少于两项时为 false；任一能量缺失时为 false
pub fn is_converged(history: &ConvergenceHistory, tolerance: f64) -> bool {
    let Some((previous, latest)) = history.last_two() else {
        return false;
    };
    match (previous.complete_energies(), latest.complete_energies()) {
        (Some(p), Some(l)) => energies_agree(&p, &l, tolerance),
        _ => false,
    }
}

/// gcut 目录名
pub fn cutoff_dir_name(cutoff: f64) -> String {
    format!("gcut_{}", format_decimal(cutoff))
}

/// 截断能收敛控制器
pub struct ConvergenceController<'a> {
    settings: &'a EvaluationSettings,
    configurations: &'a [AtomicConfiguration],
    reference: &'a ForceTable,
}

impl<'a> ConvergenceController<'a> {
    /// 校验输入；形状不符等前置条件违例立即报错
    pub fn new(
        settings: &'a EvaluationSettings,
        configurations: &'a [AtomicConfiguration],
        reference: &'a ForceTable,
    ) -> Result<Self> {
        if settings.cutoffs.is_empty() {
            return Err(PpevalError::InvalidArgument(
                "cutoff list is empty".to_string(),
            ));
        }
        if let Some(bad) = settings.cutoffs.iter().find(|c| !c.is_finite() || **c <= 0.0) {
            return Err(PpevalError::InvalidArgument(format!(
                "cutoffs must be finite and positive, got {}",
                bad
            )));
        }
        if settings.cutoffs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(PpevalError::InvalidArgument(format!(
                "cutoffs must be strictly ascending: {:?}",
                settings.cutoffs
            )));
        }
        if settings.tolerance.is_nan() || settings.tolerance < 0.0 {
            return Err(PpevalError::InvalidArgument(format!(
                "energy tolerance must be non-negative, got {}",
                settings.tolerance
            )));
        }

        let num_atoms = configurations.first().map_or(0, |c| c.num_atoms());
        if let Some(bad) = configurations.iter().position(|c| c.num_atoms() != num_atoms) {
            return Err(PpevalError::ShapeMismatch(format!(
                "configuration {} has {} atoms, expected {}",
                bad,
                configurations[bad].num_atoms(),
                num_atoms
            )));
        }
        check_reference_shape(reference, configurations.len(), num_atoms)?;

        Ok(ConvergenceController {
            settings,
            configurations,
            reference,
        })
    }

    /// 运行整个截断能扫描
    pub fn run(&self) -> Result<Evaluation> {
        let settings = self.settings;
        fs::create_dir_all(&settings.work_dir)
            .map_err(|e| PpevalError::write(&settings.work_dir, e))?;

        let sweep = PositionSweep::new(settings.solver.clone()).with_timeout(settings.timeout);
        let mut history = ConvergenceHistory::new();

        for &cutoff in &settings.cutoffs {
            info!("gcut {}: running {} configurations", cutoff, self.configurations.len());

            let batch_dir = settings.work_dir.join(cutoff_dir_name(cutoff));
            create_fresh_dir(&batch_dir)?;

            let mut runs: Vec<RunDescriptor> = self
                .configurations
                .iter()
                .map(|c| RunDescriptor::new(settings.inputs.clone(), c.clone(), cutoff))
                .collect();

            let statuses = sweep.run(&batch_dir, &mut runs)?;
            let result = extract_cutoff_result(cutoff, &runs, &statuses);
            let failed_configs = result.incomplete_runs();
            history.push(result);

            if !failed_configs.is_empty() {
                warn!("gcut {}: incomplete runs for configurations {:?}", cutoff, failed_configs);
                return Ok(Evaluation::IncompleteRun {
                    cutoff,
                    failed_configs,
                    history,
                });
            }

            if is_converged(&history, settings.tolerance) {
                info!("energies converged at gcut {}", cutoff);
                let latest = history.latest().ok_or_else(|| {
                    PpevalError::Other("convergence history is empty".to_string())
                })?;
                let objectives =
                    compute_objectives(latest, &runs, self.reference, &settings.cost_tool)?;
                return Ok(Evaluation::Converged {
                    cutoff,
                    objectives,
                    history,
                });
            }
        }

        warn!(
            "no energy convergence within tolerance {} over gcuts {:?}",
            settings.tolerance,
            history.cutoffs()
        );
        Ok(Evaluation::NotConverged { history })
    }
}
