//! # evaluate 命令实现
//!
//! 读取构型与参考力，按升序截断能运行求解器直到能量收敛，
//! 打印收敛历史和目标函数（失败时为惩罚值），并可选导出结果。
//!
//! ## 依赖关系
//! - 使用 `cli/evaluate.rs` 定义的参数
//! - 使用 `convergence/` 驱动扫描和导出
//! - 使用 `parsers/table.rs` 读取输入矩阵
//! - 使用 `utils/output.rs` 输出

use crate::cli::evaluate::EvaluateArgs;
use crate::convergence::export;
use crate::convergence::{ConvergenceController, Evaluation, EvaluationSettings, Penalties};
use crate::dft::{ExternalCommand, RunInputs};
use crate::error::Result;
use crate::parsers::table::{read_configurations, read_force_table};
use crate::utils::output;

use log::info;
use std::time::Duration;
use tabled::{Table, Tabled};

/// 收敛历史表格行
#[derive(Debug, Clone, Tabled)]
struct HistoryRow {
    #[tabled(rename = "Cutoff")]
    cutoff: String,
    #[tabled(rename = "Energies")]
    energies: String,
    #[tabled(rename = "Max |ΔE|")]
    max_delta: String,
    #[tabled(rename = "Status")]
    status: String,
}

/// 执行 evaluate 命令
pub fn execute(args: EvaluateArgs) -> Result<()> {
    let configurations = read_configurations(&args.configurations)?;
    let reference = read_force_table(&args.reference_forces)?;
    info!(
        "loaded {} configurations and {} reference force rows",
        configurations.len(),
        reference.num_configs()
    );

    let settings = EvaluationSettings {
        cutoffs: args.cutoffs.clone(),
        tolerance: args.tolerance,
        work_dir: args.work_dir.clone(),
        inputs: RunInputs::from_pp_dir(
            &args.elements,
            &args.pp_dir,
            args.cutoff_template.clone(),
            args.structure_template.clone(),
        )?,
        solver: ExternalCommand::parse(&args.solver)?,
        cost_tool: ExternalCommand::parse(&args.cost_tool)?,
        timeout: (args.timeout > 0).then(|| Duration::from_secs(args.timeout)),
    };
    let penalties = Penalties {
        solver_failure: args.solver_failure_penalty,
        not_converged: args.no_convergence_penalty,
    };

    output::print_header(&format!(
        "Cutoff convergence: {} ({} configurations)",
        args.elements.join(", "),
        configurations.len()
    ));
    output::print_info(&format!(
        "Cutoffs: {:?}, tolerance: {:e}",
        settings.cutoffs, settings.tolerance
    ));
    output::print_info(&format!("Working directory: {}", settings.work_dir.display()));

    let controller = ConvergenceController::new(&settings, &configurations, &reference)?;
    let evaluation = controller.run()?;

    println!();
    println!("{}", Table::new(history_rows(&evaluation)));
    println!();

    print_outcome(&evaluation, &penalties);
    write_outputs(&args, &evaluation, &penalties)?;

    Ok(())
}

/// 构造历史表格：相邻 gcut 的最大能量差
fn history_rows(evaluation: &Evaluation) -> Vec<HistoryRow> {
    let entries = evaluation.history().entries();
    entries
        .iter()
        .enumerate()
        .map(|(i, result)| {
            let energies = result
                .energies()
                .iter()
                .map(|e| e.map(|v| format!("{:.6}", v)).unwrap_or_else(|| "-".to_string()))
                .collect::<Vec<_>>()
                .join(" ");

            let max_delta = match i.checked_sub(1).map(|p| &entries[p]) {
                Some(previous) => match (previous.complete_energies(), result.complete_energies()) {
                    (Some(p), Some(l)) => format!(
                        "{:.3e}",
                        p.iter().zip(&l).map(|(a, b)| (b - a).abs()).fold(0.0, f64::max)
                    ),
                    _ => "-".to_string(),
                },
                None => "-".to_string(),
            };

            let status = if !result.is_complete() {
                format!("incomplete {:?}", result.incomplete_runs())
            } else if i + 1 == entries.len() && evaluation.is_converged() {
                "converged".to_string()
            } else {
                "ok".to_string()
            };

            HistoryRow {
                cutoff: format!("{}", result.cutoff()),
                energies,
                max_delta,
                status,
            }
        })
        .collect()
}

fn print_outcome(evaluation: &Evaluation, penalties: &Penalties) {
    let objectives = evaluation.objectives(penalties);
    match evaluation {
        Evaluation::Converged { cutoff, .. } => {
            output::print_success(&format!("Energies converged at gcut {}", cutoff));
            output::print_done(&format!(
                "accuracy = {:.9}, work = {:.6}",
                objectives.accuracy, objectives.work
            ));
        }
        Evaluation::IncompleteRun {
            cutoff,
            failed_configs,
            ..
        } => {
            output::print_warning(&format!(
                "Solver runs incomplete at gcut {} for configurations {:?}",
                cutoff, failed_configs
            ));
            output::print_done(&format!("Penalty objectives: {}", objectives.accuracy));
        }
        Evaluation::NotConverged { history } => {
            output::print_warning(&format!(
                "No convergence within tolerance over gcuts {:?}",
                history.cutoffs()
            ));
            output::print_done(&format!("Penalty objectives: {}", objectives.accuracy));
        }
    }
}

fn write_outputs(
    args: &EvaluateArgs,
    evaluation: &Evaluation,
    penalties: &Penalties,
) -> Result<()> {
    if let Some(path) = &args.history_csv {
        export::history_to_csv(evaluation.history(), path)?;
        output::print_success(&format!("History written to {}", path.display()));
    }

    if let Some(path) = &args.objectives_out {
        export::objectives_to_csv(evaluation, penalties, path)?;
        output::print_success(&format!("Objectives written to {}", path.display()));
    }

    if let Some(path) = &args.forces_out {
        if export::converged_forces_to_file(evaluation, path)? {
            output::print_success(&format!("Converged forces written to {}", path.display()));
        } else {
            output::print_warning("No converged forces to write");
        }
    }

    Ok(())
}
