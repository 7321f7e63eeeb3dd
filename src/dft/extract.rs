//! # 结果提取
//!
//! 把一个截断能批次的所有运行汇总为 `CutoffResult`。
//! 超时或未能启动的运行直接记为缺失；正常退出的运行以输出文件为准，
//! 非零退出码本身不算失败，只要能量和力都读得到。
//!
//! ## 依赖关系
//! - 被 `convergence/controller.rs` 使用
//! - 使用 `dft/run.rs`, `models/result.rs`

use super::run::{RunDescriptor, RunStatus};
use crate::models::CutoffResult;

use log::warn;

/// 读取批次中每个运行的能量和力（保持构型顺序）
pub fn extract_cutoff_result(
    cutoff: f64,
    runs: &[RunDescriptor],
    statuses: &[RunStatus],
) -> CutoffResult {
    assert_eq!(runs.len(), statuses.len(), "one status per run");

    let mut energies = Vec::with_capacity(runs.len());
    let mut forces = Vec::with_capacity(runs.len());

    for (index, (run, status)) in runs.iter().zip(statuses).enumerate() {
        if !status.may_have_output() {
            warn!("gcut {} config {}: {}", cutoff, index, status);
            energies.push(None);
            forces.push(None);
            continue;
        }

        if let RunStatus::Exited(exit) = status {
            if !exit.success() {
                warn!("gcut {} config {}: solver {}", cutoff, index, exit);
            }
        }

        energies.push(run.read_energy());
        forces.push(run.read_forces());
    }

    CutoffResult::new(cutoff, energies, forces)
}
