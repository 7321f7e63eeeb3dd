//! # 截断能扫描结果数据模型
//!
//! - `CutoffResult`: 单个 gcut 下所有构型的能量和力
//! - `ConvergenceHistory`: 按 gcut 升序追加的结果序列
//! - `Objectives`: 返回给外层优化器的 (accuracy, work)
//!
//! ## 依赖关系
//! - 被 `dft/extract.rs` 构造
//! - 被 `convergence/` 和 `commands/evaluate.rs` 使用

use super::configuration::ForceMatrix;

/// 单个截断能下的结果（构造后不可变）
///
/// `energies` 和 `forces` 与输入构型一一对应，未完成的运行记为 `None`。
#[derive(Debug, Clone, PartialEq)]
pub struct CutoffResult {
    cutoff: f64,
    energies: Vec<Option<f64>>,
    forces: Vec<Option<ForceMatrix>>,
}

impl CutoffResult {
    /// 两个序列长度必须一致
    pub fn new(cutoff: f64, energies: Vec<Option<f64>>, forces: Vec<Option<ForceMatrix>>) -> Self {
        assert_eq!(
            energies.len(),
            forces.len(),
            "energy and force sequences must be aligned"
        );
        CutoffResult {
            cutoff,
            energies,
            forces,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn energies(&self) -> &[Option<f64>] {
        &self.energies
    }

    pub fn num_configs(&self) -> usize {
        self.energies.len()
    }

    /// 缺少能量或力的构型下标
    pub fn incomplete_runs(&self) -> Vec<usize> {
        self.energies
            .iter()
            .zip(&self.forces)
            .enumerate()
            .filter(|(_, (e, f))| e.is_none() || f.is_none())
            .map(|(i, _)| i)
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.incomplete_runs().is_empty()
    }

    /// 全部能量（任一缺失则为 `None`）
    pub fn complete_energies(&self) -> Option<Vec<f64>> {
        self.energies.iter().copied().collect()
    }

    /// 全部力矩阵（任一缺失则为 `None`）
    pub fn complete_forces(&self) -> Option<Vec<ForceMatrix>> {
        self.forces.iter().cloned().collect()
    }
}

/// 收敛历史：只追加，按 gcut 升序
#[derive(Debug, Clone, Default)]
pub struct ConvergenceHistory {
    entries: Vec<CutoffResult>,
}

impl ConvergenceHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个结果；gcut 必须大于最后一项
    pub fn push(&mut self, result: CutoffResult) {
        if let Some(last) = self.entries.last() {
            assert!(
                result.cutoff() > last.cutoff(),
                "history must be ordered by ascending cutoff"
            );
        }
        self.entries.push(result);
    }

    pub fn entries(&self) -> &[CutoffResult] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&CutoffResult> {
        self.entries.last()
    }

    /// 最近两项 (previous, latest)
    pub fn last_two(&self) -> Option<(&CutoffResult, &CutoffResult)> {
        match self.entries.as_slice() {
            [.., previous, latest] => Some((previous, latest)),
            _ => None,
        }
    }

    /// 所有尝试过的截断能
    pub fn cutoffs(&self) -> Vec<f64> {
        self.entries.iter().map(|r| r.cutoff()).collect()
    }
}

/// 返回给外层优化器的目标函数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Objectives {
    /// 力的 RMSD
    pub accuracy: f64,
    /// 计算量估计之和
    pub work: f64,
}

impl Objectives {
    pub fn new(accuracy: f64, work: f64) -> Self {
        Objectives { accuracy, work }
    }

    /// 两个目标取同一惩罚值
    pub fn penalty(value: f64) -> Self {
        Objectives {
            accuracy: value,
            work: value,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(cutoff: f64, energies: Vec<Option<f64>>) -> CutoffResult {
        let forces = energies.iter().map(|e| e.map(|_| vec![[0.0; 3]])).collect();
        CutoffResult::new(cutoff, energies, forces)
    }

    #[test]
    fn test_incomplete_runs_lists_missing_configs() {
        let r = CutoffResult::new(
            20.0,
            vec![Some(-1.0), None, Some(-1.0)],
            vec![Some(vec![[0.0; 3]]), Some(vec![[0.0; 3]]), None],
        );
        assert_eq!(r.incomplete_runs(), vec![1, 2]);
        assert!(!r.is_complete());
        assert!(r.complete_energies().is_none());
    }

    #[test]
    fn test_last_two_requires_two_entries() {
        let mut history = ConvergenceHistory::new();
        assert!(history.last_two().is_none());

        history.push(result(20.0, vec![Some(-1.0)]));
        assert!(history.last_two().is_none());

        history.push(result(30.0, vec![Some(-2.0)]));
        let (previous, latest) = history.last_two().unwrap();
        assert_eq!(previous.cutoff(), 20.0);
        assert_eq!(latest.cutoff(), 30.0);
        assert_eq!(history.cutoffs(), vec![20.0, 30.0]);
    }

    #[test]
    #[should_panic(expected = "ascending cutoff")]
    fn test_history_rejects_descending_cutoff() {
        let mut history = ConvergenceHistory::new();
        history.push(result(30.0, vec![Some(-1.0)]));
        history.push(result(20.0, vec![Some(-1.0)]));
    }
}
