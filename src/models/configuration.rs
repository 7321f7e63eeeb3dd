//! # 原子构型数据模型
//!
//! 一个构型就是按原子顺序排列的分数坐标 (x, y, z)。
//! 同一次扫描中所有构型的原子数相同。
//!
//! ## 依赖关系
//! - 被 `parsers/table.rs` 构造
//! - 被 `dft/run.rs`, `convergence/objectives.rs` 使用

/// 力矩阵：每个原子一行 3 分量
pub type ForceMatrix = Vec<[f64; 3]>;

/// 单个原子构型（只读）
#[derive(Debug, Clone, PartialEq)]
pub struct AtomicConfiguration {
    positions: Vec<[f64; 3]>,
}

impl AtomicConfiguration {
    pub fn new(positions: Vec<[f64; 3]>) -> Self {
        AtomicConfiguration { positions }
    }

    /// 从扁平行 (x1 y1 z1 x2 y2 z2 ...) 重排为每原子 3 向量
    ///
    /// 行长度不是 3 的倍数时返回 `None`。
    pub fn from_flat(row: &[f64]) -> Option<Self> {
        if row.len() % 3 != 0 {
            return None;
        }
        let positions = row.chunks_exact(3).map(|c| [c[0], c[1], c[2]]).collect();
        Some(Self::new(positions))
    }

    pub fn positions(&self) -> &[[f64; 3]] {
        &self.positions
    }

    /// 原子数
    pub fn num_atoms(&self) -> usize {
        self.positions.len()
    }
}

/// 参考力表：行 = 构型，列 = 3 × 原子数
#[derive(Debug, Clone, PartialEq)]
pub struct ForceTable {
    rows: Vec<Vec<f64>>,
}

impl ForceTable {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        ForceTable { rows }
    }

    /// 由各构型的力矩阵堆叠而成
    pub fn from_matrices(matrices: &[ForceMatrix]) -> Self {
        let rows = matrices
            .iter()
            .map(|m| m.iter().flat_map(|v| v.iter().copied()).collect())
            .collect();
        ForceTable { rows }
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn num_configs(&self) -> usize {
        self.rows.len()
    }

    /// 每行列数（空表为 0）
    pub fn row_len(&self) -> usize {
        self.rows.first().map(|r| r.len()).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_flat_reshapes_per_atom() {
        let config = AtomicConfiguration::from_flat(&[0.0, 0.0, 0.1, 0.5, 0.6, 0.7]).unwrap();
        assert_eq!(config.num_atoms(), 2);
        assert_eq!(config.positions()[1], [0.5, 0.6, 0.7]);
    }

    #[test]
    fn test_from_flat_rejects_partial_atom() {
        assert!(AtomicConfiguration::from_flat(&[0.0, 0.1]).is_none());
    }

    #[test]
    fn test_force_table_from_matrices() {
        let table = ForceTable::from_matrices(&[vec![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]]]);
        assert_eq!(table.num_configs(), 1);
        assert_eq!(table.row_len(), 6);
        assert_eq!(table.rows()[0], vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
    }
}
