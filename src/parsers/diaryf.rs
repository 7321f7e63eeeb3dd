//! # Socorro diaryf 输出解析器
//!
//! 从求解器输出文本中提取总能量和原子力。
//!
//! 文本约定：
//! - 能量行包含 `cell energy`，能量是标记之后第一个可解析的数
//!   （例如 `cell energy   =   -738.821147137`，即第 4 个字段）
//! - 力块以包含 `Atomic forces` 的行开头，其后每行末尾 3 个字段为
//!   一个原子的力向量，遇到空行或不以 3 个数结尾的行即结束
//! - 多次出现时取最后一次
//!
//! 所有函数对空文件、截断文件返回 `None`，不报错。
//!
//! ## 依赖关系
//! - 被 `dft/run.rs`, `commands/extract.rs` 使用
//! - 使用 `models/configuration.rs`

use crate::models::ForceMatrix;
use std::fs;
use std::path::Path;

/// 能量标记
pub const ENERGY_MARKER: &str = "cell energy";

/// 力块标记
pub const FORCES_MARKER: &str = "Atomic forces";

/// 求解器输出文件名
pub const OUTPUT_FILE: &str = "diaryf";

/// 从输出文本中提取总能量
pub fn parse_energy(content: &str) -> Option<f64> {
    content
        .lines()
        .rev()
        .filter_map(|line| {
            let pos = line.find(ENERGY_MARKER)?;
            extract_number_after(&line[pos + ENERGY_MARKER.len()..])
        })
        .next()
}

/// 从输出文本中提取力矩阵（原子顺序）
pub fn parse_forces(content: &str) -> Option<ForceMatrix> {
    let lines: Vec<&str> = content.lines().collect();
    let start = lines.iter().rposition(|l| l.contains(FORCES_MARKER))?;

    let mut forces = Vec::new();
    for line in &lines[start + 1..] {
        if line.trim().is_empty() {
            break;
        }
        match extract_trailing_vector(line) {
            Some(v) => forces.push(v),
            None => break,
        }
    }

    if forces.is_empty() {
        None
    } else {
        Some(forces)
    }
}

/// 读取文件并提取能量；文件缺失或不可读时为 `None`
pub fn read_energy(path: &Path) -> Option<f64> {
    fs::read_to_string(path).ok().as_deref().and_then(parse_energy)
}

/// 读取文件并提取力；文件缺失或不可读时为 `None`
pub fn read_forces(path: &Path) -> Option<ForceMatrix> {
    fs::read_to_string(path).ok().as_deref().and_then(parse_forces)
}

/// 标记之后第一个数（跳过 `=` 之类的字段）
fn extract_number_after(rest: &str) -> Option<f64> {
    rest.split_whitespace().find_map(|w| w.parse::<f64>().ok())
}

/// 行末 3 个数
fn extract_trailing_vector(line: &str) -> Option<[f64; 3]> {
    let parts: Vec<&str> = line.split_whitespace().collect();
    if parts.len() < 3 {
        return None;
    }
    let tail = &parts[parts.len() - 3..];
    let x = tail[0].parse().ok()?;
    let y = tail[1].parse().ok()?;
    let z = tail[2].parse().ok()?;
    Some([x, y, z])
}
