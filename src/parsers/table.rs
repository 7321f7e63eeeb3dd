//! # 文本矩阵解析器
//!
//! 解析以空白分隔的数值表（构型文件、参考力表），`#` 开头的行为注释。
//!
//! ## 依赖关系
//! - 被 `commands/evaluate.rs` 使用
//! - 使用 `models/configuration.rs`

use crate::error::{PpevalError, Result};
use crate::models::{AtomicConfiguration, ForceTable};
use std::fs;
use std::path::Path;

/// 解析数值矩阵，所有行必须等长
pub fn parse_matrix(content: &str, path: &str) -> Result<Vec<Vec<f64>>> {
    let mut rows: Vec<Vec<f64>> = Vec::new();

    for (lineno, line) in content.lines().enumerate() {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }

        let row = trimmed
            .split_whitespace()
            .map(|w| w.parse::<f64>())
            .collect::<std::result::Result<Vec<f64>, _>>()
            .map_err(|e| PpevalError::ParseError {
                format: "matrix".to_string(),
                path: path.to_string(),
                reason: format!("line {}: {}", lineno + 1, e),
            })?;

        if let Some(first) = rows.first() {
            if first.len() != row.len() {
                return Err(PpevalError::ParseError {
                    format: "matrix".to_string(),
                    path: path.to_string(),
                    reason: format!(
                        "line {}: expected {} columns, found {}",
                        lineno + 1,
                        first.len(),
                        row.len()
                    ),
                });
            }
        }
        rows.push(row);
    }

    Ok(rows)
}

/// 解析构型表：每行一个构型，行长度为 3 的倍数
pub fn parse_configurations(content: &str, path: &str) -> Result<Vec<AtomicConfiguration>> {
    let rows = parse_matrix(content, path)?;
    if rows.is_empty() {
        return Err(PpevalError::ParseError {
            format: "configurations".to_string(),
            path: path.to_string(),
            reason: "no configurations found".to_string(),
        });
    }

    rows.iter()
        .map(|row| {
            AtomicConfiguration::from_flat(row).ok_or_else(|| PpevalError::ParseError {
                format: "configurations".to_string(),
                path: path.to_string(),
                reason: format!("row length {} is not a multiple of 3", row.len()),
            })
        })
        .collect()
}

/// 读取构型文件
pub fn read_configurations(path: &Path) -> Result<Vec<AtomicConfiguration>> {
    let content = fs::read_to_string(path).map_err(|e| PpevalError::read(path, e))?;
    parse_configurations(&content, &path.display().to_string())
}

/// 读取参考力表
pub fn read_force_table(path: &Path) -> Result<ForceTable> {
    let content = fs::read_to_string(path).map_err(|e| PpevalError::read(path, e))?;
    let rows = parse_matrix(&content, &path.display().to_string())?;
    Ok(ForceTable::new(rows))
}

/// 将力表写为文本矩阵（与参考力表同格式）
pub fn to_matrix_string(table: &ForceTable) -> String {
    let mut result = String::new();
    for row in table.rows() {
        let line = row
            .iter()
            .map(|v| format!("{:16.9}", v))
            .collect::<Vec<_>>()
            .join(" ");
        result.push_str(line.trim_start());
        result.push('\n');
    }
    result
}
