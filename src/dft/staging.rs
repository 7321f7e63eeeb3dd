//! # 输入文件渲染与赝势链接
//!
//! - `argvf`：将模板中的 `{gcut}`、`{4gcut}` 替换为截断能及其 4 倍
//! - `data/crystal`：去掉模板空行，在最后 N 行末尾追加 N 个原子坐标
//! - `data/PAW.<元素>`：指向赝势文件的符号链接（不复制）
//!
//! 所有写操作都要求目标不存在。
//!
//! ## 依赖关系
//! - 被 `dft/run.rs` 使用
//! - 无外部 crate 依赖

use crate::error::{PpevalError, Result};
use std::collections::BTreeMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

/// 截断能输入文件名
pub const CUTOFF_INPUT_FILE: &str = "argvf";

/// 数据子目录
pub const DATA_DIR: &str = "data";

/// 结构输入文件名（位于 `data/` 下）
pub const STRUCTURE_FILE: &str = "crystal";

/// 十进制文本，整数值保留一位小数（`40` -> `40.0`）
pub fn format_decimal(value: f64) -> String {
    let s = format!("{}", value);
    if value.is_finite() && !s.contains('.') {
        format!("{}.0", s)
    } else {
        s
    }
}

/// 替换截断能占位符
pub fn render_cutoff_input(template: &str, cutoff: f64) -> String {
    template
        .replace("{gcut}", &format_decimal(cutoff))
        .replace("{4gcut}", &format_decimal(4.0 * cutoff))
}

/// 渲染结构文件
///
/// 去掉空行后，最后 `positions.len()` 行依次追加 `x y z`。
pub fn render_structure(template: &str, positions: &[[f64; 3]]) -> Result<String> {
    let mut lines: Vec<String> = template
        .lines()
        .filter(|l| !l.trim().is_empty())
        .map(str::to_string)
        .collect();

    if lines.len() < positions.len() {
        return Err(PpevalError::ShapeMismatch(format!(
            "structure template has {} non-blank lines but {} atoms were given",
            lines.len(),
            positions.len()
        )));
    }

    let offset = lines.len() - positions.len();
    for (line, pos) in lines[offset..].iter_mut().zip(positions) {
        *line = format!(
            "{} {} {} {}",
            line.trim(),
            format_decimal(pos[0]),
            format_decimal(pos[1]),
            format_decimal(pos[2])
        );
    }

    let mut text = lines.join("\n");
    text.push('\n');
    Ok(text)
}

/// 创建新文件并写入；文件已存在则失败
pub fn write_new_file(path: &Path, content: &str) -> Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .map_err(|e| already_exists_or(path, e))?;
    file.write_all(content.as_bytes())
        .map_err(|e| PpevalError::write(path, e))
}

/// 创建新目录；目录已存在则失败
pub fn create_fresh_dir(path: &Path) -> Result<()> {
    fs::create_dir(path).map_err(|e| already_exists_or(path, e))
}

/// 将赝势以原文件名链接到 `dest_dir`
pub fn link_pseudopotentials(
    pseudopotentials: &BTreeMap<String, PathBuf>,
    dest_dir: &Path,
) -> Result<()> {
    for source in pseudopotentials.values() {
        let name = source.file_name().ok_or_else(|| {
            PpevalError::InvalidArgument(format!(
                "pseudopotential path has no file name: {}",
                source.display()
            ))
        })?;

        // 链接目标必须是绝对路径，否则相对于 data/ 解析
        let target = fs::canonicalize(source).map_err(|_| PpevalError::FileNotFound {
            path: source.display().to_string(),
        })?;
        let link = dest_dir.join(name);
        symlink_file(&target, &link).map_err(|e| already_exists_or(&link, e))?;
    }
    Ok(())
}

#[cfg(unix)]
fn symlink_file(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn symlink_file(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::windows::fs::symlink_file(target, link)
}

fn already_exists_or(path: &Path, e: std::io::Error) -> PpevalError {
    if e.kind() == std::io::ErrorKind::AlreadyExists {
        PpevalError::AlreadyExists {
            path: path.display().to_string(),
        }
    } else {
        PpevalError::write(path, e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_decimal() {
        assert_eq!(format_decimal(40.0), "40.0");
        assert_eq!(format_decimal(160.0), "160.0");
        assert_eq!(format_decimal(12.5), "12.5");
        assert_eq!(format_decimal(0.0), "0.0");
        assert_eq!(format_decimal(-0.25), "-0.25");
    }

    #[test]
    fn test_render_cutoff_input() {
        let template = "asdfsd\nasdf {gcut}\nasdfas {4gcut}\n\n\nlkjlj\n";
        let rendered = render_cutoff_input(template, 40.0);
        assert_eq!(rendered, "asdfsd\nasdf 40.0\nasdfas 160.0\n\n\nlkjlj\n");
        assert_eq!(rendered.lines().count(), template.lines().count());
    }

    #[test]
    fn test_render_cutoff_input_replaces_every_occurrence() {
        let rendered = render_cutoff_input("{gcut} {gcut} {4gcut}{4gcut}", 12.5);
        assert_eq!(rendered, "12.5 12.5 50.050.0");
    }

    #[test]
    fn test_render_structure() {
        let template = r#"Si_moga
  5.169458407

      1.0  1.0  0.0
      0.0  1.0  1.0
      1.0  0.0  1.0
lattice
  2
Si
Si
"#;
        let positions = [[0.0, 0.0, 0.1], [0.5, 0.6, 0.7]];
        let rendered = render_structure(template, &positions).unwrap();
        let split: Vec<Vec<&str>> = rendered
            .lines()
            .map(|l| l.split_whitespace().collect())
            .collect();

        assert_eq!(
            split,
            vec![
                vec!["Si_moga"],
                vec!["5.169458407"],
                vec!["1.0", "1.0", "0.0"],
                vec!["0.0", "1.0", "1.0"],
                vec!["1.0", "0.0", "1.0"],
                vec!["lattice"],
                vec!["2"],
                vec!["Si", "0.0", "0.0", "0.1"],
                vec!["Si", "0.5", "0.6", "0.7"],
            ]
        );
    }

    #[test]
    fn test_render_structure_too_few_lines() {
        let err = render_structure("Si\n", &[[0.0; 3], [0.5; 3]]).unwrap_err();
        assert!(matches!(err, PpevalError::ShapeMismatch(_)));
    }

    #[test]
    fn test_write_new_file_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("argvf");
        write_new_file(&path, "first").unwrap();
        let err = write_new_file(&path, "second").unwrap_err();
        assert!(matches!(err, PpevalError::AlreadyExists { .. }));
        assert_eq!(fs::read_to_string(&path).unwrap(), "first");
    }

    #[cfg(unix)]
    #[test]
    fn test_link_pseudopotentials() {
        let dir = tempfile::tempdir().unwrap();
        let si = dir.path().join("PAW.Si");
        let ge = dir.path().join("PAW.Ge");
        fs::write(&si, "silicon paw data").unwrap();
        fs::write(&ge, "germanium paw data").unwrap();

        let data = dir.path().join("data");
        fs::create_dir(&data).unwrap();

        let mut pps = BTreeMap::new();
        pps.insert("Si".to_string(), si.clone());
        pps.insert("Ge".to_string(), ge.clone());
        link_pseudopotentials(&pps, &data).unwrap();

        assert_eq!(fs::read_to_string(data.join("PAW.Si")).unwrap(), "silicon paw data");
        assert_eq!(fs::read_to_string(data.join("PAW.Ge")).unwrap(), "germanium paw data");
        assert!(fs::symlink_metadata(data.join("PAW.Si")).unwrap().file_type().is_symlink());

        // 再次链接必须失败
        assert!(link_pseudopotentials(&pps, &data).is_err());
    }
}
