//! # extract 命令实现
//!
//! 读取单个 diaryf，打印能量和力表，用于检查求解器输出是否满足文本约定。
//!
//! ## 依赖关系
//! - 使用 `cli/extract.rs` 定义的参数
//! - 使用 `parsers/diaryf.rs`, `utils/output.rs`

use crate::cli::extract::ExtractArgs;
use crate::error::{PpevalError, Result};
use crate::parsers::diaryf::{self, OUTPUT_FILE};
use crate::utils::output;

use tabled::{Table, Tabled};

/// 力表行
#[derive(Debug, Clone, Tabled)]
struct ForceRow {
    #[tabled(rename = "Atom")]
    atom: usize,
    #[tabled(rename = "Fx")]
    fx: String,
    #[tabled(rename = "Fy")]
    fy: String,
    #[tabled(rename = "Fz")]
    fz: String,
}

/// 执行 extract 命令
pub fn execute(args: ExtractArgs) -> Result<()> {
    let path = if args.path.is_dir() {
        args.path.join(OUTPUT_FILE)
    } else {
        args.path.clone()
    };

    if !path.exists() {
        return Err(PpevalError::FileNotFound {
            path: path.display().to_string(),
        });
    }

    output::print_header(&format!("Solver output: {}", path.display()));

    match diaryf::read_energy(&path) {
        Some(e) => output::print_success(&format!("Total energy: {:.9}", e)),
        None => output::print_warning(&format!(
            "No '{}' line found (run incomplete?)",
            diaryf::ENERGY_MARKER
        )),
    }

    let forces = match diaryf::read_forces(&path) {
        Some(f) => f,
        None => {
            output::print_warning(&format!(
                "No '{}' block found (run incomplete?)",
                diaryf::FORCES_MARKER
            ));
            return Ok(());
        }
    };

    let rows: Vec<ForceRow> = forces
        .iter()
        .enumerate()
        .map(|(i, f)| ForceRow {
            atom: i + 1,
            fx: format!("{:.6}", f[0]),
            fy: format!("{:.6}", f[1]),
            fz: format!("{:.6}", f[2]),
        })
        .collect();
    println!("{}", Table::new(&rows));

    if let Some(expected) = args.atoms {
        if expected != forces.len() {
            output::print_warning(&format!(
                "Force block has {} atoms, expected {}",
                forces.len(),
                expected
            ));
        }
    }

    Ok(())
}
