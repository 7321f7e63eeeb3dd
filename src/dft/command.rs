//! # 外部命令描述
//!
//! 求解器和计算量估计工具都以 "程序 参数..." 的命令行给出，
//! 例如 `mpirun -np 4 socorro`。
//!
//! ## 依赖关系
//! - 被 `dft/run.rs`, `convergence/objectives.rs`, `commands/evaluate.rs` 使用

use crate::error::{PpevalError, Result};
use std::path::Path;
use std::process::Command;

/// 外部命令（程序 + 参数）
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExternalCommand {
    program: String,
    args: Vec<String>,
}

impl ExternalCommand {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        ExternalCommand {
            program: program.into(),
            args,
        }
    }

    /// 按空白切分命令行
    pub fn parse(line: &str) -> Result<Self> {
        let mut parts = line.split_whitespace().map(str::to_string);
        let program = parts
            .next()
            .ok_or_else(|| PpevalError::InvalidArgument("empty command line".to_string()))?;
        Ok(Self::new(program, parts.collect()))
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// 以 `dir` 为工作目录构造 `Command`
    pub fn command_in(&self, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).current_dir(dir);
        cmd
    }

    /// 将启动失败映射为统一错误
    pub fn spawn_error(&self, e: std::io::Error) -> PpevalError {
        if e.kind() == std::io::ErrorKind::NotFound {
            PpevalError::CommandNotFound {
                command: self.program().to_string(),
            }
        } else {
            PpevalError::CommandFailed {
                command: self.to_string(),
                stderr: e.to_string(),
            }
        }
    }
}

impl std::fmt::Display for ExternalCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        Ok(())
    }
}
