//! # 运行描述符
//!
//! `RunDescriptor` 表示一次求解器调用：给定截断能和原子构型，
//! 先 `stage()` 到一个全新的工作目录，再 `execute()` 启动进程，
//! 进程结束后用 `read_energy()` / `read_forces()` 读取结果。
//!
//! ## 依赖关系
//! - 被 `batch/runner.rs`, `convergence/` 使用
//! - 使用 `dft/staging.rs`, `dft/command.rs`, `parsers/diaryf.rs`

use super::command::ExternalCommand;
use super::staging::{self, CUTOFF_INPUT_FILE, DATA_DIR, STRUCTURE_FILE};
use crate::error::{PpevalError, Result};
use crate::models::{AtomicConfiguration, ForceMatrix};
use crate::parsers::diaryf::{self, OUTPUT_FILE};

use log::debug;
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::process::{Child, ExitStatus, Stdio};

/// 求解器 stdout/stderr 日志文件名
pub const LOG_FILE: &str = "solver.log";

/// 同一扫描中所有运行共享的输入
#[derive(Debug, Clone)]
pub struct RunInputs {
    /// 元素符号 -> 赝势文件 (`PAW.<元素>`)
    pub pseudopotentials: BTreeMap<String, PathBuf>,
    /// 含 `{gcut}`/`{4gcut}` 的输入模板
    pub cutoff_template: PathBuf,
    /// 晶体结构模板
    pub structure_template: PathBuf,
}

impl RunInputs {
    /// 按 `PAW.<元素>` 命名约定在 `pp_dir` 中查找赝势
    pub fn from_pp_dir(
        elements: &[String],
        pp_dir: &Path,
        cutoff_template: PathBuf,
        structure_template: PathBuf,
    ) -> Result<Self> {
        if !pp_dir.is_dir() {
            return Err(PpevalError::DirectoryNotFound {
                path: pp_dir.display().to_string(),
            });
        }

        let mut pseudopotentials = BTreeMap::new();
        for element in elements {
            let path = pp_dir.join(format!("PAW.{}", element));
            if !path.is_file() {
                return Err(PpevalError::FileNotFound {
                    path: path.display().to_string(),
                });
            }
            pseudopotentials.insert(element.clone(), path);
        }

        for template in [&cutoff_template, &structure_template] {
            if !template.is_file() {
                return Err(PpevalError::FileNotFound {
                    path: template.display().to_string(),
                });
            }
        }

        Ok(RunInputs {
            pseudopotentials,
            cutoff_template,
            structure_template,
        })
    }
}

/// 一次运行的终止状态
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunStatus {
    /// 进程自行退出
    Exited(ExitStatus),
    /// 超过批次时限被终止
    TimedOut,
    /// 未能启动或等待失败
    Failed(String),
}

impl RunStatus {
    /// 输出文件是否可信（超时和启动失败的运行一律视为未完成）
    pub fn may_have_output(&self) -> bool {
        matches!(self, RunStatus::Exited(_))
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Exited(status) => write!(f, "exited ({})", status),
            RunStatus::TimedOut => write!(f, "timed out"),
            RunStatus::Failed(reason) => write!(f, "failed: {}", reason),
        }
    }
}

/// 单次求解器调用
#[derive(Debug, Clone)]
pub struct RunDescriptor {
    inputs: RunInputs,
    configuration: AtomicConfiguration,
    cutoff: f64,
    /// `Some` 即已 stage
    work_dir: Option<PathBuf>,
}

impl RunDescriptor {
    pub fn new(inputs: RunInputs, configuration: AtomicConfiguration, cutoff: f64) -> Self {
        RunDescriptor {
            inputs,
            configuration,
            cutoff,
            work_dir: None,
        }
    }

    pub fn cutoff(&self) -> f64 {
        self.cutoff
    }

    pub fn work_dir(&self) -> Option<&Path> {
        self.work_dir.as_deref()
    }

    /// 求解器输出文件（未 stage 时为 `None`）
    pub fn output_path(&self) -> Option<PathBuf> {
        self.work_dir.as_ref().map(|d| d.join(OUTPUT_FILE))
    }

    /// 在全新目录 `work_dir` 中写入所有输入文件
    ///
    /// 目录或任一目标文件已存在时失败。
    pub fn stage(&mut self, work_dir: &Path) -> Result<()> {
        if let Some(existing) = &self.work_dir {
            return Err(PpevalError::AlreadyExists {
                path: existing.display().to_string(),
            });
        }

        let cutoff_template = read_template(&self.inputs.cutoff_template)?;
        let structure_template = read_template(&self.inputs.structure_template)?;

        staging::create_fresh_dir(work_dir)?;

        staging::write_new_file(
            &work_dir.join(CUTOFF_INPUT_FILE),
            &staging::render_cutoff_input(&cutoff_template, self.cutoff),
        )?;

        let data_dir = work_dir.join(DATA_DIR);
        staging::create_fresh_dir(&data_dir)?;
        staging::write_new_file(
            &data_dir.join(STRUCTURE_FILE),
            &staging::render_structure(&structure_template, self.configuration.positions())?,
        )?;
        staging::link_pseudopotentials(&self.inputs.pseudopotentials, &data_dir)?;

        debug!("staged gcut {} run in {}", self.cutoff, work_dir.display());
        self.work_dir = Some(work_dir.to_path_buf());
        Ok(())
    }

    /// 在工作目录中启动求解器，stdout/stderr 写入 `log`
    ///
    /// 不等待进程结束；未 stage 时返回 `NotStaged` 且不产生任何副作用。
    /// Unix 下进程位于以自身 pid 为 id 的新进程组中。
    pub fn execute(&self, solver: &ExternalCommand, log: File) -> Result<Child> {
        let work_dir = self.work_dir.as_ref().ok_or(PpevalError::NotStaged {
            cutoff: self.cutoff,
        })?;

        let log_path = work_dir.join(LOG_FILE);
        let err_log = log.try_clone().map_err(|e| PpevalError::write(&log_path, e))?;

        let mut cmd = solver.command_in(work_dir);
        cmd.stdin(Stdio::null()).stdout(log).stderr(err_log);

        // 独立进程组（组 id = pid），超时时连同 mpirun 派生的进程一起终止
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            cmd.process_group(0);
        }

        cmd.spawn().map_err(|e| solver.spawn_error(e))
    }

    /// 总能量；无输出或无能量行时为 `None`
    pub fn read_energy(&self) -> Option<f64> {
        diaryf::read_energy(&self.output_path()?)
    }

    /// 力矩阵；行数与原子数不符时也视为缺失
    pub fn read_forces(&self) -> Option<ForceMatrix> {
        diaryf::read_forces(&self.output_path()?)
            .filter(|forces| forces.len() == self.configuration.num_atoms())
    }
}

fn read_template(path: &Path) -> Result<String> {
    fs::read_to_string(path).map_err(|e| PpevalError::read(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture(dir: &Path) -> RunInputs {
        fs::write(dir.join("PAW.Si"), "si").unwrap();
        fs::write(dir.join("PAW.Ge"), "ge").unwrap();
        fs::write(dir.join("argvf.template"), "gcut {gcut}\nrhocut {4gcut}\n").unwrap();
        fs::write(dir.join("crystal.template"), "SiGe\n\nlattice\n  2\nSi\nGe\n").unwrap();

        RunInputs::from_pp_dir(
            &["Si".to_string(), "Ge".to_string()],
            dir,
            dir.join("argvf.template"),
            dir.join("crystal.template"),
        )
        .unwrap()
    }

    fn config() -> AtomicConfiguration {
        AtomicConfiguration::new(vec![[0.0, 0.0, 0.1], [0.24, 0.25, 0.26]])
    }

    #[test]
    fn test_from_pp_dir_missing_element() {
        let dir = tempfile::tempdir().unwrap();
        fixture(dir.path());
        let err = RunInputs::from_pp_dir(
            &["C".to_string()],
            dir.path(),
            dir.path().join("argvf.template"),
            dir.path().join("crystal.template"),
        )
        .unwrap_err();
        assert!(err.to_string().contains("PAW.C"));

        let err = RunInputs::from_pp_dir(
            &["Si".to_string()],
            &dir.path().join("missing"),
            dir.path().join("argvf.template"),
            dir.path().join("crystal.template"),
        )
        .unwrap_err();
        assert!(matches!(err, PpevalError::DirectoryNotFound { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_stage_writes_inputs() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = fixture(dir.path());
        let mut run = RunDescriptor::new(inputs, config(), 30.0);

        let work = dir.path().join("config_0");
        run.stage(&work).unwrap();

        assert!(run.work_dir().is_some());
        assert_eq!(run.work_dir(), Some(work.as_path()));
        assert_eq!(
            fs::read_to_string(work.join("argvf")).unwrap(),
            "gcut 30.0\nrhocut 120.0\n"
        );
        assert_eq!(
            fs::read_to_string(work.join("data/crystal")).unwrap(),
            "SiGe\nlattice\n  2\nSi 0.0 0.0 0.1\nGe 0.24 0.25 0.26\n"
        );
        assert_eq!(fs::read_to_string(work.join("data/PAW.Ge")).unwrap(), "ge");
    }

    #[test]
    fn test_stage_into_existing_dir_fails() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = fixture(dir.path());
        let work = dir.path().join("config_0");
        fs::create_dir(&work).unwrap();

        let mut run = RunDescriptor::new(inputs, config(), 30.0);
        let err = run.stage(&work).unwrap_err();
        assert!(matches!(err, PpevalError::AlreadyExists { .. }));
        assert!(run.work_dir().is_none());
    }

    #[test]
    fn test_execute_without_stage_fails() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = fixture(dir.path());
        let run = RunDescriptor::new(inputs, config(), 10.0);

        let log = File::create(dir.path().join("socorro.log")).unwrap();
        let solver = ExternalCommand::parse("true").unwrap();
        let err = run.execute(&solver, log).unwrap_err();
        assert!(matches!(err, PpevalError::NotStaged { .. }));
        assert!(run.output_path().is_none());
        assert!(run.read_energy().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_execute_and_read_results() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = fixture(dir.path());
        let mut run = RunDescriptor::new(inputs, config(), 10.0);
        let work = dir.path().join("config_0");
        run.stage(&work).unwrap();

        let script = dir.path().join("fake_socorro.sh");
        fs::write(
            &script,
            concat!(
                "printf ' cell energy = -312.593586340\\n Atomic forces:\\n",
                " 1 0.246519 0.247743 0.243064\\n",
                " 2 -0.246519 -0.247743 -0.243064\\n\\n' > diaryf\n",
            ),
        )
        .unwrap();
        let solver = ExternalCommand::new("sh", vec![script.display().to_string()]);

        let log = File::create(work.join(LOG_FILE)).unwrap();
        let mut child = run.execute(&solver, log).unwrap();
        assert!(child.wait().unwrap().success());

        assert_eq!(run.read_energy(), Some(-312.593586340));
        let forces = run.read_forces().unwrap();
        assert_eq!(forces.len(), 2);
        assert!((forces[1][2] - (-0.243064)).abs() < 1e-12);
    }

    #[cfg(unix)]
    #[test]
    fn test_read_forces_rejects_wrong_atom_count() {
        let dir = tempfile::tempdir().unwrap();
        let inputs = fixture(dir.path());
        let mut run = RunDescriptor::new(inputs, config(), 10.0);
        let work = dir.path().join("config_0");
        run.stage(&work).unwrap();

        fs::write(
            work.join(OUTPUT_FILE),
            "cell energy = -1.0\nAtomic forces:\n 0.1 0.2 0.3\n\n",
        )
        .unwrap();
        assert_eq!(run.read_energy(), Some(-1.0));
        assert!(run.read_forces().is_none());
    }
}
