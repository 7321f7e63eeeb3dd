//! # 位置扫描执行器
//!
//! 对同一截断能的一组运行：依次 stage 到 `config_<i>`，
//! 然后在 rayon 线程池中并发启动并等待每个求解器进程。
//! 返回前所有进程必定已经结束（正常退出、失败或超时被杀）。
//!
//! ## 依赖关系
//! - 被 `convergence/controller.rs` 调用
//! - 使用 `dft/run.rs`
//! - 使用 `utils/progress.rs` 创建进度条
//! - 使用 `rayon` 进行并行等待

use crate::dft::run::LOG_FILE;
use crate::dft::{ExternalCommand, RunDescriptor, RunStatus};
use crate::error::{PpevalError, Result};
use crate::utils::progress;

use log::{debug, info, warn};
use rayon::prelude::*;
use std::fs::File;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};

/// 轮询子进程状态的间隔
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// 构型子目录名
pub fn run_dir_name(index: usize) -> String {
    format!("config_{}", index)
}

/// 位置扫描执行器
pub struct PositionSweep {
    /// 求解器命令
    solver: ExternalCommand,
    /// 批次时限，`None` 表示不限
    timeout: Option<Duration>,
}

impl PositionSweep {
    /// 创建新的执行器
    pub fn new(solver: ExternalCommand) -> Self {
        Self {
            solver,
            timeout: None,
        }
    }

    /// 设置批次时限
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    /// stage 并运行整个批次，按输入顺序返回每个运行的状态
    ///
    /// stage 失败（目录已存在等）直接返回错误，此时尚未启动任何进程。
    pub fn run(&self, batch_dir: &Path, runs: &mut [RunDescriptor]) -> Result<Vec<RunStatus>> {
        for (index, run) in runs.iter_mut().enumerate() {
            run.stage(&batch_dir.join(run_dir_name(index)))?;
        }

        let total = runs.len();
        if total > num_cpus::get() {
            warn!(
                "launching {} solver processes on {} logical CPUs",
                total,
                num_cpus::get()
            );
        }
        info!("launching {} runs in {}", total, batch_dir.display());

        let pb = progress::create_progress_bar(total as u64, "Waiting for solver");
        let deadline = self.timeout.map(|t| Instant::now() + t);

        // 每个运行独占一个线程，保证同时启动
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(total.max(1))
            .build()
            .map_err(|e| PpevalError::Other(format!("failed to build thread pool: {}", e)))?;

        let statuses: Vec<RunStatus> = pool.install(|| {
            runs.par_iter()
                .with_max_len(1)
                .map(|run| {
                    let status = self.launch_and_wait(run, deadline);
                    pb.inc(1);
                    status
                })
                .collect()
        });

        pb.finish_and_clear();
        Ok(statuses)
    }

    /// 启动单个运行并等待结束
    fn launch_and_wait(&self, run: &RunDescriptor, deadline: Option<Instant>) -> RunStatus {
        let Some(work_dir) = run.work_dir() else {
            return RunStatus::Failed("run is not staged".to_string());
        };

        let log_path = work_dir.join(LOG_FILE);
        let log = match File::create(&log_path) {
            Ok(f) => f,
            Err(e) => return RunStatus::Failed(format!("{}: {}", log_path.display(), e)),
        };

        let mut child = match run.execute(&self.solver, log) {
            Ok(child) => child,
            Err(e) => return RunStatus::Failed(e.to_string()),
        };

        match wait_with_deadline(&mut child, deadline) {
            Ok(status) => status,
            Err(e) => RunStatus::Failed(e.to_string()),
        }
    }
}

/// 等待子进程；超过 `deadline` 则杀掉并回收
fn wait_with_deadline(child: &mut Child, deadline: Option<Instant>) -> std::io::Result<RunStatus> {
    let Some(deadline) = deadline else {
        return child.wait().map(RunStatus::Exited);
    };

    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(RunStatus::Exited(status));
        }
        if Instant::now() >= deadline {
            kill_run(child);
            child.wait()?;
            return Ok(RunStatus::TimedOut);
        }
        thread::sleep(POLL_INTERVAL);
    }
}

/// 终止整个运行：先杀进程组，再杀直接子进程
///
/// 进程可能恰好在此刻退出，两步都允许失败。
fn kill_run(child: &mut Child) {
    #[cfg(unix)]
    {
        let group = format!("-{}", child.id());
        match Command::new("kill")
            .args(["-s", "KILL", "--", &group])
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
        {
            Ok(status) if status.success() => {}
            Ok(status) => debug!("kill of process group {} {}", group, status),
            Err(e) => warn!("failed to run kill for process group {}: {}", group, e),
        }
    }
    let _ = child.kill();
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::dft::staging::format_decimal;
    use crate::dft::RunInputs;
    use crate::models::AtomicConfiguration;
    use std::collections::BTreeMap;
    use std::fs;

    fn runs(dir: &Path, n: usize) -> Vec<RunDescriptor> {
        fs::write(dir.join("argvf.template"), "gcut {gcut}\n").unwrap();
        fs::write(dir.join("crystal.template"), "lattice\nSi\n").unwrap();
        let inputs = RunInputs {
            pseudopotentials: BTreeMap::new(),
            cutoff_template: dir.join("argvf.template"),
            structure_template: dir.join("crystal.template"),
        };
        (0..n)
            .map(|i| {
                RunDescriptor::new(
                    inputs.clone(),
                    AtomicConfiguration::new(vec![[0.1 * i as f64, 0.0, 0.0]]),
                    20.0,
                )
            })
            .collect()
    }

    fn script(dir: &Path, body: &str) -> ExternalCommand {
        let path = dir.join("solver.sh");
        fs::write(&path, body).unwrap();
        ExternalCommand::new("sh", vec![path.display().to_string()])
    }

    #[test]
    fn test_sweep_runs_every_config_in_own_dir() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("gcut_20.0");
        fs::create_dir(&batch).unwrap();

        let mut runs = runs(dir.path(), 3);
        let solver = script(dir.path(), "cat data/crystal > diaryf\necho done\n");
        let statuses = PositionSweep::new(solver).run(&batch, &mut runs).unwrap();

        assert_eq!(statuses.len(), 3);
        for (i, status) in statuses.iter().enumerate() {
            assert!(matches!(status, RunStatus::Exited(s) if s.success()));
            let out = fs::read_to_string(batch.join(run_dir_name(i)).join("diaryf")).unwrap();
            let x = format_decimal(0.1 * i as f64);
            assert!(out.contains(&format!("Si {} 0.0 0.0", x)));
            let log = fs::read_to_string(batch.join(run_dir_name(i)).join(LOG_FILE)).unwrap();
            assert_eq!(log.trim(), "done");
        }
    }

    #[test]
    fn test_sweep_runs_concurrently() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("gcut_20.0");
        fs::create_dir(&batch).unwrap();

        let mut runs = runs(dir.path(), 4);
        let solver = script(dir.path(), "sleep 1\n");
        let start = Instant::now();
        let statuses = PositionSweep::new(solver).run(&batch, &mut runs).unwrap();

        assert!(statuses.iter().all(|s| s.may_have_output()));
        assert!(start.elapsed() < Duration::from_secs(3));
    }

    #[test]
    fn test_sweep_timeout_kills_runs() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("gcut_20.0");
        fs::create_dir(&batch).unwrap();

        let mut runs = runs(dir.path(), 2);
        let solver = script(dir.path(), "sleep 30\n");
        let start = Instant::now();
        let statuses = PositionSweep::new(solver)
            .with_timeout(Some(Duration::from_millis(300)))
            .run(&batch, &mut runs)
            .unwrap();

        assert_eq!(statuses, vec![RunStatus::TimedOut, RunStatus::TimedOut]);
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[test]
    fn test_timeout_kills_solver_children() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("gcut_20.0");
        fs::create_dir(&batch).unwrap();

        // 模拟 mpirun：后台 rank 比启动器活得更久
        let mut runs = runs(dir.path(), 1);
        let solver = script(dir.path(), "(sleep 1; touch rank_survived) &\nwait\n");
        let statuses = PositionSweep::new(solver)
            .with_timeout(Some(Duration::from_millis(200)))
            .run(&batch, &mut runs)
            .unwrap();
        assert_eq!(statuses, vec![RunStatus::TimedOut]);

        thread::sleep(Duration::from_millis(1500));
        assert!(!batch.join(run_dir_name(0)).join("rank_survived").exists());
    }

    #[test]
    fn test_sweep_fails_on_existing_run_dir() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("gcut_20.0");
        fs::create_dir_all(batch.join(run_dir_name(1))).unwrap();

        let mut runs = runs(dir.path(), 2);
        let solver = script(dir.path(), "exit 0\n");
        let err = PositionSweep::new(solver).run(&batch, &mut runs).unwrap_err();
        assert!(matches!(err, PpevalError::AlreadyExists { .. }));
    }

    #[test]
    fn test_missing_solver_is_failed_status() {
        let dir = tempfile::tempdir().unwrap();
        let batch = dir.path().join("gcut_20.0");
        fs::create_dir(&batch).unwrap();

        let mut runs = runs(dir.path(), 1);
        let solver = ExternalCommand::parse("no-such-socorro-binary").unwrap();
        let statuses = PositionSweep::new(solver).run(&batch, &mut runs).unwrap();
        assert!(matches!(statuses[0], RunStatus::Failed(_)));
    }
}
