//! # evaluate 子命令 CLI 定义
//!
//! 截断能收敛扫描的全部输入、外部程序和惩罚值
//!
//! ## 依赖关系
//! - 被 `cli/mod.rs` 使用
//! - 参数传递给 `commands/evaluate.rs`

use clap::Args;
use std::path::PathBuf;

/// evaluate 子命令参数
#[derive(Args, Debug)]
pub struct EvaluateArgs {
    // ─────────────────────────────────────────────────────────────
    // Pseudopotentials
    // ─────────────────────────────────────────────────────────────
    /// Element symbols (comma-separated), one PAW.<symbol> file each
    #[arg(long, value_delimiter = ',', required = true)]
    pub elements: Vec<String>,

    /// Directory containing the PAW.<symbol> pseudopotential files
    #[arg(long, default_value = ".")]
    pub pp_dir: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // Cutoff sweep
    // ─────────────────────────────────────────────────────────────
    /// Wavefunction cutoffs to sweep, ascending (comma-separated)
    #[arg(long, value_delimiter = ',', required = true)]
    pub cutoffs: Vec<f64>,

    /// Absolute energy tolerance between consecutive cutoffs
    #[arg(long, default_value_t = 3e-3)]
    pub tolerance: f64,

    // ─────────────────────────────────────────────────────────────
    // Input files
    // ─────────────────────────────────────────────────────────────
    /// Solver input template containing {gcut} and {4gcut}
    #[arg(long, default_value = "argvf.template")]
    pub cutoff_template: PathBuf,

    /// Crystal structure template (atom lines last)
    #[arg(long, default_value = "crystal.template")]
    pub structure_template: PathBuf,

    /// Atomic configurations, one per row (x y z per atom)
    #[arg(long, default_value = "configurations.in")]
    pub configurations: PathBuf,

    /// Reference forces, one row per configuration
    #[arg(long, default_value = "allelectron_forces.dat")]
    pub reference_forces: PathBuf,

    /// Root directory for gcut_* run directories
    #[arg(long, default_value = "ppeval_runs")]
    pub work_dir: PathBuf,

    // ─────────────────────────────────────────────────────────────
    // External programs
    // ─────────────────────────────────────────────────────────────
    /// Solver command line (e.g. 'mpirun -np 4 socorro')
    #[arg(long, env = "PPEVAL_SOLVER", default_value = "socorro")]
    pub solver: String,

    /// Cost estimation command, run inside each converged run directory
    #[arg(long, env = "PPEVAL_COST_TOOL", default_value = "calc_nflops")]
    pub cost_tool: String,

    /// Wall-clock limit per cutoff batch in seconds (0 disables)
    #[arg(long, default_value_t = 86400)]
    pub timeout: u64,

    // ─────────────────────────────────────────────────────────────
    // Failure penalties
    // ─────────────────────────────────────────────────────────────
    /// Objective value reported when a solver run is incomplete
    #[arg(long, default_value_t = 100.0)]
    pub solver_failure_penalty: f64,

    /// Objective value reported when no cutoff converges
    #[arg(long, default_value_t = 95.0)]
    pub no_convergence_penalty: f64,

    // ─────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────
    /// Write energies per cutoff to CSV
    #[arg(long)]
    pub history_csv: Option<PathBuf>,

    /// Write converged forces in reference-table layout
    #[arg(long)]
    pub forces_out: Option<PathBuf>,

    /// Write objectives record to CSV
    #[arg(long)]
    pub objectives_out: Option<PathBuf>,
}
