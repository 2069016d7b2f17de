//! LTE/EPC 场景仿真
//!
//! 远端主机经网关向移动 UE 发送批量 TCP 与突发 UDP 流量，结束时输出按流统计的 JSON 报告。

use std::error::Error;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use ltesim_rs::config::ScenarioConfig;
use ltesim_rs::lte::{RemConfig, write_rem_to_path};
use ltesim_rs::scenario::Scenario;
use tracing::error;

#[derive(Debug, Parser)]
#[command(name = "lte-sim", about = "LTE 场景仿真：远端主机 -> 网关 -> 基站 -> 移动 UE")]
struct Args {
    /// 仿真时长（秒），覆盖配置文件中的 `sim_duration_s`
    #[arg(long)]
    sim_time: Option<f64>,

    /// JSON 场景配置文件；不填则使用默认场景
    #[arg(long)]
    config: Option<PathBuf>,

    /// 随机种子，覆盖配置文件中的 `seed`
    #[arg(long)]
    seed: Option<u64>,

    /// 流统计报告输出路径；`-` 表示标准输出
    #[arg(long, default_value = "flowmon-lte.json")]
    report: PathBuf,

    /// 输出无线环境图（REM）；网格参数取配置文件中的 `rem`，缺省为 200x200 覆盖 [0,200]^2
    #[arg(long)]
    rem_output: Option<PathBuf>,
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_file(true)
        .with_line_number(true)
        .with_target(true)
        .init();

    let args = Args::parse();
    match run(args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{e}");
            let mut source = e.source();
            while let Some(s) = source {
                error!("  caused by: {s}");
                source = s.source();
            }
            ExitCode::FAILURE
        }
    }
}

fn run(args: Args) -> Result<(), Box<dyn Error>> {
    let mut config = match &args.config {
        Some(path) => ScenarioConfig::from_path(path)?,
        None => ScenarioConfig::default(),
    };
    if let Some(t) = args.sim_time {
        config.sim_duration_s = t;
    }
    if let Some(seed) = args.seed {
        config.seed = seed;
    }
    let rem_cfg = config.rem.unwrap_or_default();

    let mut scenario = Scenario::build(config)?;
    if let Some(path) = &args.rem_output {
        rem_cfg.validate()?;
        write_rem_to_path(&scenario.rem(&rem_cfg), path)?;
    }
    scenario.run();
    let report = scenario.finish();
    report.write_to_path(&args.report)?;
    Ok(())
}
