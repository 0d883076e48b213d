use std::path::PathBuf;

use clap::{Parser, Subcommand};
use takeoff_config::{AppConfig, ConfigError};
use takeoff_pipeline::{Pipeline, StageContext, Toolkit};
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, fmt};

/// 建筑图纸工程量提取与材料估算。
#[derive(Debug, Parser)]
#[command(name = "takeoff", version, about)]
struct Cli {
    /// 配置文件路径；缺省时读取 `TAKEOFF_CONFIG` 或 `./config/default.toml`
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
enum Command {
    /// 按默认顺序运行全部阶段
    Run,
    /// PDF 文本提取
    Text,
    /// PDF 表格提取
    Tables,
    /// PDF 光栅化后 OCR
    Ocr,
    /// PDF 矢量路径提取
    Vector,
    /// DXF 房间、面积与图层材料提取
    Cad,
    /// 材料用量估算
    Estimate,
    /// 生成最终报告
    Report,
    /// 图像目标检测
    Detect,
}

impl Command {
    fn stage_name(self) -> Option<&'static str> {
        match self {
            Command::Run => None,
            Command::Text => Some("text"),
            Command::Tables => Some("tables"),
            Command::Ocr => Some("ocr"),
            Command::Vector => Some("vector"),
            Command::Cad => Some("cad"),
            Command::Estimate => Some("estimate"),
            Command::Report => Some("report"),
            Command::Detect => Some("detect"),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    let config = load_configuration(cli.config);
    init_logging(&config);
    info!(
        input = %config.paths.input_dir.display(),
        output = %config.paths.output_dir.display(),
        project = %config.paths.project,
        "启动工程量提取"
    );

    let command = cli.command.unwrap_or(Command::Run);
    let pipeline = match command.stage_name() {
        None => Pipeline::standard(),
        Some(name) => match Pipeline::single(name) {
            Some(pipeline) => pipeline,
            None => {
                error!(stage = name, "未知阶段");
                std::process::exit(2);
            }
        },
    };

    let context = StageContext::new(&config, Toolkit::from_config(&config.tools));
    let summary = pipeline.run(&context);
    for outcome in &summary.outcomes {
        println!("{outcome}");
    }

    if !summary.is_success() {
        error!(
            failed = ?summary.failed_stages(),
            failures = summary.failure_count(),
            "部分阶段失败"
        );
        std::process::exit(1);
    }
    info!("全部阶段完成");
}

fn load_configuration(override_path: Option<PathBuf>) -> AppConfig {
    match override_path {
        Some(path) => AppConfig::from_file(&path).unwrap_or_else(|err| {
            warn!(path = %path.display(), error = %err, "加载指定配置失败，使用默认配置");
            AppConfig::default()
        }),
        None => match AppConfig::discover() {
            Ok(cfg) => cfg,
            Err(err) => {
                match &err {
                    ConfigError::Io { path, .. } | ConfigError::Parse { path, .. } => {
                        warn!(path = %path.display(), error = %err, "加载默认配置失败，使用内建默认值");
                    }
                    ConfigError::Invalid { .. } | ConfigError::Context { .. } => {
                        warn!(error = %err, "加载默认配置失败，使用内建默认值");
                    }
                }
                AppConfig::default()
            }
        },
    }
}

fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_new(config.logging.level.clone()).unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
