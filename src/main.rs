use clap::{Args, Parser, Subcommand};
use pastec_batch::config::{Config, OutputPaths, RunMode};
use pastec_batch::{logger, App};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::error;

/// Pastec 批量索引 / 搜索工具
#[derive(Parser)]
#[command(name = "pastec-batch", version, about = "Perform Pastec API batch indexing and searches.")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// 批量添加图片到索引
    Add(RunArgs),
    /// 批量以图搜图
    Search(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// 测试模式：只处理前 100 张图片
    #[arg(long)]
    testing: bool,
    /// 源 CSV 文件路径
    #[arg(long)]
    csv: Option<PathBuf>,
    /// 图片根目录
    #[arg(long)]
    base_path: Option<PathBuf>,
    /// 每批并发数量
    #[arg(long)]
    batch_size: Option<usize>,
    /// 每处理多少张保存一次索引（仅 add）
    #[arg(long)]
    save_interval: Option<usize>,
    /// TOML 配置文件
    #[arg(long, env = "PASTEC_CONFIG")]
    config: Option<PathBuf>,
}

impl RunArgs {
    fn into_config(self) -> anyhow::Result<Config> {
        let mut config = Config::load(self.config.as_deref())?;

        if self.testing {
            config.test_mode = true;
        }
        if let Some(csv) = self.csv {
            config.source_csv = csv;
        }
        if let Some(base_path) = self.base_path {
            config.base_path = base_path;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(save_interval) = self.save_interval {
            config.save_interval = save_interval;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let (mode, args) = match cli.command {
        Command::Add(args) => (RunMode::Submit, args),
        Command::Search(args) => (RunMode::Query, args),
    };

    // 加载配置
    let config = match args.into_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("配置加载失败: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // 初始化日志
    let paths = OutputPaths::for_mode(&config, mode);
    if let Err(e) = logger::init(&paths.log_file) {
        eprintln!("{:#}", e);
        return ExitCode::FAILURE;
    }

    // 初始化并运行应用
    let app = match App::initialize(config, mode) {
        Ok(app) => app,
        Err(e) => {
            error!("❌ 初始化失败: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match app.run().await {
        Ok(_) => ExitCode::SUCCESS,
        Err(_) => ExitCode::FAILURE,
    }
}
