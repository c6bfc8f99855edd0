use std::path::Path;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, error};
use tracing_subscriber::{EnvFilter, fmt};
use unfold_config::AppConfig;

mod cli;
mod commands;
mod report;

use cli::Cli;
use commands::RunContext;

fn main() {
    let cli = Cli::parse();

    let config = match load_configuration(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err:#}");
            std::process::exit(1);
        }
    };
    init_logging(&config);
    debug!(level = %config.logging.level, "配置已加载");

    let result = RunContext::new(config, cli.json).and_then(|ctx| commands::run(cli.command, &ctx));
    if let Err(err) = result {
        error!(error = %format!("{err:#}"), "命令执行失败");
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

/// 显式路径优先，否则按环境变量与默认位置自动发现；文件存在但无效时报错。
fn load_configuration(override_path: Option<&Path>) -> Result<AppConfig> {
    match override_path {
        Some(path) => AppConfig::from_file(path)
            .with_context(|| format!("cannot load configuration {}", path.display())),
        None => AppConfig::discover().context("cannot load configuration"),
    }
}

/// `RUST_LOG` 优先于配置中的日志等级；日志写到 stderr，stdout 留给报告。
fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(config.logging.level.clone()))
        .unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(filter).with_writer(std::io::stderr);
    if subscriber.try_init().is_err() {
        // 已初始化，忽略
    }
}
