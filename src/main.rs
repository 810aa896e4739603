use anyhow::{Context, Result};
use push_gateway::{
    cli::{Cli, Commands},
    config::{self, GatewayConfig},
    infra::metrics,
    logging, GatewayHttpServer, HttpServerState, ProviderRegistry, PushDispatcher,
};
use std::fs;
use std::process;
use std::sync::Arc;

#[tokio::main]
async fn main() -> Result<()> {
    // 加载 .env 文件（如果存在）
    let _ = dotenvy::dotenv();

    // 解析命令行参数
    let cli = Cli::parse();

    // 处理子命令
    if let Some(command) = &cli.command {
        match command {
            Commands::GenerateConfig { path } => {
                return generate_config(path);
            }
            Commands::ValidateConfig { path } => {
                return validate_config(path);
            }
            Commands::ShowConfig => {
                return show_config(&cli);
            }
        }
    }

    // 快速读取 config.toml 的 [logging] 段（不加载完整配置）
    let early_log = config::load_early_logging_config(cli.config_file.as_deref());

    // 合并日志配置（优先级：CLI > config.toml > 默认值）
    let log_level = cli
        .get_log_level()
        .or(early_log.level)
        .unwrap_or_else(|| "info".to_string());
    let log_format = cli.get_log_format().or(early_log.format);
    let log_file = cli.log_file.clone().or(early_log.file);

    let _log_guard =
        logging::init_logging(&log_level, log_format.as_deref(), log_file.as_deref(), cli.quiet)?;

    tracing::info!("🚀 Push Gateway starting...");

    // 加载配置（按优先级：命令行 > 环境变量 > 配置文件 > 默认值）
    let config = GatewayConfig::load(&cli).context("加载配置失败")?;

    if cli.dev {
        tracing::info!("🔧 开发模式已启用");
    }

    tracing::info!("📊 Gateway Configuration:");
    tracing::info!("  - HTTP: {}", config.server.bind_address());
    tracing::info!("  - Max Body: {} bytes", config.server.max_body_bytes);
    tracing::info!("  - Vendor Timeout: {}s", config.server.vendor_timeout_secs);
    tracing::info!("  - Vendors: {:?}", config.pusher.configured_vendors());
    tracing::info!("  - Default Vendor: {:?}", config.pusher.default_vendor);
    tracing::info!("  - Metrics: {}", config.server.enable_metrics);

    if config.server.enable_metrics {
        if let Err(e) = metrics::init() {
            tracing::warn!("⚠️ Prometheus 指标初始化失败: {}", e);
        }
    }

    // 创建厂商客户端（任一厂商配置无效则退出）
    let registry =
        match ProviderRegistry::from_config(&config.pusher, config.server.vendor_timeout()) {
            Ok(registry) => registry,
            Err(e) => {
                tracing::error!("❌ 推送客户端初始化失败: {}", e);
                tracing::error!("💡 请检查 [pusher] 段的厂商配置后重试");
                process::exit(1);
            }
        };
    if registry.is_empty() {
        tracing::warn!("⚠️ 没有配置任何厂商通道，所有设备都会投递失败");
    }

    let dispatcher = Arc::new(PushDispatcher::new(Arc::new(registry), config.render.clone()));
    let state = HttpServerState::new(dispatcher, config.server.max_body_bytes);
    let server = GatewayHttpServer::new(state, config.server.bind_address());

    if let Err(e) = server.start().await {
        tracing::error!("❌ 服务器运行失败: {}", e);
        process::exit(1);
    }

    Ok(())
}

/// 生成默认配置文件
fn generate_config(path: &str) -> Result<()> {
    fs::write(path, config::DEFAULT_CONFIG_TOML)
        .with_context(|| format!("无法写入配置文件: {}", path))?;

    println!("✅ 配置文件已生成: {}", path);
    Ok(())
}

/// 验证配置文件
fn validate_config(path: &str) -> Result<()> {
    let mut config = GatewayConfig::from_toml_file(path)
        .with_context(|| format!("配置文件验证失败: {}", path))?;
    config
        .validate()
        .with_context(|| format!("配置文件验证失败: {}", path))?;

    println!("✅ 配置文件有效: {}", path);
    println!("📊 配置摘要:");
    println!("  - HTTP: {}", config.server.bind_address());
    println!("  - Vendors: {:?}", config.pusher.configured_vendors());
    println!("  - Default Vendor: {:?}", config.pusher.default_vendor);

    Ok(())
}

/// 显示最终配置（合并后的配置）
fn show_config(cli: &Cli) -> Result<()> {
    // 初始化基本日志（用于显示配置）
    let _guard = logging::init_logging("info", None, None, false)?;

    let config = GatewayConfig::load(cli).context("加载配置失败")?;

    println!("📊 最终配置（合并后的配置，密钥已隐藏）:");
    println!("{}", serde_json::to_string_pretty(&config.redacted())?);

    Ok(())
}
