use clap::Parser;
use hydra_hub::app::{commands, connect_all};
use hydra_hub::utils::error::{ErrorSeverity, HubError};
use hydra_hub::utils::{logger, validation::Validate};
use hydra_hub::{CliArgs, FileTokenStore, HubConfig, HubControlService, MemoryTokenStore};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = CliArgs::parse();

    // 初始化日誌
    if args.json_logs {
        logger::init_json_logger(args.verbose);
    } else {
        logger::init_cli_logger(args.verbose);
    }

    tracing::info!("🚀 Starting hydra-hub");
    tracing::info!("📁 Loading configuration from: {}", args.config);

    let config = match HubConfig::from_file(&args.config) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ Failed to load config file '{}': {}", args.config, e);
            eprintln!("💡 Make sure the file exists and is valid TOML format");
            std::process::exit(1);
        }
    };

    // 驗證配置
    if let Err(e) = config.validate() {
        tracing::error!("❌ Configuration validation failed: {}", e);
        tracing::error!("💡 Suggestion: {}", e.recovery_suggestion());
        eprintln!("❌ {}", e.user_friendly_message());
        std::process::exit(1);
    }

    if args.verbose {
        tracing::debug!("Hub config: {:?}", config);
    }

    let hub = match connect(&config).await {
        Ok(hub) => hub,
        Err(e) => fail(e),
    };

    match commands::execute(&hub, &args.command).await {
        Ok(output) => {
            println!("{}", serde_json::to_string_pretty(&output)?);
        }
        Err(e) => fail(e),
    }

    Ok(())
}

async fn connect(config: &HubConfig) -> hydra_hub::Result<HubControlService> {
    match config.token_cache_path() {
        Some(path) => {
            let tokens = FileTokenStore::new(path);
            tracing::debug!("🔑 Token cache file: {}", tokens.path().display());
            connect_all(config, &tokens).await
        }
        None => connect_all(config, &MemoryTokenStore::new()).await,
    }
}

fn fail(e: HubError) -> ! {
    // 記錄詳細錯誤信息
    tracing::error!(
        "❌ Command failed: {} (Category: {:?}, Severity: {:?})",
        e,
        e.category(),
        e.severity()
    );
    tracing::error!("💡 Recovery suggestion: {}", e.recovery_suggestion());

    // 輸出用戶友好的錯誤信息
    eprintln!("❌ {}", e.user_friendly_message());
    eprintln!("💡 建議: {}", e.recovery_suggestion());

    // 根據錯誤嚴重程度決定退出碼
    let exit_code = match e.severity() {
        ErrorSeverity::Low => 0,
        ErrorSeverity::Medium => 2,
        ErrorSeverity::High => 1,
        ErrorSeverity::Critical => 3,
    };
    std::process::exit(exit_code)
}
