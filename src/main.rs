use localchat::logging;
use tui_app::AppConfig;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 终端界面占用屏幕，日志只写文件
    let _guard = logging::init_file_logging()?;

    let config = AppConfig::from_env();
    tracing::info!("预设模型: {:?}", config.presets);

    tui_app::run_chat(config).await?;

    Ok(())
}
