use localchat::logging;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let _guard = logging::init_file_logging()?;

    tui_app::run_hello().await?;

    Ok(())
}
