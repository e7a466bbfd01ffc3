use updater::runtime::{boot, serve};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    boot::init_logging();
    let (watcher, _config) = boot::boot().await?;
    serve::serve(watcher).await
}
