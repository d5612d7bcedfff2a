#[tokio::main]
async fn main() {
    if let Err(e) = importer_wine_crawler_lib::run().await {
        eprintln!("crawl run failed: {e:#}");
        std::process::exit(1);
    }
}
