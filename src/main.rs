#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = paperwright_rust::run().await {
        eprintln!("paperwright-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
