#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if let Err(e) = reportcard_rust::run().await {
        eprintln!("reportcard-rust fatal: {e:#}");
        std::process::exit(1);
    }
    Ok(())
}
