#[tokio::main]
async fn main() {
    if let Err(err) = hv_api::run().await {
        tracing::error!(error = %err, "hv-api failed");
        std::process::exit(1);
    }
}
