#[tokio::main]
async fn main() {
    if let Err(error) = killfeed_lib::run().await {
        eprintln!("killfeed: {error}");
        std::process::exit(1);
    }
}
