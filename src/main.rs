#[tokio::main]
async fn main() {
    if let Err(e) = healthstats_lib::run().await {
        eprintln!("healthstats: {e}");
        std::process::exit(1);
    }
}
