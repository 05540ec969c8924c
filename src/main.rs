use meshlens::cli;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present; only surface real read errors.
    if let Err(e) = dotenvy::dotenv() {
        if !e.to_string().contains("not found") {
            eprintln!("Warning: Error loading .env file: {}", e);
        }
    }

    cli::run_cli().await
}
