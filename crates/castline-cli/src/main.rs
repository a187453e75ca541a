#[tokio::main]
async fn main() -> anyhow::Result<()> {
    castline_cli::run_command().await
}
