use anyhow::Result;

#[tokio::main]
async fn main() -> Result<()> {
    critic::run().await
}
