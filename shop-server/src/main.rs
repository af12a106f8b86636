use anyhow::Context;
use shop_server::{Config, Server, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // .env 中的变量不覆盖已设置的环境变量
    let _ = dotenv::dotenv();

    let config = Config::from_env();
    setup_environment(&config);

    tracing::info!(
        http_port = config.http_port,
        tcp_port = config.message_tcp_port,
        "Shop server starting..."
    );

    Server::new(config)
        .run()
        .await
        .context("server terminated with an error")?;

    Ok(())
}
