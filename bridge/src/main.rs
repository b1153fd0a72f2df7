mod auth;
mod broker;
mod clock;
mod error;
mod kv;
mod routes;
mod server;
mod store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    server::run().await
}
