use std::sync::Arc;

use anyhow::Result;
use chorus_client::{
    Client, ClientConfig, FileSession, IdentityToolkit, MemoryStore, Notice,
};
use tracing_subscriber::EnvFilter;

struct Toasts;

#[async_trait::async_trait]
impl chorus_client::Handler for Toasts {
    async fn on_notice(&mut self, notice: &Notice) {
        println!("{notice}");
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let email = std::env::var("CHORUS_EMAIL").expect("Set CHORUS_EMAIL environment variable");
    let password =
        std::env::var("CHORUS_PASSWORD").expect("Set CHORUS_PASSWORD environment variable");

    let config = ClientConfig::from_env()?;
    let auth = IdentityToolkit::from_config(&config)?;
    let session = FileSession::new(config.session_path.clone());

    let (client, mut receiver) = Client::connect(
        config,
        Arc::new(MemoryStore::new()),
        Arc::new(auth),
        Arc::new(session),
    )?;

    if let Some(user) = client.resume().await? {
        println!("Resumed session for {}", user.name);
        return Ok(());
    }

    let result = client.sign_in(&email, &password).await;
    receiver.drain(&mut Toasts).await;

    let user = result?;
    println!("Signed in as: {} (admin: {})", user.name, user.is_admin);

    Ok(())
}
