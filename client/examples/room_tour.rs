use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chorus_client::model::{DocPath, Room, RoomDraft};
use chorus_client::{
    Client, ClientConfig, Handler, MemoryAuth, MemorySession, MemoryStore, Notice, RemoteStore,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Prints whatever the receiver hands over
struct Printer;

#[async_trait]
impl Handler for Printer {
    async fn on_notice(&mut self, notice: &Notice) {
        println!("{notice}");
    }

    async fn on_rooms(&mut self, rooms: &[Room]) {
        for room in rooms {
            println!(
                "  room {:<8} {:<16} {} listening, {} on mic",
                room.id,
                room.title,
                room.listener_count(),
                room.speakers.len()
            );
        }
    }

    async fn on_room_update(&mut self, room: &Room) {
        println!("active room {} now has {} listeners", room.id, room.listener_count());
    }

    async fn on_evicted(&mut self, room: &Room) {
        println!("room {} was closed, back to the lobby", room.id);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let store = MemoryStore::new();
    store.seed(
        &DocPath::room("lobby"),
        json!({ "title": "Lobby", "hostId": "system", "listeners": 4, "speakers": [] }),
    );

    let (client, mut receiver) = Client::connect(
        ClientConfig::default(),
        Arc::new(store.clone()),
        Arc::new(MemoryAuth::new()),
        Arc::new(MemorySession::new()),
    )?;
    let mut printer = Printer;

    let user = client.sign_up("mira@example.com", "secret1", "Mira").await?;
    println!("signed up as {} (#{})", user.name, user.custom_id.unwrap_or_default());
    receiver.drain(&mut printer).await;

    println!("-- joining the lobby");
    client.join_by_id("lobby").await?;
    client.take_seat(2).await?;
    let unmuted = !client.toggle_mute();
    println!("microphone on: {unmuted}");
    receiver.drain(&mut printer).await;

    println!("-- opening a room of our own");
    client.leave().await?;
    let draft = RoomDraft {
        title: "Mira's corner".to_string(),
        ..Default::default()
    };
    let room_id = client.create_room(&draft).await?;
    client.join_by_id(&room_id).await?;
    client.minimize();
    println!("view: {:?}", client.view());
    receiver.drain(&mut printer).await;

    println!("-- the room disappears");
    store.delete(&DocPath::room(room_id)).await?;
    receiver.drain(&mut printer).await;
    println!("view: {:?}", client.view());

    client.sign_out().await?;
    receiver.drain(&mut printer).await;
    client.shutdown();

    Ok(())
}
