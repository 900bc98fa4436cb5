//! # WISP Client SDK
//!
//! Connect to a relay, authenticate with an Ed25519 identity, and exchange
//! addressed frames with other clients anywhere in the federation.
//!
//! Incoming traffic arrives as typed [`Event`]s on a channel; outgoing
//! traffic goes through [`Client`] methods.
//!
//! ```no_run
//! use wisp_client::{Client, Event};
//! use wisp_crypto::Identity;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let identity = Identity::generate();
//!     let (client, mut events) = Client::connect("ws://127.0.0.1:8080", identity).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         match event {
//!             Event::Authenticated { .. } => {
//!                 client.send(&[0u8; 32], b"hello")?;
//!             }
//!             Event::Message { sender, content, .. } => {
//!                 println!("{}: {:?}", hex::encode(sender), content);
//!             }
//!             Event::Closed => break,
//!             _ => {}
//!         }
//!     }
//!     Ok(())
//! }
//! ```

#![warn(clippy::all)]

mod client;
mod error;
mod event;

pub use client::Client;
pub use error::ClientError;
pub use event::Event;
