//! Streaming Chat Demo
//!
//! Sends one message to the PadLM backend and prints the response as it
//! streams in.
//!
//! Run with:
//!   PADLM_API_KEY=... PADLM_API_URL=... cargo run --example streaming_chat -- "Your message"

use anyhow::Result;
use futures::StreamExt;
use std::env;
use std::io::{self, Write};

use padlm_sdk::{ChatMessage, PadLmChat};

#[tokio::main]
async fn main() -> Result<()> {
    // Set RUST_LOG=padlm_sdk=debug to see wire-level details
    tracing_subscriber::fmt()
        .with_env_filter("streaming_chat=info,padlm_sdk=warn")
        .init();

    let args: Vec<String> = env::args().collect();
    let user_message = if args.len() > 1 {
        args[1..].join(" ")
    } else {
        "Tell me a short story about a lighthouse.".to_string()
    };

    let chat = PadLmChat::from_env()?
        .with_model(env::var("PADLM_MODEL").unwrap_or_default())
        .with_max_tokens(1024);

    println!("You: {user_message}\n");

    let messages = vec![ChatMessage::human(user_message)];
    let mut fragments = chat.stream_with(&messages, None, &Default::default()).await?;

    while let Some(fragment) = fragments.next().await {
        print!("{}", fragment?);
        io::stdout().flush()?;
    }
    println!();

    Ok(())
}
