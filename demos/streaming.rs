//! Streaming chat example for OpenRouter.
//!
//! This example demonstrates:
//! - Creating a client from environment variables
//! - Refreshing the model catalog
//! - Streaming a reply into a placeholder assistant message
//! - Stopping the reply with Ctrl+C
//!
//! # Usage
//!
//! Set your API key as an environment variable:
//! ```bash
//! export OPENROUTER_API_KEY="sk-or-your-api-key"
//! ```
//!
//! Then run:
//! ```bash
//! cargo run --example streaming -- "Write a haiku about rivers"
//! ```

use chatty_client::observability::{init_tracing, LogConfig, LogLevel};
use chatty_client::{ChattyClient, Message, MessageStatus, StreamEvent};
use futures::StreamExt;
use std::io::Write;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing(&LogConfig::new().level(LogLevel::Warn))?;

    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Write a short story about a robot learning to paint.".to_string());

    println!("=== Chatty Streaming Example ===\n");

    let client = ChattyClient::from_env()?;
    match client.models().refresh().await {
        Ok(count) => println!("Loaded {count} models"),
        Err(e) => println!("Using built-in models ({e})"),
    }
    if let Some(model) = client.models().current() {
        println!("Model: {} ({})\n", model.name, model.id);
    }

    let mut conversation = vec![
        Message::system("You are a helpful assistant."),
        Message::user(prompt),
    ];

    let mut reply = Message::assistant("");
    reply.start_streaming();

    let mut events = client.stream().send(&conversation)?;
    loop {
        tokio::select! {
            event = events.next() => {
                let Some(event) = event else { break };
                if let StreamEvent::Delta { content, .. } = &event {
                    print!("{content}");
                    std::io::stdout().flush()?;
                }
                reply.apply(&event);
            }
            _ = tokio::signal::ctrl_c() => {
                client.stream().stop();
            }
        }
    }

    println!("\n\n=== Summary ===");
    match reply.status {
        MessageStatus::Complete => println!("Status: complete"),
        MessageStatus::Error => println!("Status: failed"),
        other => println!("Status: {other:?}"),
    }
    println!("Tokens streamed: {}", reply.stats.token_count);
    println!("Throughput: {:.1} tokens/s", client.stream().tokens_per_second());
    println!("Total tokens: {}", client.stream().total_tokens_used());
    println!("Estimated cost: ${:.6}", client.stream().estimated_cost());

    conversation.push(reply);
    Ok(())
}
