//! `agentchat chat`: Talk to a running gateway.

use std::io::Write;

use agentchat_client::{ChatClient, LogEntry, StreamReducer};
use agentchat_core::event::StreamEvent;
use tokio::io::{AsyncBufReadExt, BufReader};

pub async fn run(
    message: Option<String>,
    stream: bool,
    url: String,
    verbose: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let client = ChatClient::new(url);
    let mut reducer = StreamReducer::new();

    if let Some(msg) = message {
        send(&client, &mut reducer, &msg, stream, verbose).await;
        return Ok(());
    }

    println!("agentchat: connected to {}", client.url());
    println!("   Mode: {}", if stream { "streaming" } else { "collected" });
    println!("   Type 'exit' or 'quit' to leave.");
    println!();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("> ");
        std::io::stdout().flush()?;

        let Some(line) = lines.next_line().await? else {
            break;
        };
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if matches!(line, "exit" | "quit") {
            break;
        }

        send(&client, &mut reducer, line, stream, verbose).await;
        println!();
    }

    Ok(())
}

/// One turn. Failures are already folded into the transcript.
async fn send(
    client: &ChatClient,
    reducer: &mut StreamReducer,
    message: &str,
    stream: bool,
    verbose: bool,
) {
    let result = if stream {
        let outcome = client
            .stream_chat(message, reducer, |event| {
                if let StreamEvent::Content { content } = event {
                    print!("{content}");
                    let _ = std::io::stdout().flush();
                }
            })
            .await;
        println!();
        outcome
    } else {
        client.chat(message, reducer).await
    };

    if let Err(e) = &result {
        tracing::debug!(error = %e, "Chat request failed");
    }

    // Streaming already printed the answer as it arrived
    let printed = stream && !reducer.answer().is_empty() && !reducer.errored();
    if !printed && let Some(last) = reducer.transcript().last() {
        println!("{}", last.content);
    }

    if verbose {
        dump("AI activity", reducer.ai_activity());
        dump("Server log", reducer.server_log());
    }
}

fn dump(title: &str, entries: &[LogEntry]) {
    println!();
    println!("── {title} ({}) ──", entries.len());
    for entry in entries {
        println!("[{}] {:?}: {}", entry.timestamp, entry.kind, entry.message);
    }
}
