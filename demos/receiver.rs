//! Demo Receiver
//!
//! Receives messages from the named channel and prints them until the
//! process is interrupted.

use pagepipe::ReceiverChannel;

fn main() {
    tracing_subscriber::fmt::init();

    let channel_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "pagepipe_demo".to_string());

    println!("[Receiver] Opening channel: {}", channel_name);

    let mut receiver = match ReceiverChannel::open(&channel_name) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("[Receiver] Failed to open channel: {}", e);
            std::process::exit(1);
        }
    };

    println!("[Receiver] Waiting for messages... (Ctrl+C to quit)");

    let mut count = 0u64;
    loop {
        match receiver.receive_message() {
            Ok(message) => {
                count += 1;
                match std::str::from_utf8(&message) {
                    Ok(text) => println!("[Receiver] #{} ({} bytes): {}", count, message.len(), text),
                    Err(_) => println!("[Receiver] #{} ({} bytes, binary)", count, message.len()),
                }
            }
            Err(e) => {
                eprintln!("[Receiver] Receive failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}
