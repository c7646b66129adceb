//! Demo Sender
//!
//! Reads lines from stdin and sends each one as a message through the
//! named channel. Start the receiver first or second; either order works.

use pagepipe::SenderChannel;
use std::io::{self, BufRead, Write};

fn main() {
    tracing_subscriber::fmt::init();

    let channel_name = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "pagepipe_demo".to_string());

    println!("[Sender] Opening channel: {}", channel_name);

    let mut sender = match SenderChannel::open(&channel_name) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("[Sender] Failed to open channel: {}", e);
            std::process::exit(1);
        }
    };

    println!(
        "[Sender] Channel open, chunk capacity {} bytes",
        sender.capacity()
    );
    println!("[Sender] Type a line to send it; Ctrl+D to exit");

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("> ");
        stdout.flush().unwrap();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break,
            Ok(_) => {}
            Err(e) => {
                eprintln!("[Sender] stdin error: {}", e);
                break;
            }
        }

        let body = line.trim_end().as_bytes().to_vec();
        match sender.send_message(|w| w.write_bytes(&body)) {
            Ok(()) => println!("[Sender] Delivered {} bytes", body.len()),
            Err(e) => {
                eprintln!("[Sender] Send failed: {}", e);
                break;
            }
        }
    }

    println!("[Sender] Bye");
}
