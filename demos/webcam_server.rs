//! Webcam-style MJPEG server
//!
//! Run with: cargo run --example webcam_server -- [PORT] [FRAME.jpg ...]
//!
//! Examples:
//!   cargo run --example webcam_server                        # port 8080, synthetic frames
//!   cargo run --example webcam_server 8081 a.jpg b.jpg       # cycles through the files
//!
//! ## Viewing
//!
//! Browser:  http://<host>:8080/video
//! ffplay:   ffplay -f mjpeg http://<host>:8080/video
//! curl:     curl -s http://<host>:8080/status
//!
//! The frame source stands in for a camera capture callback: it submits a new
//! JPEG roughly 30 times per second, and every viewer gets the newest one.

use std::net::{IpAddr, UdpSocket};
use std::path::PathBuf;
use std::time::{Duration, Instant};

use mjpeg_rs::{Settings, StreamService};

fn print_usage() {
    eprintln!("Usage: webcam_server [PORT] [FRAME.jpg ...]");
    eprintln!();
    eprintln!("  PORT        1-65535, default 8080");
    eprintln!("  FRAME.jpg   JPEG files to cycle through; synthetic frames if omitted");
}

/// Address of the interface used for outbound traffic, if any
///
/// Connecting a UDP socket sends nothing; it only selects a route.
fn local_ip() -> Option<IpAddr> {
    let socket = UdpSocket::bind("0.0.0.0:0").ok()?;
    socket.connect("192.0.2.1:80").ok()?;
    socket.local_addr().ok().map(|addr| addr.ip())
}

/// Minimal marker-delimited payload so viewers have something to decode
fn synthetic_frame(counter: u64) -> Vec<u8> {
    let mut data = vec![0xFF, 0xD8];
    data.extend_from_slice(format!("frame {}", counter).as_bytes());
    data.extend_from_slice(&[0xFF, 0xD9]);
    data
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args: Vec<String> = std::env::args().skip(1).collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_usage();
        return Ok(());
    }

    let mut settings = Settings::default();
    let mut files = Vec::new();
    for arg in &args {
        match Settings::parse_port(arg) {
            Ok(port) => settings.port = port,
            Err(_) => files.push(PathBuf::from(arg)),
        }
    }

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mjpeg_rs=debug".parse()?)
                .add_directive("webcam_server=debug".parse()?),
        )
        .init();

    let mut frames = Vec::with_capacity(files.len());
    for path in &files {
        let data = std::fs::read(path)?;
        println!("Loaded {} ({} bytes)", path.display(), data.len());
        frames.push(bytes::Bytes::from(data));
    }

    let service = std::sync::Arc::new(StreamService::new(settings));
    let addr = service.start().await?;

    println!("Listening on {}", addr);
    println!("{}", service.status_text(local_ip()));
    println!("Press Ctrl+C to stop");

    let producer = {
        let service = std::sync::Arc::clone(&service);
        tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = tokio::time::interval(Duration::from_millis(33));
            let mut counter: u64 = 0;

            loop {
                ticker.tick().await;
                let timestamp = started.elapsed().as_millis() as u64;
                let sequence = if frames.is_empty() {
                    service.submit_frame(synthetic_frame(counter), 640, 480, timestamp)
                } else {
                    let data = frames[(counter as usize) % frames.len()].clone();
                    service.submit_frame(data, 640, 480, timestamp)
                };
                counter += 1;

                if sequence % 300 == 0 {
                    if let Some(stats) = service.manager().stats().await {
                        println!(
                            "Stats: viewers={} sessions={} frames_sent={} bytes_sent={}",
                            stats.active_sessions, stats.total_sessions, stats.frames_sent, stats.bytes_sent
                        );
                    }
                }
            }
        })
    };

    tokio::signal::ctrl_c().await?;
    println!();
    println!("Shutting down");

    producer.abort();
    service.shutdown().await;

    Ok(())
}
