//! Demo: platform detection and extraction payload normalization
//!
//! Run with: cargo run -p mveed-models --example platform_demo

use mveed_models::{detect_platform, VideoMetadata};
use serde_json::json;

fn main() {
    let test_urls = [
        "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
        "https://youtu.be/dQw4w9WgXcQ?t=30",
        "https://vm.tiktok.com/ZM8abc123/",
        "https://www.instagram.com/reel/Cx1/",
        "https://x.com/someone/status/1",
        "https://vimeo.com/123456789",
    ];

    for url in test_urls {
        println!("\n{}", "=".repeat(60));
        println!("INPUT: {}", url);
        println!("{}", "=".repeat(60));

        let Some(platform) = detect_platform(url) else {
            println!("unsupported platform");
            continue;
        };

        let payload = json!({
            "success": true,
            "data": {
                "title": format!("Sample from {}", platform),
                "proxy_url": format!("/api/v1/{}/proxy?video_url={}", platform, url),
            }
        });

        match VideoMetadata::from_payload(&payload, platform) {
            Ok(meta) => println!(
                "{}",
                serde_json::to_string_pretty(&meta).expect("serialization should be infallible")
            ),
            Err(e) => println!("error: {}", e),
        }
    }
}
