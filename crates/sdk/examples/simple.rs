//! Simple SDK Example
//!
//! Submits a job, follows its status stream and prints the result.
//!
//! # Usage
//!
//! ```bash
//! FAL_KEY=... cargo run --package falqueue-sdk --example simple
//! ```

use falqueue_sdk::{FalClient, QueuePriority};
use serde_json::json;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("Falqueue SDK - Simple Example");
    println!("=============================\n");

    let client = FalClient::from_env()?;
    let identifier = "fal-ai/fast-sdxl";

    // 1. Submit
    let input = json!({"prompt": "a lighthouse at dusk, oil painting"});
    let request = client
        .request(identifier, input.as_object().cloned().unwrap_or_default())
        .with_priority(QueuePriority::Normal);
    let submitted = client.queue().submit(&request)?;
    if let Some(error) = submitted.error() {
        println!("Submission failed: {}", error);
        return Ok(());
    }
    let request_id = submitted
        .request_id()
        .ok_or("submission returned no request id")?
        .to_string();
    println!("1. Submitted: {}\n", request_id);

    // 2. Follow the status stream
    println!("2. Status updates:");
    for update in client.queue().stream_status(identifier, &request_id, true)? {
        let update = update?;
        match update.queue_position() {
            Some(position) => println!("   - {:?} (position {})", update.status(), position),
            None => println!("   - {:?}", update.status()),
        }
    }

    // 3. Fetch the result
    let result = client.queue().result(identifier, &request_id)?;
    println!("\n3. Result:\n{}", serde_json::to_string_pretty(&result)?);

    Ok(())
}
