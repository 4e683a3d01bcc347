//! Example: stream a generation and save it to the local history.
//!
//! Run with: `GEMINI_API_KEY=... cargo run --example generate`
//!
//! Without a key the demo falls back to a canned mock response.

use std::io::Write;

use penpal_studio::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let config = StudioConfig::from_env()?;
    let (mut studio, report) = match &config.api_key {
        Some(_) => Studio::from_config(&config).await?,
        None => {
            println!("GEMINI_API_KEY not set; using a mock backend.");
            let client = StudioClientBuilder::new("mock-key")
                .with_routing(config.routing.clone())
                .with_mock(|request| {
                    println!("[mock] routed to {}", request.model);
                    Ok(vec![
                        "Old stones exhale,\n".to_string(),
                        "moss swallows the name carved there,\n".to_string(),
                        "rain keeps the ledger.".to_string(),
                    ])
                })
                .build()?;
            let store = FileStore::open(&config.data_dir).await?;
            Studio::open(client, store, config.history_capacity).await?
        }
    };

    for warning in &report.warnings {
        println!("History recovered with a warning: {warning:?}");
    }

    let params = GenerationParams::new(ContentType::Poem)
        .with_genre("Horror")
        .with_tone("Eerie")
        .with_length(Length::Short)
        .with_creativity(0.9)
        .with_input("style", "Haiku")
        .with_input("theme", "decay");

    let mut printed = 0;
    let report = studio
        .generate(params, |snapshot| {
            // Snapshots are cumulative; print only the new tail.
            print!("{}", &snapshot[printed..]);
            let _ = std::io::stdout().flush();
            printed = snapshot.len();
        })
        .await?;

    let metrics = &report.result.metrics;
    println!("\n\n--- {} ({:?}) ---", metrics.model_used, report.tier);
    println!(
        "{} ms, ~{} tokens, {:.1} tokens/s",
        metrics.duration_ms,
        metrics.estimated_token_count,
        metrics.tokens_per_second()
    );

    match report.save {
        SaveStatus::Saved { remaining_slots } => {
            println!("Saved. {remaining_slots} history slots left.")
        }
        SaveStatus::StorageFull => println!("History is full; delete an entry to save more."),
        SaveStatus::WriteFailed { message } => println!("Could not save: {message}"),
    }

    Ok(())
}
