//! Example: fill a history with mocked generations, then export it.
//!
//! Run with: `cargo run --example history_export`
//!
//! Exports are written to a temporary directory whose path is printed at the end.

use penpal_studio::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let client = StudioClientBuilder::new("mock-key")
        .with_mock(|request| {
            Ok(vec![format!(
                "A {:?} piece written by {}.",
                request.tier,
                request.model
            )])
        })
        .build()?;
    let (mut studio, _) = Studio::open(client, MemoryStore::new(), 10).await?;

    let requests = [
        GenerationParams::new(ContentType::Story)
            .with_genre("Mystery")
            .with_creativity(0.4)
            .with_input("protagonist", "A retired detective")
            .with_input("setting", "A rain-slicked futuristic Tokyo")
            .with_input("twist", "The detective is a ghost"),
        GenerationParams::new(ContentType::Worldbuilding)
            .with_genre("Fantasy")
            .with_input("worldName", "Aethelgard")
            .with_input("element", "Floating islands")
            .with_input("society", "A guild of sky cartographers"),
        GenerationParams::new(ContentType::Dialogue)
            .with_genre("Comedy")
            .with_tone("Playful")
            .with_input("characters", "Two roommates")
            .with_input("conflict", "Who ate the last slice of pizza"),
    ];

    for params in requests {
        let report = studio.generate(params, |_| {}).await?;
        println!("{} -> {}", report.result.params.content_type, report.result.content);
    }

    let latest = studio.history().all()[0].id.clone();
    studio.rate(&latest, 4).await?;

    let stats = studio.stats();
    println!(
        "\n{} generations, average rating {:.1}, favorite genre {}",
        stats.total_generations,
        stats.average_rating,
        stats.favorite_genre.as_deref().unwrap_or("n/a")
    );
    for (content_type, count) in &stats.by_content_type {
        println!("  {content_type}: {count}");
    }

    let dir = std::env::temp_dir().join("penpal-export-demo");
    tokio::fs::create_dir_all(&dir).await?;
    for format in ExportFormat::ALL {
        let file = studio.export(format)?;
        let path = dir.join(&file.file_name);
        tokio::fs::write(&path, &file.contents).await?;
        println!("Wrote {} ({})", path.display(), file.mime_type);
    }

    Ok(())
}
