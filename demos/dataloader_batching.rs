#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::uninlined_format_args,
    clippy::doc_markdown
)]
//! DataLoader Batching Example
//!
//! Demonstrates using DataLoader for ML-style batched iteration over
//! ragged data:
//! - Configurable batch sizes and pad value
//! - Shuffling with reproducible seeds, reshuffled every epoch
//! - Drop last incomplete batch option
//!
//! Run with: cargo run --example dataloader_batching

use std::sync::Arc;

use vlndata::{DType, DataLoader, Dataset, FrameRef, GroupedDataset, MapFrame};

fn create_sample_dataset(num_samples: usize) -> vlndata::Result<GroupedDataset> {
    let features: Vec<f64> = (0..num_samples).map(|i| i as f64 * 0.1).collect();
    let labels: Vec<f64> = (0..num_samples).map(|i| (i % 3) as f64).collect();
    let hits: Vec<Vec<f64>> = (0..num_samples)
        .map(|i| (0..i % 5).map(|k| (i * 10 + k) as f64).collect())
        .collect();

    let frame: FrameRef = Arc::new(
        MapFrame::builder(DType::Float32)
            .scalar("feature", features)
            .scalar("label", labels)
            .vlarr("hits", hits)
            .build()?,
    );

    Ok(GroupedDataset::new(frame)
        .scalar_group("inputs", ["feature"])
        .scalar_group("target", ["label"])
        .vlarr_group("hits", ["hits"]))
}

fn main() -> vlndata::Result<()> {
    println!("=== vlndata DataLoader Example ===\n");

    let dataset = create_sample_dataset(100)?;
    println!("Created dataset with {} samples", dataset.len());

    // 1. Basic DataLoader with batch size
    println!("\n1. Basic DataLoader (batch_size=32, no shuffle)");
    let mut loader = DataLoader::new(dataset.clone()).batch_size(32).shuffle(false);
    for (i, batch) in loader.iter().enumerate() {
        let batch = batch?;
        println!(
            "   Batch {}: inputs {:?}, hits {:?}",
            i + 1,
            batch["inputs"].shape(),
            batch["hits"].shape()
        );
    }

    // 2. DataLoader with drop_last
    println!("\n2. DataLoader with drop_last=true (batch_size=32)");
    let loader = DataLoader::new(dataset.clone())
        .batch_size(32)
        .drop_last(true);
    println!(
        "   {} batches (dropped incomplete last batch)",
        loader.num_batches()
    );

    // 3. Shuffling is on by default; each epoch gets a new order
    println!("\n3. Shuffled DataLoader (seed=42), two epochs");
    let mut loader = DataLoader::new(dataset.clone()).batch_size(8).seed(42);
    for epoch in 1..=2 {
        let first = loader.iter().next().transpose()?.unwrap_or_default();
        let labels: Vec<f64> = first["target"].iter().copied().collect();
        println!("   Epoch {}: first batch labels {:?}", epoch, labels);
    }

    // 4. Padding value for ragged groups
    println!("\n4. Padding with -1");
    let loader = DataLoader::new(dataset).batch_size(4).shuffle(false).pad(-1.0);
    let batch = loader.get_batch(0)?;
    println!("   hits =\n{}", batch["hits"]);

    println!("\n=== Example Complete ===");
    Ok(())
}
