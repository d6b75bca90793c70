#![allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::cast_precision_loss,
    clippy::uninlined_format_args,
    clippy::doc_markdown
)]
//! Basic Pipeline Example
//!
//! Builds a complete input pipeline from a JSON config:
//! - CSV frame with scalar and vlarray columns
//! - A derived column computed from the frame
//! - Seeded shuffle and train/val/test split
//! - Sorting and noise transforms, then padded batches
//!
//! Run with: cargo run --example basic_pipeline

use std::fmt::Write as _;

use vlndata::{
    construct_dataset, derive_fn, ColumnData, DataLoader, DatasetConfig, Frame, Split,
};

fn write_events(path: &std::path::Path, rows: usize) -> vlndata::Result<()> {
    let mut content = String::from("energy,pt,eta\n");
    for i in 0..rows {
        let pt: Vec<String> = (0..i % 4).map(|k| ((i + k) % 7).to_string()).collect();
        let eta: Vec<String> = (0..i % 4).map(|k| format!("{:.2}", k as f64 * 0.3)).collect();
        let _ = writeln!(
            content,
            "{},\"[{}]\",\"[{}]\"",
            i as f64 * 2.5,
            pt.join(","),
            eta.join(",")
        );
    }
    std::fs::write(path, content).map_err(|e| vlndata::Error::io(e, path))
}

fn main() -> vlndata::Result<()> {
    println!("=== vlndata Basic Pipeline Example ===\n");

    let dir = tempfile::tempdir().map_err(|source| vlndata::Error::Io { path: None, source })?;
    let csv = dir.path().join("events.csv");
    write_events(&csv, 40)?;

    let config = format!(
        r#"{{
            "frame": {{ "name": "csv", "path": {:?}, "dtype": "float32" }},
            "shuffle": true,
            "seed": 7,
            "val_size": 0.2,
            "test_size": 0.1,
            "scalar_groups": {{ "event": ["energy", "multiplicity"] }},
            "vlarr_groups": {{ "particles": ["pt", "eta"] }},
            "vlarr_limits": {{ "particles": 2 }},
            "transform_train": [
                {{ "name": "vlarr-sort", "vlarr_group": "particles", "column": "pt", "ascending": false }},
                {{
                    "name": "noise",
                    "noise": {{ "name": "gaussian", "mu": 0, "sigma": 0.05, "seed": 1 }},
                    "relative": true,
                    "scalar_groups": {{ "event": ["energy"] }}
                }}
            ],
            "transform_test": [
                {{ "name": "vlarr-sort", "vlarr_group": "particles", "column": "pt", "ascending": false }}
            ]
        }}"#,
        csv
    );
    let mut config = DatasetConfig::from_json(&config)?;

    // Derived columns are closures, passed next to the config
    let multiplicity = derive_fn(|frame: &dyn Frame| {
        (0..frame.len())
            .map(|i| frame.get_vlarr("pt", i).map(|pt| pt.len() as f64))
            .collect::<vlndata::Result<Vec<_>>>()
            .map(ColumnData::Scalar)
    });

    for split in [Split::Train, Split::Val, Split::Test] {
        config.split = split;
        let dataset = construct_dataset(&config, [("multiplicity".to_string(), multiplicity.clone())])?;
        println!("{} split: {} rows", split, dataset.len());

        let loader = DataLoader::new(dataset).batch_size(4).pad(-1.0).shuffle(false);
        if loader.num_batches() > 0 {
            let batch = loader.get_batch(0)?;
            println!("   event =\n{}", batch["event"]);
            println!("   particles shape = {:?}", batch["particles"].shape());
        }
    }

    println!("\n=== Example Complete ===");
    Ok(())
}
