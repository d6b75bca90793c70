//! Property-based tests for frames, collation and loading.

#![allow(clippy::cast_precision_loss, clippy::float_cmp)]

use std::sync::Arc;

use ndarray::{Array2, ArrayD};
use proptest::prelude::*;
use vlndata::{
    collate, train_val_test_split, DType, DataLoader, Frame, FrameRef, GroupedDataset, MapFrame,
    ReadAheadFrame, Sample, SplitSize,
};

fn vlarrs() -> impl Strategy<Value = Vec<Vec<f64>>> {
    prop::collection::vec(prop::collection::vec(-1e3f64..1e3, 0..6), 1..40)
}

fn frame_of(rows: &[Vec<f64>]) -> MapFrame {
    MapFrame::builder(DType::Float64)
        .scalar("n", rows.iter().map(|row| row.len() as f64).collect())
        .vlarr("v", rows.to_vec())
        .build()
        .unwrap()
}

proptest! {
    #[test]
    fn prop_collate_pads_to_longest(rows in vlarrs(), pad in -10.0f64..-1.0) {
        let samples: Vec<Sample> = rows
            .iter()
            .map(|row| {
                let data = Array2::from_shape_vec((row.len(), 1), row.clone()).unwrap();
                let mut sample = Sample::new();
                sample.insert("v".to_string(), data.into_dyn());
                sample
            })
            .collect();

        let batch = collate(&samples, pad).unwrap();
        let data: &ArrayD<f64> = &batch["v"];
        let max_len = rows.iter().map(Vec::len).max().unwrap_or(0);
        prop_assert_eq!(data.shape(), &[rows.len(), max_len, 1]);

        for (i, row) in rows.iter().enumerate() {
            for j in 0..max_len {
                let expected = row.get(j).copied().unwrap_or(pad);
                prop_assert_eq!(data[[i, j, 0]], expected);
            }
        }
    }

    #[test]
    fn prop_read_ahead_matches_source(
        rows in vlarrs(),
        chunk_size in 1usize..10,
        order in prop::collection::vec(any::<prop::sample::Index>(), 1..60),
    ) {
        let reference = frame_of(&rows);
        let frame = ReadAheadFrame::new(frame_of(&rows), chunk_size).unwrap();

        for index in order {
            let i = index.index(rows.len());
            prop_assert_eq!(frame.get_vlarr("v", i).unwrap(), reference.get_vlarr("v", i).unwrap());
            prop_assert_eq!(frame.get_scalar("n", i).unwrap(), reference.get_scalar("n", i).unwrap());
        }
    }

    #[test]
    fn prop_split_partitions_rows(
        len in 0usize..60,
        val in 0usize..30,
        test_fraction in 0.0f64..=1.0,
    ) {
        let frame: FrameRef = Arc::new(frame_of(&vec![vec![]; len]));
        let (train, val_frame, test) = train_val_test_split(
            &frame,
            Some(SplitSize::Count(val)),
            Some(SplitSize::Fraction(test_fraction)),
        )
        .unwrap();

        prop_assert_eq!(train.len() + val_frame.len() + test.len(), len);
        let indices: Vec<usize> = train
            .indices()
            .iter()
            .chain(val_frame.indices())
            .chain(test.indices())
            .copied()
            .collect();
        prop_assert_eq!(indices, (0..len).collect::<Vec<_>>());
    }

    #[test]
    fn prop_loader_visits_every_row_once(
        rows in vlarrs(),
        batch_size in 1usize..8,
        seed in any::<u64>(),
    ) {
        let frame: FrameRef = Arc::new(frame_of(&rows));
        let dataset = GroupedDataset::new(frame).scalar_group("s", ["n"]);
        let mut loader = DataLoader::new(dataset).batch_size(batch_size).seed(seed);

        let mut lengths: Vec<f64> = loader
            .iter()
            .flat_map(|batch| batch.unwrap()["s"].iter().copied().collect::<Vec<_>>())
            .collect();
        lengths.sort_by(f64::total_cmp);

        let mut expected: Vec<f64> = rows.iter().map(|row| row.len() as f64).collect();
        expected.sort_by(f64::total_cmp);
        prop_assert_eq!(lengths, expected);
    }
}
