use std::path::Path;

use anyhow::{Context, Result};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use super::features::PackagingFeatures;

pub const PACKAGING_TYPES: [&str; 4] = ["Plastic", "Biodegradable", "Paper", "Metal"];
pub const DEFAULT_SAMPLES: usize = 1000;
pub const DEFAULT_SEED: u64 = 42;

/// One labelled training example; also the CSV row layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRow {
    pub temperature: f64,
    pub humidity: f64,
    pub transportation_time: f64,
    pub month: u32,
    pub dayofweek: u32,
    pub dayofyear: u32,
    pub is_month_start: u32,
    pub is_month_end: u32,
    pub packaging_type: String,
}

impl TrainingRow {
    pub fn features(&self) -> PackagingFeatures {
        PackagingFeatures {
            temperature: self.temperature,
            humidity: self.humidity,
            transportation_time: self.transportation_time,
            month: self.month,
            dayofweek: self.dayofweek,
            dayofyear: self.dayofyear,
            is_month_start: self.is_month_start,
            is_month_end: self.is_month_end,
        }
    }
}

/// Uniformly random features and labels; the calendar columns are drawn
/// independently rather than derived from a real date.
pub fn synthetic(samples: usize, seed: u64) -> Vec<TrainingRow> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..samples)
        .map(|_| TrainingRow {
            temperature: rng.gen_range(0.0..40.0),
            humidity: rng.gen_range(0.0..100.0),
            transportation_time: rng.gen_range(1.0..24.0),
            month: rng.gen_range(1..13),
            dayofweek: rng.gen_range(0..7),
            dayofyear: rng.gen_range(1..366),
            is_month_start: rng.gen_range(0..2),
            is_month_end: rng.gen_range(0..2),
            packaging_type: PACKAGING_TYPES[rng.gen_range(0..PACKAGING_TYPES.len())].to_string(),
        })
        .collect()
}

pub fn load_csv(path: &Path) -> Result<Vec<TrainingRow>> {
    let mut reader =
        csv::Reader::from_path(path).with_context(|| format!("open {}", path.display()))?;
    let mut rows = Vec::new();
    for (i, record) in reader.deserialize().enumerate() {
        let row: TrainingRow = record.with_context(|| format!("parse csv row {}", i + 1))?;
        rows.push(row);
    }
    Ok(rows)
}

pub fn save_csv(path: &Path, rows: &[TrainingRow]) -> Result<()> {
    let mut writer =
        csv::Writer::from_path(path).with_context(|| format!("create {}", path.display()))?;
    for row in rows {
        writer.serialize(row).context("write csv row")?;
    }
    writer.flush().context("flush csv")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_data_is_seeded_and_in_range() {
        let a = synthetic(200, 7);
        let b = synthetic(200, 7);
        assert_eq!(a, b);
        assert_ne!(a, synthetic(200, 8));

        for row in &a {
            assert!((0.0..40.0).contains(&row.temperature));
            assert!((1.0..24.0).contains(&row.transportation_time));
            assert!((1..=12).contains(&row.month));
            assert!(row.dayofweek < 7);
            assert!((1..=365).contains(&row.dayofyear));
            assert!(PACKAGING_TYPES.contains(&row.packaging_type.as_str()));
        }
    }

    #[test]
    fn csv_round_trip_keeps_rows() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.csv");
        let rows = synthetic(5, 1);

        save_csv(&path, &rows).unwrap();
        let header = std::fs::read_to_string(&path).unwrap();
        assert!(header.starts_with("temperature,humidity,transportation_time,month"));
        assert_eq!(load_csv(&path).unwrap(), rows);
    }

    #[test]
    fn malformed_csv_names_the_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.csv");
        std::fs::write(
            &path,
            "temperature,humidity,transportation_time,month,dayofweek,dayofyear,is_month_start,is_month_end,packaging_type\n\
             1,2,3,4,5,6,0,1,Paper\n\
             hot,2,3,4,5,6,0,1,Paper\n",
        )
        .unwrap();
        let err = load_csv(&path).unwrap_err();
        assert!(err.to_string().contains("row 2"));
    }
}
