use serde::{Deserialize, Serialize};

use super::features::PackagingFeatures;

/// Zero mean, unit variance per column (population variance). Constant
/// columns are left unscaled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    mean: Vec<f64>,
    scale: Vec<f64>,
}

impl StandardScaler {
    pub fn fit<const N: usize>(rows: &[[f64; N]]) -> Self {
        let n = rows.len().max(1) as f64;
        let mean: Vec<f64> = (0..N)
            .map(|c| rows.iter().map(|r| r[c]).sum::<f64>() / n)
            .collect();
        let scale = (0..N)
            .map(|c| {
                let var = rows.iter().map(|r| (r[c] - mean[c]).powi(2)).sum::<f64>() / n;
                let std = var.sqrt();
                if std > f64::EPSILON {
                    std
                } else {
                    1.0
                }
            })
            .collect();
        Self { mean, scale }
    }

    pub fn transform<'a>(&'a self, row: &'a [f64]) -> impl Iterator<Item = f64> + 'a {
        row.iter()
            .zip(self.mean.iter().zip(&self.scale))
            .map(|(x, (m, s))| (x - m) / s)
    }
}

/// One indicator column per category seen at fit time, categories sorted
/// ascending. Values never seen during fitting encode as all zeros.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OneHotEncoder {
    categories: Vec<Vec<u32>>,
}

impl OneHotEncoder {
    pub fn fit<const N: usize>(rows: &[[u32; N]]) -> Self {
        let categories = (0..N)
            .map(|c| {
                let mut seen: Vec<u32> = rows.iter().map(|r| r[c]).collect();
                seen.sort_unstable();
                seen.dedup();
                seen
            })
            .collect();
        Self { categories }
    }

    pub fn width(&self) -> usize {
        self.categories.iter().map(Vec::len).sum()
    }

    pub fn transform(&self, row: &[u32]) -> Vec<f64> {
        let mut out = Vec::with_capacity(self.width());
        for (value, cats) in row.iter().zip(&self.categories) {
            out.extend(cats.iter().map(|c| if c == value { 1.0 } else { 0.0 }));
        }
        out
    }
}

/// Scaled numerical columns followed by one-hot categorical columns.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Preprocessor {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl Preprocessor {
    pub fn fit(rows: &[PackagingFeatures]) -> Self {
        let numerical: Vec<[f64; 4]> = rows.iter().map(PackagingFeatures::numerical).collect();
        let categorical: Vec<[u32; 4]> = rows.iter().map(PackagingFeatures::categorical).collect();
        Self {
            scaler: StandardScaler::fit(&numerical),
            encoder: OneHotEncoder::fit(&categorical),
        }
    }

    pub fn width(&self) -> usize {
        4 + self.encoder.width()
    }

    pub fn transform(&self, features: &PackagingFeatures) -> Vec<f64> {
        let mut out: Vec<f64> = self.scaler.transform(&features.numerical()).collect();
        out.extend(self.encoder.transform(&features.categorical()));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaler_centers_and_scales() {
        let scaler = StandardScaler::fit(&[[1.0, 5.0], [3.0, 5.0]]);
        let out: Vec<f64> = scaler.transform(&[3.0, 7.0]).collect();
        assert!((out[0] - 1.0).abs() < 1e-12);
        // Constant column: only centered.
        assert!((out[1] - 2.0).abs() < 1e-12);
    }

    #[test]
    fn scaler_streams_borrowed_rows() {
        let scaler = StandardScaler::fit(&[[0.0], [2.0]]);
        let rows = vec![vec![2.0], vec![0.0]];
        let out: Vec<f64> = rows.iter().flat_map(|r| scaler.transform(r)).collect();
        assert_eq!(out, vec![1.0, -1.0]);
    }

    #[test]
    fn encoder_uses_sorted_categories() {
        let enc = OneHotEncoder::fit(&[[3, 0], [1, 1], [3, 1]]);
        assert_eq!(enc.width(), 4);
        assert_eq!(enc.transform(&[3, 0]), vec![0.0, 1.0, 1.0, 0.0]);
        assert_eq!(enc.transform(&[2, 1]), vec![0.0, 0.0, 0.0, 1.0]);
    }

    #[test]
    fn preprocessor_width_matches_output() {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let rows = vec![
            PackagingFeatures::from_parts(date, 10.0, 50.0, 3.0),
            PackagingFeatures::from_parts(date.succ_opt().unwrap(), 30.0, 70.0, 9.0),
        ];
        let pre = Preprocessor::fit(&rows);
        let out = pre.transform(&rows[0]);
        assert_eq!(out.len(), pre.width());
        assert!((out[0] + 1.0).abs() < 1e-12);
    }
}
