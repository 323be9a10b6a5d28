use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use anyhow::{Context, Result};

use crate::predictor::PackagingModel;

pub fn save_model_json(path: &Path, model: &PackagingModel) -> Result<()> {
    let file = File::create(path).with_context(|| format!("create {}", path.display()))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer(&mut writer, model).context("serialize packaging model")?;
    writer.flush().context("flush model file")
}

pub fn load_model_json(path: &Path) -> Result<PackagingModel> {
    let file = File::open(path).with_context(|| format!("open {}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("parse packaging model {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::predictor::dataset::synthetic;

    #[test]
    fn model_survives_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        let model = PackagingModel::fit(&synthetic(100, 3)).unwrap();

        save_model_json(&path, &model).unwrap();
        let loaded = load_model_json(&path).unwrap();
        assert_eq!(loaded, model);
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_model_json(Path::new("/nonexistent/model.json")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/model.json"));
    }
}
