use std::fs;

use base64::Engine;
use base64::engine::general_purpose;
use camino::Utf8PathBuf;
use serde::Serialize;

use crate::error::CovarError;

const HELP_MEDIA: &[(&str, &str)] = &[
    ("evolution video", "evolution.webm"),
    ("pango lineages tree map", "pango.png"),
];

/// Resolver for the static files shipped next to the database: mutation
/// charts (`<ref>.svg`) and the help page media.
#[derive(Debug, Clone)]
pub struct Assets {
    resources_dir: Utf8PathBuf,
}

#[derive(Debug, Clone, Serialize)]
pub struct StaticAsset {
    pub name: String,
    pub path: String,
    pub exists: bool,
}

impl Assets {
    pub fn new(resources_dir: Utf8PathBuf) -> Self {
        Self { resources_dir }
    }

    pub fn chart_path(&self, chart_ref: &str) -> Utf8PathBuf {
        self.resources_dir.join(format!("{chart_ref}.svg"))
    }

    pub fn load_chart(&self, chart_ref: &str) -> Result<String, CovarError> {
        let path = self.chart_path(chart_ref);
        if !path.as_std_path().is_file() {
            return Err(CovarError::ChartMissing(path.to_string()));
        }
        fs::read_to_string(path.as_std_path())
            .map_err(|err| CovarError::Filesystem(format!("read {path}: {err}")))
    }

    pub fn help_media(&self) -> Vec<StaticAsset> {
        HELP_MEDIA
            .iter()
            .map(|(name, file)| {
                let path = self.resources_dir.join(file);
                StaticAsset {
                    name: name.to_string(),
                    exists: path.as_std_path().exists(),
                    path: path.to_string(),
                }
            })
            .collect()
    }
}

/// Inline form of an SVG document for HTML `<img src=...>` embedding.
pub fn svg_data_uri(svg: &str) -> String {
    format!(
        "data:image/svg+xml;base64,{}",
        general_purpose::STANDARD.encode(svg.as_bytes())
    )
}
