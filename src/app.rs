use std::time::{Duration, Instant};

use camino::Utf8Path;
use serde::Serialize;
use tracing::info;

use crate::assets::Assets;
use crate::domain::{KeyField, SearchKey, VariantEntry};
use crate::error::CovarError;
use crate::export;
use crate::store::VariantSource;
use crate::views::{self, GeoBreakdown, MutationView, StructureView, SummaryView};

#[derive(Debug, Clone, Serialize)]
pub struct VariantReport {
    pub key: String,
    pub field: KeyField,
    pub title: String,
    pub summary: SummaryView,
    pub mutations: MutationView,
    pub structure: StructureView,
    pub geography: GeoBreakdown,
    pub structure_caption: String,
    pub chart_caption: String,
    pub geography_caption: String,
    pub export_file_name: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum LookupOutcome {
    Found(Box<VariantReport>),
    NotFound {
        key: String,
        field: KeyField,
        message: String,
    },
}

impl LookupOutcome {
    pub fn report(&self) -> Option<&VariantReport> {
        match self {
            LookupOutcome::Found(report) => Some(&**report),
            LookupOutcome::NotFound { .. } => None,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ExportResult {
    pub key: String,
    pub path: String,
    pub rows: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ListResult {
    pub variants: Vec<VariantEntry>,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Picks the search key from the two lookup inputs. A non-empty lineage wins
/// over the label; two empty inputs mean no request.
pub fn select_key(lineage: &str, label: &str) -> Result<Option<SearchKey>, CovarError> {
    if !lineage.trim().is_empty() {
        return SearchKey::new(KeyField::Lineage, lineage).map(Some);
    }
    if !label.trim().is_empty() {
        return SearchKey::new(KeyField::Label, label).map(Some);
    }
    Ok(None)
}

#[derive(Clone)]
pub struct App<S: VariantSource> {
    source: S,
    assets: Assets,
}

impl<S: VariantSource> App<S> {
    pub fn new(source: S, assets: Assets) -> Self {
        Self { source, assets }
    }

    pub fn assets(&self) -> &Assets {
        &self.assets
    }

    pub fn lookup(
        &self,
        key: &SearchKey,
        sink: &dyn ProgressSink,
    ) -> Result<LookupOutcome, CovarError> {
        sink.event(ProgressEvent {
            message: format!("phase=Resolve; {} {}", key.field(), key.as_str()),
            elapsed: None,
        });
        let start = Instant::now();
        let record = self.source.find(key)?;
        let latency = start.elapsed();
        sink.event(ProgressEvent {
            message: format!("store.response latency_ms={}", latency.as_millis()),
            elapsed: Some(latency),
        });

        let Some(record) = record else {
            sink.event(ProgressEvent {
                message: format!("phase=Query; no match for {}", key.as_str()),
                elapsed: None,
            });
            return Ok(LookupOutcome::NotFound {
                key: key.as_str().to_string(),
                field: key.field(),
                message: key.field().not_found_message().to_string(),
            });
        };

        sink.event(ProgressEvent {
            message: "phase=Format; building views".to_string(),
            elapsed: None,
        });
        let title = key.as_str().to_string();
        let report = VariantReport {
            key: title.clone(),
            field: key.field(),
            summary: views::summary(&record),
            mutations: views::mutations(&record),
            structure: views::structure(&record, &self.assets),
            geography: views::geography(&record),
            structure_caption: format!("{title} Spike Protein:"),
            chart_caption: format!("Mutation chart of the {title} genome:"),
            geography_caption: "Percentage of cases in top 5 countries with the most cases"
                .to_string(),
            export_file_name: key.export_file_name(),
            title,
        };
        sink.event(ProgressEvent {
            message: format!(
                "phase=Done; {} mutations, {} countries",
                report.mutations.rows.len(),
                report.geography.rows.len()
            ),
            elapsed: Some(start.elapsed()),
        });
        Ok(LookupOutcome::Found(Box::new(report)))
    }

    /// Looks the key up and writes its mutation workbook into `dir`.
    pub fn export(
        &self,
        key: &SearchKey,
        dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, CovarError> {
        let outcome = self.lookup(key, sink)?;
        let report = match outcome {
            LookupOutcome::Found(report) => report,
            LookupOutcome::NotFound { message, .. } => {
                return Err(CovarError::NotFound(message));
            }
        };
        self.export_report(&report, dir, sink)
    }

    /// Writes the workbook for an already rendered report.
    pub fn export_report(
        &self,
        report: &VariantReport,
        dir: &Utf8Path,
        sink: &dyn ProgressSink,
    ) -> Result<ExportResult, CovarError> {
        sink.event(ProgressEvent {
            message: format!("phase=Export; writing {}", report.export_file_name),
            elapsed: None,
        });
        let key = SearchKey::new(report.field, &report.key)?;
        let path = export::write_export(dir, &key, &report.mutations)?;
        Ok(ExportResult {
            key: report.key.clone(),
            path: path.to_string(),
            rows: report.mutations.rows.len(),
        })
    }

    pub fn list(&self, sink: &dyn ProgressSink) -> Result<ListResult, CovarError> {
        sink.event(ProgressEvent {
            message: "phase=Resolve; listing stored variants".to_string(),
            elapsed: None,
        });
        let variants = self.source.list()?;
        info!(count = variants.len(), "variant listing");
        Ok(ListResult { variants })
    }
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;

    #[test]
    fn lineage_input_takes_precedence() {
        let key = select_key("b.1.1.7", "delta").unwrap().unwrap();
        assert_eq!(key.field(), KeyField::Lineage);
        assert_eq!(key.as_str(), "B.1.1.7");

        let key = select_key("  ", "delta").unwrap().unwrap();
        assert_eq!(key.field(), KeyField::Label);
        assert_eq!(key.as_str(), "Delta");

        assert_matches!(select_key("", ""), Ok(None));
    }
}
