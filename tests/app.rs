mod common;

use std::sync::Mutex;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use covar::app::{App, LookupOutcome, ProgressEvent, ProgressSink, select_key};
use covar::assets::Assets;
use covar::domain::{KeyField, SearchKey, VariantEntry, VariantRecord};
use covar::error::CovarError;
use covar::export;
use covar::output::JsonOutput;
use covar::store::VariantSource;
use covar::views::{GEO_ROWS, OTHER_BUCKET};

#[derive(Default)]
struct RecordingSink {
    messages: Mutex<Vec<String>>,
}

impl ProgressSink for RecordingSink {
    fn event(&self, event: ProgressEvent) {
        self.messages.lock().unwrap().push(event.message);
    }
}

struct BrokenSource;

impl VariantSource for BrokenSource {
    fn find(&self, _key: &SearchKey) -> Result<Option<VariantRecord>, CovarError> {
        Err(CovarError::StoreUnavailable("locked".to_string()))
    }

    fn list(&self) -> Result<Vec<VariantEntry>, CovarError> {
        Err(CovarError::StoreUnavailable("locked".to_string()))
    }
}

#[test]
fn lookup_is_case_insensitive() {
    let fixture = common::Fixture::new();
    let app = fixture.app();

    let key = SearchKey::new(KeyField::Lineage, "b.1.617.2").unwrap();
    let outcome = app.lookup(&key, &JsonOutput).unwrap();
    let report = outcome.report().unwrap();
    assert_eq!(report.summary.who_label, "Delta");
    assert_eq!(report.title, "B.1.617.2");

    let key = SearchKey::new(KeyField::Label, "gamma").unwrap();
    let outcome = app.lookup(&key, &JsonOutput).unwrap();
    assert_eq!(outcome.report().unwrap().summary.lineage_code, "P.1");
}

#[test]
fn unknown_keys_report_field_specific_messages() {
    let fixture = common::Fixture::new();
    let app = fixture.app();

    let key = SearchKey::new(KeyField::Lineage, "NONEXISTENT").unwrap();
    assert_matches!(
        app.lookup(&key, &JsonOutput),
        Ok(LookupOutcome::NotFound { message, .. }) if message == "Pango lineage not found!"
    );

    let key = SearchKey::new(KeyField::Label, "omega").unwrap();
    assert_matches!(
        app.lookup(&key, &JsonOutput),
        Ok(LookupOutcome::NotFound { message, .. }) if message == "Variant not found!"
    );
}

#[test]
fn report_views_follow_the_record() {
    let fixture = common::Fixture::new();
    let app = fixture.app();
    let key = SearchKey::new(KeyField::Label, "Gamma").unwrap();
    let outcome = app.lookup(&key, &JsonOutput).unwrap();
    let report = outcome.report().unwrap();

    let pairs = report
        .mutations
        .rows
        .iter()
        .map(|row| (row.nucleotide.as_str(), row.amino_acid.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        vec![
            ("C21614T", "S:L18F"),
            ("C21621A", ""),
            ("A23063T", "S:N501Y"),
        ]
    );
    assert_eq!(report.mutations.unpaired, 0);

    assert_eq!(report.geography.rows.len(), GEO_ROWS);
    assert_eq!(report.geography.rows[5].country, OTHER_BUCKET);
    assert_eq!(report.geography.rows[5].percentage, Some(4.0));
    assert_eq!(report.geography.rows[3].percentage, None);

    assert_eq!(report.structure.viewer.structure_id, "7SBK");
    assert!(report.structure.chart.svg.is_none());
    assert_eq!(report.export_file_name, "Gamma mutations.xlsx");
    assert_eq!(report.chart_caption, "Mutation chart of the Gamma genome:");
    assert_eq!(report.structure_caption, "Gamma Spike Protein:");
}

#[test]
fn chart_is_embedded_when_present() {
    let fixture = common::Fixture::new();
    let app = fixture.app();
    let key = SearchKey::new(KeyField::Label, "delta").unwrap();
    let outcome = app.lookup(&key, &JsonOutput).unwrap();
    let chart = &outcome.report().unwrap().structure.chart;

    assert!(chart.path.ends_with("B.1.617.2.svg"));
    assert!(
        chart
            .data_uri
            .as_deref()
            .unwrap()
            .starts_with("data:image/svg+xml;base64,")
    );

    let json = serde_json::to_value(&outcome).unwrap();
    let uri = json["structure"]["chart"]["data_uri"].as_str().unwrap();
    assert!(uri.starts_with("data:image/svg+xml;base64,"));
}

#[test]
fn export_writes_named_workbook() {
    let fixture = common::Fixture::new();
    let app = fixture.app();
    let key = SearchKey::new(KeyField::Lineage, "B.1.617.2").unwrap();

    let result = app.export(&key, &fixture.exports, &JsonOutput).unwrap();
    assert_eq!(result.rows, 3);
    let path = Utf8PathBuf::from(&result.path);
    assert_eq!(path.file_name(), Some("B.1.617.2 mutations.xlsx"));

    let bytes = std::fs::read(path.as_std_path()).unwrap();
    let rows = export::read_mutations(&bytes).unwrap();
    let nucleotides = rows.iter().map(|row| row.nucleotide.as_str()).collect::<Vec<_>>();
    assert_eq!(nucleotides, vec!["C241T", "C22995A", "C23604G"]);
    assert_eq!(rows[2].amino_acid, "S:P681R");
}

#[test]
fn export_keeps_pairs_around_a_blank_cell() {
    let fixture = common::Fixture::new();
    let app = fixture.app();
    let key = SearchKey::new(KeyField::Label, "gamma").unwrap();

    let result = app.export(&key, &fixture.exports, &JsonOutput).unwrap();
    assert_eq!(result.rows, 3);
    let bytes = std::fs::read(Utf8PathBuf::from(&result.path).as_std_path()).unwrap();
    let rows = export::read_mutations(&bytes).unwrap();
    let pairs = rows
        .iter()
        .map(|row| (row.nucleotide.as_str(), row.amino_acid.as_str()))
        .collect::<Vec<_>>();
    assert_eq!(
        pairs,
        vec![
            ("C21614T", "S:L18F"),
            ("C21621A", ""),
            ("A23063T", "S:N501Y"),
        ]
    );
}

#[test]
fn export_of_unknown_key_fails() {
    let fixture = common::Fixture::new();
    let app = fixture.app();
    let key = SearchKey::new(KeyField::Lineage, "XYZ.9").unwrap();
    assert_matches!(
        app.export(&key, &fixture.exports, &JsonOutput),
        Err(CovarError::NotFound(_))
    );
    assert_eq!(std::fs::read_dir(fixture.exports.as_std_path()).unwrap().count(), 0);
}

#[test]
fn lookup_reports_phases() {
    let fixture = common::Fixture::new();
    let app = fixture.app();
    let sink = RecordingSink::default();
    let key = select_key("", "alpha").unwrap().unwrap();

    app.lookup(&key, &sink).unwrap();
    let messages = sink.messages.lock().unwrap();
    assert!(messages[0].starts_with("phase=Resolve;"));
    assert!(messages.iter().any(|m| m.contains("latency_ms=")));
    assert!(messages.last().unwrap().starts_with("phase=Done;"));
}

#[test]
fn store_failure_is_not_a_miss() {
    let temp = tempfile::tempdir().unwrap();
    let resources = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let app = App::new(BrokenSource, Assets::new(resources));
    let key = SearchKey::new(KeyField::Lineage, "B.1.1.7").unwrap();

    assert_matches!(
        app.lookup(&key, &JsonOutput),
        Err(CovarError::StoreUnavailable(_))
    );
    assert_matches!(app.list(&JsonOutput), Err(CovarError::StoreUnavailable(_)));
}
