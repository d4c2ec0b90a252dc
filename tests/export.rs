use std::io::Read;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use covar::domain::{KeyField, SearchKey};
use covar::error::CovarError;
use covar::export::{self, SHEET_NAME};
use covar::views::{MUTATION_HEADERS, MutationRow, MutationView};

fn view(pairs: &[(&str, &str)]) -> MutationView {
    MutationView {
        rows: pairs
            .iter()
            .map(|(nucleotide, amino_acid)| MutationRow {
                nucleotide: nucleotide.to_string(),
                amino_acid: amino_acid.to_string(),
            })
            .collect(),
        unpaired: 0,
    }
}

#[test]
fn workbook_is_a_valid_package() {
    let bytes = export::to_xlsx(&view(&[("C241T", "5'UTR:C241T")])).unwrap();
    let mut archive = zip::ZipArchive::new(std::io::Cursor::new(bytes)).unwrap();

    for part in [
        "[Content_Types].xml",
        "_rels/.rels",
        "xl/workbook.xml",
        "xl/styles.xml",
        "xl/sharedStrings.xml",
        "xl/worksheets/sheet1.xml",
    ] {
        assert!(archive.by_name(part).is_ok(), "missing {part}");
    }

    let mut workbook = String::new();
    archive
        .by_name("xl/workbook.xml")
        .unwrap()
        .read_to_string(&mut workbook)
        .unwrap();
    assert!(workbook.contains(&format!("name=\"{SHEET_NAME}\"")));
}

#[test]
fn header_comes_first_and_markup_survives() {
    let bytes = export::to_xlsx(&view(&[
        ("C21765-", "S:del69/70 <H69-V70>"),
        ("A23063T", "S:N501Y & more"),
    ]))
    .unwrap();

    let grid = export::read_sheet(&bytes).unwrap();
    assert_eq!(grid[0], MUTATION_HEADERS);
    assert_eq!(grid[1], vec!["C21765-", "S:del69/70 <H69-V70>"]);
    assert_eq!(grid[2], vec!["A23063T", "S:N501Y & more"]);
}

#[test]
fn empty_table_keeps_its_header() {
    let bytes = export::to_xlsx(&view(&[])).unwrap();
    assert!(export::read_mutations(&bytes).unwrap().is_empty());
    assert_eq!(export::read_sheet(&bytes).unwrap().len(), 1);
}

#[test]
fn second_export_replaces_the_first() {
    let temp = tempfile::tempdir().unwrap();
    let dir = Utf8PathBuf::from_path_buf(temp.path().to_path_buf()).unwrap();
    let key = SearchKey::new(KeyField::Label, "alpha").unwrap();

    export::write_export(&dir, &key, &view(&[("C3267T", "ORF1a:T1001I")])).unwrap();
    let path = export::write_export(&dir, &key, &view(&[("C5388A", "ORF1a:A1708D")])).unwrap();

    assert_eq!(path, dir.join("Alpha mutations.xlsx"));
    let entries = std::fs::read_dir(temp.path()).unwrap().count();
    assert_eq!(entries, 1);
    let rows = export::read_mutations(&std::fs::read(path.as_std_path()).unwrap()).unwrap();
    assert_eq!(rows[0].nucleotide, "C5388A");
}

#[test]
fn garbage_is_not_a_workbook() {
    assert_matches!(
        export::read_sheet(b"not a zip"),
        Err(CovarError::SheetRead(_))
    );
}
