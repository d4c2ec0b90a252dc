mod common;

use assert_matches::assert_matches;
use camino::Utf8PathBuf;

use covar::domain::{KeyField, SearchKey};
use covar::error::CovarError;
use covar::store::{Store, VariantSource};

#[test]
fn every_variant_is_found_by_both_keys() {
    let fixture = common::Fixture::new();
    let store = Store::new(fixture.db.clone());

    for entry in store.list().unwrap() {
        let by_lineage = SearchKey::new(KeyField::Lineage, &entry.lineage_code).unwrap();
        let by_label = SearchKey::new(KeyField::Label, &entry.who_label).unwrap();
        let left = store.find(&by_lineage).unwrap().unwrap();
        let right = store.find(&by_label).unwrap().unwrap();
        assert_eq!(left, right);
        assert_eq!(left.lineage_code, entry.lineage_code);
    }
}

#[test]
fn list_follows_first_appearance() {
    let fixture = common::Fixture::new();
    let store = Store::new(fixture.db.clone());
    let lineages = store
        .list()
        .unwrap()
        .into_iter()
        .map(|entry| entry.lineage_code)
        .collect::<Vec<_>>();
    assert_eq!(lineages, vec!["B.1.617.2", "P.1", "B.1.1.7"]);
}

#[test]
fn scalar_fields_and_mutation_order() {
    let fixture = common::Fixture::new();
    let store = Store::new(fixture.db.clone());
    let key: SearchKey = "b.1.617.2".parse().unwrap();

    let record = store.find(&key).unwrap().unwrap();
    assert_eq!(record.who_label, "Delta");
    assert_eq!(record.first_country, "India");
    assert_eq!(record.structure_id, "7V7Q");
    assert_eq!(record.nucleotide_mutations, vec!["C241T", "C22995A", "C23604G"]);
    assert_eq!(record.top_countries.len(), 5);
    assert_eq!(record.other_percentage, Some(15.0));
}

#[test]
fn percentages_stored_as_text_are_parsed() {
    let fixture = common::Fixture::new();
    let store = Store::new(fixture.db.clone());
    let key = SearchKey::new(KeyField::Label, "GAMMA").unwrap();

    let record = store.find(&key).unwrap().unwrap();
    assert_eq!(record.top_countries[0].percentage, Some(80.5));
    assert_eq!(record.top_countries[1].percentage, Some(10.0));
    assert_eq!(record.top_countries[2].percentage, Some(5.5));
    assert_eq!(record.top_countries[3].country, None);
    assert_eq!(record.amino_acid_mutations, vec!["S:L18F", "", "S:N501Y"]);
}

#[test]
fn null_cell_keeps_later_pairs_aligned() {
    let fixture = common::Fixture::new();
    let store = Store::new(fixture.db.clone());
    let key = SearchKey::new(KeyField::Lineage, "P.1").unwrap();

    let record = store.find(&key).unwrap().unwrap();
    assert_eq!(
        record.nucleotide_mutations,
        vec!["C21614T", "C21621A", "A23063T"]
    );
    assert_eq!(
        record.nucleotide_mutations.len(),
        record.amino_acid_mutations.len()
    );
    assert_eq!(record.amino_acid_mutations[1], "");
    assert_eq!(record.amino_acid_mutations[2], "S:N501Y");
}

#[test]
fn unknown_key_is_absent() {
    let fixture = common::Fixture::new();
    let store = Store::new(fixture.db.clone());
    let key = SearchKey::new(KeyField::Lineage, "NONEXISTENT").unwrap();
    assert_matches!(store.find(&key), Ok(None));
}

#[test]
fn file_without_table_is_unavailable() {
    let temp = tempfile::tempdir().unwrap();
    let path = Utf8PathBuf::from_path_buf(temp.path().join("empty.db")).unwrap();
    rusqlite::Connection::open(path.as_std_path()).unwrap();
    let store = Store::new(path);
    assert_matches!(store.list(), Err(CovarError::StoreUnavailable(_)));
}
