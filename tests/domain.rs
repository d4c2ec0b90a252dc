use assert_matches::assert_matches;

use covar::domain::{KeyField, SearchKey, normalize};
use covar::error::CovarError;

#[test]
fn normalization_is_idempotent() {
    for (field, raw) in [
        (KeyField::Lineage, " b.1.617.2 "),
        (KeyField::Lineage, "ba.2.86"),
        (KeyField::Label, "oMiCrOn"),
        (KeyField::Label, "  gamma"),
    ] {
        let once = normalize(field, raw);
        assert_eq!(normalize(field, &once), once);
    }
}

#[test]
fn keys_normalize_per_field() {
    let key = SearchKey::new(KeyField::Lineage, "p.1").unwrap();
    assert_eq!(key.as_str(), "P.1");
    let key = SearchKey::new(KeyField::Label, "DELTA").unwrap();
    assert_eq!(key.as_str(), "Delta");
    assert_eq!(key.export_file_name(), "Delta mutations.xlsx");
}

#[test]
fn parse_prefixed_keys() {
    let key: SearchKey = "label:gamma".parse().unwrap();
    assert_eq!(key.field(), KeyField::Label);
    assert_eq!(key.as_str(), "Gamma");

    let key: SearchKey = "b.1.1.7".parse().unwrap();
    assert_eq!(key.field(), KeyField::Lineage);

    assert_matches!(
        "clade:20A".parse::<SearchKey>(),
        Err(CovarError::InvalidKeyField(_))
    );
}

#[test]
fn blank_input_is_rejected() {
    assert_matches!(
        SearchKey::new(KeyField::Label, "   "),
        Err(CovarError::EmptyKey)
    );
}
