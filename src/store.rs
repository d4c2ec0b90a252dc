use camino::Utf8PathBuf;
use rusqlite::types::ValueRef;
use rusqlite::{Connection, OpenFlags, Row, params};
use tracing::debug;

use crate::domain::{CountryShare, KeyField, SearchKey, VariantEntry, VariantRecord};
use crate::error::CovarError;

const FIND_BY_LINEAGE: &str = "SELECT Pango_Lineage, WHO_Label, First_Country, First_Date, VOC, \
     Mutation_N, Mutation_A, Spike_PDB, \
     Country1, Country2, Country3, Country4, Country5, \
     Value1, Value2, Value3, Value4, Value5, Other \
     FROM covar WHERE Pango_Lineage = ?1 ORDER BY rowid";

const FIND_BY_LABEL: &str = "SELECT Pango_Lineage, WHO_Label, First_Country, First_Date, VOC, \
     Mutation_N, Mutation_A, Spike_PDB, \
     Country1, Country2, Country3, Country4, Country5, \
     Value1, Value2, Value3, Value4, Value5, Other \
     FROM covar WHERE WHO_Label = ?1 ORDER BY rowid";

const LIST_VARIANTS: &str = "SELECT Pango_Lineage, WHO_Label, VOC, MIN(rowid) AS first_row \
     FROM covar GROUP BY Pango_Lineage ORDER BY first_row";

const COUNTRY_COLUMNS: usize = 5;
const COUNTRY_OFFSET: usize = 8;
const VALUE_OFFSET: usize = 13;
const OTHER_INDEX: usize = 18;

/// Read-only access to the curated variant table.
pub trait VariantSource: Send + Sync {
    fn find(&self, key: &SearchKey) -> Result<Option<VariantRecord>, CovarError>;
    fn list(&self) -> Result<Vec<VariantEntry>, CovarError>;
}

/// SQLite-backed variant store. A connection is opened per call and dropped
/// before the call returns.
#[derive(Debug, Clone)]
pub struct Store {
    db_path: Utf8PathBuf,
}

impl Store {
    pub fn new(db_path: Utf8PathBuf) -> Self {
        Self { db_path }
    }

    fn open(&self) -> Result<Connection, CovarError> {
        Connection::open_with_flags(
            self.db_path.as_std_path(),
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|err| CovarError::StoreUnavailable(format!("{}: {err}", self.db_path)))
    }
}

impl VariantSource for Store {
    fn find(&self, key: &SearchKey) -> Result<Option<VariantRecord>, CovarError> {
        let conn = self.open()?;
        let sql = match key.field() {
            KeyField::Lineage => FIND_BY_LINEAGE,
            KeyField::Label => FIND_BY_LABEL,
        };
        let mut stmt = conn
            .prepare(sql)
            .map_err(|err| CovarError::StoreUnavailable(err.to_string()))?;
        let rows = stmt
            .query_map(params![key.as_str()], StoredRow::from_row)
            .map_err(|err| CovarError::StoreUnavailable(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| CovarError::StoreUnavailable(err.to_string()))?;

        debug!(
            column = key.field().column(),
            key = key.as_str(),
            rows = rows.len(),
            "variant lookup"
        );
        Ok(assemble(rows))
    }

    fn list(&self) -> Result<Vec<VariantEntry>, CovarError> {
        let conn = self.open()?;
        let mut stmt = conn
            .prepare(LIST_VARIANTS)
            .map_err(|err| CovarError::StoreUnavailable(err.to_string()))?;
        let entries = stmt
            .query_map([], |row| {
                Ok(VariantEntry {
                    lineage_code: read_text(row, 0)?.unwrap_or_default(),
                    who_label: read_text(row, 1)?.unwrap_or_default(),
                    monitoring_status: read_text(row, 2)?.unwrap_or_default(),
                })
            })
            .map_err(|err| CovarError::StoreUnavailable(err.to_string()))?
            .collect::<Result<Vec<_>, _>>()
            .map_err(|err| CovarError::StoreUnavailable(err.to_string()))?;
        debug!(count = entries.len(), "listed variants");
        Ok(entries)
    }
}

/// One row of the denormalized table: the variant's scalar columns repeated
/// next to a single mutation pair.
struct StoredRow {
    lineage: Option<String>,
    label: Option<String>,
    first_country: Option<String>,
    first_date: Option<String>,
    status: Option<String>,
    nucleotide: Option<String>,
    amino_acid: Option<String>,
    structure_id: Option<String>,
    countries: Vec<CountryShare>,
    other: Option<f64>,
}

impl StoredRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        let mut countries = Vec::with_capacity(COUNTRY_COLUMNS);
        for idx in 0..COUNTRY_COLUMNS {
            countries.push(CountryShare {
                country: read_text(row, COUNTRY_OFFSET + idx)?,
                percentage: read_number(row, VALUE_OFFSET + idx)?,
            });
        }
        Ok(Self {
            lineage: read_text(row, 0)?,
            label: read_text(row, 1)?,
            first_country: read_text(row, 2)?,
            first_date: read_text(row, 3)?,
            status: read_text(row, 4)?,
            nucleotide: read_text(row, 5)?,
            amino_acid: read_text(row, 6)?,
            structure_id: read_text(row, 7)?,
            countries,
            other: read_number(row, OTHER_INDEX)?,
        })
    }
}

fn assemble(rows: Vec<StoredRow>) -> Option<VariantRecord> {
    let mut rows = rows.into_iter();
    let first = rows.next()?;

    let mut nucleotide_mutations = Vec::new();
    let mut amino_acid_mutations = Vec::new();
    // Each row is one pair; a NULL side stays as an empty cell in that row.
    let mut push_pair = |row: &StoredRow| {
        if row.nucleotide.is_none() && row.amino_acid.is_none() {
            return;
        }
        nucleotide_mutations.push(row.nucleotide.clone().unwrap_or_default());
        amino_acid_mutations.push(row.amino_acid.clone().unwrap_or_default());
    };
    push_pair(&first);
    for row in rows {
        push_pair(&row);
    }

    let lineage_code = first.lineage.unwrap_or_default();
    Some(VariantRecord {
        structural_chart_ref: lineage_code.clone(),
        lineage_code,
        who_label: first.label.unwrap_or_default(),
        first_country: first.first_country.unwrap_or_default(),
        first_date: first.first_date.unwrap_or_default(),
        monitoring_status: first.status.unwrap_or_default(),
        nucleotide_mutations,
        amino_acid_mutations,
        structure_id: first.structure_id.unwrap_or_default(),
        top_countries: first.countries,
        other_percentage: first.other,
    })
}

fn read_text(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<String>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Some(String::from_utf8_lossy(bytes).into_owned())
        }
        ValueRef::Integer(value) => Some(value.to_string()),
        ValueRef::Real(value) => Some(value.to_string()),
    })
}

// Percentages were loaded from spreadsheets, so some arrive as text.
fn read_number(row: &Row<'_>, idx: usize) -> rusqlite::Result<Option<f64>> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => None,
        ValueRef::Integer(value) => Some(value as f64),
        ValueRef::Real(value) => Some(value),
        ValueRef::Text(bytes) => String::from_utf8_lossy(bytes)
            .trim()
            .trim_end_matches('%')
            .parse::<f64>()
            .ok(),
        ValueRef::Blob(_) => None,
    })
}
