use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::CovarError;

/// Which alternate key of the `covar` table a search matches against.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum KeyField {
    Lineage,
    Label,
}

impl KeyField {
    pub fn column(self) -> &'static str {
        match self {
            KeyField::Lineage => "Pango_Lineage",
            KeyField::Label => "WHO_Label",
        }
    }

    pub fn not_found_message(self) -> &'static str {
        match self {
            KeyField::Lineage => "Pango lineage not found!",
            KeyField::Label => "Variant not found!",
        }
    }
}

impl fmt::Display for KeyField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KeyField::Lineage => write!(f, "lineage"),
            KeyField::Label => write!(f, "label"),
        }
    }
}

impl FromStr for KeyField {
    type Err = CovarError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "lineage" | "pango" => Ok(KeyField::Lineage),
            "label" | "who" => Ok(KeyField::Label),
            _ => Err(CovarError::InvalidKeyField(value.to_string())),
        }
    }
}

/// Canonical form of a search value for the given key field.
///
/// Lineages are stored uppercase (`B.1.617.2`), labels capitalized (`Delta`).
pub fn normalize(field: KeyField, raw: &str) -> String {
    let trimmed = raw.trim();
    match field {
        KeyField::Lineage => trimmed.to_uppercase(),
        KeyField::Label => {
            let lower = trimmed.to_lowercase();
            let mut chars = lower.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchKey {
    field: KeyField,
    value: String,
}

impl SearchKey {
    pub fn new(field: KeyField, raw: &str) -> Result<Self, CovarError> {
        let value = normalize(field, raw);
        if value.is_empty() {
            return Err(CovarError::EmptyKey);
        }
        Ok(Self { field, value })
    }

    pub fn field(&self) -> KeyField {
        self.field
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    /// File name offered for the mutation spreadsheet download.
    pub fn export_file_name(&self) -> String {
        format!("{} mutations.xlsx", self.value)
    }
}

impl fmt::Display for SearchKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

/// Parses `lineage:<code>`, `label:<name>` or a bare lineage code.
impl FromStr for SearchKey {
    type Err = CovarError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().split_once(':') {
            Some((kind, rest)) => SearchKey::new(kind.parse()?, rest),
            None => SearchKey::new(KeyField::Lineage, value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CountryShare {
    pub country: Option<String>,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VariantRecord {
    pub lineage_code: String,
    pub who_label: String,
    pub first_country: String,
    pub first_date: String,
    pub monitoring_status: String,
    pub nucleotide_mutations: Vec<String>,
    pub amino_acid_mutations: Vec<String>,
    pub structural_chart_ref: String,
    pub structure_id: String,
    pub top_countries: Vec<CountryShare>,
    pub other_percentage: Option<f64>,
}

/// One line of the stored-variant listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct VariantEntry {
    pub lineage_code: String,
    pub who_label: String,
    pub monitoring_status: String,
}

impl VariantEntry {
    /// The alternate key value matched by `field`.
    pub fn key_value(&self, field: KeyField) -> &str {
        match field {
            KeyField::Lineage => &self.lineage_code,
            KeyField::Label => &self.who_label,
        }
    }
}
