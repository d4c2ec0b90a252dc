//! Fixed-shape projections of a [`VariantRecord`]. Nothing here validates the
//! curated data; values pass through as stored.

use serde::Serialize;
use tracing::warn;

use crate::assets::{Assets, svg_data_uri};
use crate::domain::VariantRecord;

pub const SUMMARY_HEADERS: [&str; 5] = [
    "Pango Lineage",
    "WHO Label",
    "First Detected Country",
    "First Detected Date",
    "WHO Monitoring Status",
];

pub const MUTATION_HEADERS: [&str; 2] = ["Nucleotide Mutation", "Amino Acid Mutation"];

pub const GEO_HEADERS: [&str; 2] = ["Country", "Percentage"];

pub const OTHER_BUCKET: &str = "Other";
pub const GEO_ROWS: usize = 6;

const UNKNOWN_COUNTRY: &str = "n/a";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SummaryView {
    pub lineage_code: String,
    pub who_label: String,
    pub first_country: String,
    pub first_date: String,
    pub monitoring_status: String,
}

impl SummaryView {
    pub fn cells(&self) -> [&str; 5] {
        [
            self.lineage_code.as_str(),
            self.who_label.as_str(),
            self.first_country.as_str(),
            self.first_date.as_str(),
            self.monitoring_status.as_str(),
        ]
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationRow {
    pub nucleotide: String,
    pub amino_acid: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MutationView {
    pub rows: Vec<MutationRow>,
    /// Entries left over on the longer side when the two sequences differ in length.
    pub unpaired: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ViewerDirective {
    pub structure_id: String,
    pub style: &'static str,
    pub background: &'static str,
    pub spin: &'static str,
}

impl ViewerDirective {
    /// Embeddable 3Dmol.js element for the structure; rendering is left to the viewer.
    pub fn to_html(&self) -> String {
        format!(
            "<div style=\"height: 400px; width: 400px; position: relative;\" \
             class='viewer_3Dmoljs' data-pdb={} data-style1='{}' \
             data-backgroundcolor='{}' data-style='stick' data-spin='{}'></div>",
            self.structure_id, self.style, self.background, self.spin
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChartAsset {
    pub path: String,
    #[serde(skip)]
    pub svg: Option<String>,
    /// `data:image/svg+xml;base64,...` form of `svg` for HTML embedding.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_uri: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StructureView {
    pub viewer: ViewerDirective,
    pub chart: ChartAsset,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CountryRow {
    pub country: String,
    pub percentage: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GeoBreakdown {
    pub rows: Vec<CountryRow>,
}

impl GeoBreakdown {
    /// Donut-chart slices: each row's share of the populated total.
    pub fn proportions(&self) -> Vec<(&str, f64)> {
        let total: f64 = self.rows.iter().filter_map(|row| row.percentage).sum();
        self.rows
            .iter()
            .map(|row| {
                let share = match row.percentage {
                    Some(value) if total > 0.0 => value / total,
                    _ => 0.0,
                };
                (row.country.as_str(), share)
            })
            .collect()
    }
}

pub fn summary(record: &VariantRecord) -> SummaryView {
    SummaryView {
        lineage_code: record.lineage_code.clone(),
        who_label: record.who_label.clone(),
        first_country: record.first_country.clone(),
        first_date: record.first_date.clone(),
        monitoring_status: record.monitoring_status.clone(),
    }
}

pub fn mutations(record: &VariantRecord) -> MutationView {
    let rows = record
        .nucleotide_mutations
        .iter()
        .zip(&record.amino_acid_mutations)
        .map(|(nucleotide, amino_acid)| MutationRow {
            nucleotide: nucleotide.clone(),
            amino_acid: amino_acid.clone(),
        })
        .collect::<Vec<_>>();
    let unpaired = record
        .nucleotide_mutations
        .len()
        .abs_diff(record.amino_acid_mutations.len());
    if unpaired > 0 {
        warn!(
            lineage = %record.lineage_code,
            nucleotide = record.nucleotide_mutations.len(),
            amino_acid = record.amino_acid_mutations.len(),
            "mutation lists differ in length; unpaired entries omitted"
        );
    }
    MutationView { rows, unpaired }
}

pub fn structure(record: &VariantRecord, assets: &Assets) -> StructureView {
    let path = assets.chart_path(&record.structural_chart_ref);
    let svg = match assets.load_chart(&record.structural_chart_ref) {
        Ok(svg) => Some(svg),
        Err(err) => {
            warn!(error = %err, "mutation chart unavailable");
            None
        }
    };
    StructureView {
        viewer: ViewerDirective {
            structure_id: record.structure_id.clone(),
            style: "cartoon:color=spectrum",
            background: "0xffffff",
            spin: "axis:y;speed:1",
        },
        chart: ChartAsset {
            path: path.to_string(),
            data_uri: svg.as_deref().map(svg_data_uri),
            svg,
        },
    }
}

pub fn geography(record: &VariantRecord) -> GeoBreakdown {
    let mut rows = record
        .top_countries
        .iter()
        .take(GEO_ROWS - 1)
        .map(|share| CountryRow {
            country: share
                .country
                .clone()
                .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string()),
            percentage: share.percentage,
        })
        .collect::<Vec<_>>();
    while rows.len() < GEO_ROWS - 1 {
        rows.push(CountryRow {
            country: UNKNOWN_COUNTRY.to_string(),
            percentage: None,
        });
    }
    rows.push(CountryRow {
        country: OTHER_BUCKET.to_string(),
        percentage: record.other_percentage,
    });
    GeoBreakdown { rows }
}
