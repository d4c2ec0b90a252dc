use serde::Serialize;

use crate::assets::{Assets, StaticAsset};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tone {
    Info,
    Warning,
    Error,
    Success,
}

#[derive(Debug, Clone, Serialize)]
pub struct Notice {
    pub tone: Tone,
    pub title: &'static str,
    pub lines: &'static [&'static str],
}

pub const HOME_TITLE: &str = "Welcome to CoVar!";
pub const HOME_CAPTION: &str =
    "Molecular and Epidemiological Database for Major SARS-CoV-2 Variants";

pub const LINEAGE_PROMPT: &str = "Enter the Pango Lineage Here: (e.g., B.1.617.2)";
pub const LABEL_PROMPT: &str = "Enter the WHO Label Here: (e.g., Gamma)";
pub const INPUT_MAX_CHARS: usize = 20;

pub const ABOUT: &[Notice] = &[
    Notice {
        tone: Tone::Info,
        title: "Credits",
        lines: &[
            "CoVar: A molecular and epidemiological database for major SARS-CoV-2 variants",
            "Developed by Sina Farazmandi (s.farazmandi@modares.ac.ir), Tarbiat Modares University, Tehran, Iran",
        ],
    },
    Notice {
        tone: Tone::Warning,
        title: "Data sources",
        lines: &[
            "Epidemiological data from Cov-lineages.org (https://cov-lineages.org/)",
            "Sample sequences from NCBI SRA (https://www.ncbi.nlm.nih.gov/sra)",
            "Reference sequence: hCoV-19/Wuhan/WIV04/2019 (WIV04)",
        ],
    },
    Notice {
        tone: Tone::Error,
        title: "Disclaimer",
        lines: &[
            "Developed for educational purposes as a project for a Biological Databases course.",
            "There is no guarantee that it will be maintained or that the epidemiological data stays up to date; always double-check before using this data in research.",
        ],
    },
    Notice {
        tone: Tone::Success,
        title: "WHO monitoring status",
        lines: &[
            "For updated WHO monitoring status see https://www.who.int/en/activities/tracking-SARS-CoV-2-variants/",
        ],
    },
];

pub const HOW_TO_USE: Notice = Notice {
    tone: Tone::Info,
    title: "How to use?",
    lines: &[
        "Open the Lookup view from the menu.",
        "Search variants either by Pango lineage or by the label given by WHO.",
        "Lower or upper case input both work.",
        "Once you enter the input the variant information is shown.",
        "Press F6 on a shown variant to download its mutations as an Excel file.",
    ],
};

#[derive(Debug, Clone, Serialize)]
pub struct HelpPage {
    pub guide: Notice,
    pub media: Vec<StaticAsset>,
    pub media_source: &'static str,
}

pub fn help(assets: &Assets) -> HelpPage {
    HelpPage {
        guide: HOW_TO_USE,
        media: assets.help_media(),
        media_source: "https://www.youtube.com/watch?v=JmJIF47_f1s",
    }
}
