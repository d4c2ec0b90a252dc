use std::path::Path;

use camino::Utf8PathBuf;
use rusqlite::Connection;

use covar::app::App;
use covar::assets::Assets;
use covar::store::Store;

const SCHEMA: &str = "CREATE TABLE covar (
    Pango_Lineage TEXT, WHO_Label TEXT, First_Country TEXT, First_Date TEXT,
    VOC TEXT, Mutation_N TEXT, Mutation_A TEXT, Spike_PDB TEXT,
    Country1 TEXT, Country2 TEXT, Country3 TEXT, Country4 TEXT, Country5 TEXT,
    Value1, Value2, Value3, Value4, Value5, Other
);";

const DELTA: [(&str, &str); 3] = [
    ("C241T", "5'UTR:C241T"),
    ("C22995A", "S:T478K"),
    ("C23604G", "S:P681R"),
];

const GAMMA: [(&str, Option<&str>); 3] = [
    ("C21614T", Some("S:L18F")),
    ("C21621A", None),
    ("A23063T", Some("S:N501Y")),
];

pub struct Fixture {
    pub _dir: tempfile::TempDir,
    pub db: Utf8PathBuf,
    pub resources: Utf8PathBuf,
    pub exports: Utf8PathBuf,
}

impl Fixture {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let root = Utf8PathBuf::from_path_buf(dir.path().to_path_buf()).unwrap();
        let db = root.join("covar.db");
        let resources = root.join("resources");
        let exports = root.join("exports");
        std::fs::create_dir_all(resources.as_std_path()).unwrap();
        std::fs::create_dir_all(exports.as_std_path()).unwrap();
        std::fs::write(
            resources.join("B.1.617.2.svg").as_std_path(),
            "<svg xmlns=\"http://www.w3.org/2000/svg\"/>",
        )
        .unwrap();
        seed(db.as_std_path());
        Self {
            _dir: dir,
            db,
            resources,
            exports,
        }
    }

    pub fn app(&self) -> App<Store> {
        App::new(
            Store::new(self.db.clone()),
            Assets::new(self.resources.clone()),
        )
    }
}

fn seed(path: &Path) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(SCHEMA).unwrap();

    let mut insert = conn
        .prepare(
            "INSERT INTO covar VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8,
                ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18, ?19)",
        )
        .unwrap();
    for (nucleotide, amino_acid) in DELTA {
        insert
            .execute(rusqlite::params![
                "B.1.617.2",
                "Delta",
                "India",
                "Oct-2020",
                "Former VOC",
                nucleotide,
                amino_acid,
                "7V7Q",
                "United Kingdom",
                "United States of America",
                "India",
                "Germany",
                "Denmark",
                40.0,
                25.0,
                10.0,
                5.0,
                5.0,
                15.0,
            ])
            .unwrap();
    }
    for (nucleotide, amino_acid) in GAMMA {
        insert
            .execute(rusqlite::params![
                "P.1",
                "Gamma",
                "Brazil",
                "Nov-2020",
                "Former VOC",
                nucleotide,
                amino_acid,
                "7SBK",
                "Brazil",
                "United States of America",
                "Canada",
                Option::<&str>::None,
                Option::<&str>::None,
                "80.5%",
                "10",
                5.5,
                Option::<f64>::None,
                Option::<f64>::None,
                4.0,
            ])
            .unwrap();
    }
    insert
        .execute(rusqlite::params![
            "B.1.1.7",
            "Alpha",
            "United Kingdom",
            "Sep-2020",
            "Former VOC",
            "C3267T",
            "ORF1a:T1001I",
            "7LWV",
            "United Kingdom",
            "United States of America",
            "Denmark",
            "Germany",
            "Sweden",
            50.0,
            20.0,
            8.0,
            6.0,
            4.0,
            12.0,
        ])
        .unwrap();
}
