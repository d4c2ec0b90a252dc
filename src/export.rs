//! Excel workbook export of the mutation table.
//!
//! The workbook is a minimal SpreadsheetML package assembled with `zip`: one
//! sheet named `Sheet1`, a bold header row, shared strings, and the `0.00`
//! number format attached to column A. [`read_sheet`] parses the same layout
//! back so downloads can be verified.

use std::collections::HashMap;
use std::fmt::Write as _;
use std::fs;
use std::io::{Cursor, Read, Write};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{SecondsFormat, Utc};
use regex::Regex;
use tracing::info;
use zip::ZipArchive;
use zip::write::SimpleFileOptions;

use crate::domain::SearchKey;
use crate::error::CovarError;
use crate::views::{MUTATION_HEADERS, MutationRow, MutationView};

pub const SHEET_NAME: &str = "Sheet1";

const STYLE_NUMBER: u8 = 1;
const STYLE_HEADER: u8 = 2;

const CONTENT_TYPES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="rels" ContentType="application/vnd.openxmlformats-package.relationships+xml"/><Default Extension="xml" ContentType="application/xml"/><Override PartName="/docProps/app.xml" ContentType="application/vnd.openxmlformats-officedocument.extended-properties+xml"/><Override PartName="/docProps/core.xml" ContentType="application/vnd.openxmlformats-package.core-properties+xml"/><Override PartName="/xl/styles.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.styles+xml"/><Override PartName="/xl/theme/theme1.xml" ContentType="application/vnd.openxmlformats-officedocument.theme+xml"/><Override PartName="/xl/workbook.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml"/><Override PartName="/xl/worksheets/sheet1.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml"/><Override PartName="/xl/sharedStrings.xml" ContentType="application/vnd.openxmlformats-officedocument.spreadsheetml.sharedStrings+xml"/></Types>"#;

const ROOT_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/extended-properties" Target="docProps/app.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/package/2006/relationships/metadata/core-properties" Target="docProps/core.xml"/><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument" Target="xl/workbook.xml"/></Relationships>"#;

const WORKBOOK_RELS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/theme" Target="theme/theme1.xml"/><Relationship Id="rId3" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/styles" Target="styles.xml"/><Relationship Id="rId4" Type="http://schemas.openxmlformats.org/officeDocument/2006/relationships/sharedStrings" Target="sharedStrings.xml"/></Relationships>"#;

const THEME: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<a:theme xmlns:a="http://schemas.openxmlformats.org/drawingml/2006/main" name="Office Theme"><a:themeElements><a:clrScheme name="Office"><a:dk1><a:sysClr val="windowText" lastClr="000000"/></a:dk1><a:lt1><a:sysClr val="window" lastClr="FFFFFF"/></a:lt1><a:dk2><a:srgbClr val="1F497D"/></a:dk2><a:lt2><a:srgbClr val="EEECE1"/></a:lt2><a:accent1><a:srgbClr val="4F81BD"/></a:accent1><a:accent2><a:srgbClr val="C0504D"/></a:accent2><a:accent3><a:srgbClr val="9BBB59"/></a:accent3><a:accent4><a:srgbClr val="8064A2"/></a:accent4><a:accent5><a:srgbClr val="4BACC6"/></a:accent5><a:accent6><a:srgbClr val="F79646"/></a:accent6><a:hlink><a:srgbClr val="0000FF"/></a:hlink><a:folHlink><a:srgbClr val="800080"/></a:folHlink></a:clrScheme><a:fontScheme name="Office"><a:majorFont><a:latin typeface="Cambria"/><a:ea typeface=""/><a:cs typeface=""/></a:majorFont><a:minorFont><a:latin typeface="Calibri"/><a:ea typeface=""/><a:cs typeface=""/></a:minorFont></a:fontScheme><a:fmtScheme name="Office"><a:fillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:fillStyleLst><a:lnStyleLst><a:ln w="9525"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="25400"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln><a:ln w="38100"><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:ln></a:lnStyleLst><a:effectStyleLst><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle><a:effectStyle><a:effectLst/></a:effectStyle></a:effectStyleLst><a:bgFillStyleLst><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill><a:solidFill><a:schemeClr val="phClr"/></a:solidFill></a:bgFillStyleLst></a:fmtScheme></a:themeElements><a:objectDefaults/><a:extraClrSchemeLst/></a:theme>"#;

// numFmtId 2 is the built-in "0.00" format.
const STYLES: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<styleSheet xmlns="http://schemas.openxmlformats.org/spreadsheetml/2006/main"><fonts count="2"><font><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font><font><b/><sz val="11"/><color theme="1"/><name val="Calibri"/><family val="2"/><scheme val="minor"/></font></fonts><fills count="2"><fill><patternFill patternType="none"/></fill><fill><patternFill patternType="gray125"/></fill></fills><borders count="2"><border><left/><right/><top/><bottom/><diagonal/></border><border><left style="thin"><color auto="1"/></left><right style="thin"><color auto="1"/></right><top style="thin"><color auto="1"/></top><bottom style="thin"><color auto="1"/></bottom><diagonal/></border></borders><cellStyleXfs count="1"><xf numFmtId="0" fontId="0" fillId="0" borderId="0"/></cellStyleXfs><cellXfs count="3"><xf numFmtId="0" fontId="0" fillId="0" borderId="0" xfId="0"/><xf numFmtId="2" fontId="0" fillId="0" borderId="0" xfId="0" applyNumberFormat="1"/><xf numFmtId="0" fontId="1" fillId="0" borderId="1" xfId="0" applyFont="1" applyBorder="1" applyAlignment="1"><alignment horizontal="center" vertical="top"/></xf></cellXfs><cellStyles count="1"><cellStyle name="Normal" xfId="0" builtinId="0"/></cellStyles><dxfs count="0"/><tableStyles count="0" defaultTableStyle="TableStyleMedium9" defaultPivotStyle="PivotStyleLight16"/></styleSheet>"#;

const APP_PROPS: &str = r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?>
<Properties xmlns="http://schemas.openxmlformats.org/officeDocument/2006/extended-properties" xmlns:vt="http://schemas.openxmlformats.org/officeDocument/2006/docPropsVTypes"><Application>Microsoft Excel</Application><DocSecurity>0</DocSecurity><ScaleCrop>false</ScaleCrop><HeadingPairs><vt:vector size="2" baseType="variant"><vt:variant><vt:lpstr>Worksheets</vt:lpstr></vt:variant><vt:variant><vt:i4>1</vt:i4></vt:variant></vt:vector></HeadingPairs><TitlesOfParts><vt:vector size="1" baseType="lpstr"><vt:lpstr>Sheet1</vt:lpstr></vt:vector></TitlesOfParts><LinksUpToDate>false</LinksUpToDate><SharedDoc>false</SharedDoc><HyperlinksChanged>false</HyperlinksChanged><AppVersion>12.0000</AppVersion></Properties>"#;

/// Serializes the mutation table into `.xlsx` bytes.
pub fn to_xlsx(view: &MutationView) -> Result<Vec<u8>, CovarError> {
    let mut strings = SharedStrings::default();
    let sheet = sheet_xml(view, &mut strings);
    let created = Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true);

    let parts: [(&str, String); 9] = [
        ("[Content_Types].xml", CONTENT_TYPES.to_string()),
        ("_rels/.rels", ROOT_RELS.to_string()),
        ("docProps/app.xml", APP_PROPS.to_string()),
        ("docProps/core.xml", core_props_xml(&created)),
        ("xl/workbook.xml", workbook_xml()),
        ("xl/_rels/workbook.xml.rels", WORKBOOK_RELS.to_string()),
        ("xl/theme/theme1.xml", THEME.to_string()),
        ("xl/styles.xml", STYLES.to_string()),
        ("xl/sharedStrings.xml", strings.to_xml()),
    ];

    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    for (name, body) in parts
        .iter()
        .map(|(name, body)| (*name, body.as_str()))
        .chain(std::iter::once(("xl/worksheets/sheet1.xml", sheet.as_str())))
    {
        writer
            .start_file(name, options)
            .map_err(|err| CovarError::Export(format!("{name}: {err}")))?;
        writer
            .write_all(body.as_bytes())
            .map_err(|err| CovarError::Export(format!("{name}: {err}")))?;
    }
    let cursor = writer
        .finish()
        .map_err(|err| CovarError::Export(err.to_string()))?;
    Ok(cursor.into_inner())
}

/// Writes `"<key> mutations.xlsx"` into `dir`, replacing any previous export.
pub fn write_export(
    dir: &Utf8Path,
    key: &SearchKey,
    view: &MutationView,
) -> Result<Utf8PathBuf, CovarError> {
    let bytes = to_xlsx(view)?;
    fs::create_dir_all(dir.as_std_path())
        .map_err(|err| CovarError::Filesystem(err.to_string()))?;
    let dest = dir.join(key.export_file_name());

    let mut temp = tempfile::Builder::new()
        .prefix("covar-export")
        .suffix(".xlsx")
        .tempfile_in(dir.as_std_path())
        .map_err(|err| CovarError::Filesystem(err.to_string()))?;
    temp.write_all(&bytes)
        .map_err(|err| CovarError::Filesystem(err.to_string()))?;
    temp.persist(dest.as_std_path())
        .map_err(|err| CovarError::Filesystem(err.to_string()))?;

    info!(path = %dest, rows = view.rows.len(), "exported mutations");
    Ok(dest)
}

/// Reads the first worksheet of an `.xlsx` package into a grid of strings,
/// one inner vector per row, cells in column order.
pub fn read_sheet(bytes: &[u8]) -> Result<Vec<Vec<String>>, CovarError> {
    let mut archive =
        ZipArchive::new(Cursor::new(bytes)).map_err(|err| CovarError::SheetRead(err.to_string()))?;
    let shared = match read_part(&mut archive, "xl/sharedStrings.xml") {
        Ok(xml) => parse_shared_strings(&xml),
        Err(_) => Vec::new(),
    };
    let sheet = read_part(&mut archive, "xl/worksheets/sheet1.xml")?;

    let row_re = Regex::new(r#"(?s)<row\b[^>]*>(.*?)</row>"#).unwrap();
    let cell_re = Regex::new(r#"(?s)<c\b([^>]*?)(?:/>|>(.*?)</c>)"#).unwrap();
    let ref_re = Regex::new(r#"\br="([A-Z]+)\d+""#).unwrap();
    let type_re = Regex::new(r#"\bt="(\w+)""#).unwrap();
    let value_re = Regex::new(r#"(?s)<v>(.*?)</v>"#).unwrap();
    let inline_re = Regex::new(r#"(?s)<t\b[^>]*>(.*?)</t>"#).unwrap();

    let mut grid = Vec::new();
    for row in row_re.captures_iter(&sheet) {
        let mut cells: Vec<String> = Vec::new();
        for cell in cell_re.captures_iter(&row[1]) {
            let attrs = &cell[1];
            let body = cell.get(2).map(|m| m.as_str()).unwrap_or("");
            let column = ref_re
                .captures(attrs)
                .map(|caps| column_index(&caps[1]))
                .unwrap_or(cells.len());
            let value = match type_re.captures(attrs).map(|caps| caps[1].to_string()) {
                Some(kind) if kind == "s" => {
                    let index = value_re
                        .captures(body)
                        .and_then(|caps| caps[1].trim().parse::<usize>().ok())
                        .ok_or_else(|| CovarError::SheetRead("bad shared string index".into()))?;
                    shared
                        .get(index)
                        .cloned()
                        .ok_or_else(|| CovarError::SheetRead(format!("missing string {index}")))?
                }
                Some(kind) if kind == "inlineStr" => inline_re
                    .captures_iter(body)
                    .map(|caps| unescape(&caps[1]))
                    .collect(),
                _ => value_re
                    .captures(body)
                    .map(|caps| unescape(&caps[1]))
                    .unwrap_or_default(),
            };
            if cells.len() <= column {
                cells.resize(column + 1, String::new());
            }
            cells[column] = value;
        }
        grid.push(cells);
    }
    Ok(grid)
}

/// Reads an exported mutation workbook back into table rows.
pub fn read_mutations(bytes: &[u8]) -> Result<Vec<MutationRow>, CovarError> {
    let grid = read_sheet(bytes)?;
    let mut rows = grid.into_iter();
    let header = rows
        .next()
        .ok_or_else(|| CovarError::SheetRead("empty worksheet".to_string()))?;
    if header != MUTATION_HEADERS {
        return Err(CovarError::SheetRead(format!(
            "unexpected header row: {}",
            header.join(", ")
        )));
    }
    Ok(rows
        .map(|mut cells| {
            cells.resize(2, String::new());
            let amino_acid = cells.pop().unwrap_or_default();
            let nucleotide = cells.pop().unwrap_or_default();
            MutationRow {
                nucleotide,
                amino_acid,
            }
        })
        .collect())
}

#[derive(Default)]
struct SharedStrings {
    index: HashMap<String, usize>,
    ordered: Vec<String>,
    references: usize,
}

impl SharedStrings {
    fn intern(&mut self, value: &str) -> usize {
        self.references += 1;
        if let Some(&id) = self.index.get(value) {
            return id;
        }
        let id = self.ordered.len();
        self.ordered.push(value.to_string());
        self.index.insert(value.to_string(), id);
        id
    }

    fn to_xml(&self) -> String {
        let mut xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <sst xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
             count=\"{}\" uniqueCount=\"{}\">",
            self.references,
            self.ordered.len()
        );
        for value in &self.ordered {
            let space = if value.trim() != value {
                " xml:space=\"preserve\""
            } else {
                ""
            };
            let _ = write!(xml, "<si><t{space}>{}</t></si>", escape(value));
        }
        xml.push_str("</sst>");
        xml
    }
}

fn sheet_xml(view: &MutationView, strings: &mut SharedStrings) -> String {
    let last_row = view.rows.len() + 1;
    let mut xml = format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         <dimension ref=\"A1:B{last_row}\"/>\
         <sheetViews><sheetView tabSelected=\"1\" workbookViewId=\"0\"/></sheetViews>\
         <sheetFormatPr defaultRowHeight=\"15\"/>\
         <cols><col min=\"1\" max=\"1\" width=\"9.140625\" style=\"{STYLE_NUMBER}\"/></cols>\
         <sheetData>"
    );

    push_row(&mut xml, strings, 1, MUTATION_HEADERS, [STYLE_HEADER, STYLE_HEADER]);
    for (idx, row) in view.rows.iter().enumerate() {
        push_row(
            &mut xml,
            strings,
            idx + 2,
            [row.nucleotide.as_str(), row.amino_acid.as_str()],
            [STYLE_NUMBER, 0],
        );
    }

    xml.push_str(
        "</sheetData><pageMargins left=\"0.7\" right=\"0.7\" top=\"0.75\" \
         bottom=\"0.75\" header=\"0.3\" footer=\"0.3\"/></worksheet>",
    );
    xml
}

fn push_row(
    xml: &mut String,
    strings: &mut SharedStrings,
    row: usize,
    values: [&str; 2],
    styles: [u8; 2],
) {
    let _ = write!(xml, "<row r=\"{row}\" spans=\"1:2\">");
    for (col, (value, style)) in ["A", "B"].iter().zip(values.iter().zip(styles)) {
        if value.is_empty() {
            continue;
        }
        let id = strings.intern(value);
        if style == 0 {
            let _ = write!(xml, "<c r=\"{col}{row}\" t=\"s\"><v>{id}</v></c>");
        } else {
            let _ = write!(xml, "<c r=\"{col}{row}\" s=\"{style}\" t=\"s\"><v>{id}</v></c>");
        }
    }
    xml.push_str("</row>");
}

fn workbook_xml() -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
         xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\">\
         <fileVersion appName=\"xl\" lastEdited=\"4\" lowestEdited=\"4\" rupBuild=\"4505\"/>\
         <workbookPr defaultThemeVersion=\"124226\"/>\
         <bookViews><workbookView xWindow=\"240\" yWindow=\"15\" windowWidth=\"16095\" windowHeight=\"9660\"/></bookViews>\
         <sheets><sheet name=\"{SHEET_NAME}\" sheetId=\"1\" r:id=\"rId1\"/></sheets>\
         <calcPr calcId=\"124519\" fullCalcOnLoad=\"1\"/></workbook>"
    )
}

fn core_props_xml(created: &str) -> String {
    format!(
        "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
         <cp:coreProperties xmlns:cp=\"http://schemas.openxmlformats.org/package/2006/metadata/core-properties\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" xmlns:dcterms=\"http://purl.org/dc/terms/\" \
         xmlns:dcmitype=\"http://purl.org/dc/dcmitype/\" \
         xmlns:xsi=\"http://www.w3.org/2001/XMLSchema-instance\">\
         <dc:creator>covar</dc:creator>\
         <dcterms:created xsi:type=\"dcterms:W3CDTF\">{created}</dcterms:created>\
         <dcterms:modified xsi:type=\"dcterms:W3CDTF\">{created}</dcterms:modified>\
         </cp:coreProperties>"
    )
}

fn read_part(
    archive: &mut ZipArchive<Cursor<&[u8]>>,
    name: &str,
) -> Result<String, CovarError> {
    let mut entry = archive
        .by_name(name)
        .map_err(|err| CovarError::SheetRead(format!("{name}: {err}")))?;
    let mut content = String::new();
    entry
        .read_to_string(&mut content)
        .map_err(|err| CovarError::SheetRead(format!("{name}: {err}")))?;
    Ok(content)
}

fn parse_shared_strings(xml: &str) -> Vec<String> {
    let si_re = Regex::new(r#"(?s)<si>(.*?)</si>"#).unwrap();
    let t_re = Regex::new(r#"(?s)<t\b[^>]*>(.*?)</t>"#).unwrap();
    si_re
        .captures_iter(xml)
        .map(|si| {
            t_re.captures_iter(&si[1])
                .map(|t| unescape(&t[1]))
                .collect::<String>()
        })
        .collect()
}

fn column_index(letters: &str) -> usize {
    letters
        .bytes()
        .fold(0usize, |acc, b| acc * 26 + usize::from(b - b'A' + 1))
        - 1
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}

fn unescape(value: &str) -> String {
    value
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn column_letters_to_index() {
        assert_eq!(column_index("A"), 0);
        assert_eq!(column_index("B"), 1);
        assert_eq!(column_index("AA"), 26);
    }

    #[test]
    fn escape_round_trips_markup() {
        let raw = "ins<22204>&'GAGCCAGAA\"";
        assert_eq!(unescape(&escape(raw)), raw);
    }

    #[test]
    fn number_format_applies_to_column_a() {
        let view = MutationView {
            rows: vec![MutationRow {
                nucleotide: "A23063T".to_string(),
                amino_acid: "S:N501Y".to_string(),
            }],
            unpaired: 0,
        };
        let mut strings = SharedStrings::default();
        let xml = sheet_xml(&view, &mut strings);
        assert!(xml.contains("<col min=\"1\" max=\"1\" width=\"9.140625\" style=\"1\"/>"));
        assert!(xml.contains("<c r=\"A2\" s=\"1\" t=\"s\"><v>2</v></c>"));
        assert!(xml.contains("<c r=\"B2\" t=\"s\"><v>3</v></c>"));
        assert!(STYLES.contains("numFmtId=\"2\""));
    }

    #[test]
    fn blank_amino_acid_leaves_no_cell() {
        let view = MutationView {
            rows: vec![MutationRow {
                nucleotide: "C21621A".to_string(),
                amino_acid: String::new(),
            }],
            unpaired: 0,
        };
        let mut strings = SharedStrings::default();
        let xml = sheet_xml(&view, &mut strings);
        assert!(xml.contains("<c r=\"A2\""));
        assert!(!xml.contains("<c r=\"B2\""));
    }
}
