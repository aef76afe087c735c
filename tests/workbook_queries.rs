// End-to-end queries against a workbook written to disk as a real .xlsx package.

use sheetwise::query::processor::UNRECOGNIZED;
use sheetwise::MetricCatalog;
use sheetwise::QueryProcessor;
use sheetwise::Workbook;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

const MAIN_NS: &str = "http://schemas.openxmlformats.org/spreadsheetml/2006/main";
const REL_NS: &str = "http://schemas.openxmlformats.org/officeDocument/2006/relationships";

/// Market sheet: a merged two-row header repeated at row 6, HOTELS and BANKS
/// sectors, and a footnote at row 16 followed by a stray row.
fn market_rows() -> Vec<Vec<&'static str>> {
    vec![
        vec!["CODE", "Name", "P/E", "Div Yield", "PBV"],
        vec!["", "", "", "TTM", "2024"],
        vec!["ABL", "Abans", "8.5", "3", "1.2"],
        vec!["BOC", "Bank of Ceylon", "5", "5", "0.8"],
        vec![],
        vec!["CODE", "Name", "P/E", "Div Yield", "PBV"],
        vec!["", "", "", "TTM", "2024"],
        vec!["HOTELS"],
        vec!["AHPL", "Asian Hotels", "12", "1", "0.5"],
        vec!["BANKS"],
        vec!["COMB", "Commercial Bank", "6", "2", "1.0"],
        vec!["HNB", "Hatton National", "7", "4", "0.9"],
        vec!["SAMP", "Sampath", "5.5", "6", "0.7"],
        vec!["NTB", "Nations Trust", "9", "", "1.1"],
        vec!["DFCC", "DFCC Bank", "10", "", "0.6"],
        vec!["Note: P/E is the share price divided by earnings per share"],
        vec!["ZZZ", "Ghost", "1", "100", "9"],
    ]
}

fn ratio_rows() -> Vec<Vec<&'static str>> {
    vec![vec!["CODE", "ROE"], vec!["ABL", "15"], vec!["COMB", "12"]]
}

fn column_letter(col: usize) -> char {
    (b'A' + col as u8) as char
}

fn worksheet_xml(rows: &[Vec<&str>], merges: &[&str]) -> String {
    let mut xml = format!(r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><worksheet xmlns="{MAIN_NS}"><sheetData>"#);
    for (index, values) in rows.iter().enumerate() {
        let row = index + 1;
        xml.push_str(&format!(r#"<row r="{row}">"#));
        for (col, value) in values.iter().enumerate() {
            let reference = format!("{}{row}", column_letter(col));
            if value.is_empty() {
                continue;
            } else if value.parse::<f64>().is_ok() {
                xml.push_str(&format!(r#"<c r="{reference}"><v>{value}</v></c>"#));
            } else {
                xml.push_str(&format!(r#"<c r="{reference}" t="inlineStr"><is><t>{value}</t></is></c>"#));
            }
        }
        xml.push_str("</row>");
    }
    xml.push_str("</sheetData>");
    if !merges.is_empty() {
        xml.push_str(&format!(r#"<mergeCells count="{}">"#, merges.len()));
        for merge in merges {
            xml.push_str(&format!(r#"<mergeCell ref="{merge}"/>"#));
        }
        xml.push_str("</mergeCells>");
    }
    xml.push_str("</worksheet>");
    xml
}

fn write_workbook(path: &Path) {
    let file = std::fs::File::create(path).unwrap();
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default();
    let parts = [
        (
            "[Content_Types].xml",
            r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Types xmlns="http://schemas.openxmlformats.org/package/2006/content-types"><Default Extension="xml" ContentType="application/xml"/></Types>"#.to_string(),
        ),
        (
            "xl/workbook.xml",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><workbook xmlns="{MAIN_NS}" xmlns:r="{REL_NS}"><sheets><sheet name="Market" sheetId="1" r:id="rId1"/><sheet name="Ratios" sheetId="2" r:id="rId2"/></sheets></workbook>"#
            ),
        ),
        (
            "xl/_rels/workbook.xml.rels",
            format!(
                r#"<?xml version="1.0" encoding="UTF-8" standalone="yes"?><Relationships xmlns="http://schemas.openxmlformats.org/package/2006/relationships"><Relationship Id="rId1" Type="{REL_NS}/worksheet" Target="worksheets/sheet1.xml"/><Relationship Id="rId2" Type="{REL_NS}/worksheet" Target="worksheets/sheet2.xml"/></Relationships>"#
            ),
        ),
        ("xl/worksheets/sheet1.xml", worksheet_xml(&market_rows(), &["A1:A2", "C1:C2", "A6:A7", "C6:C7"])),
        ("xl/worksheets/sheet2.xml", worksheet_xml(&ratio_rows(), &[])),
    ];
    for (name, content) in parts {
        zip.start_file(name, options).unwrap();
        zip.write_all(content.as_bytes()).unwrap();
    }
    zip.finish().unwrap();
}

fn fixture() -> (TempDir, PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("market.xlsx");
    write_workbook(&path);
    (dir, path)
}

fn processor() -> (TempDir, QueryProcessor) {
    let (dir, path) = fixture();
    let workbook = Workbook::open(&path).unwrap();
    (dir, QueryProcessor::new(workbook, Arc::new(MetricCatalog::default())))
}

#[test]
fn infers_layout_from_file() {
    let (_dir, processor) = processor();
    let workbook = processor.workbook();
    assert_eq!(workbook.sheet_names(), vec!["Market", "Ratios"]);
    assert_eq!(workbook.primary_sheet().map(|sheet| sheet.name()), Some("Market"));

    let structure = workbook.structure("Market").unwrap();
    assert_eq!(structure.header_rows, vec![1, 2]);
    assert_eq!(structure.repeating_header_rows, vec![6]);
    assert_eq!(structure.glossary_start, Some(16));
    let sectors: Vec<(usize, &str)> = structure.sectors.iter().map(|sector| (sector.row, sector.label.as_str())).collect();
    assert_eq!(sectors, vec![(8, "HOTELS"), (10, "BANKS")]);
    assert_eq!(structure.data_rows, vec![3, 4, 5, 9, 11, 12, 13, 14, 15]);
    assert_eq!(structure.primary_key_column, 1);

    assert_eq!(
        processor.describe_headers("Market").unwrap(),
        vec!["A: CODE", "B: Name", "C: P/E", "D: Div Yield > TTM", "E: PBV > 2024"]
    );
    assert_eq!(workbook.structure("Ratios").unwrap().header_rows, vec![1]);
}

#[test]
fn point_lookup_reads_merged_header() {
    let (_dir, processor) = processor();
    let response = processor.process_query("P/E for ABL");
    assert!(response.text.contains("P/E: 8.5"), "{}", response.text);
    assert_eq!(response.text, "Data for ABL:\nMarket - P/E: 8.5");

    // exchange suffix falls back to the bare code
    assert_eq!(processor.process_query("pe for abl.n0000").text, "Data for ABL.N0000:\nMarket - P/E: 8.5");
    assert_eq!(processor.process_query("roe for comb").text, "Data for COMB:\nRatios - ROE: 12");
}

#[test]
fn sector_average_uses_numeric_cells_only() {
    let (_dir, processor) = processor();
    let response = processor.process_query("average Div Yield for sector BANKS");
    assert!(response.text.contains("Average: 4.00"), "{}", response.text);
    assert!(response.text.starts_with("Div Yield for sector BANKS in Market:"));
    assert!(response.text.ends_with("  • SAMP: 6.00\n  • HNB: 4.00\n  • COMB: 2.00"));
    assert_eq!(response.chart.map(|chart| chart.points.len()), Some(3));
}

#[test]
fn rows_after_glossary_are_ignored() {
    let (_dir, processor) = processor();
    let text = processor.process_query("average pbv").text;
    assert!(text.contains("Range: 0.50 - 1.20"), "{text}");
    assert!(text.contains("Total Companies: 8"), "{text}");
    assert!(!text.contains("ZZZ"));
    assert_eq!(processor.process_query("P/E for ZZZ").text, "Company 'ZZZ' not found in any sheet.");
}

#[test]
fn unrecognized_query() {
    let (_dir, processor) = processor();
    let response = processor.process_query("xyz123");
    assert_eq!(response.text, UNRECOGNIZED);
    assert!(response.chart.is_none());
}

#[test]
fn structured_query_with_chart() {
    let (_dir, processor) = processor();
    let response = processor.process_structured_json(r#"{"type": "best_stock", "criteria": "dividend yield"}"#);
    assert_eq!(
        response.text,
        "Top stocks by Div Yield in Market:\n1. SAMP: Score = 6.00\n2. BOC: Score = 5.00\n3. HNB: Score = 4.00"
    );
    let json = serde_json::to_value(&response).unwrap();
    assert_eq!(json["chart"]["kind"], "bar");
    assert_eq!(json["chart"]["points"][0]["label"], "SAMP");
}

#[test]
fn bytes_and_file_agree() {
    let (_dir, path) = fixture();
    let from_file = Workbook::open(&path).unwrap();
    let from_bytes = Workbook::from_bytes("upload.xlsx", std::fs::read(&path).unwrap()).unwrap();
    assert_eq!(from_file.structure("Market"), from_bytes.structure("Market"));
}

#[test]
fn load_errors_name_the_file() {
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join("missing.xlsx");
    let error = Workbook::open(&missing).unwrap_err();
    assert!(error.to_string().contains("missing.xlsx"));

    let not_zip = dir.path().join("broken.xlsx");
    std::fs::write(&not_zip, b"plain text").unwrap();
    assert!(Workbook::open(&not_zip).is_err());
}

#[test]
fn reload_rereads_the_file() {
    let (dir, path) = fixture();
    let mut processor = QueryProcessor::new(Workbook::open(&path).unwrap(), Arc::new(MetricCatalog::default()));
    assert_eq!(processor.process_query("roe for abl").text, "Data for ABL:\nRatios - ROE: 15");

    std::fs::remove_file(&path).unwrap();
    assert!(processor.reload().is_err());
    drop(dir);
}
