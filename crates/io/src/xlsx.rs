// Excel source import (xlsx, xls, xlsb, ods) and report workbook export (xlsx only)
//
// Import: first row is the header, every cell is rendered to text.
// Export: one worksheet per view, native table, conditional highlighting.

use std::path::Path;

use calamine::{open_workbook_auto, Data, ExcelDateTime, Reader, Sheets};
use chrono::NaiveTime;
use rust_xlsxwriter::{
    Color, ConditionalFormatFormula, Format, Table as XlsxTable, TableColumn, TableStyle, Workbook,
    Worksheet,
};
use stockrecon_recon::model::{Table, VehicleField};
use stockrecon_recon::views::{sheet_name, Cell, TableView, VIEW_SUMMARY};
use tracing::debug;

/// Read one worksheet (the first when `sheet` is None) into a [`Table`].
pub fn read_table(path: &Path, sheet: Option<&str>) -> Result<Table, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file {}: {}", path.display(), e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| format!("{}: no sheet named '{}'", path.display(), wanted))?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| format!("{}: Excel file contains no sheets", path.display()))?,
    };

    let range = workbook
        .worksheet_range(&name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", name, e))?;

    let mut rows = range.rows();
    let headers: Vec<String> = match rows.next() {
        Some(first) => first.iter().map(|c| cell_text(c).trim().to_string()).collect(),
        None => return Ok(Table::default()),
    };
    let rows: Vec<Vec<String>> = rows.map(|r| r.iter().map(cell_text).collect()).collect();

    debug!(
        path = %path.display(),
        sheet = %name,
        columns = headers.len(),
        rows = rows.len(),
        "read workbook"
    );
    Ok(Table::new(headers, rows))
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        Data::Float(n) => {
            // Format nicely: integers without decimals
            if n.fract() == 0.0 && n.abs() < 1e15 {
                format!("{}", *n as i64)
            } else {
                format!("{}", n)
            }
        }
        Data::Int(n) => n.to_string(),
        Data::Bool(b) => if *b { "TRUE" } else { "FALSE" }.to_string(),
        Data::Error(e) => format!("#{:?}", e),
        Data::DateTime(dt) => datetime_text(dt),
        Data::DateTimeIso(s) | Data::DurationIso(s) => s.clone(),
    }
}

/// Dates as `YYYY-MM-DD`, with the time of day only when it is set.
/// Durations stay as Excel's fractional day count.
fn datetime_text(dt: &ExcelDateTime) -> String {
    if dt.is_duration() {
        return format!("{}", dt.as_f64());
    }
    match dt.as_datetime() {
        Some(value) if value.time() == NaiveTime::MIN => value.format("%Y-%m-%d").to_string(),
        Some(value) => value.format("%Y-%m-%d %H:%M:%S").to_string(),
        None => format!("{}", dt.as_f64()),
    }
}

// ============================================================================
// Report export
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportOptions {
    /// Rows whose `Photo Count` exceeds this and miss a channel are marked red.
    pub photo_threshold: u32,
}

impl Default for ReportOptions {
    fn default() -> Self {
        Self { photo_threshold: 1 }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExportResult {
    pub sheets_exported: usize,
    /// Empty views left out of the workbook.
    pub sheets_skipped: usize,
    pub rows_exported: usize,
}

/// Write the report workbook. Empty views are skipped; the summary view is
/// always written.
pub fn write_report(
    views: &[TableView],
    path: &Path,
    options: &ReportOptions,
) -> Result<ExportResult, String> {
    let mut result = ExportResult::default();
    let mut workbook = Workbook::new();

    for view in views {
        if view.is_empty() && view.name != VIEW_SUMMARY {
            debug!(view = %view.name, "skipping empty view");
            result.sheets_skipped += 1;
            continue;
        }

        let name = sheet_name(&view.name);
        let worksheet = workbook
            .add_worksheet()
            .set_name(&name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))?;

        export_view(worksheet, view, options)?;
        result.sheets_exported += 1;
        result.rows_exported += view.rows.len();
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file: {}", e))?;

    Ok(result)
}

fn export_view(
    worksheet: &mut Worksheet,
    view: &TableView,
    options: &ReportOptions,
) -> Result<(), String> {
    let last_row = view.rows.len() as u32;
    let last_col = view.columns.len().saturating_sub(1) as u16;

    for (r, row) in view.rows.iter().enumerate() {
        for (c, cell) in row.iter().enumerate() {
            let (r, c) = (r as u32 + 1, c as u16);
            match cell {
                Cell::Text(s) if s.is_empty() => {}
                Cell::Count(n) => {
                    worksheet
                        .write_number(r, c, *n as f64)
                        .map_err(|e| format!("Failed to write cell: {}", e))?;
                }
                other => {
                    worksheet
                        .write_string(r, c, other.to_string())
                        .map_err(|e| format!("Failed to write cell: {}", e))?;
                }
            }
        }
    }

    if !view.rows.is_empty() && !view.columns.is_empty() {
        let columns: Vec<TableColumn> = view
            .columns
            .iter()
            .map(|c| TableColumn::new().set_header(c))
            .collect();
        let table = XlsxTable::new()
            .set_style(TableStyle::Medium9)
            .set_columns(&columns);
        worksheet
            .add_table(0, 0, last_row, last_col, &table)
            .map_err(|e| format!("Failed to add table: {}", e))?;

        if view.highlight {
            add_highlighting(worksheet, view, last_row, last_col, options)?;
        }
    }

    // Header last so the bold format survives the table header
    let header = Format::new().set_bold();
    for (c, column) in view.columns.iter().enumerate() {
        worksheet
            .write_string_with_format(0, c as u16, column, &header)
            .map_err(|e| format!("Failed to write header: {}", e))?;
    }

    worksheet.autofit();
    Ok(())
}

/// Green when listed on every channel; red when the photo count is over the
/// threshold but a channel is missing.
fn add_highlighting(
    worksheet: &mut Worksheet,
    view: &TableView,
    last_row: u32,
    last_col: u16,
    options: &ReportOptions,
) -> Result<(), String> {
    let presence = view.presence_columns();
    if presence.is_empty() {
        return Ok(());
    }

    let all_yes: Vec<String> = presence
        .iter()
        .map(|&c| format!("${}2=\"Yes\"", col_to_letter(c)))
        .collect();
    let green = Format::new()
        .set_background_color(Color::RGB(0xC6EFCE))
        .set_font_color(Color::RGB(0x006100));
    let rule = format!("=AND({})", all_yes.join(","));
    let cf = ConditionalFormatFormula::new()
        .set_rule(rule.as_str())
        .set_format(&green);
    worksheet
        .add_conditional_format(1, 0, last_row, last_col, &cf)
        .map_err(|e| format!("Failed to add conditional format: {}", e))?;

    if let Some(photos) = view.column_index(VehicleField::PhotoCount.column()) {
        let any_no: Vec<String> = presence
            .iter()
            .map(|&c| format!("${}2=\"No\"", col_to_letter(c)))
            .collect();
        let red = Format::new()
            .set_background_color(Color::RGB(0xFFC7CE))
            .set_font_color(Color::RGB(0x9C0006));
        let rule = format!(
            "=AND(IFERROR(VALUE(${}2),0)>{},OR({}))",
            col_to_letter(photos),
            options.photo_threshold,
            any_no.join(",")
        );
        let cf = ConditionalFormatFormula::new()
            .set_rule(rule.as_str())
            .set_format(&red);
        worksheet
            .add_conditional_format(1, 0, last_row, last_col, &cf)
            .map_err(|e| format!("Failed to add conditional format: {}", e))?;
    }

    Ok(())
}

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn text_view(name: &str, columns: &[&str], rows: &[&[&str]], highlight: bool) -> TableView {
        TableView {
            name: name.into(),
            columns: columns.iter().map(|s| s.to_string()).collect(),
            rows: rows
                .iter()
                .map(|r| r.iter().map(|s| Cell::text(*s)).collect())
                .collect(),
            highlight,
        }
    }

    #[test]
    fn test_col_to_letter() {
        assert_eq!(col_to_letter(0), "A");
        assert_eq!(col_to_letter(25), "Z");
        assert_eq!(col_to_letter(26), "AA");
        assert_eq!(col_to_letter(28), "AC");
        assert_eq!(col_to_letter(701), "ZZ");
    }

    #[test]
    fn test_read_first_sheet_numbers_as_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cars.xlsx");

        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.write_string(0, 0, " Reference ").unwrap();
        ws.write_string(0, 1, "Price").unwrap();
        ws.write_string(1, 0, "uf001").unwrap();
        ws.write_number(1, 1, 350000.0).unwrap();
        ws.write_string(2, 0, "UG002").unwrap();
        ws.write_number(2, 1, 199999.5).unwrap();
        wb.save(&path).unwrap();

        let table = read_table(&path, None).unwrap();
        assert_eq!(table.headers, vec!["Reference", "Price"]);
        assert_eq!(table.cell(0, 0), "uf001");
        assert_eq!(table.cell(0, 1), "350000");
        assert_eq!(table.cell(1, 1), "199999.5");
    }

    #[test]
    fn test_read_dates_as_iso_text() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("dms.xlsx");
        let date_format = Format::new().set_num_format("dd/mm/yyyy");
        let stamp_format = Format::new().set_num_format("dd/mm/yyyy hh:mm:ss");

        let mut wb = Workbook::new();
        let ws = wb.add_worksheet();
        ws.write_string(0, 0, "Stock Number").unwrap();
        ws.write_string(0, 1, "Registration Date").unwrap();
        ws.write_string(0, 2, "Date In Stock").unwrap();
        ws.write_string(1, 0, "UF001").unwrap();
        let registered = rust_xlsxwriter::ExcelDateTime::from_ymd(2023, 7, 18).unwrap();
        ws.write_datetime_with_format(1, 1, &registered, &date_format).unwrap();
        let stocked = rust_xlsxwriter::ExcelDateTime::from_ymd(2024, 2, 29)
            .unwrap()
            .and_hms(9, 30, 0)
            .unwrap();
        ws.write_datetime_with_format(1, 2, &stocked, &stamp_format).unwrap();
        wb.save(&path).unwrap();

        let table = read_table(&path, None).unwrap();
        assert_eq!(table.cell(0, 1), "2023-07-18");
        assert_eq!(table.cell(0, 2), "2024-02-29 09:30:00");
    }

    #[test]
    fn test_read_named_sheet() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("multi.xlsx");

        let mut wb = Workbook::new();
        wb.add_worksheet().set_name("Other").unwrap().write_string(0, 0, "x").unwrap();
        let ws = wb.add_worksheet().set_name("Stock").unwrap();
        ws.write_string(0, 0, "Stock Number").unwrap();
        ws.write_string(1, 0, "UA1").unwrap();
        wb.save(&path).unwrap();

        let table = read_table(&path, Some("Stock")).unwrap();
        assert_eq!(table.headers, vec!["Stock Number"]);
        assert_eq!(table.cell(0, 0), "UA1");

        let err = read_table(&path, Some("Missing")).unwrap_err();
        assert!(err.contains("Missing"));
    }

    #[test]
    fn test_read_missing_file_errors() {
        let dir = tempdir().unwrap();
        assert!(read_table(&dir.path().join("cars.xlsx"), None).is_err());
    }

    #[test]
    fn test_write_report_skips_empty_views() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("report.xlsx");

        let views = vec![
            text_view(
                "Ford_Nelspruit",
                &["Stock Number", "Photo Count", "is_on_cars", "cars_price"],
                &[&["UF001", "3", "No", ""], &["UF002", "", "Yes", "R 1"]],
                true,
            ),
            text_view("Ford_Mazda", &["Stock Number", "is_on_cars"], &[], true),
            TableView {
                name: VIEW_SUMMARY.into(),
                columns: vec!["Metric".into(), "Count".into()],
                rows: vec![vec![Cell::text("Total records"), Cell::Count(2)]],
                highlight: false,
            },
        ];

        let result = write_report(&views, &path, &ReportOptions::default()).unwrap();
        assert_eq!(result.sheets_exported, 2);
        assert_eq!(result.sheets_skipped, 1);
        assert_eq!(result.rows_exported, 3);

        let mut wb: Sheets<_> = open_workbook_auto(&path).unwrap();
        assert_eq!(wb.sheet_names().to_vec(), vec!["Ford_Nelspruit", "summary"]);

        let dealer = read_table(&path, Some("Ford_Nelspruit")).unwrap();
        assert_eq!(dealer.headers, vec!["Stock Number", "Photo Count", "is_on_cars", "cars_price"]);
        assert_eq!(dealer.rows.len(), 2);
        assert_eq!(dealer.cell(0, 2), "No");
        assert_eq!(dealer.cell(1, 3), "R 1");

        let summary = read_table(&path, Some("summary")).unwrap();
        assert_eq!(summary.cell(0, 0), "Total records");
        assert_eq!(summary.cell(0, 1), "2");
    }

    #[test]
    fn test_write_report_summary_always_present() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("empty.xlsx");
        let views = vec![TableView {
            name: VIEW_SUMMARY.into(),
            columns: vec!["Metric".into(), "Count".into()],
            rows: vec![],
            highlight: false,
        }];

        let result = write_report(&views, &path, &ReportOptions::default()).unwrap();
        assert_eq!(result.sheets_exported, 1);
        assert!(path.exists());
    }
}
