// CSV/TSV source import and report view export

use std::cmp::Reverse;
use std::io::Read;
use std::path::{Path, PathBuf};

use stockrecon_recon::model::Table;
use stockrecon_recon::views::{file_stem, TableView, VIEW_SUMMARY};
use tracing::debug;

/// Read a delimited export into a [`Table`]. The first record is the header.
pub fn read_table(path: &Path) -> Result<Table, String> {
    let content = read_file_as_utf8(path)?;
    let table = parse_table(&content)?;
    debug!(
        path = %path.display(),
        columns = table.headers.len(),
        rows = table.rows.len(),
        "read csv"
    );
    Ok(table)
}

/// Parse delimited text. A leading `sep=` directive (written by Excel and by
/// some dealer portals) names the delimiter and is not part of the data;
/// otherwise the delimiter is sniffed.
pub fn parse_table(content: &str) -> Result<Table, String> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let (body, directive) = strip_sep_directive(content);
    let delimiter = directive.unwrap_or_else(|| sniff_delimiter(body));

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(body.as_bytes());

    let mut records = reader.records();
    let headers: Vec<String> = match records.next() {
        Some(result) => {
            let record = result.map_err(|e| e.to_string())?;
            record.iter().map(|h| h.trim().to_string()).collect()
        }
        None => return Ok(Table::default()),
    };

    let mut rows = Vec::new();
    for result in records {
        let record = result.map_err(|e| e.to_string())?;
        rows.push(record.iter().map(str::to_string).collect());
    }

    Ok(Table::new(headers, rows))
}

/// Split off a `sep=X` first line (any case). Returns the remaining text and
/// the delimiter it named, if it named a single-byte one.
fn strip_sep_directive(content: &str) -> (&str, Option<u8>) {
    let (first, rest) = match content.find('\n') {
        Some(idx) => (&content[..idx], &content[idx + 1..]),
        None => (content, ""),
    };
    let first = first.trim_end_matches('\r');
    let is_directive = first
        .get(..4)
        .is_some_and(|head| head.eq_ignore_ascii_case("sep="));
    if !is_directive {
        return (content, None);
    }
    let delimiter = match first[4..].as_bytes() {
        [b] => Some(*b),
        _ => None,
    };
    (rest, delimiter)
}

/// Delimiters seen in dealer exports, in tie-break order.
const DELIMITERS: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Records sampled when sniffing.
const SNIFF_RECORDS: usize = 10;

/// Pick the delimiter that splits the header into the most columns while
/// keeping the sampled rows at the header's width. Single-column files fall
/// back to comma.
fn sniff_delimiter(content: &str) -> u8 {
    DELIMITERS
        .iter()
        .enumerate()
        .filter_map(|(rank, &delimiter)| {
            let widths = record_widths(content, delimiter);
            let header = *widths.first()?;
            if header < 2 {
                return None;
            }
            let steady = widths.iter().filter(|&&w| w == header).count();
            Some((steady * header, Reverse(rank), delimiter))
        })
        .max_by_key(|&(score, rank, _)| (score, rank))
        .map_or(b',', |(_, _, delimiter)| delimiter)
}

fn record_widths(content: &str, delimiter: u8) -> Vec<usize> {
    csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .has_headers(false)
        .flexible(true)
        .from_reader(content.as_bytes())
        .records()
        .take(SNIFF_RECORDS)
        .map_while(Result::ok)
        .map(|record| record.len())
        .collect()
}

/// Read file and convert to UTF-8 if needed (handles Windows-1252, Latin-1, etc.)
pub fn read_file_as_utf8(path: &Path) -> Result<String, String> {
    let mut file = std::fs::File::open(path).map_err(|e| format!("{}: {e}", path.display()))?;
    let mut bytes = Vec::new();
    file.read_to_end(&mut bytes)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    match String::from_utf8(bytes) {
        Ok(s) => Ok(s),
        Err(e) => {
            let bytes = e.into_bytes();
            // DMS exports come out of Excel on Windows
            let (decoded, _, _) = encoding_rs::WINDOWS_1252.decode(&bytes);
            Ok(decoded.into_owned())
        }
    }
}

/// Write one view as CSV: header row, then rows with flags as Yes/No.
pub fn write_view(view: &TableView, path: &Path) -> Result<(), String> {
    let mut writer = csv::WriterBuilder::new()
        .from_path(path)
        .map_err(|e| format!("{}: {e}", path.display()))?;

    writer.write_record(&view.columns).map_err(|e| e.to_string())?;
    for row in &view.rows {
        writer
            .write_record(row.iter().map(|cell| cell.to_string()))
            .map_err(|e| e.to_string())?;
    }

    writer.flush().map_err(|e| e.to_string())?;
    Ok(())
}

/// Write every non-empty view (and always the summary) to `<dir>/<name>.csv`.
pub fn write_views(views: &[TableView], dir: &Path) -> Result<Vec<PathBuf>, String> {
    std::fs::create_dir_all(dir).map_err(|e| format!("{}: {e}", dir.display()))?;

    let mut written = Vec::new();
    for view in views {
        if view.is_empty() && view.name != VIEW_SUMMARY {
            continue;
        }
        let path = dir.join(format!("{}.csv", file_stem(&view.name)));
        write_view(view, &path)?;
        written.push(path);
    }
    Ok(written)
}
