//! Tabular projections of a report, one per output sheet.
//!
//! Views carry typed cells so writers can choose how to render them; flags
//! render as `Yes`/`No` everywhere.

use std::fmt;

use serde::Serialize;

use crate::config::{ChannelKind, ReconConfig};
use crate::model::{Listing, ReconReport, UnifiedRecord, VehicleField};

pub const VIEW_UPLOAD: &str = "to_upload";
pub const VIEW_REMOVE: &str = "to_remove";
pub const VIEW_REMOVE_FOREIGN: &str = "to_remove_foreign";
pub const VIEW_TODOS: &str = "to_dos";
pub const VIEW_SUMMARY: &str = "summary";

/// Views every report carries alongside the per-dealer ones.
pub const FIXED_VIEWS: [&str; 5] = [
    VIEW_UPLOAD,
    VIEW_REMOVE,
    VIEW_REMOVE_FOREIGN,
    VIEW_TODOS,
    VIEW_SUMMARY,
];

/// Excel's limit on worksheet name length.
pub const MAX_SHEET_NAME: usize = 31;

pub const COL_STOCK_NUMBER: &str = "Stock Number";
pub const COL_IN_DMS: &str = "in_dms";
pub const COL_NOTES: &str = "Notes";
pub const COL_DONE: &str = "Done";
pub const COL_TASK: &str = "Task";

/// DMS columns placed before `in_dms`, in sheet order.
const FRONT_FIELDS: [VehicleField; 19] = [
    VehicleField::Make,
    VehicleField::Model,
    VehicleField::Specification,
    VehicleField::Colour,
    VehicleField::RegistrationDate,
    VehicleField::Vin,
    VehicleField::Odometer,
    VehicleField::SellingPrice,
    VehicleField::StandInValue,
    VehicleField::DateInStock,
    VehicleField::OriginalGroupDateInStock,
    VehicleField::StockDays,
    VehicleField::Branch,
    VehicleField::Location,
    VehicleField::BodyStyle,
    VehicleField::FuelType,
    VehicleField::Transmission,
    VehicleField::CustomerOrdered,
    VehicleField::Profiles,
];

/// DMS columns placed after `in_dms`, ahead of the channel columns.
const END_FIELDS: [VehicleField; 2] = [VehicleField::PhotoCount, VehicleField::InternetPrice];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Cell {
    Text(String),
    Flag(bool),
    Count(usize),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        Self::Text(s.into())
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(s) => f.write_str(s),
            Self::Flag(true) => f.write_str("Yes"),
            Self::Flag(false) => f.write_str("No"),
            Self::Count(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableView {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
    /// Rows are vehicles with channel presence columns; writers may colour them.
    pub highlight: bool,
}

impl TableView {
    fn new(name: impl Into<String>, columns: Vec<String>, highlight: bool) -> Self {
        Self {
            name: name.into(),
            columns,
            rows: Vec::new(),
            highlight,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Indices of the `is_on_*` columns.
    pub fn presence_columns(&self) -> Vec<usize> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with("is_on_"))
            .map(|(i, _)| i)
            .collect()
    }
}

pub fn presence_column(key: &str) -> String {
    format!("is_on_{key}")
}

pub fn price_column(key: &str) -> String {
    format!("{key}_price")
}

/// Worksheet name for a view: Excel rejects `[]:*?/\` and long names.
pub fn sheet_name(name: &str) -> String {
    name.chars()
        .map(|c| if matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\') { '_' } else { c })
        .take(MAX_SHEET_NAME)
        .collect()
}

/// File stem for a view's CSV.
pub fn file_stem(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '-' { c } else { '_' })
        .collect()
}

/// Every view of a report in sheet order: dealers, uploads, removals
/// (recognized then foreign), tasks, summary.
pub fn report_views(report: &ReconReport, config: &ReconConfig) -> Vec<TableView> {
    let mut views: Vec<TableView> = report
        .dealers
        .iter()
        .map(|bucket| dealer_view(&bucket.dealer, &bucket.records, config))
        .collect();
    views.push(upload_view(report));
    views.push(removal_view(VIEW_REMOVE, &report.removals.recognized, config));
    views.push(removal_view(VIEW_REMOVE_FOREIGN, &report.removals.foreign, config));
    views.push(task_view(report));
    views.push(summary_view(report, config));
    views
}

/// Full DMS record per vehicle, channel presence and price at the end.
pub fn dealer_view(name: &str, records: &[UnifiedRecord], config: &ReconConfig) -> TableView {
    let mut columns = vec![COL_STOCK_NUMBER.to_string()];
    columns.extend(FRONT_FIELDS.iter().map(|f| f.column().to_string()));
    columns.push(COL_IN_DMS.into());
    columns.extend(END_FIELDS.iter().map(|f| f.column().to_string()));
    for channel in &config.channels {
        columns.push(presence_column(&channel.key));
        columns.push(price_column(&channel.key));
    }

    let mut view = TableView::new(name, columns, true);
    for r in records {
        let mut row = vec![Cell::text(r.identifier.as_str())];
        row.extend(FRONT_FIELDS.iter().map(|f| Cell::text(r.vehicle.get(*f))));
        row.push(Cell::Flag(r.in_primary_system));
        row.extend(END_FIELDS.iter().map(|f| Cell::text(r.vehicle.get(*f))));
        for channel in &config.channels {
            let (present, price) = listing_cells(r.listing(&channel.key));
            row.push(present);
            row.push(price);
        }
        view.rows.push(row);
    }
    view
}

fn upload_view(report: &ReconReport) -> TableView {
    let columns = [
        COL_STOCK_NUMBER,
        VehicleField::Make.column(),
        VehicleField::Model.column(),
        COL_NOTES,
        COL_DONE,
    ];
    let mut view = TableView::new(VIEW_UPLOAD, columns.map(String::from).to_vec(), false);
    for c in &report.upload_candidates {
        view.rows.push(vec![
            Cell::text(c.identifier.as_str()),
            Cell::text(&c.make),
            Cell::text(&c.model),
            Cell::text(&c.note),
            Cell::text(&c.done),
        ]);
    }
    view
}

/// Presence for every channel, price for marketplaces only.
fn removal_view(
    name: &str,
    candidates: &[crate::model::RemovalCandidate],
    config: &ReconConfig,
) -> TableView {
    let mut columns = vec![COL_STOCK_NUMBER.to_string()];
    for channel in &config.channels {
        columns.push(presence_column(&channel.key));
        if channel.kind == ChannelKind::Marketplace {
            columns.push(price_column(&channel.key));
        }
    }
    columns.push(COL_DONE.into());

    let mut view = TableView::new(name, columns, true);
    for c in candidates {
        let mut row = vec![Cell::text(c.identifier.as_str())];
        for channel in &config.channels {
            let listing = c.listings.iter().find(|l| l.channel == channel.key);
            let (present, price) = listing_cells(listing);
            row.push(present);
            if channel.kind == ChannelKind::Marketplace {
                row.push(price);
            }
        }
        row.push(Cell::text(&c.done));
        view.rows.push(row);
    }
    view
}

fn task_view(report: &ReconReport) -> TableView {
    let columns = [COL_TASK, COL_STOCK_NUMBER, COL_NOTES];
    let mut view = TableView::new(VIEW_TODOS, columns.map(String::from).to_vec(), false);
    for t in &report.tasks {
        view.rows.push(vec![
            Cell::text(t.task.label()),
            Cell::text(t.identifier.as_str()),
            Cell::text(&t.note),
        ]);
    }
    view
}

fn summary_view(report: &ReconReport, config: &ReconConfig) -> TableView {
    let s = &report.summary;
    let mut view = TableView::new(VIEW_SUMMARY, vec!["Metric".into(), "Count".into()], false);
    let mut push = |label: String, n: usize| view.rows.push(vec![Cell::Text(label), Cell::Count(n)]);

    push("Total records".into(), s.total_records);
    push("In DMS".into(), s.in_primary_system);
    push("Not in DMS".into(), s.not_in_primary_system);
    for channel in &config.channels {
        let n = s.per_channel.get(&channel.key).copied().unwrap_or(0);
        push(format!("On {}", channel.label), n);
    }
    for dealer in &config.dealers {
        let n = s.per_dealer.get(&dealer.name).copied().unwrap_or(0);
        push(dealer.name.clone(), n);
    }
    push("To upload".into(), s.upload_candidates);
    push("To remove".into(), s.removal_recognized);
    push("To remove (foreign)".into(), s.removal_foreign);
    push("Tasks".into(), s.tasks);
    view
}

fn listing_cells(listing: Option<&Listing>) -> (Cell, Cell) {
    match listing {
        Some(l) => (Cell::Flag(l.present), Cell::text(&l.price)),
        None => (Cell::Flag(false), Cell::text("")),
    }
}
