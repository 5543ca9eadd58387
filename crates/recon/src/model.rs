use std::collections::BTreeMap;

use serde::Serialize;

use crate::normalize::StockId;

// ---------------------------------------------------------------------------
// Input
// ---------------------------------------------------------------------------

/// A parsed tabular source: trimmed header names plus string cells.
///
/// Rows may be shorter than the header (ragged CSV); missing cells read as "".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Table {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

impl Table {
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { headers, rows }
    }

    pub fn cell(&self, row: usize, col: usize) -> &str {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .map(String::as_str)
            .unwrap_or("")
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// ---------------------------------------------------------------------------
// DMS schema
// ---------------------------------------------------------------------------

/// DMS columns retained after the allow-list filter (identifier excluded).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum VehicleField {
    Make,
    Model,
    Specification,
    Colour,
    RegistrationDate,
    Vin,
    Odometer,
    PhotoCount,
    SellingPrice,
    StandInValue,
    InternetPrice,
    DateInStock,
    OriginalGroupDateInStock,
    StockDays,
    Branch,
    Location,
    BodyStyle,
    FuelType,
    Transmission,
    CustomerOrdered,
    Profiles,
}

impl VehicleField {
    /// Allow-list order as exported by the DMS.
    pub const ALL: [VehicleField; 21] = [
        Self::Make,
        Self::Model,
        Self::Specification,
        Self::Colour,
        Self::RegistrationDate,
        Self::Vin,
        Self::Odometer,
        Self::PhotoCount,
        Self::SellingPrice,
        Self::StandInValue,
        Self::InternetPrice,
        Self::DateInStock,
        Self::OriginalGroupDateInStock,
        Self::StockDays,
        Self::Branch,
        Self::Location,
        Self::BodyStyle,
        Self::FuelType,
        Self::Transmission,
        Self::CustomerOrdered,
        Self::Profiles,
    ];

    pub fn column(self) -> &'static str {
        match self {
            Self::Make => "Make",
            Self::Model => "Model",
            Self::Specification => "Specification",
            Self::Colour => "Colour",
            Self::RegistrationDate => "Registration Date",
            Self::Vin => "VIN",
            Self::Odometer => "Odometer",
            Self::PhotoCount => "Photo Count",
            Self::SellingPrice => "Selling Price",
            Self::StandInValue => "Stand In Value",
            Self::InternetPrice => "Internet Price",
            Self::DateInStock => "Date In Stock",
            Self::OriginalGroupDateInStock => "Original Group Date In Stock",
            Self::StockDays => "Stock Days",
            Self::Branch => "Branch",
            Self::Location => "Location",
            Self::BodyStyle => "Body Style",
            Self::FuelType => "Fuel Type",
            Self::Transmission => "Transmission",
            Self::CustomerOrdered => "Customer Ordered",
            Self::Profiles => "Profiles",
        }
    }

    pub fn from_column(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.column() == name)
    }
}

/// DMS attributes of one vehicle. Absent and blank values are both "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Vehicle {
    #[serde(rename = "Make")]
    pub make: String,
    #[serde(rename = "Model")]
    pub model: String,
    #[serde(rename = "Specification")]
    pub specification: String,
    #[serde(rename = "Colour")]
    pub colour: String,
    #[serde(rename = "Registration Date")]
    pub registration_date: String,
    #[serde(rename = "VIN")]
    pub vin: String,
    #[serde(rename = "Odometer")]
    pub odometer: String,
    #[serde(rename = "Photo Count")]
    pub photo_count: String,
    #[serde(rename = "Selling Price")]
    pub selling_price: String,
    #[serde(rename = "Stand In Value")]
    pub stand_in_value: String,
    #[serde(rename = "Internet Price")]
    pub internet_price: String,
    #[serde(rename = "Date In Stock")]
    pub date_in_stock: String,
    #[serde(rename = "Original Group Date In Stock")]
    pub original_group_date_in_stock: String,
    #[serde(rename = "Stock Days")]
    pub stock_days: String,
    #[serde(rename = "Branch")]
    pub branch: String,
    #[serde(rename = "Location")]
    pub location: String,
    #[serde(rename = "Body Style")]
    pub body_style: String,
    #[serde(rename = "Fuel Type")]
    pub fuel_type: String,
    #[serde(rename = "Transmission")]
    pub transmission: String,
    #[serde(rename = "Customer Ordered")]
    pub customer_ordered: String,
    #[serde(rename = "Profiles")]
    pub profiles: String,
}

impl Vehicle {
    pub fn get(&self, field: VehicleField) -> &str {
        match field {
            VehicleField::Make => &self.make,
            VehicleField::Model => &self.model,
            VehicleField::Specification => &self.specification,
            VehicleField::Colour => &self.colour,
            VehicleField::RegistrationDate => &self.registration_date,
            VehicleField::Vin => &self.vin,
            VehicleField::Odometer => &self.odometer,
            VehicleField::PhotoCount => &self.photo_count,
            VehicleField::SellingPrice => &self.selling_price,
            VehicleField::StandInValue => &self.stand_in_value,
            VehicleField::InternetPrice => &self.internet_price,
            VehicleField::DateInStock => &self.date_in_stock,
            VehicleField::OriginalGroupDateInStock => &self.original_group_date_in_stock,
            VehicleField::StockDays => &self.stock_days,
            VehicleField::Branch => &self.branch,
            VehicleField::Location => &self.location,
            VehicleField::BodyStyle => &self.body_style,
            VehicleField::FuelType => &self.fuel_type,
            VehicleField::Transmission => &self.transmission,
            VehicleField::CustomerOrdered => &self.customer_ordered,
            VehicleField::Profiles => &self.profiles,
        }
    }

    pub fn set(&mut self, field: VehicleField, value: impl Into<String>) {
        let slot = match field {
            VehicleField::Make => &mut self.make,
            VehicleField::Model => &mut self.model,
            VehicleField::Specification => &mut self.specification,
            VehicleField::Colour => &mut self.colour,
            VehicleField::RegistrationDate => &mut self.registration_date,
            VehicleField::Vin => &mut self.vin,
            VehicleField::Odometer => &mut self.odometer,
            VehicleField::PhotoCount => &mut self.photo_count,
            VehicleField::SellingPrice => &mut self.selling_price,
            VehicleField::StandInValue => &mut self.stand_in_value,
            VehicleField::InternetPrice => &mut self.internet_price,
            VehicleField::DateInStock => &mut self.date_in_stock,
            VehicleField::OriginalGroupDateInStock => &mut self.original_group_date_in_stock,
            VehicleField::StockDays => &mut self.stock_days,
            VehicleField::Branch => &mut self.branch,
            VehicleField::Location => &mut self.location,
            VehicleField::BodyStyle => &mut self.body_style,
            VehicleField::FuelType => &mut self.fuel_type,
            VehicleField::Transmission => &mut self.transmission,
            VehicleField::CustomerOrdered => &mut self.customer_ordered,
            VehicleField::Profiles => &mut self.profiles,
        };
        *slot = value.into();
    }

    /// Build from retained DMS columns; unknown column names are ignored.
    pub fn from_fields(fields: &BTreeMap<String, String>) -> Self {
        let mut vehicle = Self::default();
        for (name, value) in fields {
            if let Some(field) = VehicleField::from_column(name) {
                vehicle.set(field, value.trim());
            }
        }
        vehicle
    }

    /// Numeric photo count. Non-numeric or blank values count as zero.
    pub fn photo_count_value(&self) -> f64 {
        self.photo_count
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|n| !n.is_nan())
            .unwrap_or(0.0)
    }
}

// ---------------------------------------------------------------------------
// Unified record
// ---------------------------------------------------------------------------

/// Presence and price of one identifier on one listing channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Listing {
    pub channel: String,
    pub present: bool,
    /// Empty when absent or when the source had no price column.
    pub price: String,
}

/// One reconciled row per canonical identifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnifiedRecord {
    pub identifier: StockId,
    pub in_primary_system: bool,
    /// Populated only when `in_primary_system`; default (all "") otherwise.
    pub vehicle: Vehicle,
    /// One entry per configured channel, in channel order.
    pub listings: Vec<Listing>,
}

impl UnifiedRecord {
    pub fn listing(&self, channel: &str) -> Option<&Listing> {
        self.listings.iter().find(|l| l.channel == channel)
    }

    pub fn is_present_on(&self, channel: &str) -> bool {
        self.listing(channel).map(|l| l.present).unwrap_or(false)
    }

    /// Channels this identifier is missing from, in channel order.
    pub fn missing_channels(&self) -> impl Iterator<Item = &Listing> {
        self.listings.iter().filter(|l| !l.present)
    }
}

// ---------------------------------------------------------------------------
// Derived views
// ---------------------------------------------------------------------------

/// DMS vehicles carrying one dealer's prefix.
#[derive(Debug, Clone, Serialize)]
pub struct DealerBucket {
    pub dealer: String,
    pub prefix: String,
    pub records: Vec<UnifiedRecord>,
}

/// A DMS vehicle missing from at least one channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadCandidate {
    pub identifier: StockId,
    pub make: String,
    pub model: String,
    /// "Add to X, Y" naming every channel the vehicle is missing from.
    pub note: String,
    /// Left blank for manual completion.
    pub done: String,
}

/// A listed identifier the DMS does not know about.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalCandidate {
    pub identifier: StockId,
    pub listings: Vec<Listing>,
    pub done: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RemovalSplit {
    /// Prefix belongs to a known dealer.
    pub recognized: Vec<RemovalCandidate>,
    /// Prefix unknown; usually noise from shared marketplace exports.
    pub foreign: Vec<RemovalCandidate>,
}

impl RemovalSplit {
    pub fn len(&self) -> usize {
        self.recognized.len() + self.foreign.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recognized.is_empty() && self.foreign.is_empty()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    FixListing,
    RemoveFromSite,
}

impl TaskKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FixListing => "Need to fix listing",
            Self::RemoveFromSite => "Remove from site",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ListingTask {
    pub task: TaskKind,
    pub identifier: StockId,
    pub note: String,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconSummary {
    pub total_records: usize,
    pub in_primary_system: usize,
    pub not_in_primary_system: usize,
    /// Channel key -> identifiers present on that channel.
    pub per_channel: BTreeMap<String, usize>,
    /// Dealer name -> DMS vehicles carrying that dealer's prefix.
    pub per_dealer: BTreeMap<String, usize>,
    pub upload_candidates: usize,
    pub removal_recognized: usize,
    pub removal_foreign: usize,
    pub tasks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub engine_version: String,
    pub run_at: String,
    /// Channel keys in iteration order.
    pub channels: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub records: Vec<UnifiedRecord>,
    pub dealers: Vec<DealerBucket>,
    pub upload_candidates: Vec<UploadCandidate>,
    pub removals: RemovalSplit,
    pub tasks: Vec<ListingTask>,
}

impl ReconReport {
    /// True when anything needs a human: uploads, removals or tasks.
    pub fn has_discrepancies(&self) -> bool {
        !self.upload_candidates.is_empty() || !self.removals.is_empty() || !self.tasks.is_empty()
    }
}
