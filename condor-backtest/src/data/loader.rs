//! CSV loaders for option chains, price paths, and earnings calendars.
//!
//! All loaders are header-driven and accept any `io::Read`, so callers can
//! feed files, stdin, or in-memory buffers. Malformed rows are skipped with a
//! warning; a file with missing required columns is an error.
//!
//! Option chain columns:
//! - required: ticker, strike, expiration, option_type, bid, ask, volume,
//!   open_interest, delta, implied_vol
//! - optional: last, gamma, theta, vega

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{info, warn};

use super::types::{Contract, OptionType, PricePath, PricePoint, UnderlyingBar};

/// Required columns in an option chain CSV.
pub const REQUIRED_CHAIN_COLUMNS: &[&str] = &[
    "ticker",
    "strike",
    "expiration",
    "option_type",
    "bid",
    "ask",
    "volume",
    "open_interest",
    "delta",
    "implied_vol",
];

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Missing required columns: {0}")]
    MissingColumns(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Contracts parsed from a chain file plus the number of rows skipped.
#[derive(Debug, Clone)]
pub struct ChainLoad {
    pub contracts: Vec<Contract>,
    pub skipped_rows: usize,
}

/// Header-name to column-index lookup for one CSV file.
struct Columns {
    index: HashMap<String, usize>,
}

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().to_lowercase(), i))
            .collect();
        Self { index }
    }

    fn require(&self, names: &[&str]) -> Result<(), LoaderError> {
        let missing: Vec<&str> = names
            .iter()
            .copied()
            .filter(|n| !self.index.contains_key(*n))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(LoaderError::MissingColumns(missing.join(", ")))
        }
    }

    fn get<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Option<&'r str> {
        self.index
            .get(name)
            .and_then(|&i| record.get(i))
            .map(str::trim)
    }

    fn field<'r>(&self, record: &'r csv::StringRecord, name: &str) -> Result<&'r str, String> {
        match self.get(record, name) {
            Some(v) if !v.is_empty() => Ok(v),
            _ => Err(format!("missing {}", name)),
        }
    }

    fn parse<T: FromStr>(&self, record: &csv::StringRecord, name: &str) -> Result<T, String> {
        let raw = self.field(record, name)?;
        raw.parse::<T>()
            .map_err(|_| format!("invalid {}: {}", name, raw))
    }

    fn optional<T: FromStr>(&self, record: &csv::StringRecord, name: &str) -> Result<Option<T>, String> {
        match self.get(record, name) {
            None => Ok(None),
            Some(v) if is_blank(v) => Ok(None),
            Some(v) => v
                .parse::<T>()
                .map(Some)
                .map_err(|_| format!("invalid {}: {}", name, v)),
        }
    }
}

fn is_blank(value: &str) -> bool {
    matches!(
        value.to_lowercase().as_str(),
        "" | "null" | "none" | "nan"
    )
}

/// Parse a date in `YYYY-MM-DD` or `MM/DD/YYYY` form.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(raw, "%m/%d/%Y"))
        .ok()
}

fn open(path: &Path) -> Result<File, LoaderError> {
    if !path.exists() {
        return Err(LoaderError::FileNotFound(path.display().to_string()));
    }
    Ok(File::open(path)?)
}

/// Load an option chain from CSV.
pub fn load_chain<R: Read>(reader: R) -> Result<ChainLoad, LoaderError> {
    let mut rdr = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::new(rdr.headers()?);
    columns.require(REQUIRED_CHAIN_COLUMNS)?;

    let mut contracts = Vec::new();
    let mut skipped_rows = 0;

    for (i, record) in rdr.records().enumerate() {
        // Header is row 1.
        let row_num = i + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(row = row_num, error = %e, "Skipping unreadable chain row");
                skipped_rows += 1;
                continue;
            }
        };

        match parse_contract_row(&columns, &record) {
            Ok(contract) => contracts.push(contract),
            Err(reason) => {
                warn!(row = row_num, %reason, "Skipping invalid chain row");
                skipped_rows += 1;
            }
        }
    }

    if contracts.is_empty() {
        return Err(LoaderError::InvalidData(
            "No valid option rows found".to_string(),
        ));
    }

    if skipped_rows > 0 {
        warn!(skipped_rows, loaded = contracts.len(), "Skipped invalid chain rows");
    }

    Ok(ChainLoad {
        contracts,
        skipped_rows,
    })
}

/// Load an option chain from a CSV file.
pub fn load_chain_file(path: impl AsRef<Path>) -> Result<ChainLoad, LoaderError> {
    let path = path.as_ref();
    let load = load_chain(open(path)?)?;
    info!(path = %path.display(), contracts = load.contracts.len(), "Loaded option chain");
    Ok(load)
}

fn parse_contract_row(columns: &Columns, record: &csv::StringRecord) -> Result<Contract, String> {
    let expiration_raw = columns.field(record, "expiration")?;
    let expiration = parse_date(expiration_raw)
        .ok_or_else(|| format!("invalid expiration date: {}", expiration_raw))?;

    let type_raw = columns.field(record, "option_type")?;
    let option_type = OptionType::from_str(type_raw)
        .ok_or_else(|| format!("invalid option_type: {}", type_raw))?;

    Ok(Contract {
        ticker: columns.field(record, "ticker")?.to_uppercase(),
        strike: columns.parse(record, "strike")?,
        expiration,
        option_type,
        bid: columns.parse(record, "bid")?,
        ask: columns.parse(record, "ask")?,
        volume: columns.parse(record, "volume")?,
        open_interest: columns.parse(record, "open_interest")?,
        delta: columns.parse(record, "delta")?,
        implied_vol: columns.parse(record, "implied_vol")?,
        last: columns.optional(record, "last")?,
        gamma: columns.optional(record, "gamma")?,
        theta: columns.optional(record, "theta")?,
        vega: columns.optional(record, "vega")?,
    })
}

/// Load a `date,price` CSV into a price path.
pub fn load_price_path<R: Read>(reader: R) -> Result<PricePath, LoaderError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns = Columns::new(rdr.headers()?);
    columns.require(&["date", "price"])?;

    let mut points = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let parsed = columns
            .field(&record, "date")
            .and_then(|d| parse_date(d).ok_or_else(|| format!("invalid date: {}", d)))
            .and_then(|date| {
                columns
                    .parse::<Decimal>(&record, "price")
                    .map(|price| PricePoint { date, price })
            });
        match parsed {
            Ok(point) => points.push(point),
            Err(reason) => warn!(%reason, "Skipping invalid price row"),
        }
    }

    Ok(PricePath::new(points))
}

pub fn load_price_path_file(path: impl AsRef<Path>) -> Result<PricePath, LoaderError> {
    load_price_path(open(path.as_ref())?)
}

/// Load `date,open,high,low,close` bars.
pub fn load_underlying_bars<R: Read>(reader: R) -> Result<Vec<UnderlyingBar>, LoaderError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns = Columns::new(rdr.headers()?);
    columns.require(&["date", "open", "high", "low", "close"])?;

    let mut bars = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let parsed = (|| -> Result<UnderlyingBar, String> {
            let raw = columns.field(&record, "date")?;
            Ok(UnderlyingBar {
                date: parse_date(raw).ok_or_else(|| format!("invalid date: {}", raw))?,
                open: columns.parse(&record, "open")?,
                high: columns.parse(&record, "high")?,
                low: columns.parse(&record, "low")?,
                close: columns.parse(&record, "close")?,
            })
        })();
        match parsed {
            Ok(bar) => bars.push(bar),
            Err(reason) => warn!(%reason, "Skipping invalid bar row"),
        }
    }

    bars.sort_by_key(|b| b.date);
    Ok(bars)
}

pub fn load_underlying_bars_file(path: impl AsRef<Path>) -> Result<Vec<UnderlyingBar>, LoaderError> {
    load_underlying_bars(open(path.as_ref())?)
}

/// Load a single-column `iv` CSV of historical implied volatilities.
pub fn load_iv_history<R: Read>(reader: R) -> Result<Vec<f64>, LoaderError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns = Columns::new(rdr.headers()?);
    columns.require(&["iv"])?;

    let mut ivs = Vec::new();
    for record in rdr.records() {
        let record = record?;
        match columns.parse::<f64>(&record, "iv") {
            Ok(iv) if iv.is_finite() && iv > 0.0 => ivs.push(iv),
            Ok(iv) => warn!(iv, "Skipping non-positive IV"),
            Err(reason) => warn!(%reason, "Skipping invalid IV row"),
        }
    }
    Ok(ivs)
}

pub fn load_iv_history_file(path: impl AsRef<Path>) -> Result<Vec<f64>, LoaderError> {
    load_iv_history(open(path.as_ref())?)
}

/// Load a `symbol,earnings_date` calendar. Recognized dates are normalized to
/// `YYYY-MM-DD`; anything else stays raw for the simulator to warn about.
pub fn load_earnings_calendar<R: Read>(reader: R) -> Result<HashMap<String, String>, LoaderError> {
    let mut rdr = csv::Reader::from_reader(reader);
    let columns = Columns::new(rdr.headers()?);
    columns.require(&["symbol", "earnings_date"])?;

    let mut calendar = HashMap::new();
    for record in rdr.records() {
        let record = record?;
        let symbol = columns.get(&record, "symbol").unwrap_or_default();
        let date = columns.get(&record, "earnings_date").unwrap_or_default();
        if symbol.is_empty() || is_blank(date) || date.eq_ignore_ascii_case("unknown") {
            continue;
        }
        let date = parse_date(date)
            .map(|d| d.format("%Y-%m-%d").to_string())
            .unwrap_or_else(|| date.to_string());
        calendar.insert(symbol.to_uppercase(), date);
    }

    info!(symbols = calendar.len(), "Loaded earnings calendar");
    Ok(calendar)
}

pub fn load_earnings_calendar_file(
    path: impl AsRef<Path>,
) -> Result<HashMap<String, String>, LoaderError> {
    let path = path.as_ref();
    if !path.exists() {
        warn!(path = %path.display(), "Earnings calendar not found; continuing without earnings dates");
        return Ok(HashMap::new());
    }
    load_earnings_calendar(File::open(path)?)
}
