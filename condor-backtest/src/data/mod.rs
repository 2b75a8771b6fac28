//! Option chain data model and CSV loaders.
//!
//! - `types`: contracts, price paths, and underlying bars
//! - `loader`: header-driven CSV readers for chains, prices, IV history,
//!   and earnings calendars

pub mod loader;
pub mod types;

pub use loader::{
    load_chain, load_chain_file, load_earnings_calendar, load_earnings_calendar_file,
    load_iv_history, load_iv_history_file, load_price_path, load_price_path_file,
    load_underlying_bars, load_underlying_bars_file, parse_date, ChainLoad, LoaderError,
};
pub use types::{Contract, OptionType, PricePath, PricePoint, UnderlyingBar};
