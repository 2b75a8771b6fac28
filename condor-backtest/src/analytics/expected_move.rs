//! One-standard-deviation expected move estimates.
//!
//! - Straddle: ATM call mid + ATM put mid, discounted to 85%
//! - IV: spot * IV * sqrt(DTE / 365)

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::{Contract, OptionType};

/// Share of the ATM straddle price taken as the expected move.
pub const STRADDLE_DISCOUNT: f64 = 0.85;

/// Which estimator to compute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExpectedMoveMethod {
    #[default]
    Straddle,
    Iv,
    Both,
}

/// Expected move in currency per estimator.
///
/// With a single method selected, both fields carry that method's value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ExpectedMove {
    pub straddle: f64,
    pub iv: f64,
}

pub fn expected_move_from_straddle(atm_call: &Contract, atm_put: &Contract) -> f64 {
    let straddle: f64 = (atm_call.mid() + atm_put.mid()).try_into().unwrap_or(0.0);
    straddle * STRADDLE_DISCOUNT
}

pub fn expected_move_from_iv(spot: f64, implied_vol: f64, dte: i32) -> f64 {
    spot * implied_vol * (dte.max(0) as f64 / 365.0).sqrt()
}

fn nearest_to_spot<'a>(
    contracts: &[&'a Contract],
    option_type: OptionType,
    spot: f64,
) -> Option<&'a Contract> {
    contracts
        .iter()
        .copied()
        .filter(|c| c.option_type == option_type)
        .min_by(|a, b| {
            let da = (f64::try_from(a.strike).unwrap_or(0.0) - spot).abs();
            let db = (f64::try_from(b.strike).unwrap_or(0.0) - spot).abs();
            da.total_cmp(&db)
        })
}

/// Expected move from contracts sharing one expiration.
///
/// Returns `None` when `contracts` is empty.
pub fn calculate_expected_move(
    contracts: &[&Contract],
    spot: f64,
    as_of: NaiveDate,
    method: ExpectedMoveMethod,
) -> Option<ExpectedMove> {
    let dte = contracts.first()?.dte(as_of);
    let atm_call = nearest_to_spot(contracts, OptionType::Call, spot);
    let atm_put = nearest_to_spot(contracts, OptionType::Put, spot);

    let atm_iv = atm_call.or(atm_put).map(|c| c.implied_vol);

    let straddle = match (atm_call, atm_put) {
        (Some(call), Some(put)) => expected_move_from_straddle(call, put),
        _ => atm_iv
            .map(|iv| expected_move_from_iv(spot, iv, dte))
            .unwrap_or(0.0),
    };

    let iv = {
        let iv = atm_iv.unwrap_or_else(|| {
            contracts.iter().map(|c| c.implied_vol).sum::<f64>() / contracts.len() as f64
        });
        expected_move_from_iv(spot, iv, dte)
    };

    Some(match method {
        ExpectedMoveMethod::Straddle => ExpectedMove {
            straddle,
            iv: straddle,
        },
        ExpectedMoveMethod::Iv => ExpectedMove { straddle: iv, iv },
        ExpectedMoveMethod::Both => ExpectedMove { straddle, iv },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    fn contract(strike: Decimal, option_type: OptionType, mid: Decimal, iv: f64) -> Contract {
        Contract {
            ticker: "SPY".to_string(),
            strike,
            expiration: NaiveDate::from_ymd_opt(2024, 2, 16).unwrap(),
            option_type,
            bid: mid,
            ask: mid,
            volume: 100,
            open_interest: 1000,
            delta: 0.0,
            implied_vol: iv,
            last: None,
            gamma: None,
            theta: None,
            vega: None,
        }
    }

    #[test]
    fn test_iv_method() {
        assert!((expected_move_from_iv(100.0, 0.20, 365) - 20.0).abs() < 1e-9);
        assert_eq!(expected_move_from_iv(100.0, 0.20, -3), 0.0);
    }

    #[test]
    fn test_straddle_method() {
        let call = contract(dec!(560), OptionType::Call, dec!(6), 0.18);
        let put = contract(dec!(560), OptionType::Put, dec!(4), 0.18);
        assert!((expected_move_from_straddle(&call, &put) - 8.5).abs() < 1e-9);
    }

    #[test]
    fn test_calculate_picks_atm() {
        let contracts = vec![
            contract(dec!(545), OptionType::Put, dec!(2), 0.20),
            contract(dec!(560), OptionType::Put, dec!(4), 0.18),
            contract(dec!(560), OptionType::Call, dec!(6), 0.18),
            contract(dec!(575), OptionType::Call, dec!(2), 0.16),
        ];
        let refs: Vec<&Contract> = contracts.iter().collect();
        let as_of = NaiveDate::from_ymd_opt(2024, 1, 12).unwrap();

        let both = calculate_expected_move(&refs, 560.0, as_of, ExpectedMoveMethod::Both).unwrap();
        assert!((both.straddle - 8.5).abs() < 1e-9);
        let expected_iv = 560.0 * 0.18 * (35.0f64 / 365.0).sqrt();
        assert!((both.iv - expected_iv).abs() < 1e-9);

        let straddle_only =
            calculate_expected_move(&refs, 560.0, as_of, ExpectedMoveMethod::Straddle).unwrap();
        assert_eq!(straddle_only.iv, straddle_only.straddle);

        assert!(calculate_expected_move(&[], 560.0, as_of, ExpectedMoveMethod::Iv).is_none());
    }
}
