//! ETH Gas Station style gas-price oracle
//!
//! The oracle reports tiers in a fixed fraction of a gwei (tenths for
//! ethgasstation). Any failure is reported as `GasPriceUnavailable`; the
//! caller never falls back to a default price.

use rust_decimal::Decimal;
use serde::Deserialize;
use std::time::Duration;

use super::GasPriceOracle;
use crate::error::{WalletError, WalletResult};
use crate::types::GasQuote;
use crate::utils::http::HttpClient;

pub struct GasStationOracle {
    url: String,
    units_per_gwei: Decimal,
    http: HttpClient,
}

#[derive(Debug, Deserialize)]
struct WireSnapshot {
    average: Decimal,
    #[serde(default)]
    fast: Option<Decimal>,
    #[serde(default)]
    fastest: Option<Decimal>,
}

impl GasStationOracle {
    pub fn new(url: impl Into<String>, units_per_gwei: u32, timeout: Duration) -> WalletResult<Self> {
        Ok(Self::with_client(url, units_per_gwei, HttpClient::new(timeout)?))
    }

    pub fn with_client(url: impl Into<String>, units_per_gwei: u32, http: HttpClient) -> Self {
        Self {
            url: url.into(),
            units_per_gwei: Decimal::from(units_per_gwei.max(1)),
            http,
        }
    }

    fn to_quote(&self, snapshot: WireSnapshot) -> WalletResult<GasQuote> {
        if snapshot.average <= Decimal::ZERO {
            return Err(WalletError::gas_price_unavailable(
                "Oracle returned a non-positive average price",
            ));
        }

        let scale = |tier: Decimal| tier / self.units_per_gwei;
        let average = scale(snapshot.average);
        Ok(GasQuote {
            average,
            fast: snapshot.fast.map(scale).unwrap_or(average),
            fastest: snapshot.fastest.map(scale).unwrap_or(average),
        })
    }
}

impl GasPriceOracle for GasStationOracle {
    fn quote(&self) -> WalletResult<GasQuote> {
        let snapshot: WireSnapshot = self.http.get_json(&self.url).map_err(|e| {
            tracing::warn!(error = %e, "gas oracle request failed");
            WalletError::gas_price_unavailable(e.message)
        })?;
        self.to_quote(snapshot)
    }
}
