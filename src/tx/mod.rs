//! Transaction Module
//!
//! Building, signing and broadcasting sends for both accounting models,
//! plus validation of externally supplied raw transactions.

pub mod erc20;
mod evm;
mod signer;
mod utxo;
mod validator;

pub use evm::*;
pub use signer::*;
pub use utxo::*;
pub use validator::*;

use crate::error::WalletResult;
use crate::types::{SendOutcome, SendRequest, SignedTransaction};
use crate::utils::logging::redact_hash;

/// Shared "build, sign and broadcast a send" capability
pub trait TransactionBuilder {
    /// Build and sign a transaction for the request without broadcasting it
    fn build_signed(&self, request: &SendRequest) -> WalletResult<SignedTransaction>;

    /// Submit a signed transaction, returning the service's transaction id
    fn broadcast(&self, signed: &SignedTransaction) -> WalletResult<String>;

    /// Build, sign and broadcast. Either a txid or an error, never both.
    fn send(&self, request: &SendRequest) -> WalletResult<SendOutcome> {
        let signed = self.build_signed(request)?;

        let txid = match self.broadcast(&signed) {
            Ok(txid) => txid,
            Err(e) => {
                tracing::warn!(coin = %signed.coin, error = %e, "broadcast rejected");
                return Err(e);
            }
        };

        tracing::info!(
            coin = %signed.coin,
            txid = %redact_hash(&txid),
            fee = ?signed.fee,
            "transaction broadcast"
        );
        Ok(SendOutcome {
            txid,
            raw_hex: signed.raw_hex,
        })
    }
}
