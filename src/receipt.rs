//! Network-independent view of a confirmed transaction.

use alloy_primitives::{Address, TxHash};
use alloy_rpc_types::{Log, TransactionReceipt};
use alloy_sol_types::SolEvent;

/// What the relay needs from a receipt: status, position and logs.
#[derive(Debug, Clone, PartialEq)]
pub struct ChainReceipt {
    tx_hash: TxHash,
    block_number: Option<u64>,
    success: bool,
    logs: Vec<Log>,
}

impl ChainReceipt {
    /// A successful receipt carrying `logs`.
    pub fn new(tx_hash: TxHash, block_number: Option<u64>, logs: Vec<Log>) -> Self {
        Self {
            tx_hash,
            block_number,
            success: true,
            logs,
        }
    }

    /// A reverted receipt. Reverted transactions emit no logs.
    pub fn reverted(tx_hash: TxHash, block_number: Option<u64>) -> Self {
        Self {
            tx_hash,
            block_number,
            success: false,
            logs: Vec::new(),
        }
    }

    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    pub fn block_number(&self) -> Option<u64> {
        self.block_number
    }

    pub fn is_success(&self) -> bool {
        self.success
    }

    pub fn logs(&self) -> &[Log] {
        &self.logs
    }

    /// Decodes the first `E` emitted by `emitter`.
    ///
    /// Logs from other contracts, other events, or that fail to decode are
    /// skipped.
    pub fn find_event<E: SolEvent>(&self, emitter: Address) -> Option<E> {
        self.logs
            .iter()
            .filter(|log| log.address() == emitter)
            .filter(|log| log.topics().first() == Some(&E::SIGNATURE_HASH))
            .find_map(|log| E::decode_log_data(log.data()).ok())
    }
}

impl From<&TransactionReceipt> for ChainReceipt {
    fn from(receipt: &TransactionReceipt) -> Self {
        Self {
            tx_hash: receipt.transaction_hash,
            block_number: receipt.block_number,
            success: receipt.inner.status(),
            logs: receipt.inner.logs().to_vec(),
        }
    }
}
