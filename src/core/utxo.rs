use crate::core::{Blockchain, Transaction, TxOutput};
use crate::{LedgerError, Result};
use std::collections::{HashMap, HashSet};

/// A transaction holding at least one unspent output for the queried address,
/// with the indices of those outputs in ascending order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnspentEntry {
    pub tx: Transaction,
    pub outputs: Vec<usize>,
}

/// Outputs picked to fund a spend, grouped by transaction id in walk order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SpendableOutputs {
    pub accumulated: u64,
    pub outputs: Vec<(Vec<u8>, Vec<i64>)>,
}

/// Read-only queries over the unspent outputs of a chain. Every call scans
/// the whole chain from the tip captured at the start of the call.
#[derive(Debug, Clone, Copy)]
pub struct UtxoSet<'a> {
    chain: &'a Blockchain,
}

impl<'a> UtxoSet<'a> {
    pub fn new(chain: &'a Blockchain) -> Self {
        Self { chain }
    }

    /// Walks tip to genesis collecting the outputs owned by `address` that no
    /// later input signed by `address` has consumed.
    ///
    /// Inputs can only reference outputs created earlier in chain order, so
    /// by the time a transaction's outputs are examined every spend of them
    /// has already been recorded.
    pub fn find_unspent_outputs(&self, address: &str) -> Result<Vec<UnspentEntry>> {
        let mut unspent = Vec::new();
        let mut spent: HashMap<String, HashSet<i64>> = HashMap::new();

        for block in self.chain.iter() {
            let block = block?;

            // Record this block's spends first so an output consumed later in
            // the same block is not reported.
            for tx in block.transactions.iter().filter(|tx| !tx.is_coinbase()) {
                for input in &tx.inputs {
                    if input.can_unlock(address) {
                        spent.entry(hex::encode(&input.id))
                            .or_default()
                            .insert(input.out);
                    }
                }
            }

            for tx in block.transactions {
                let tx_id = tx.id_hex();

                let outputs: Vec<usize> = tx.outputs.iter()
                    .enumerate()
                    .filter(|(index, out)| {
                        let already_spent = spent.get(&tx_id)
                            .map_or(false, |indices| indices.contains(&(*index as i64)));
                        !already_spent && out.can_be_unlocked(address)
                    })
                    .map(|(index, _)| index)
                    .collect();

                if !outputs.is_empty() {
                    unspent.push(UnspentEntry { tx, outputs });
                }
            }
        }

        log::debug!("Found {} transaction(s) with unspent outputs for {}", unspent.len(), address);
        Ok(unspent)
    }

    /// Transactions with at least one unspent output for `address`, newest
    /// first. Each transaction appears once.
    pub fn find_unspent_transactions(&self, address: &str) -> Result<Vec<Transaction>> {
        Ok(self.find_unspent_outputs(address)?
            .into_iter()
            .map(|entry| entry.tx)
            .collect())
    }

    pub fn find_utxo(&self, address: &str) -> Result<Vec<TxOutput>> {
        let mut utxos = Vec::new();
        for entry in self.find_unspent_outputs(address)? {
            for index in entry.outputs {
                utxos.push(entry.tx.outputs[index].clone());
            }
        }
        Ok(utxos)
    }

    /// Fails with `ValueOverflow` if the owned outputs sum past `u64::MAX`.
    pub fn get_balance(&self, address: &str) -> Result<u64> {
        self.find_utxo(address)?
            .iter()
            .try_fold(0u64, |total, out| total.checked_add(out.value))
            .ok_or_else(|| LedgerError::ValueOverflow(format!("balance of {}", address)))
    }

    /// Accumulates unspent outputs in walk order (newest transaction first,
    /// ascending output index) until `amount` is covered. If the address
    /// cannot cover it, every unspent output is returned with the full total.
    pub fn find_spendable_outputs(&self, address: &str, amount: u64) -> Result<SpendableOutputs> {
        let mut spendable = SpendableOutputs::default();

        'work: for entry in self.find_unspent_outputs(address)? {
            let mut picked = Vec::new();

            for index in entry.outputs {
                if spendable.accumulated >= amount {
                    break;
                }
                spendable.accumulated = spendable.accumulated
                    .checked_add(entry.tx.outputs[index].value)
                    .ok_or_else(|| LedgerError::ValueOverflow(format!("spendable outputs of {}", address)))?;
                picked.push(index as i64);
            }

            if !picked.is_empty() {
                spendable.outputs.push((entry.tx.id, picked));
            }

            if spendable.accumulated >= amount {
                break 'work;
            }
        }

        log::debug!(
            "Selected {} of {} requested for {}",
            spendable.accumulated,
            amount,
            address
        );
        Ok(spendable)
    }
}
