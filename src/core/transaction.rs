use crate::core::utxo::UtxoSet;
use crate::crypto::hash::{Hash256, Hashable};
use crate::{LedgerError, Result};
use serde::{Deserialize, Serialize};

/// Value minted by every coinbase transaction.
pub const COINBASE_REWARD: u64 = 100;

/// Output index carried by the single input of a coinbase transaction.
pub const COINBASE_OUT: i64 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transaction {
    pub id: Vec<u8>,
    pub inputs: Vec<TxInput>,
    pub outputs: Vec<TxOutput>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxInput {
    /// Id of the transaction whose output is being spent.
    pub id: Vec<u8>,
    /// Index into that transaction's outputs.
    pub out: i64,
    pub sig: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxOutput {
    pub value: u64,
    pub pub_key: String,
}

impl TxInput {
    /// Signatures are plain address strings.
    pub fn can_unlock(&self, address: &str) -> bool {
        self.sig == address
    }
}

impl TxOutput {
    pub fn can_be_unlocked(&self, address: &str) -> bool {
        self.pub_key == address
    }
}

impl Transaction {
    /// Builds a transaction from its final inputs and outputs and stamps its id.
    /// The id is never recomputed afterwards.
    pub fn from_parts(inputs: Vec<TxInput>, outputs: Vec<TxOutput>) -> Self {
        let mut tx = Self {
            id: Vec::new(),
            inputs,
            outputs,
        };
        tx.id = tx.hash().to_vec();
        tx
    }

    pub fn new_coinbase(to: &str, memo: &str) -> Self {
        let sig = if memo.is_empty() {
            format!("Coins to {}", to)
        } else {
            memo.to_string()
        };

        let input = TxInput {
            id: Vec::new(),
            out: COINBASE_OUT,
            sig,
        };
        let output = TxOutput {
            value: COINBASE_REWARD,
            pub_key: to.to_string(),
        };

        Self::from_parts(vec![input], vec![output])
    }

    /// Spends `amount` from `from` to `to`, returning any surplus of the
    /// selected outputs to `from` as change.
    pub fn new_transaction(from: &str, to: &str, amount: u64, utxo_set: &UtxoSet<'_>) -> Result<Self> {
        if amount == 0 {
            return Err(LedgerError::InvalidInput("amount must be greater than zero".to_string()));
        }

        let spendable = utxo_set.find_spendable_outputs(from, amount)?;

        if spendable.accumulated < amount {
            return Err(LedgerError::InsufficientFunds {
                required: amount,
                available: spendable.accumulated,
            });
        }

        let mut inputs = Vec::new();
        for (txid, outs) in &spendable.outputs {
            for &out in outs {
                inputs.push(TxInput {
                    id: txid.clone(),
                    out,
                    sig: from.to_string(),
                });
            }
        }

        let mut outputs = vec![TxOutput {
            value: amount,
            pub_key: to.to_string(),
        }];

        if spendable.accumulated > amount {
            outputs.push(TxOutput {
                value: spendable.accumulated - amount,
                pub_key: from.to_string(),
            });
        }

        let tx = Self::from_parts(inputs, outputs);
        log::debug!(
            "Built transaction {} spending {} input(s) from {}",
            tx.id_hex(),
            tx.inputs.len(),
            from
        );

        Ok(tx)
    }

    pub fn is_coinbase(&self) -> bool {
        self.inputs.len() == 1
            && self.inputs[0].id.is_empty()
            && self.inputs[0].out == COINBASE_OUT
    }

    pub fn id_hex(&self) -> String {
        hex::encode(&self.id)
    }
}

impl Hashable for Transaction {
    /// Digest of the inputs and outputs; the id field itself is excluded.
    fn hash(&self) -> Hash256 {
        let mut data = Vec::new();

        data.extend_from_slice(&(self.inputs.len() as u32).to_be_bytes());
        for input in &self.inputs {
            data.extend_from_slice(&(input.id.len() as u32).to_be_bytes());
            data.extend_from_slice(&input.id);
            data.extend_from_slice(&input.out.to_be_bytes());
            data.extend_from_slice(&(input.sig.len() as u32).to_be_bytes());
            data.extend_from_slice(input.sig.as_bytes());
        }

        data.extend_from_slice(&(self.outputs.len() as u32).to_be_bytes());
        for output in &self.outputs {
            data.extend_from_slice(&output.value.to_be_bytes());
            data.extend_from_slice(&(output.pub_key.len() as u32).to_be_bytes());
            data.extend_from_slice(output.pub_key.as_bytes());
        }

        Hash256::hash(&data)
    }
}
