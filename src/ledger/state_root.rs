use std::collections::BTreeMap;

use sha2::{Digest, Sha256};

use crate::address::Address;

use super::Amount;

fn hash_amount(hasher: &mut Sha256, amount: &Amount) {
    // little-endian limbs, least significant first
    for limb in amount.0 {
        hasher.update(limb.to_le_bytes());
    }
}

/// Merkle root over every stored balance and allowance, in key order.
pub fn compute_state_root(
    balances: &BTreeMap<Address, Amount>,
    allowances: &BTreeMap<(Address, Address), Amount>,
) -> [u8; 32] {
    let mut leaves: Vec<[u8; 32]> = Vec::with_capacity(balances.len() + allowances.len());
    for (account, balance) in balances {
        let mut hasher = Sha256::new();
        hasher.update(b"balance");
        hasher.update(account.as_bytes());
        hash_amount(&mut hasher, balance);
        leaves.push(hasher.finalize().into());
    }
    for ((owner, spender), allowance) in allowances {
        let mut hasher = Sha256::new();
        hasher.update(b"allowance");
        hasher.update(owner.as_bytes());
        hasher.update(spender.as_bytes());
        hash_amount(&mut hasher, allowance);
        leaves.push(hasher.finalize().into());
    }
    build_merkle(leaves)
}

fn build_merkle(mut leaves: Vec<[u8; 32]>) -> [u8; 32] {
    if leaves.is_empty() {
        return Sha256::digest(b"token-ledger-empty").into();
    }
    while leaves.len() > 1 {
        let mut next = Vec::with_capacity(leaves.len().div_ceil(2));
        for chunk in leaves.chunks(2) {
            let mut hasher = Sha256::new();
            hasher.update(b"node");
            hasher.update(chunk[0]);
            // odd node is paired with itself
            hasher.update(chunk.get(1).unwrap_or(&chunk[0]));
            next.push(hasher.finalize().into());
        }
        leaves = next;
    }
    leaves[0]
}

pub(crate) mod serde_root {
    use serde::{de::Error, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(value: &[u8; 32], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&hex::encode(value))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<[u8; 32], D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded = String::deserialize(deserializer)?;
        let mut root = [0u8; 32];
        hex::decode_to_slice(&encoded, &mut root).map_err(D::Error::custom)?;
        Ok(root)
    }
}
