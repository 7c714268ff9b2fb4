//! Orders: locked claims linking a payment to a requested name, and the
//! caller-owned queue of those pending mint or cancellation.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::hasher::value_hash;
use crate::error::NameError;
use crate::types::{hex_bytes, PositionRef};

/// Longest name, in bytes, an asset may carry.
pub const MAX_NAME_BYTES: usize = 32;

/// Asset name of the token minted with every order.
pub const ORDER_TOKEN_NAME: &str = "order";

/// A validated, human-readable asset name. Its UTF-8 bytes are the
/// canonical encoding used as index key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetName(String);

impl AssetName {
    pub fn new(name: impl Into<String>) -> Result<Self, NameError> {
        let name = name.into();
        if name.is_empty() {
            return Err(NameError::Empty);
        }
        if name.len() > MAX_NAME_BYTES {
            return Err(NameError::TooLong {
                len: name.len(),
                max: MAX_NAME_BYTES,
            });
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }

    /// Ledger asset-name encoding.
    pub fn to_hex(&self) -> String {
        hex::encode(self.0.as_bytes())
    }
}

impl TryFrom<String> for AssetName {
    type Error = NameError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<AssetName> for String {
    fn from(name: AssetName) -> Self {
        name.0
    }
}

impl fmt::Display for AssetName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Who is acting: the key whose signature is required, and where refunds go.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientIdentity {
    pub key_hash: String,
    pub address: String,
}

/// Datum locked with an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderDatum {
    pub owner_key_hash: String,
    pub name: AssetName,
    /// Amount locked to pay for the name.
    pub price: u64,
    /// Receives the minted item.
    pub destination_address: String,
}

/// An order visible on the ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderRecord {
    pub position: PositionRef,
    pub datum: OrderDatum,
    /// Datum the minted item will carry; the index stores its hash.
    #[serde(with = "hex_bytes")]
    pub asset_datum: Vec<u8>,
}

impl OrderRecord {
    pub fn name(&self) -> &AssetName {
        &self.datum.name
    }

    /// Key under which the name is recorded in the index.
    pub fn index_key(&self) -> Vec<u8> {
        self.datum.name.as_bytes().to_vec()
    }

    /// Value recorded for the name: the hash of the item's datum.
    pub fn index_value(&self) -> Vec<u8> {
        value_hash(&self.asset_datum).to_vec()
    }
}

/// Where a name stands in its lifecycle.
///
/// A cancelled order leaves its name `Unclaimed` again; `Minted` is final.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NameState {
    Unclaimed,
    Requested,
    Minted,
}

/// Pending orders, in arrival order, owned by whoever drives the minter.
#[derive(Debug, Clone, Default)]
pub struct OrderQueue {
    orders: Vec<OrderRecord>,
}

impl OrderQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an order. Returns false if its position is already queued.
    pub fn push(&mut self, order: OrderRecord) -> bool {
        if self.contains(&order.position) {
            return false;
        }
        self.orders.push(order);
        true
    }

    /// Replace the queue with the orders a ledger snapshot reports,
    /// keeping the arrival order of those already known.
    pub fn sync(&mut self, orders: &[OrderRecord]) {
        let live: HashSet<&PositionRef> = orders.iter().map(|o| &o.position).collect();
        self.orders.retain(|o| live.contains(&o.position));
        for order in orders {
            self.push(order.clone());
        }
    }

    pub fn pending(&self) -> &[OrderRecord] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    pub fn contains(&self, position: &PositionRef) -> bool {
        self.get(position).is_some()
    }

    pub fn get(&self, position: &PositionRef) -> Option<&OrderRecord> {
        self.orders.iter().find(|o| &o.position == position)
    }

    pub fn remove(&mut self, position: &PositionRef) -> Option<OrderRecord> {
        let idx = self.orders.iter().position(|o| &o.position == position)?;
        Some(self.orders.remove(idx))
    }

    pub fn is_requested(&self, name: &AssetName) -> bool {
        self.orders.iter().any(|o| o.name() == name)
    }

    /// Up to `max` oldest orders with pairwise distinct names. Later orders
    /// for an already selected name wait for a following batch.
    pub fn take_batch(&self, max: usize) -> Vec<OrderRecord> {
        self.take_batch_where(max, |_| true)
    }

    /// Like [`take_batch`](Self::take_batch), skipping orders `eligible`
    /// rejects. A skipped order does not hold back later orders for its name.
    pub fn take_batch_where<F>(&self, max: usize, mut eligible: F) -> Vec<OrderRecord>
    where
        F: FnMut(&OrderRecord) -> bool,
    {
        let mut names = HashSet::new();
        self.orders
            .iter()
            .filter(|o| eligible(*o) && names.insert(o.name().clone()))
            .take(max)
            .cloned()
            .collect()
    }

    /// Drop the given positions once their consuming transaction is accepted.
    pub fn settle<'a>(&mut self, consumed: impl IntoIterator<Item = &'a PositionRef>) -> usize {
        let consumed: HashSet<&PositionRef> = consumed.into_iter().collect();
        let before = self.orders.len();
        self.orders.retain(|o| !consumed.contains(&o.position));
        before - self.orders.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn order(tx: &str, name: &str) -> OrderRecord {
        OrderRecord {
            position: PositionRef::new(tx, 0),
            datum: OrderDatum {
                owner_key_hash: "aa".into(),
                name: AssetName::new(name).unwrap(),
                price: 100,
                destination_address: "addr_dest".into(),
            },
            asset_datum: name.as_bytes().to_vec(),
        }
    }

    #[test]
    fn names_are_validated() {
        assert_eq!(AssetName::new(""), Err(NameError::Empty));
        assert!(matches!(
            AssetName::new("x".repeat(33)),
            Err(NameError::TooLong { len: 33, .. })
        ));
        let name = AssetName::new("hal-1").unwrap();
        assert_eq!(name.to_hex(), "68616c2d31");
    }

    #[test]
    fn take_batch_skips_repeated_names() {
        let mut queue = OrderQueue::new();
        queue.push(order("t1", "hal-1"));
        queue.push(order("t2", "hal-1"));
        queue.push(order("t3", "hal-2"));
        queue.push(order("t4", "hal-3"));

        let batch = queue.take_batch(2);
        let names: Vec<&str> = batch.iter().map(|o| o.name().as_str()).collect();
        assert_eq!(names, vec!["hal-1", "hal-2"]);
        assert_eq!(queue.len(), 4, "take_batch does not consume");
    }

    #[test]
    fn take_batch_where_skips_ineligible_orders() {
        let mut queue = OrderQueue::new();
        queue.push(order("t1", "hal-1"));
        queue.push(order("t2", "hal-2"));
        queue.push(order("t3", "hal-3"));

        let batch = queue.take_batch_where(2, |o| o.name().as_str() != "hal-1");
        let txs: Vec<&str> = batch.iter().map(|o| o.position.tx_id.as_str()).collect();
        assert_eq!(txs, vec!["t2", "t3"]);
    }

    #[test]
    fn sync_and_settle() {
        let mut queue = OrderQueue::new();
        assert!(queue.push(order("t1", "a")));
        assert!(!queue.push(order("t1", "a")));
        queue.push(order("t2", "b"));

        queue.sync(&[order("t2", "b"), order("t3", "c")]);
        let txs: Vec<&str> = queue
            .pending()
            .iter()
            .map(|o| o.position.tx_id.as_str())
            .collect();
        assert_eq!(txs, vec!["t2", "t3"]);

        let settled = queue.settle([&PositionRef::new("t2", 0)]);
        assert_eq!(settled, 1);
        assert!(!queue.contains(&PositionRef::new("t2", 0)));
        assert!(queue.remove(&PositionRef::new("t3", 0)).is_some());
        assert!(queue.is_empty());
    }
}
