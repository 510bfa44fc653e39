//! Group normalized records by shop.
//!
//! ```text
//! Records (upload order)            Partitions (first-appearance order)
//! ┌──────────────────────┐         ┌────────────────────────────┐
//! │ #0 shop: A, P-1      │         │ A: [#0 P-1, #2 P-3]        │
//! │ #1 shop: B, P-2      │   →     ├────────────────────────────┤
//! │ #2 shop: A, P-3      │         │ B: [#1 P-2]                │
//! └──────────────────────┘         └────────────────────────────┘
//! ```
//!
//! The shop is dropped from each record: it is implied by the credentials
//! used to send the partition.

use std::collections::HashMap;

use crate::models::{IndexedProduct, ProductRecord, ShopPartition};

/// Stable group-by on `shop`. Empty shop names form their own partition.
pub fn partition_by_shop(records: Vec<ProductRecord>) -> Vec<ShopPartition> {
    let mut slots: HashMap<String, usize> = HashMap::new();
    let mut partitions: Vec<ShopPartition> = Vec::new();

    for ProductRecord { row, shop, product } in records {
        let slot = match slots.get(&shop) {
            Some(&slot) => slot,
            None => {
                let slot = partitions.len();
                slots.insert(shop.clone(), slot);
                partitions.push(ShopPartition {
                    shop,
                    records: Vec::new(),
                });
                slot
            }
        };
        partitions[slot]
            .records
            .push(IndexedProduct { row, product });
    }

    partitions
}
