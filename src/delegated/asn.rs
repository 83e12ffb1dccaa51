//! ASN allocation table built from delegated-stats ASN blocks

use crate::records::AsnRecord;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Allocation status of an ASN
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AsnAllocation {
    /// Raw status string (assigned, reserved, available, ...)
    pub status: String,
    /// Registry that holds the ASN
    pub registry: String,
}

#[derive(Debug, Clone)]
struct AsnBlock {
    /// Last ASN in the block (inclusive)
    end: u32,
    allocation: AsnAllocation,
}

/// Lookup table from ASN to allocation status.
///
/// Consecutive blocks with the same status and registry are merged when the
/// table is built, so a full delegated-stats file collapses to a few
/// thousand entries.
#[derive(Debug, Clone, Default)]
pub struct AsnIndex {
    blocks: BTreeMap<u32, AsnBlock>,
    records: usize,
}

/// Give `start..=end` to `allocation`, trimming any blocks it overlaps and
/// merging with neighbors that hold the same allocation
fn assign(blocks: &mut BTreeMap<u32, AsnBlock>, start: u32, end: u32, allocation: AsnAllocation) {
    // Blocks are disjoint, so the overlapped ones form one run ending at or before `end`
    let overlapped: Vec<u32> = blocks
        .range(..=end)
        .rev()
        .take_while(|(_, block)| block.end >= start)
        .map(|(first, _)| *first)
        .collect();

    for first in overlapped {
        let Some(block) = blocks.remove(&first) else {
            continue;
        };
        if first < start {
            blocks.insert(
                first,
                AsnBlock {
                    end: start - 1,
                    allocation: block.allocation.clone(),
                },
            );
        }
        if block.end > end {
            blocks.insert(
                end + 1,
                AsnBlock {
                    end: block.end,
                    allocation: block.allocation,
                },
            );
        }
    }

    let mut first = start;
    let mut last = end;

    let left = blocks
        .range(..start)
        .next_back()
        .filter(|(_, block)| block.end + 1 == start && block.allocation == allocation)
        .map(|(key, _)| *key);
    if let Some(key) = left {
        blocks.remove(&key);
        first = key;
    }

    if let Some(next) = end.checked_add(1) {
        if blocks.get(&next).is_some_and(|block| block.allocation == allocation) {
            if let Some(block) = blocks.remove(&next) {
                last = block.end;
            }
        }
    }

    blocks.insert(
        first,
        AsnBlock {
            end: last,
            allocation,
        },
    );
}

impl AsnIndex {
    /// Build the table from records in any order.
    ///
    /// Records are applied in sorted order. Where two blocks overlap, the one
    /// applied later takes the shared ASNs and the rest of the earlier block
    /// keeps its own allocation.
    pub fn build<I: IntoIterator<Item = AsnRecord>>(records: I) -> Self {
        let mut records: Vec<AsnRecord> = records.into_iter().collect();
        records.sort();
        records.dedup();

        let count = records.len();
        let mut blocks: BTreeMap<u32, AsnBlock> = BTreeMap::new();

        for rec in records {
            let end = rec.last_asn();
            let allocation = AsnAllocation {
                status: rec.status,
                registry: rec.registry,
            };
            assign(&mut blocks, rec.asn, end, allocation);
        }

        Self {
            blocks,
            records: count,
        }
    }

    /// Allocation covering `asn`, if any
    pub fn get(&self, asn: u32) -> Option<&AsnAllocation> {
        self.blocks
            .range(..=asn)
            .next_back()
            .filter(|(_, block)| block.end >= asn)
            .map(|(_, block)| &block.allocation)
    }

    /// Number of records the table was built from
    pub fn record_count(&self) -> usize {
        self.records
    }

    /// Number of merged blocks
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Whether the table is empty
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }
}
