//! Commit checkpoint text format
//!
//! `external_state,slices_1,records_1,...,slices_P,records_P`, one pair per
//! partition in declaration order.

use crate::error::{RecordKvError, Result};
use crate::storage::CommitStats;

/// The state recorded by one commit
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Checkpoint {
    pub external_state: u64,
    /// Per partition, in declaration order
    pub partitions: Vec<CommitStats>,
}

impl Checkpoint {
    /// All-zero checkpoint for `partitions` partitions
    pub fn empty(partitions: usize) -> Self {
        Self {
            external_state: 0,
            partitions: vec![CommitStats::default(); partitions],
        }
    }

    /// Flat integer form: `[external_state, slices_1, records_1, ...]`
    pub fn to_vec(&self) -> Vec<u64> {
        let mut out = Vec::with_capacity(1 + 2 * self.partitions.len());
        out.push(self.external_state);
        for stats in &self.partitions {
            out.push(stats.slices);
            out.push(stats.records);
        }
        out
    }

    pub fn encode(&self) -> String {
        self.to_vec()
            .iter()
            .map(u64::to_string)
            .collect::<Vec<_>>()
            .join(",")
    }

    /// Parse a (possibly padded) block written for `partitions` partitions
    pub fn parse(block: &[u8], partitions: usize) -> Result<Self> {
        let text = std::str::from_utf8(block)
            .map_err(|_| RecordKvError::Corrupt("commit block is not valid UTF-8".to_string()))?;

        let numbers = text
            .split(',')
            .map(|item| {
                let item = item.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');
                item.parse::<u64>().map_err(|_| {
                    RecordKvError::Corrupt(format!("invalid integer '{}' in commit block", item))
                })
            })
            .collect::<Result<Vec<u64>>>()?;

        if numbers.len() != 2 * partitions + 1 {
            return Err(RecordKvError::Corrupt(format!(
                "commit block has {} integers, expected {}",
                numbers.len(),
                2 * partitions + 1
            )));
        }

        Ok(Self {
            external_state: numbers[0],
            partitions: numbers[1..]
                .chunks_exact(2)
                .map(|pair| CommitStats {
                    slices: pair[0],
                    records: pair[1],
                })
                .collect(),
        })
    }
}

