// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::{cmp::Ordering, fmt};

/// Where a message's bytes came from. Almost always the primary stream
/// of one direction, occasionally a buffer this engine reassembled.
#[derive(Debug, Clone, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum DataSource {
    Stream,
    Reassembled(u64),
}

/// Identifies a byte range inside a conversation: which message it is,
/// which data source holds it, and where in that source it starts.
/// Also serves as a stable cross-reference between records.
#[derive(Debug, Clone, Eq, PartialEq, Hash)]
pub struct FrameLocation {
    pub message_index: u64,
    pub source: DataSource,
    pub offset: usize,
}

impl FrameLocation {
    pub fn stream(message_index: u64, offset: usize) -> Self {
        FrameLocation {
            message_index,
            source: DataSource::Stream,
            offset,
        }
    }

    pub fn reassembled(message_index: u64, transfer_id: u64, offset: usize) -> Self {
        FrameLocation {
            message_index,
            source: DataSource::Reassembled(transfer_id),
            offset,
        }
    }
}

// message index first, then offset; the source only breaks ties
impl Ord for FrameLocation {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.message_index, self.offset, &self.source).cmp(&(
            other.message_index,
            other.offset,
            &other.source,
        ))
    }
}

impl PartialOrd for FrameLocation {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for FrameLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.source {
            &DataSource::Stream => write!(f, "#{}+{}", self.message_index, self.offset),
            &DataSource::Reassembled(id) => {
                write!(f, "#{}+{} (reassembled transfer {})", self.message_index, self.offset, id)
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::FrameLocation;

    #[test]
    fn ordering_is_index_then_offset() {
        let a = FrameLocation::stream(1, 100);
        let b = FrameLocation::stream(2, 0);
        let c = FrameLocation::stream(2, 8);
        assert!(a < b);
        assert!(b < c);
        assert_eq!(a.clone(), a);
    }

    #[test]
    fn reassembled_source_only_breaks_ties() {
        let stream = FrameLocation::stream(3, 16);
        let buffered = FrameLocation::reassembled(3, 7, 16);
        assert!(stream < buffered);
        assert!(FrameLocation::stream(3, 8) < buffered);
    }
}
