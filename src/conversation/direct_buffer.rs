// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::{collections::BTreeMap, ops::Range};
use super::location::FrameLocation;
use super::message::Message;

/// One framed message and where its bytes live in the direction
/// buffer.
#[derive(Debug, Clone)]
pub struct FramedRecord {
    pub location: FrameLocation,
    pub range: Range<usize>,
    pub message: Message,
}

/// Buffer of incoming *or* outgoing byte ranges. Accumulates payload,
/// remembers which bytes each captured frame contributed and which
/// ranges framed into messages.
pub struct DirectBuffer {
    data: Vec<u8>,
    processed: usize,
    records: Vec<FramedRecord>,
    packets: BTreeMap<u64, Range<usize>>,
    /// Bytes from here on could not be framed and stay opaque.
    opaque_from: Option<usize>,
}

impl DirectBuffer {
    pub fn new() -> Self {
        DirectBuffer {
            data: Vec::with_capacity(0x10000),
            processed: 0,
            records: Vec::new(),
            packets: BTreeMap::new(),
            opaque_from: None,
        }
    }

    pub fn consume(&mut self, payload: &[u8], frame_number: u64) -> Range<usize> {
        let offset = self.data.len();
        self.data.extend_from_slice(payload);
        let range = offset..self.data.len();
        self.packets.insert(frame_number, range.clone());
        range
    }

    pub fn data(&self) -> &[u8] {
        self.data.as_ref()
    }

    pub fn processed(&self) -> usize {
        self.processed
    }

    pub fn unprocessed(&self) -> &[u8] {
        &self.data[self.processed..]
    }

    pub fn advance(&mut self, consumed: usize) {
        self.processed += consumed;
    }

    pub fn push_record(&mut self, record: FramedRecord) {
        self.records.push(record);
    }

    pub fn records(&self) -> &[FramedRecord] {
        self.records.as_ref()
    }

    pub fn packet_range(&self, frame_number: u64) -> Option<&Range<usize>> {
        self.packets.get(&frame_number)
    }

    pub fn mark_opaque(&mut self) {
        if self.opaque_from.is_none() {
            self.opaque_from = Some(self.processed);
        }
        self.processed = self.data.len();
    }

    pub fn opaque_from(&self) -> Option<usize> {
        self.opaque_from
    }
}
