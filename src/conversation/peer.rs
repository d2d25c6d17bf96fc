// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use capture_definitions::SocketAddress;
use std::collections::BTreeMap;
use super::location::FrameLocation;
use super::transfer::Transfer;

/// Whether the contact exchange of this side was captured. Once it
/// leaves `Unknown` the state never changes again.
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ContactState {
    Unknown,
    Observed,
    InferredV3,
    InferredV4,
}

impl ContactState {
    pub fn known(&self) -> bool {
        match self {
            &ContactState::Unknown => false,
            _ => true,
        }
    }
}

/// One side of a conversation. Created with the conversation,
/// mutated as messages from this side are classified, never dropped.
pub struct Peer {
    address: SocketAddress,
    pub contact: ContactState,
    pub version: Option<u8>,
    pub contact_flags: u8,
    pub can_tls: bool,
    pub keepalive: Option<u16>,
    pub segment_mru: Option<u64>,
    pub transfer_mru: Option<u64>,
    pub contact_location: Option<FrameLocation>,
    pub init_location: Option<FrameLocation>,
    pub term_location: Option<FrameLocation>,
    /// Everything from this stream offset onward belongs to the
    /// security collaborator.
    pub security_passthrough: bool,
    /// Legacy messages carry no transfer id on the wire, the id each
    /// segment ended up under is remembered per location.
    pub segment_transfers: BTreeMap<FrameLocation, u64>,
    pub transfers: BTreeMap<u64, Transfer>,
    next_transfer_id: u64,
    pub current_transfer: Option<u64>,
    pub last_transfer: Option<u64>,
    /// A legacy length announcement seen before its transfer opened.
    pub pending_total: Option<u64>,
}

impl Peer {
    pub fn new(address: SocketAddress) -> Self {
        Peer {
            address,
            contact: ContactState::Unknown,
            version: None,
            contact_flags: 0,
            can_tls: false,
            keepalive: None,
            segment_mru: None,
            transfer_mru: None,
            contact_location: None,
            init_location: None,
            term_location: None,
            security_passthrough: false,
            segment_transfers: BTreeMap::new(),
            transfers: BTreeMap::new(),
            next_transfer_id: 0,
            current_transfer: None,
            last_transfer: None,
            pending_total: None,
        }
    }

    pub fn address(&self) -> &SocketAddress {
        &self.address
    }

    pub fn transfer_mut(&mut self, id: u64) -> &mut Transfer {
        self.last_transfer = Some(id);
        self.transfers.entry(id).or_insert_with(|| Transfer::new(id))
    }

    /// Allocate the next implicit transfer id for a legacy segment
    /// stream. Carries over a pending length announcement if one was
    /// waiting for this transfer.
    pub fn begin_transfer(&mut self) -> u64 {
        let id = self.next_transfer_id;
        self.next_transfer_id += 1;
        self.current_transfer = Some(id);
        if let Some(total) = self.pending_total.take() {
            self.transfer_mut(id).set_pending_total(total);
        }
        id
    }
}
