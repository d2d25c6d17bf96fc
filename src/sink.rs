// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use crate::conversation::{Addresses, FrameLocation, Sender};

/// Receives transfer payloads. The bytes are opaque here, the inner
/// codec lives with the host.
pub trait PayloadSink {
    /// A transfer finished reassembling, `payload` is the whole thing.
    fn complete(&mut self, addresses: &Addresses, transfer_id: u64, payload: &[u8]);

    /// Best-effort view of a transfer that is still accumulating,
    /// for progressive display.
    fn partial(&mut self, addresses: &Addresses, transfer_id: u64, payload: &[u8]);
}

/// Receives transport-security events. The handshake itself is decoded
/// elsewhere, this engine only points at where it begins.
pub trait SecuritySink {
    /// Both peers agreed to upgrade. Everything from `location` onward
    /// in the direction of `sender` belongs to the security layer.
    fn upgrade_from(&mut self, addresses: &Addresses, location: &FrameLocation, sender: &Sender);

    /// A recovery check found a security record where the contact
    /// exchange was expected, after the fact.
    fn detected_post_hoc(&mut self, addresses: &Addresses, location: &FrameLocation, sender: &Sender);
}

/// Discards everything. Handy for hosts that only want the tree.
pub struct NullSink;

impl PayloadSink for NullSink {
    fn complete(&mut self, _: &Addresses, _: u64, _: &[u8]) {}

    fn partial(&mut self, _: &Addresses, _: u64, _: &[u8]) {}
}

impl SecuritySink for NullSink {
    fn upgrade_from(&mut self, _: &Addresses, _: &FrameLocation, _: &Sender) {}

    fn detected_post_hoc(&mut self, _: &Addresses, _: &FrameLocation, _: &Sender) {}
}
