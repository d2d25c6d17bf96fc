// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use capture_definitions::PacketMetadata;
use std::ops::Range;
use super::addresses::{Addresses, Sender};
use super::direct_buffer::DirectBuffer;

/// Both direction buffers and the addresses that tell them apart.
pub struct ConversationBuffer {
    addresses: Addresses,
    incoming: DirectBuffer,
    outgoing: DirectBuffer,
}

impl ConversationBuffer {
    pub fn new<P>(packet: &P) -> Self
    where
        P: PacketMetadata,
    {
        ConversationBuffer {
            addresses: Addresses::new(packet),
            incoming: DirectBuffer::new(),
            outgoing: DirectBuffer::new(),
        }
    }

    pub fn consume<P>(&mut self, packet: &P, payload: &[u8]) -> (Sender, Range<usize>)
    where
        P: PacketMetadata,
    {
        let sender = self.addresses.sender(packet);
        let range = self.direct_mut(&sender).consume(payload, packet.frame_number());
        (sender, range)
    }

    pub fn id(&self) -> String {
        format!("{}", self.addresses)
    }

    pub fn addresses(&self) -> &Addresses {
        &self.addresses
    }

    pub fn sender<P>(&self, packet: &P) -> Sender
    where
        P: PacketMetadata,
    {
        self.addresses.sender(packet)
    }

    pub fn direct(&self, sender: &Sender) -> &DirectBuffer {
        match sender {
            &Sender::Initiator => &self.incoming,
            &Sender::Responder => &self.outgoing,
        }
    }

    pub fn direct_mut(&mut self, sender: &Sender) -> &mut DirectBuffer {
        match sender {
            &Sender::Initiator => &mut self.incoming,
            &Sender::Responder => &mut self.outgoing,
        }
    }
}
