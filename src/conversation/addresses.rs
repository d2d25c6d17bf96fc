// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use capture_definitions::{PacketMetadata, SocketAddress};
use std::fmt;

/// Structure stores addresses of the first observed packet,
/// for any next packet it can determine whether the sender
/// is the active (initiating) or the passive (responding) side.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Addresses {
    initiator: SocketAddress,
    responder: SocketAddress,
}

impl fmt::Display for Addresses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} -> {}", self.initiator, self.responder)
    }
}

impl Addresses {
    pub fn new<P>(packet: &P) -> Self
    where
        P: PacketMetadata,
    {
        Addresses {
            initiator: packet.source(),
            responder: packet.destination(),
        }
    }

    pub fn sender<P>(&self, packet: &P) -> Sender
    where
        P: PacketMetadata,
    {
        if self.initiator == packet.source() {
            assert_eq!(self.responder, packet.destination());
            Sender::Initiator
        } else if self.responder == packet.source() {
            assert_eq!(self.initiator, packet.destination());
            Sender::Responder
        } else {
            panic!("packet does not belong to this conversation")
        }
    }

    pub fn initiator(&self) -> &SocketAddress {
        &self.initiator
    }

    pub fn responder(&self) -> &SocketAddress {
        &self.responder
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub enum Sender {
    Initiator,
    Responder,
}

impl Sender {
    pub fn opposite(&self) -> Self {
        match self {
            &Sender::Initiator => Sender::Responder,
            &Sender::Responder => Sender::Initiator,
        }
    }
}

#[cfg(test)]
mod tests {
    use capture_definitions::{NetworkPacket, SocketAddress};
    use std::time::Duration;
    use super::{Addresses, Sender};

    fn packet(src: &str, dst: &str) -> NetworkPacket {
        NetworkPacket {
            source: SocketAddress::Ip(src.parse().unwrap()),
            destination: SocketAddress::Ip(dst.parse().unwrap()),
            number: 1,
            timestamp: Duration::from_secs(0),
            payload: Vec::new(),
        }
    }

    #[test]
    fn first_seen_source_is_the_initiator() {
        let first = packet("10.0.0.1:4556", "10.0.0.2:4556");
        let addresses = Addresses::new(&first);
        assert_eq!(addresses.sender(&first), Sender::Initiator);

        let reply = packet("10.0.0.2:4556", "10.0.0.1:4556");
        assert_eq!(addresses.sender(&reply), Sender::Responder);
    }
}
