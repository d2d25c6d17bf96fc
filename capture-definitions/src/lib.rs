// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::{fmt, net::SocketAddr, ops::Range, time::Duration};

/// The most common socket address is ip (v4 or v6 and port),
/// but a capture source might report some other kind of address.
#[derive(Debug, Clone, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum SocketAddress {
    Ip(SocketAddr),
    Other { ip: Vec<u8>, port: u16 },
}

impl fmt::Display for SocketAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &SocketAddress::Ip(ref a) => write!(f, "{}", a),
            &SocketAddress::Other { ref ip, ref port } => {
                write!(f, "Unknown:{}:{}", hex::encode(ip), *port)
            },
        }
    }
}

/// What the capture layer knows about a packet before any dissection.
pub trait PacketMetadata {
    fn source(&self) -> SocketAddress;
    fn destination(&self) -> SocketAddress;
    fn frame_number(&self) -> u64;
    fn timestamp(&self) -> Duration;
}

/// One observed byte range of a conversation, already ordered within
/// its direction by the transport-layer reassembly of the capture host.
#[derive(Debug, Clone)]
pub struct NetworkPacket {
    pub source: SocketAddress,
    pub destination: SocketAddress,
    pub number: u64,
    pub timestamp: Duration,
    pub payload: Vec<u8>,
}

impl PacketMetadata for NetworkPacket {
    fn source(&self) -> SocketAddress {
        self.source.clone()
    }

    fn destination(&self) -> SocketAddress {
        self.destination.clone()
    }

    fn frame_number(&self) -> u64 {
        self.number
    }

    fn timestamp(&self) -> Duration {
        self.timestamp
    }
}

/// Display hierarchy built by the host. The dissector only appends
/// leaves and subtrees, it never renders anything itself.
pub trait TreePresenter {
    fn subtree(&mut self) -> Self;
    fn add<D, P>(&mut self, path: P, range: Range<usize>, v: TreeLeaf<D>) -> Self
    where
        D: fmt::Display,
        P: AsRef<str>;
}

pub enum TreeLeaf<D>
where
    D: fmt::Display,
{
    Nothing,
    Display(D),
    Int64Dec(i64),
}

impl TreeLeaf<String> {
    pub fn dec(v: i64) -> Self {
        TreeLeaf::Int64Dec(v)
    }

    pub fn nothing() -> Self {
        TreeLeaf::Nothing
    }
}
