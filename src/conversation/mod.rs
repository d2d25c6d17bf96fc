// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

// the order matters,
// framer uses message and peer
// direct_buffer uses location and message
// overall_buffer uses addresses and direct_buffer
// context uses them all

/// Store source and destination of the first packet,
/// can determine who is active, and who passive
mod addresses;

/// Byte-range coordinates: message index, data source, offset
mod location;

/// Wire model of both generations and their parsers
mod message;

/// Cut one classified message off the front of a direction
mod framer;

/// Per-side state: version, contact presence, negotiated limits,
/// owned transfers
mod peer;

/// Segment and ack bookkeeping per transfer
mod transfer;

/// Negotiation results that need both sides on file
mod negotiation;

/// Payload accumulation per transfer and direction
mod reassembly;

/// buffer of incoming *or* outgoing byte ranges, framed records,
/// packet ranges
mod direct_buffer;

/// both direction buffers and also addresses
mod overall_buffer;

/// the whole conversation information, so called conversation context
mod context;

mod context_wrapper;

pub use self::addresses::{Addresses, Sender};
pub use self::context_wrapper::Conversation;
pub use self::direct_buffer::FramedRecord;
pub use self::location::{DataSource, FrameLocation};
pub use self::message::{
    ContactHeader, ContactHeaderV3, ContactHeaderV4, ExtensionItem, Framed, FramingError, Message,
    MessageV3, MessageV4, CONTACT_CAN_TLS, MAGIC, MAX_FRAMED_PAYLOAD, SEG_END, SEG_START,
};
pub use self::peer::{ContactState, Peer};
pub use self::transfer::{AckRecord, SegmentRecord, Transfer};
