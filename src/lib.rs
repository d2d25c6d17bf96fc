// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

#![forbid(unsafe_code)]
#![allow(
    clippy::match_ref_pats,
    clippy::clone_on_copy,
    clippy::len_zero,
    clippy::new_without_default
)]

mod conversation;

mod config;

mod diagnostic;

mod registry;

mod sdnv;

mod sink;

pub mod simulator;

pub use self::config::{Preferences, RecoveryMode};
pub use self::conversation::{
    AckRecord, Addresses, ContactHeader, ContactHeaderV3, ContactHeaderV4, ContactState,
    Conversation, DataSource, ExtensionItem, FrameLocation, Framed, FramedRecord, FramingError,
    Message, MessageV3, MessageV4, Peer, SegmentRecord, Sender, Transfer, CONTACT_CAN_TLS, MAGIC,
    MAX_FRAMED_PAYLOAD, SEG_END, SEG_START,
};
pub use self::diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use self::registry::{ConversationKey, Registry};
pub use self::sink::{NullSink, PayloadSink, SecuritySink};
