// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use capture_definitions::{NetworkPacket, PacketMetadata, TreeLeaf, TreePresenter};
use std::{ops::Range, task::Poll, time::Duration};
use crate::config::Preferences;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use crate::sink::{PayloadSink, SecuritySink};
use super::addresses::{Addresses, Sender};
use super::direct_buffer::FramedRecord;
use super::framer;
use super::location::FrameLocation;
use super::message::{
    ContactHeader, Message, MessageV3, MessageV4, EXT_CRITICAL, SEG_END, SEG_START,
};
use super::negotiation::Negotiated;
use super::overall_buffer::ConversationBuffer;
use super::peer::{ContactState, Peer};
use super::reassembly::Reassembly;
use super::transfer::{correlate_ack, correlate_segment};

/// The whole per-conversation state: both direction buffers, both
/// peers, negotiation results, transfer reassembly and every finding
/// made so far.
pub struct ContextInner {
    buffer: ConversationBuffer,
    initiator: Peer,
    responder: Peer,
    negotiated: Negotiated,
    reassembly: Reassembly,
    diagnostics: Vec<Diagnostic>,
    message_count: u64,
}

impl ContextInner {
    pub fn new(packet: &NetworkPacket) -> Self {
        ContextInner {
            buffer: ConversationBuffer::new(packet),
            initiator: Peer::new(packet.source()),
            responder: Peer::new(packet.destination()),
            negotiated: Negotiated::new(),
            reassembly: Reassembly::new(),
            diagnostics: Vec::new(),
            message_count: 0,
        }
    }

    pub fn addresses(&self) -> &Addresses {
        self.buffer.addresses()
    }

    pub fn peer(&self, sender: &Sender) -> &Peer {
        match sender {
            &Sender::Initiator => &self.initiator,
            &Sender::Responder => &self.responder,
        }
    }

    pub fn negotiated(&self) -> &Negotiated {
        &self.negotiated
    }

    pub fn reassembly(&self) -> &Reassembly {
        &self.reassembly
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diagnostics.as_ref()
    }

    pub fn records(&self, sender: &Sender) -> &[FramedRecord] {
        self.buffer.direct(sender).records()
    }

    /// Append the packet's payload to its direction and frame as many
    /// messages as the captured bytes allow.
    pub fn consume<PS, SS>(
        &mut self,
        packet: &NetworkPacket,
        prefs: &Preferences,
        payload_sink: &mut PS,
        security_sink: &mut SS,
    ) where
        PS: PayloadSink,
        SS: SecuritySink,
    {
        let (sender, _range) = self.buffer.consume(packet, &packet.payload);
        let time = packet.timestamp();

        loop {
            let ContextInner {
                ref mut buffer,
                ref mut initiator,
                ref mut responder,
                ref mut negotiated,
                ref mut reassembly,
                ref mut diagnostics,
                ref mut message_count,
            } = *self;
            let direct = buffer.direct_mut(&sender);
            let passthrough = match &sender {
                &Sender::Initiator => initiator.security_passthrough,
                &Sender::Responder => responder.security_passthrough,
            };
            if passthrough || direct.opaque_from().is_some() {
                direct.mark_opaque();
                break;
            }
            if direct.unprocessed().is_empty() {
                break;
            }

            let outcome = {
                let peer = match &sender {
                    &Sender::Initiator => &*initiator,
                    &Sender::Responder => &*responder,
                };
                framer::classify(peer, prefs, direct.unprocessed())
            };
            match outcome {
                Poll::Pending => break,
                Poll::Ready(Ok(framed)) => {
                    let start = direct.processed();
                    let location = FrameLocation::stream(*message_count, start);
                    *message_count += 1;
                    direct.advance(framed.consumed);
                    let fragment = match &framed.message {
                        &Message::V3(MessageV3::DataSegment {
                            data_offset,
                            data_len,
                            ..
                        })
                        | &Message::V4(MessageV4::XferSegment {
                            data_offset,
                            data_len,
                            ..
                        }) => {
                            let from = start + data_offset;
                            Some(direct.data()[from..(from + data_len)].to_vec())
                        },
                        _ => None,
                    };
                    direct.push_record(FramedRecord {
                        location: location.clone(),
                        range: start..(start + framed.consumed),
                        message: framed.message.clone(),
                    });
                    for kind in framed.notes {
                        diagnostics.push(Diagnostic::new(
                            location.clone(),
                            Severity::Warning,
                            kind,
                        ));
                    }
                    apply(
                        initiator,
                        responder,
                        negotiated,
                        reassembly,
                        diagnostics,
                        buffer.addresses(),
                        sender,
                        &location,
                        &framed.message,
                        framed.recovered,
                        fragment,
                        time,
                        prefs,
                        payload_sink,
                        security_sink,
                    );
                },
                Poll::Ready(Err(e)) => {
                    log::warn!(
                        "cannot frame bytes of {:?} at offset {}: {}",
                        sender,
                        direct.processed(),
                        e,
                    );
                    let location = FrameLocation::stream(*message_count, direct.processed());
                    *message_count += 1;
                    diagnostics.push(Diagnostic::new(
                        location,
                        Severity::Error,
                        DiagnosticKind::Undecoded,
                    ));
                    direct.mark_opaque();
                    break;
                },
            }
        }
    }

    /// End of capture. Whatever is still open gets reported, nothing
    /// is silently dropped.
    pub fn finish(&mut self) {
        for peer in &[&self.initiator, &self.responder] {
            for (&id, transfer) in &peer.transfers {
                if !transfer.segments().is_empty() && !transfer.finished() {
                    let location = transfer.segments().last().unwrap().location.clone();
                    self.diagnostics.push(Diagnostic::new(
                        location,
                        Severity::Warning,
                        DiagnosticKind::TransferPending {
                            id,
                            seen: transfer.seen_length(),
                        },
                    ));
                }
                for segment in transfer.segments() {
                    if segment.ack.is_none() {
                        self.diagnostics.push(Diagnostic::new(
                            segment.location.clone(),
                            Severity::Note,
                            DiagnosticKind::NoCounterpart,
                        ));
                    }
                }
                for ack in transfer.acks() {
                    if ack.segment.is_none() {
                        self.diagnostics.push(Diagnostic::new(
                            ack.location.clone(),
                            Severity::Note,
                            DiagnosticKind::NoCounterpart,
                        ));
                    }
                }
            }
        }
        for (sender, id, len) in self.reassembly.unfinished() {
            log::warn!(
                "transfer {} of {:?} never finished, {} bytes buffered",
                id,
                sender,
                len,
            );
        }
    }

    /// Render the messages intersecting this packet's bytes into the
    /// host's tree, findings alongside.
    pub fn visualize<T>(&self, packet: &NetworkPacket, root: &mut T)
    where
        T: TreePresenter,
    {
        let sender = self.buffer.sender(packet);
        let direct = self.buffer.direct(&sender);
        let space = match direct.packet_range(packet.number) {
            Some(range) => range.clone(),
            None => return,
        };

        let mut node = root
            .add("tcpcl", 0..space.len(), TreeLeaf::nothing())
            .subtree();
        node.add(
            "conversation_id",
            0..0,
            TreeLeaf::Display(self.buffer.id()),
        );
        let direction = match &sender {
            &Sender::Initiator => "active",
            &Sender::Responder => "passive",
        };
        node.add("source", 0..0, TreeLeaf::Display(direction));

        for record in direct.records() {
            let range = record.range.clone();
            if range.end <= space.start || range.start >= space.end {
                continue;
            }
            let item = intersect(&space, range);
            let mut msg_node = node
                .add("msg", item, TreeLeaf::Display(describe(&record.message)))
                .subtree();
            show_fields(&record.message, &space, record.range.start, &mut msg_node);
            for d in self.diagnostics.iter() {
                if d.location == record.location {
                    msg_node.add("diagnostic", 0..0, TreeLeaf::Display(d));
                }
            }
        }

        if let Some(from) = direct.opaque_from() {
            if space.end > from {
                let item = intersect(&space, from..direct.data().len());
                node.add("undissected", item, TreeLeaf::nothing());
            }
        }
    }
}

/// Express the item range coordinates using space as the origin.
fn intersect(space: &Range<usize>, item: Range<usize>) -> Range<usize> {
    if item.end <= space.start {
        0..0
    } else if item.start >= space.end {
        space.len()..space.len()
    } else {
        let start = usize::max(space.start, item.start) - space.start;
        let end = usize::min(space.end, item.end) - space.start;
        start..end
    }
}

fn describe(message: &Message) -> &'static str {
    match message {
        &Message::Contact(ContactHeader::V3(_)) => "contact header, version 3",
        &Message::Contact(ContactHeader::V4(_)) => "contact header, version 4",
        &Message::V3(MessageV3::DataSegment { .. }) => "data segment",
        &Message::V3(MessageV3::AckSegment { .. }) => "ack segment",
        &Message::V3(MessageV3::RefuseBundle { .. }) => "refuse bundle",
        &Message::V3(MessageV3::Keepalive) => "keepalive",
        &Message::V3(MessageV3::Shutdown { .. }) => "shutdown",
        &Message::V3(MessageV3::Length { .. }) => "length announcement",
        &Message::V4(MessageV4::SessInit { .. }) => "session init",
        &Message::V4(MessageV4::SessTerm { .. }) => "session terminate",
        &Message::V4(MessageV4::XferSegment { .. }) => "transfer segment",
        &Message::V4(MessageV4::XferAck { .. }) => "transfer ack",
        &Message::V4(MessageV4::XferRefuse { .. }) => "transfer refuse",
        &Message::V4(MessageV4::Keepalive) => "keepalive",
        &Message::V4(MessageV4::MsgReject { .. }) => "message reject",
        &Message::SecurityRecord { .. } => "transport security record",
    }
}

fn show_fields<T>(message: &Message, space: &Range<usize>, base: usize, node: &mut T)
where
    T: TreePresenter,
{
    match message {
        &Message::Contact(ContactHeader::V3(ref h)) => {
            node.add("flags", 0..0, TreeLeaf::Display(hex::encode([h.flags])));
            node.add("keepalive", 0..0, TreeLeaf::dec(h.keepalive as _));
            node.add(
                "eid",
                0..0,
                TreeLeaf::Display(String::from_utf8_lossy(&h.eid).into_owned()),
            );
        },
        &Message::Contact(ContactHeader::V4(ref h)) => {
            node.add("flags", 0..0, TreeLeaf::Display(hex::encode([h.flags])));
        },
        &Message::V3(MessageV3::DataSegment {
            flags,
            length,
            data_offset,
            data_len,
        }) => {
            node.add("flags", 0..0, TreeLeaf::Display(hex::encode([flags])));
            node.add("length", 0..0, TreeLeaf::dec(length as _));
            let from = base + data_offset;
            node.add("data", intersect(space, from..(from + data_len)), TreeLeaf::nothing());
        },
        &Message::V3(MessageV3::AckSegment { length }) => {
            node.add("acked_length", 0..0, TreeLeaf::dec(length as _));
        },
        &Message::V3(MessageV3::RefuseBundle { reason }) => {
            node.add("reason", 0..0, TreeLeaf::dec(reason as _));
        },
        &Message::V3(MessageV3::Shutdown {
            reason,
            reconnect_delay,
        }) => {
            if let Some(reason) = reason {
                node.add("reason", 0..0, TreeLeaf::dec(reason as _));
            }
            if let Some(delay) = reconnect_delay {
                node.add("reconnect_delay", 0..0, TreeLeaf::dec(delay as _));
            }
        },
        &Message::V3(MessageV3::Length { total }) => {
            node.add("total_length", 0..0, TreeLeaf::dec(total as _));
        },
        &Message::V4(MessageV4::SessInit {
            keepalive,
            segment_mru,
            transfer_mru,
            ref node_id,
            ref extensions,
        }) => {
            node.add("keepalive", 0..0, TreeLeaf::dec(keepalive as _));
            node.add("segment_mru", 0..0, TreeLeaf::dec(segment_mru as _));
            node.add("transfer_mru", 0..0, TreeLeaf::dec(transfer_mru as _));
            node.add(
                "node_id",
                0..0,
                TreeLeaf::Display(String::from_utf8_lossy(node_id).into_owned()),
            );
            node.add("extensions", 0..0, TreeLeaf::dec(extensions.len() as _));
        },
        &Message::V4(MessageV4::SessTerm { flags, reason }) => {
            node.add("flags", 0..0, TreeLeaf::Display(hex::encode([flags])));
            node.add("reason", 0..0, TreeLeaf::dec(reason as _));
        },
        &Message::V4(MessageV4::XferSegment {
            flags,
            transfer_id,
            length,
            data_offset,
            data_len,
            ..
        }) => {
            node.add("transfer_id", 0..0, TreeLeaf::dec(transfer_id as _));
            node.add("flags", 0..0, TreeLeaf::Display(hex::encode([flags])));
            node.add("length", 0..0, TreeLeaf::dec(length as _));
            let from = base + data_offset;
            node.add("data", intersect(space, from..(from + data_len)), TreeLeaf::nothing());
        },
        &Message::V4(MessageV4::XferAck {
            flags,
            transfer_id,
            length,
        }) => {
            node.add("transfer_id", 0..0, TreeLeaf::dec(transfer_id as _));
            node.add("flags", 0..0, TreeLeaf::Display(hex::encode([flags])));
            node.add("acked_length", 0..0, TreeLeaf::dec(length as _));
        },
        &Message::V4(MessageV4::XferRefuse {
            reason,
            transfer_id,
        }) => {
            node.add("transfer_id", 0..0, TreeLeaf::dec(transfer_id as _));
            node.add("reason", 0..0, TreeLeaf::dec(reason as _));
        },
        &Message::V4(MessageV4::MsgReject { reason, rejected }) => {
            node.add("reason", 0..0, TreeLeaf::dec(reason as _));
            node.add("rejected_type", 0..0, TreeLeaf::dec(rejected as _));
        },
        &Message::V3(MessageV3::Keepalive) | &Message::V4(MessageV4::Keepalive) => (),
        &Message::SecurityRecord { length } => {
            node.add("length", 0..0, TreeLeaf::dec(length as _));
        },
    }
}

/// Split a peer pair into the side that sent the current message and
/// the counterpart.
fn split<'a>(
    sender: &Sender,
    initiator: &'a mut Peer,
    responder: &'a mut Peer,
) -> (&'a mut Peer, &'a mut Peer) {
    match sender {
        &Sender::Initiator => (initiator, responder),
        &Sender::Responder => (responder, initiator),
    }
}

/// Everything a classified message changes beyond the direction
/// buffer: peer state, negotiation, transfer bookkeeping, reassembly.
fn apply<PS, SS>(
    initiator: &mut Peer,
    responder: &mut Peer,
    negotiated: &mut Negotiated,
    reassembly: &mut Reassembly,
    diagnostics: &mut Vec<Diagnostic>,
    addresses: &Addresses,
    sender: Sender,
    location: &FrameLocation,
    message: &Message,
    recovered: Option<u8>,
    fragment: Option<Vec<u8>>,
    time: Duration,
    prefs: &Preferences,
    payload_sink: &mut PS,
    security_sink: &mut SS,
) where
    PS: PayloadSink,
    SS: SecuritySink,
{
    if let Some(generation) = recovered {
        let (peer, _) = split(&sender, initiator, responder);
        if !peer.contact.known() {
            peer.contact = if generation == 3 {
                ContactState::InferredV3
            } else {
                ContactState::InferredV4
            };
            peer.version = Some(generation);
            if let Some(d) = negotiated.observe_version(generation, location) {
                diagnostics.push(d);
            }
        }
    }

    match message {
        &Message::Contact(ref header) => {
            {
                let (peer, _) = split(&sender, initiator, responder);
                match peer.contact {
                    ContactState::Unknown => {
                        peer.contact = ContactState::Observed;
                        peer.version = Some(header.version());
                        peer.can_tls = header.can_tls();
                        peer.contact_location = Some(location.clone());
                        match header {
                            &ContactHeader::V3(ref h) => {
                                peer.contact_flags = h.flags;
                                peer.keepalive = Some(h.keepalive);
                            },
                            &ContactHeader::V4(ref h) => {
                                peer.contact_flags = h.flags;
                            },
                        }
                    },
                    ContactState::Observed => {
                        let same_flags = match header {
                            &ContactHeader::V3(ref h) => {
                                peer.contact_flags == h.flags
                                    && peer.keepalive == Some(h.keepalive)
                            },
                            &ContactHeader::V4(ref h) => peer.contact_flags == h.flags,
                        };
                        if peer.version != Some(header.version()) || !same_flags {
                            diagnostics.push(Diagnostic::new(
                                location.clone(),
                                Severity::Warning,
                                DiagnosticKind::ContactMismatch,
                            ));
                        }
                    },
                    ContactState::InferredV3 | ContactState::InferredV4 => {
                        diagnostics.push(Diagnostic::new(
                            location.clone(),
                            Severity::Note,
                            DiagnosticKind::ContactAfterInference,
                        ));
                    },
                }
            }
            if let Some(d) = negotiated.observe_version(header.version(), location) {
                diagnostics.push(d);
            }
            if prefs.analyze_sequence {
                if negotiated.contact_level(initiator, responder, location) {
                    initiator.security_passthrough = true;
                    responder.security_passthrough = true;
                    security_sink.upgrade_from(addresses, location, &sender);
                }
                negotiated.session_level(initiator, responder);
            }
        },
        &Message::V3(MessageV3::DataSegment { flags, length, .. }) => {
            let (peer, other) = split(&sender, initiator, responder);
            let id = if flags & SEG_START != 0 {
                peer.begin_transfer()
            } else {
                match peer.current_transfer {
                    Some(id) => id,
                    None => peer.begin_transfer(),
                }
            };
            peer.segment_transfers.insert(location.clone(), id);
            if prefs.analyze_sequence {
                let (index, diags) =
                    peer.transfer_mut(id)
                        .record_segment(flags, length, location, time);
                diagnostics.extend(diags);
                match other.transfers.get_mut(&id) {
                    Some(ack_side) => {
                        diagnostics.extend(correlate_segment(
                            peer.transfers.get_mut(&id).unwrap(),
                            ack_side,
                            index,
                        ));
                    },
                    None => diagnostics.push(Diagnostic::new(
                        location.clone(),
                        Severity::Note,
                        DiagnosticKind::NoCounterpart,
                    )),
                }
            }
            if flags & SEG_END != 0 {
                peer.current_transfer = None;
            }
            reassemble(
                reassembly,
                diagnostics,
                addresses,
                sender,
                location,
                id,
                flags & SEG_END != 0,
                fragment,
                peer.transfers.get(&id).and_then(|t| t.total_length()),
                other.transfer_mru,
                prefs,
                payload_sink,
            );
        },
        &Message::V3(MessageV3::AckSegment { length }) => {
            if !prefs.analyze_sequence {
                return;
            }
            let (peer, other) = split(&sender, initiator, responder);
            let id = match other.current_transfer.or(other.last_transfer) {
                Some(id) => id,
                None => {
                    diagnostics.push(Diagnostic::new(
                        location.clone(),
                        Severity::Warning,
                        DiagnosticKind::AckWithoutTransfer,
                    ));
                    0
                },
            };
            let (index, diags) = peer.transfer_mut(id).record_ack(None, length, location, time);
            diagnostics.extend(diags);
            match other.transfers.get_mut(&id) {
                Some(segment_side) => {
                    diagnostics.extend(correlate_ack(
                        peer.transfers.get_mut(&id).unwrap(),
                        segment_side,
                        index,
                    ));
                },
                None => diagnostics.push(Diagnostic::new(
                    location.clone(),
                    Severity::Note,
                    DiagnosticKind::NoCounterpart,
                )),
            }
        },
        &Message::V3(MessageV3::Length { total }) => {
            if !prefs.analyze_sequence {
                return;
            }
            let (peer, _) = split(&sender, initiator, responder);
            match peer.current_transfer {
                Some(id) => {
                    let diags = peer.transfer_mut(id).declare_total(total, location);
                    diagnostics.extend(diags);
                },
                None => peer.pending_total = Some(total),
            }
        },
        &Message::V3(MessageV3::Shutdown { .. }) => {
            let (peer, _) = split(&sender, initiator, responder);
            if peer.term_location.is_none() {
                peer.term_location = Some(location.clone());
            }
        },
        &Message::V3(MessageV3::RefuseBundle { .. }) | &Message::V3(MessageV3::Keepalive) => (),
        &Message::V4(MessageV4::SessInit {
            keepalive,
            segment_mru,
            transfer_mru,
            ref extensions,
            ..
        }) => {
            {
                let (peer, _) = split(&sender, initiator, responder);
                if peer.init_location.is_none() {
                    peer.init_location = Some(location.clone());
                    peer.keepalive = Some(keepalive);
                    peer.segment_mru = Some(segment_mru);
                    peer.transfer_mru = Some(transfer_mru);
                } else {
                    diagnostics.push(Diagnostic::new(
                        location.clone(),
                        Severity::Note,
                        DiagnosticKind::SessionReinit,
                    ));
                }
            }
            for extension in extensions {
                if extension.flags & EXT_CRITICAL != 0 {
                    diagnostics.push(Diagnostic::new(
                        location.clone(),
                        Severity::Warning,
                        DiagnosticKind::UnknownCriticalExtension {
                            item_type: extension.item_type,
                        },
                    ));
                }
            }
            if prefs.analyze_sequence {
                negotiated.session_level(initiator, responder);
            }
        },
        &Message::V4(MessageV4::XferSegment {
            flags,
            transfer_id,
            ref extensions,
            length,
            ..
        }) => {
            let (peer, other) = split(&sender, initiator, responder);
            if prefs.analyze_sequence {
                let (index, diags) =
                    peer.transfer_mut(transfer_id)
                        .record_segment(flags, length, location, time);
                diagnostics.extend(diags);
                for extension in extensions {
                    if let Some(total) = extension.transfer_length() {
                        let diags = peer
                            .transfer_mut(transfer_id)
                            .declare_total(total, location);
                        diagnostics.extend(diags);
                    } else if extension.flags & EXT_CRITICAL != 0 {
                        diagnostics.push(Diagnostic::new(
                            location.clone(),
                            Severity::Warning,
                            DiagnosticKind::UnknownCriticalExtension {
                                item_type: extension.item_type,
                            },
                        ));
                    }
                }
                match other.transfers.get_mut(&transfer_id) {
                    Some(ack_side) => {
                        diagnostics.extend(correlate_segment(
                            peer.transfers.get_mut(&transfer_id).unwrap(),
                            ack_side,
                            index,
                        ));
                    },
                    None => diagnostics.push(Diagnostic::new(
                        location.clone(),
                        Severity::Note,
                        DiagnosticKind::NoCounterpart,
                    )),
                }
            }
            reassemble(
                reassembly,
                diagnostics,
                addresses,
                sender,
                location,
                transfer_id,
                flags & SEG_END != 0,
                fragment,
                peer.transfers
                    .get(&transfer_id)
                    .and_then(|t| t.total_length()),
                other.transfer_mru,
                prefs,
                payload_sink,
            );
        },
        &Message::V4(MessageV4::XferAck {
            flags,
            transfer_id,
            length,
        }) => {
            if !prefs.analyze_sequence {
                return;
            }
            let (peer, other) = split(&sender, initiator, responder);
            let (index, diags) =
                peer.transfer_mut(transfer_id)
                    .record_ack(Some(flags), length, location, time);
            diagnostics.extend(diags);
            match other.transfers.get_mut(&transfer_id) {
                Some(segment_side) => {
                    diagnostics.extend(correlate_ack(
                        peer.transfers.get_mut(&transfer_id).unwrap(),
                        segment_side,
                        index,
                    ));
                },
                None => diagnostics.push(Diagnostic::new(
                    location.clone(),
                    Severity::Note,
                    DiagnosticKind::NoCounterpart,
                )),
            }
        },
        &Message::V4(MessageV4::SessTerm { .. }) => {
            let (peer, _) = split(&sender, initiator, responder);
            if peer.term_location.is_none() {
                peer.term_location = Some(location.clone());
            }
        },
        &Message::V4(MessageV4::XferRefuse { .. })
        | &Message::V4(MessageV4::Keepalive)
        | &Message::V4(MessageV4::MsgReject { .. }) => (),
        &Message::SecurityRecord { .. } => {
            let (peer, _) = split(&sender, initiator, responder);
            peer.security_passthrough = true;
            security_sink.detected_post_hoc(addresses, location, &sender);
        },
    }
}

fn reassemble<PS>(
    reassembly: &mut Reassembly,
    diagnostics: &mut Vec<Diagnostic>,
    addresses: &Addresses,
    sender: Sender,
    location: &FrameLocation,
    transfer_id: u64,
    is_final: bool,
    fragment: Option<Vec<u8>>,
    declared_total: Option<u64>,
    receiver_mru: Option<u64>,
    prefs: &Preferences,
    payload_sink: &mut PS,
) where
    PS: PayloadSink,
{
    let bytes = match fragment {
        Some(bytes) => bytes,
        None => return,
    };
    if !prefs.reassemble {
        // no buffering, each fragment is only offered for display
        payload_sink.partial(addresses, transfer_id, &bytes);
        return;
    }
    let limit = match (declared_total, receiver_mru) {
        (Some(a), Some(b)) => Some(u64::min(a, b)),
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (None, None) => None,
    };
    let (done, kind) =
        reassembly.add_fragment(sender, transfer_id, is_final, &bytes, limit);
    if let Some(kind) = kind {
        diagnostics.push(Diagnostic::new(location.clone(), Severity::Warning, kind));
    }
    match done {
        Some(payload) => payload_sink.complete(addresses, transfer_id, &payload),
        None => {
            if let Some(pending) = reassembly.pending(sender, transfer_id) {
                payload_sink.partial(addresses, transfer_id, pending);
            }
        },
    }
}
