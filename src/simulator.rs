use capture_definitions::{NetworkPacket, SocketAddress, TreeLeaf, TreePresenter};
use std::{fmt, ops::Range, time::Duration};
use crate::config::Preferences;
use crate::conversation::{
    Addresses, Conversation, FrameLocation, Sender, SEG_START,
};
use crate::registry::Registry;
use crate::sdnv;
use crate::sink::{PayloadSink, SecuritySink};

/// Throwaway tree for driving the engine without a host.
#[derive(Default, Clone)]
pub struct Tree {
    panic_on_undissected: bool,
}

impl Tree {
    /// For captures that are supposed to frame completely.
    pub fn panic_on_undissected(self) -> Self {
        let mut s = self;
        s.panic_on_undissected = true;
        s
    }
}

impl TreePresenter for Tree {
    fn subtree(&mut self) -> Self {
        self.clone()
    }

    fn add<D, P>(&mut self, path: P, range: Range<usize>, v: TreeLeaf<D>) -> Self
    where
        D: fmt::Display,
        P: AsRef<str>,
    {
        let _ = (range, v);
        if self.panic_on_undissected && path.as_ref().contains("undissected") {
            panic!()
        }
        self.clone()
    }
}

#[derive(Default)]
pub struct PayloadRecorder {
    pub completed: Vec<(u64, Vec<u8>)>,
    pub partials: Vec<(u64, usize)>,
}

impl PayloadSink for PayloadRecorder {
    fn complete(&mut self, _: &Addresses, transfer_id: u64, payload: &[u8]) {
        self.completed.push((transfer_id, payload.to_vec()));
    }

    fn partial(&mut self, _: &Addresses, transfer_id: u64, payload: &[u8]) {
        self.partials.push((transfer_id, payload.len()));
    }
}

#[derive(Default)]
pub struct SecurityRecorder {
    pub upgrades: Vec<(FrameLocation, Sender)>,
    pub detections: Vec<(FrameLocation, Sender)>,
}

impl SecuritySink for SecurityRecorder {
    fn upgrade_from(&mut self, _: &Addresses, location: &FrameLocation, sender: &Sender) {
        self.upgrades.push((location.clone(), sender.clone()));
    }

    fn detected_post_hoc(&mut self, _: &Addresses, location: &FrameLocation, sender: &Sender) {
        self.detections.push((location.clone(), sender.clone()));
    }
}

pub fn contact_v3(flags: u8, keepalive: u16, eid: &[u8]) -> Vec<u8> {
    let mut bytes = b"dtn!\x03".to_vec();
    bytes.push(flags);
    bytes.extend_from_slice(&keepalive.to_be_bytes());
    bytes.extend_from_slice(&sdnv::encode(eid.len() as u64));
    bytes.extend_from_slice(eid);
    bytes
}

pub fn contact_v4(flags: u8) -> Vec<u8> {
    let mut bytes = b"dtn!\x04".to_vec();
    bytes.push(flags);
    bytes
}

pub fn data_segment_v3(flags: u8, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x10 | flags];
    bytes.extend_from_slice(&sdnv::encode(payload.len() as u64));
    bytes.extend_from_slice(payload);
    bytes
}

pub fn ack_segment_v3(length: u64) -> Vec<u8> {
    let mut bytes = vec![0x20];
    bytes.extend_from_slice(&sdnv::encode(length));
    bytes
}

pub fn length_v3(total: u64) -> Vec<u8> {
    let mut bytes = vec![0x60];
    bytes.extend_from_slice(&sdnv::encode(total));
    bytes
}

pub fn keepalive_v3() -> Vec<u8> {
    vec![0x40]
}

pub fn shutdown_v3() -> Vec<u8> {
    vec![0x50]
}

pub fn sess_init(keepalive: u16, segment_mru: u64, transfer_mru: u64, node_id: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x07];
    bytes.extend_from_slice(&keepalive.to_be_bytes());
    bytes.extend_from_slice(&segment_mru.to_be_bytes());
    bytes.extend_from_slice(&transfer_mru.to_be_bytes());
    bytes.extend_from_slice(&(node_id.len() as u16).to_be_bytes());
    bytes.extend_from_slice(node_id);
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes
}

pub fn sess_term(flags: u8, reason: u8) -> Vec<u8> {
    vec![0x05, flags, reason]
}

/// The extension block only exists on a starting segment, a declared
/// total on a continuation is silently impossible to encode.
pub fn xfer_segment(flags: u8, transfer_id: u64, total: Option<u64>, payload: &[u8]) -> Vec<u8> {
    let mut bytes = vec![0x01, flags];
    bytes.extend_from_slice(&transfer_id.to_be_bytes());
    if flags & SEG_START != 0 {
        match total {
            Some(total) => {
                let mut item = vec![0x01];
                item.extend_from_slice(&0x0001u16.to_be_bytes());
                item.extend_from_slice(&8u16.to_be_bytes());
                item.extend_from_slice(&total.to_be_bytes());
                bytes.extend_from_slice(&(item.len() as u32).to_be_bytes());
                bytes.extend_from_slice(&item);
            },
            None => bytes.extend_from_slice(&0u32.to_be_bytes()),
        }
    }
    bytes.extend_from_slice(&(payload.len() as u64).to_be_bytes());
    bytes.extend_from_slice(payload);
    bytes
}

pub fn xfer_ack(flags: u8, transfer_id: u64, length: u64) -> Vec<u8> {
    let mut bytes = vec![0x02, flags];
    bytes.extend_from_slice(&transfer_id.to_be_bytes());
    bytes.extend_from_slice(&length.to_be_bytes());
    bytes
}

pub fn xfer_refuse(reason: u8, transfer_id: u64) -> Vec<u8> {
    let mut bytes = vec![0x03, reason];
    bytes.extend_from_slice(&transfer_id.to_be_bytes());
    bytes
}

/// One synthetic conversation between two fixed endpoints. Whoever
/// delivers first becomes the active side.
pub struct Exchange {
    pub conversation: Conversation,
    pub payloads: PayloadRecorder,
    pub security: SecurityRecorder,
    prefs: Preferences,
    tree: Tree,
    number: u64,
}

impl Exchange {
    pub fn new(prefs: Preferences) -> Self {
        Exchange {
            conversation: Conversation::new(),
            payloads: PayloadRecorder::default(),
            security: SecurityRecorder::default(),
            prefs,
            tree: Tree::default(),
            number: 0,
        }
    }

    pub fn with_tree(self, tree: Tree) -> Self {
        let mut s = self;
        s.tree = tree;
        s
    }

    pub fn deliver(&mut self, sender: Sender, payload: &[u8]) -> bool {
        let a = SocketAddress::Ip("10.0.0.1:4556".parse().unwrap());
        let b = SocketAddress::Ip("10.0.0.2:4556".parse().unwrap());
        let (source, destination) = match &sender {
            &Sender::Initiator => (a, b),
            &Sender::Responder => (b, a),
        };
        self.number += 1;
        let packet = NetworkPacket {
            source,
            destination,
            number: self.number,
            timestamp: Duration::from_millis(self.number * 10),
            payload: payload.to_vec(),
        };
        let mut tree = self.tree.clone();
        self.conversation.add(
            &self.prefs,
            &packet,
            &mut self.payloads,
            &mut self.security,
            &mut tree,
        )
    }

    pub fn finish(&mut self) {
        self.conversation.finish();
    }
}

/// Chop arbitrary bytes into alternating-direction packets and feed
/// them through the registry, the way a capture driver would. Nothing
/// here is allowed to panic, whatever the bytes are.
pub fn simulate(prefs: &Preferences, data: &[u8]) {
    let a = SocketAddress::Ip("10.0.0.1:4556".parse().unwrap());
    let b = SocketAddress::Ip("10.0.0.2:4556".parse().unwrap());
    let mut registry = Registry::new();
    let mut payloads = PayloadRecorder::default();
    let mut security = SecurityRecorder::default();
    let mut pos = 0;
    let mut step = 7;
    let mut number = 0;
    let mut from_responder = false;
    while pos < data.len() {
        let end = usize::min(pos + step, data.len());
        let (source, destination) = if from_responder {
            (b.clone(), a.clone())
        } else {
            (a.clone(), b.clone())
        };
        number += 1;
        let packet = NetworkPacket {
            source,
            destination,
            number,
            timestamp: Duration::from_millis(number * 10),
            payload: data[pos..end].to_vec(),
        };
        let mut tree = Tree::default();
        registry.get_or_create(&packet).add(
            prefs,
            &packet,
            &mut payloads,
            &mut security,
            &mut tree,
        );
        pos = end;
        from_responder = !from_responder;
        step = step % 13 + 5;
    }
    registry.finish();
}

#[cfg(test)]
mod tests {
    use crate::config::{Preferences, RecoveryMode};
    use crate::conversation::{
        ContactState, Message, MessageV4, Sender, SEG_END, SEG_START,
    };
    use crate::diagnostic::DiagnosticKind;
    use super::*;

    fn prefs(recovery: RecoveryMode) -> Preferences {
        Preferences {
            recovery,
            ..Preferences::default()
        }
    }

    #[test]
    fn contact_with_security_capability_classifies() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &[0x64, 0x74, 0x6e, 0x21, 0x04, 0x01]);
        let peer = x.conversation.peer(&Sender::Initiator).unwrap();
        assert_eq!(peer.contact, ContactState::Observed);
        assert_eq!(peer.version, Some(4));
        assert!(peer.can_tls);
        let records = x.conversation.records(&Sender::Initiator);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].range, 0..6);
    }

    #[test]
    fn legacy_segment_frames_without_leftover() {
        let mut x = Exchange::new(Preferences::default())
            .with_tree(Tree::default().panic_on_undissected());
        x.deliver(Sender::Initiator, &contact_v3(0x00, 0, b"dtn://a"));
        x.deliver(
            Sender::Initiator,
            &data_segment_v3(SEG_START | SEG_END, &[0xab; 10]),
        );
        let records = x.conversation.records(&Sender::Initiator);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].range.len(), 12);
    }

    #[test]
    fn session_keepalive_is_negotiated_to_the_minimum() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &contact_v4(0x00));
        x.deliver(Sender::Responder, &contact_v4(0x00));
        x.deliver(Sender::Initiator, &sess_init(30, 1024, 4096, b"dtn://a"));
        assert_eq!(x.conversation.negotiated_keepalive(), None);
        x.deliver(Sender::Responder, &sess_init(45, 1024, 4096, b"dtn://b"));
        assert_eq!(x.conversation.negotiated_keepalive(), Some(30));
    }

    #[test]
    fn one_sided_capture_still_classifies_the_observed_side() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &contact_v4(0x00));
        x.deliver(Sender::Initiator, &[0x04]);
        x.deliver(Sender::Responder, &[0x04]);

        let observed = x.conversation.peer(&Sender::Initiator).unwrap();
        assert_eq!(observed.contact, ContactState::Observed);
        let records = x.conversation.records(&Sender::Initiator);
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].message, Message::V4(MessageV4::Keepalive));

        // the unobserved side stays unknown, its bytes fall through
        // to recovery, which is off
        let unobserved = x.conversation.peer(&Sender::Responder).unwrap();
        assert_eq!(unobserved.contact, ContactState::Unknown);
        assert!(x
            .conversation
            .diagnostics()
            .iter()
            .any(|d| d.kind == DiagnosticKind::Undecoded));
    }

    #[test]
    fn recovery_pins_the_inferred_version() {
        let mut x = Exchange::new(prefs(RecoveryMode::V4First));
        x.deliver(Sender::Responder, &[0x04]);
        let peer = x.conversation.peer(&Sender::Responder).unwrap();
        assert_eq!(peer.contact, ContactState::InferredV4);
        assert_eq!(peer.version, Some(4));

        // later bytes skip contact detection entirely
        x.deliver(Sender::Responder, &xfer_ack(SEG_END, 1, 10));
        assert_eq!(x.conversation.records(&Sender::Responder).len(), 2);
    }

    #[test]
    fn agreed_upgrade_marks_the_boundary_and_stops_dissection() {
        let mut x = Exchange::new(Preferences::default());
        assert!(x.deliver(Sender::Initiator, &contact_v4(0x01)));
        assert!(!x.deliver(Sender::Responder, &contact_v4(0x01)));
        assert_eq!(x.conversation.negotiated_security_upgrade(), Some(true));
        assert_eq!(x.security.upgrades.len(), 1);

        // whatever follows is the security layer's business
        assert!(!x.deliver(Sender::Initiator, &[0x16, 0x03, 0x03, 0x00, 0x05]));
        assert_eq!(x.conversation.records(&Sender::Initiator).len(), 1);
    }

    #[test]
    fn upgrade_needs_agreement_from_both() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &contact_v4(0x01));
        x.deliver(Sender::Responder, &contact_v4(0x00));
        assert_eq!(x.conversation.negotiated_security_upgrade(), Some(false));
        assert!(x.security.upgrades.is_empty());
    }

    #[test]
    fn security_record_detected_post_hoc() {
        let mut x = Exchange::new(prefs(RecoveryMode::V3First));
        x.deliver(Sender::Initiator, &[0x16, 0x03, 0x01, 0x00, 0x20]);
        assert_eq!(x.security.detections.len(), 1);
        // the direction stays with the security layer from then on
        assert!(!x.deliver(Sender::Initiator, &[0xff, 0xff]));
    }

    #[test]
    fn transfer_reassembles_exactly_once() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &contact_v4(0x00));
        x.deliver(Sender::Responder, &contact_v4(0x00));
        x.deliver(Sender::Initiator, &sess_init(30, 1 << 16, 1 << 20, b"dtn://a"));
        x.deliver(Sender::Responder, &sess_init(30, 1 << 16, 1 << 20, b"dtn://b"));

        x.deliver(
            Sender::Initiator,
            &xfer_segment(SEG_START, 1, Some(10), b"hello"),
        );
        assert!(x.payloads.completed.is_empty());
        assert_eq!(x.payloads.partials.last(), Some(&(1, 5)));

        x.deliver(Sender::Initiator, &xfer_segment(SEG_END, 1, None, b"world"));
        assert_eq!(x.payloads.completed.len(), 1);
        let &(id, ref payload) = &x.payloads.completed[0];
        assert_eq!(id, 1);
        assert_eq!(payload.as_slice(), b"helloworld");

        // acks mirror the segment flags and correlate by length
        x.deliver(Sender::Responder, &xfer_ack(SEG_START, 1, 5));
        x.deliver(Sender::Responder, &xfer_ack(SEG_END, 1, 10));
        x.finish();
        // both segments were noted as uncorrelated when they were
        // classified, before their acks arrived, and nothing more
        let notes = x
            .conversation
            .diagnostics()
            .iter()
            .filter(|d| d.kind == DiagnosticKind::NoCounterpart)
            .count();
        assert_eq!(notes, 2);
        assert!(!x.conversation.diagnostics().iter().any(|d| match d.kind {
            DiagnosticKind::AckFlagMismatch { .. } => true,
            _ => false,
        }));

        let sent = &x.conversation.peer(&Sender::Initiator).unwrap().transfers[&1];
        assert!(sent.segments().iter().all(|s| s.ack.is_some()));
        assert_eq!(sent.total_length(), Some(10));
    }

    #[test]
    fn legacy_transfer_with_length_announcement() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &contact_v3(0x08, 30, b"dtn://a"));
        x.deliver(Sender::Responder, &contact_v3(0x08, 45, b"dtn://b"));
        assert_eq!(x.conversation.negotiated_keepalive(), Some(30));

        x.deliver(Sender::Initiator, &length_v3(10));
        x.deliver(Sender::Initiator, &data_segment_v3(SEG_START, &[0x5a; 4]));
        x.deliver(Sender::Initiator, &data_segment_v3(SEG_END, &[0x5a; 6]));
        x.deliver(Sender::Responder, &ack_segment_v3(10));

        assert_eq!(x.payloads.completed.len(), 1);
        assert_eq!(x.payloads.completed[0].1.len(), 10);

        let peer = x.conversation.peer(&Sender::Initiator).unwrap();
        let transfer = &peer.transfers[&0];
        assert_eq!(transfer.total_length(), Some(10));
        assert!(transfer.finished());
        assert_eq!(peer.segment_transfers.len(), 2);

        let acks = &x.conversation.peer(&Sender::Responder).unwrap().transfers[&0];
        assert_eq!(acks.acks().len(), 1);
        assert_eq!(acks.acks()[0].segment, Some(1));
    }

    #[test]
    fn segments_split_across_packets_wait_for_the_rest() {
        let mut x = Exchange::new(Preferences::default())
            .with_tree(Tree::default().panic_on_undissected());
        x.deliver(Sender::Initiator, &contact_v4(0x00));
        let segment = xfer_segment(SEG_START | SEG_END, 9, None, &[0x77; 32]);
        let (first, second) = segment.split_at(11);
        x.deliver(Sender::Initiator, first);
        assert_eq!(x.conversation.records(&Sender::Initiator).len(), 1);
        x.deliver(Sender::Initiator, second);
        assert_eq!(x.conversation.records(&Sender::Initiator).len(), 2);
        assert_eq!(x.payloads.completed.len(), 1);
    }

    #[test]
    fn open_transfers_are_reported_at_the_end() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &contact_v4(0x00));
        x.deliver(Sender::Initiator, &xfer_segment(SEG_START, 2, None, b"abc"));
        x.finish();
        assert!(x.conversation.diagnostics().iter().any(|d| match d.kind {
            DiagnosticKind::TransferPending { id: 2, seen: 3 } => true,
            _ => false,
        }));
    }

    #[test]
    fn termination_and_refusal_are_classified() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &contact_v4(0x00));
        x.deliver(Sender::Responder, &contact_v4(0x00));
        x.deliver(Sender::Initiator, &xfer_refuse(0x01, 9));
        x.deliver(Sender::Initiator, &sess_term(0x00, 0x03));
        let peer = x.conversation.peer(&Sender::Initiator).unwrap();
        assert!(peer.term_location.is_some());
        assert_eq!(x.conversation.records(&Sender::Initiator).len(), 3);
    }

    #[test]
    fn legacy_keepalive_and_shutdown() {
        let mut x = Exchange::new(Preferences::default());
        x.deliver(Sender::Initiator, &contact_v3(0x00, 0, b"dtn://a"));
        x.deliver(Sender::Initiator, &keepalive_v3());
        x.deliver(Sender::Initiator, &shutdown_v3());
        let peer = x.conversation.peer(&Sender::Initiator).unwrap();
        assert!(peer.term_location.is_some());
        assert_eq!(x.conversation.records(&Sender::Initiator).len(), 3);
    }

    #[test]
    fn junk_never_panics() {
        simulate(&prefs(RecoveryMode::V3First), &[0x00; 64]);
        simulate(&prefs(RecoveryMode::V4First), b"dtn!dtn!dtn!dtn!dtn!");
        simulate(&Preferences::default(), &[0xff; 200]);
        let mut mixed = contact_v4(0x01).to_vec();
        mixed.extend_from_slice(&[0x16, 0x03, 0x03]);
        mixed.extend_from_slice(&xfer_segment(SEG_START, 1, Some(4), b"abcd"));
        simulate(&prefs(RecoveryMode::V4First), &mixed);
    }
}
