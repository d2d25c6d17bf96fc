// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use super::location::FrameLocation;
use super::peer::Peer;

/// Conversation-wide results of the two negotiation rounds. Values
/// settle once both sides have been observed and never change after
/// that, later disagreements are diagnosed and ignored.
pub struct Negotiated {
    pub version: Option<u8>,
    pub can_tls: Option<bool>,
    pub tls_start: Option<FrameLocation>,
    pub keepalive: Option<u16>,
}

impl Negotiated {
    pub fn new() -> Self {
        Negotiated {
            version: None,
            can_tls: None,
            tls_start: None,
            keepalive: None,
        }
    }

    /// First seen version wins for the whole conversation.
    pub fn observe_version(&mut self, version: u8, location: &FrameLocation) -> Option<Diagnostic> {
        match self.version {
            None => {
                self.version = Some(version);
                None
            },
            Some(first) if first != version => Some(Diagnostic::new(
                location.clone(),
                Severity::Warning,
                DiagnosticKind::VersionMismatch {
                    first,
                    observed: version,
                },
            )),
            Some(_) => None,
        }
    }

    /// Contact-level round: both contact exchanges on file, the
    /// security upgrade happens only when both sides offered it.
    /// Returns true the one time the upgrade point is set.
    pub fn contact_level(
        &mut self,
        initiator: &Peer,
        responder: &Peer,
        location: &FrameLocation,
    ) -> bool {
        if self.can_tls.is_some() {
            return false;
        }
        if initiator.contact_location.is_none() || responder.contact_location.is_none() {
            return false;
        }
        let agreed = initiator.can_tls && responder.can_tls;
        self.can_tls = Some(agreed);
        if agreed {
            self.tls_start = Some(location.clone());
            true
        } else {
            false
        }
    }

    /// Session-level round: the agreed keepalive is the numeric
    /// minimum of the two advertised intervals, zero taken literally.
    pub fn session_level(&mut self, initiator: &Peer, responder: &Peer) {
        if self.keepalive.is_some() {
            return;
        }
        if let (Some(a), Some(b)) = (initiator.keepalive, responder.keepalive) {
            self.keepalive = Some(u16::min(a, b));
        }
    }
}
