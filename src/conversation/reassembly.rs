// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::collections::BTreeMap;
use crate::diagnostic::DiagnosticKind;
use super::addresses::Sender;
use super::message::MAX_FRAMED_PAYLOAD;

struct Fragments {
    data: Vec<u8>,
    truncated: bool,
}

/// Accumulates transfer payload per direction and transfer id.
/// Fragments arrive in classification order, which is already
/// transfer order within one direction.
pub struct Reassembly {
    pending: BTreeMap<(Sender, u64), Fragments>,
}

impl Reassembly {
    pub fn new() -> Self {
        Reassembly {
            pending: BTreeMap::new(),
        }
    }

    /// Append one fragment. Returns the whole payload exactly once,
    /// on the fragment marked final; `None` until then. `limit` bounds
    /// buffer growth, a fragment pushing past it is cut and diagnosed.
    pub fn add_fragment(
        &mut self,
        sender: Sender,
        transfer_id: u64,
        is_final: bool,
        bytes: &[u8],
        limit: Option<u64>,
    ) -> (Option<Vec<u8>>, Option<DiagnosticKind>) {
        let limit = limit
            .map(|l| usize::min(l as usize, MAX_FRAMED_PAYLOAD))
            .unwrap_or(MAX_FRAMED_PAYLOAD);
        let entry = self
            .pending
            .entry((sender, transfer_id))
            .or_insert_with(|| Fragments {
                data: Vec::new(),
                truncated: false,
            });
        let mut diagnostic = None;
        let room = limit.saturating_sub(entry.data.len());
        if bytes.len() > room {
            entry.data.extend_from_slice(&bytes[..room]);
            if !entry.truncated {
                entry.truncated = true;
                diagnostic = Some(DiagnosticKind::ReassemblyTruncated {
                    id: transfer_id,
                    limit: limit as u64,
                });
            }
        } else {
            entry.data.extend_from_slice(bytes);
        }
        if is_final {
            let done = self.pending.remove(&(sender, transfer_id)).unwrap();
            (Some(done.data), diagnostic)
        } else {
            (None, diagnostic)
        }
    }

    /// View of a transfer that is still accumulating.
    pub fn pending(&self, sender: Sender, transfer_id: u64) -> Option<&[u8]> {
        self.pending
            .get(&(sender, transfer_id))
            .map(|f| f.data.as_ref())
    }

    /// Transfers never finished by the end of the capture.
    pub fn unfinished(&self) -> impl Iterator<Item = (Sender, u64, usize)> + '_ {
        self.pending
            .iter()
            .map(|(&(sender, id), f)| (sender, id, f.data.len()))
    }
}

#[cfg(test)]
mod tests {
    use crate::diagnostic::DiagnosticKind;
    use super::super::addresses::Sender;
    use super::Reassembly;

    #[test]
    fn payload_comes_out_once_on_the_final_fragment() {
        let mut r = Reassembly::new();
        let pieces: &[&[u8]] = &[b"abc", b"defg", b"hij"];
        for (i, piece) in pieces.iter().enumerate() {
            let is_final = i == pieces.len() - 1;
            let (done, diag) =
                r.add_fragment(Sender::Initiator, 7, is_final, *piece, None);
            assert!(diag.is_none());
            if is_final {
                assert_eq!(done.unwrap(), b"abcdefghij");
            } else {
                assert_eq!(done, None);
                assert_eq!(r.pending(Sender::Initiator, 7).unwrap().len(), (i + 1) * 3 + i);
            }
        }
        assert_eq!(r.pending(Sender::Initiator, 7), None);
    }

    #[test]
    fn directions_do_not_share_buffers() {
        let mut r = Reassembly::new();
        r.add_fragment(Sender::Initiator, 1, false, b"aa", None);
        r.add_fragment(Sender::Responder, 1, false, b"bb", None);
        assert_eq!(r.pending(Sender::Initiator, 1), Some(b"aa".as_ref()));
        assert_eq!(r.pending(Sender::Responder, 1), Some(b"bb".as_ref()));
    }

    #[test]
    fn growth_is_bounded_by_the_declared_limit() {
        let mut r = Reassembly::new();
        let (_, diag) = r.add_fragment(Sender::Initiator, 1, false, &[0u8; 8], Some(5));
        assert_eq!(
            diag,
            Some(DiagnosticKind::ReassemblyTruncated { id: 1, limit: 5 }),
        );
        // only diagnosed once
        let (done, diag) = r.add_fragment(Sender::Initiator, 1, true, &[0u8; 8], Some(5));
        assert!(diag.is_none());
        assert_eq!(done.unwrap().len(), 5);
    }
}
