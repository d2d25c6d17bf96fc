// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::time::Duration;
use crate::diagnostic::{Diagnostic, DiagnosticKind, Severity};
use super::location::FrameLocation;
use super::message::{SEG_END, SEG_START};

/// Bookkeeping for one observed segment. Back-references are indices
/// into the append-only record lists, never owning pointers.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct SegmentRecord {
    pub location: FrameLocation,
    pub time: Duration,
    pub flags: u8,
    /// Bytes seen through and including this segment.
    pub seen_length: u64,
    /// Index of the start-flagged record, when one exists.
    pub start: Option<usize>,
    /// Index of the correlated record in the counterpart's ack list.
    pub ack: Option<usize>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct AckRecord {
    pub location: FrameLocation,
    pub time: Duration,
    /// The legacy generation has no ack flags.
    pub flags: Option<u8>,
    /// Bytes acknowledged through this ack.
    pub acked_length: u64,
    pub start: Option<usize>,
    /// Index of the acknowledged record in the counterpart's segment list.
    pub segment: Option<usize>,
}

/// One data transfer, identified by a 64-bit id scoped to the peer
/// that owns this record. Segment bookkeeping lives with the side
/// sending the data, ack bookkeeping with the side sending the acks,
/// tied together by the shared id.
pub struct Transfer {
    id: u64,
    segments: Vec<SegmentRecord>,
    acks: Vec<AckRecord>,
    total_length: Option<u64>,
}

impl Transfer {
    pub fn new(id: u64) -> Self {
        Transfer {
            id,
            segments: Vec::new(),
            acks: Vec::new(),
            total_length: None,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn segments(&self) -> &[SegmentRecord] {
        self.segments.as_ref()
    }

    pub fn acks(&self) -> &[AckRecord] {
        self.acks.as_ref()
    }

    pub fn total_length(&self) -> Option<u64> {
        self.total_length
    }

    /// Install a declared total that arrived before any segment,
    /// nothing to cross-check yet.
    pub fn set_pending_total(&mut self, total: u64) {
        self.total_length = Some(total);
    }

    pub fn seen_length(&self) -> u64 {
        self.segments.last().map(|s| s.seen_length).unwrap_or(0)
    }

    pub fn finished(&self) -> bool {
        self.segments.last().map(|s| s.flags & SEG_END != 0).unwrap_or(false)
    }

    /// Record a declared total length, diagnosing a disagreement with
    /// an earlier declaration or with the bytes already seen.
    pub fn declare_total(&mut self, total: u64, location: &FrameLocation) -> Vec<Diagnostic> {
        let mut diagnostics = Vec::new();
        match self.total_length {
            Some(first) if first != total => {
                diagnostics.push(Diagnostic::new(
                    location.clone(),
                    Severity::Warning,
                    DiagnosticKind::TotalRedeclared {
                        first,
                        second: total,
                    },
                ));
            },
            Some(_) => (),
            None => self.total_length = Some(total),
        }
        let seen = self.seen_length();
        if let Some(total) = self.total_length {
            if seen > total {
                diagnostics.push(Diagnostic::new(
                    location.clone(),
                    Severity::Warning,
                    DiagnosticKind::LengthExceedsTotal { seen, total },
                ));
            }
        }
        diagnostics
    }

    /// Append a segment record, idempotent by location: revisiting the
    /// same location hands back the record made the first time.
    pub fn record_segment(
        &mut self,
        flags: u8,
        data_len: u64,
        location: &FrameLocation,
        time: Duration,
    ) -> (usize, Vec<Diagnostic>) {
        if let Some(i) = self.segments.iter().position(|s| &s.location == location) {
            return (i, Vec::new());
        }
        let mut diagnostics = Vec::new();
        let diag = |severity, kind| Diagnostic::new(location.clone(), severity, kind);

        let first = self.segments.is_empty();
        if flags & SEG_START != 0 {
            if !first {
                diagnostics.push(diag(Severity::Warning, DiagnosticKind::DuplicateStartFlag));
            }
        } else if first {
            diagnostics.push(diag(Severity::Warning, DiagnosticKind::MissingStartFlag));
        }
        if let Some(last) = self.segments.last() {
            if last.flags & SEG_END != 0 {
                diagnostics.push(diag(Severity::Warning, DiagnosticKind::SegmentAfterEnd));
            }
        }

        let seen_length = self.seen_length() + data_len;
        if let Some(total) = self.total_length {
            if seen_length > total {
                diagnostics.push(diag(
                    Severity::Warning,
                    DiagnosticKind::LengthExceedsTotal {
                        seen: seen_length,
                        total,
                    },
                ));
            }
            if flags & SEG_END != 0 && seen_length != total {
                diagnostics.push(diag(
                    Severity::Warning,
                    DiagnosticKind::TotalMismatch {
                        seen: seen_length,
                        total,
                    },
                ));
            }
        }

        self.segments.push(SegmentRecord {
            location: location.clone(),
            time,
            flags,
            seen_length,
            start: None,
            ack: None,
        });
        let start = if self.segments[0].flags & SEG_START != 0 {
            Some(0)
        } else {
            None
        };
        let index = self.segments.len() - 1;
        self.segments[index].start = start;
        (index, diagnostics)
    }

    /// Append an ack record, idempotent by location like
    /// `record_segment`.
    pub fn record_ack(
        &mut self,
        flags: Option<u8>,
        acked_length: u64,
        location: &FrameLocation,
        time: Duration,
    ) -> (usize, Vec<Diagnostic>) {
        if let Some(i) = self.acks.iter().position(|a| &a.location == location) {
            return (i, Vec::new());
        }
        self.acks.push(AckRecord {
            location: location.clone(),
            time,
            flags,
            acked_length,
            start: None,
            segment: None,
        });
        (self.acks.len() - 1, Vec::new())
    }
}

/// A segment was just recorded on the sending side, look for its ack
/// among the counterpart's records. Observation order is not fixed, an
/// ack may well be on file before its segment.
pub fn correlate_segment(
    segment_side: &mut Transfer,
    ack_side: &mut Transfer,
    segment_index: usize,
) -> Vec<Diagnostic> {
    let seen = segment_side.segments[segment_index].seen_length;
    let found = ack_side.acks.iter().position(|a| a.acked_length == seen);
    link(segment_side, ack_side, segment_index, found)
}

/// The mirror image: an ack was just recorded, look for its segment.
pub fn correlate_ack(
    ack_side: &mut Transfer,
    segment_side: &mut Transfer,
    ack_index: usize,
) -> Vec<Diagnostic> {
    let acked = ack_side.acks[ack_index].acked_length;
    let found = segment_side
        .segments
        .iter()
        .position(|s| s.seen_length == acked);
    match found {
        Some(segment_index) => link(segment_side, ack_side, segment_index, Some(ack_index)),
        None => {
            let location = ack_side.acks[ack_index].location.clone();
            vec![Diagnostic::new(
                location,
                Severity::Note,
                DiagnosticKind::NoCounterpart,
            )]
        },
    }
}

fn link(
    segment_side: &mut Transfer,
    ack_side: &mut Transfer,
    segment_index: usize,
    ack_index: Option<usize>,
) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    match ack_index {
        Some(ack_index) => {
            segment_side.segments[segment_index].ack = Some(ack_index);
            ack_side.acks[ack_index].segment = Some(segment_index);
            let start = segment_side.segments[segment_index].start;
            ack_side.acks[ack_index].start = start;
            let segment_flags = segment_side.segments[segment_index].flags;
            if let Some(ack_flags) = ack_side.acks[ack_index].flags {
                if ack_flags != segment_flags {
                    diagnostics.push(Diagnostic::new(
                        ack_side.acks[ack_index].location.clone(),
                        Severity::Warning,
                        DiagnosticKind::AckFlagMismatch {
                            segment: segment_flags,
                            ack: ack_flags,
                        },
                    ));
                }
            }
        },
        None => {
            diagnostics.push(Diagnostic::new(
                segment_side.segments[segment_index].location.clone(),
                Severity::Note,
                DiagnosticKind::NoCounterpart,
            ));
        },
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use std::time::Duration;
    use crate::diagnostic::DiagnosticKind;
    use super::super::location::FrameLocation;
    use super::super::message::{SEG_END, SEG_START};
    use super::{correlate_ack, correlate_segment, Transfer};

    fn loc(index: u64) -> FrameLocation {
        FrameLocation::stream(index, 0)
    }

    fn t0() -> Duration {
        Duration::from_secs(0)
    }

    #[test]
    fn seen_length_accumulates() {
        let mut t = Transfer::new(0);
        t.record_segment(SEG_START, 10, &loc(0), t0());
        t.record_segment(0, 15, &loc(1), t0());
        let (_, diags) = t.record_segment(SEG_END, 5, &loc(2), t0());
        assert!(diags.is_empty());
        assert_eq!(
            t.segments().iter().map(|s| s.seen_length).collect::<Vec<_>>(),
            vec![10, 25, 30],
        );
        assert!(t.finished());
    }

    #[test]
    fn recording_is_idempotent_by_location() {
        let mut t = Transfer::new(0);
        let (first, _) = t.record_segment(SEG_START, 10, &loc(0), t0());
        let (second, diags) = t.record_segment(SEG_START, 10, &loc(0), t0());
        assert_eq!(first, second);
        assert!(diags.is_empty());
        assert_eq!(t.segments().len(), 1);
    }

    #[test]
    fn start_flag_violations_are_diagnosed() {
        let mut t = Transfer::new(0);
        let (_, diags) = t.record_segment(0, 10, &loc(0), t0());
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::MissingStartFlag));
        let (_, diags) = t.record_segment(SEG_START, 10, &loc(1), t0());
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::DuplicateStartFlag));
    }

    #[test]
    fn bytes_after_the_end_flag_are_diagnosed() {
        let mut t = Transfer::new(0);
        t.record_segment(SEG_START | SEG_END, 10, &loc(0), t0());
        let (_, diags) = t.record_segment(0, 1, &loc(1), t0());
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::SegmentAfterEnd));
    }

    #[test]
    fn declared_total_is_checked_both_ways() {
        let mut t = Transfer::new(0);
        t.record_segment(SEG_START, 10, &loc(0), t0());
        assert!(t.declare_total(12, &loc(0)).is_empty());
        let (_, diags) = t.record_segment(SEG_END, 10, &loc(1), t0());
        assert!(diags.iter().any(|d| match d.kind {
            DiagnosticKind::LengthExceedsTotal { seen: 20, total: 12 } => true,
            _ => false,
        }));
        assert!(diags.iter().any(|d| match d.kind {
            DiagnosticKind::TotalMismatch { seen: 20, total: 12 } => true,
            _ => false,
        }));
    }

    #[test]
    fn ack_matches_segment_by_cumulative_length() {
        let mut sent = Transfer::new(3);
        let mut received = Transfer::new(3);
        sent.record_segment(SEG_START, 10, &loc(0), t0());
        let (i, _) = sent.record_segment(SEG_END, 10, &loc(1), t0());

        let (a, _) = received.record_ack(Some(SEG_END), 20, &loc(2), t0());
        let diags = correlate_ack(&mut received, &mut sent, a);
        assert!(diags.is_empty());
        assert_eq!(received.acks()[a].segment, Some(i));
        assert_eq!(sent.segments()[i].ack, Some(a));
    }

    #[test]
    fn mirrored_flags_are_enforced_for_the_successor_generation() {
        let mut sent = Transfer::new(3);
        let mut received = Transfer::new(3);
        sent.record_segment(SEG_START | SEG_END, 10, &loc(0), t0());
        let (a, _) = received.record_ack(Some(SEG_START), 10, &loc(1), t0());
        let diags = correlate_ack(&mut received, &mut sent, a);
        assert!(diags.iter().any(|d| match d.kind {
            DiagnosticKind::AckFlagMismatch { .. } => true,
            _ => false,
        }));
    }

    #[test]
    fn uncorrelated_records_are_noted_not_rejected() {
        let mut sent = Transfer::new(3);
        let mut received = Transfer::new(3);
        let (i, _) = sent.record_segment(SEG_START, 10, &loc(0), t0());
        let diags = correlate_segment(&mut sent, &mut received, i);
        assert!(diags.iter().any(|d| d.kind == DiagnosticKind::NoCounterpart));

        // the ack arrives later and the link completes
        let (a, _) = received.record_ack(None, 10, &loc(1), t0());
        let diags = correlate_ack(&mut received, &mut sent, a);
        assert!(diags.is_empty());
        assert_eq!(sent.segments()[i].ack, Some(a));
    }
}
