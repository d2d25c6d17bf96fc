// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use failure::Fail;
use std::fmt;
use crate::conversation::FrameLocation;

/// How bad a finding is. Nothing here ever stops dissection,
/// the severity only drives presentation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    Note,
    Warning,
    Error,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            &Severity::Note => write!(f, "note"),
            &Severity::Warning => write!(f, "warning"),
            &Severity::Error => write!(f, "error"),
        }
    }
}

#[derive(Debug, Clone, Fail, Eq, PartialEq)]
pub enum DiagnosticKind {
    #[fail(display = "first segment of the transfer does not carry the start flag")]
    MissingStartFlag,
    #[fail(display = "start flag repeated inside an open transfer")]
    DuplicateStartFlag,
    #[fail(display = "segment observed after the end flag")]
    SegmentAfterEnd,
    #[fail(display = "seen length {} exceeds the declared total {}", seen, total)]
    LengthExceedsTotal { seen: u64, total: u64 },
    #[fail(display = "final seen length {} differs from the declared total {}", seen, total)]
    TotalMismatch { seen: u64, total: u64 },
    #[fail(display = "declared totals disagree: {} then {}", first, second)]
    TotalRedeclared { first: u64, second: u64 },
    #[fail(display = "acknowledgement flags 0x{:02x} do not mirror segment flags 0x{:02x}", ack, segment)]
    AckFlagMismatch { segment: u8, ack: u8 },
    #[fail(display = "no correlated counterpart observed yet")]
    NoCounterpart,
    #[fail(display = "acknowledgement without a known transfer")]
    AckWithoutTransfer,
    #[fail(display = "declared length {} clamped to {}", declared, clamped)]
    DeclaredLengthClamped { declared: u64, clamped: u64 },
    #[fail(display = "extension block overruns its declared length")]
    ExtensionOverrun,
    #[fail(display = "unknown critical extension item 0x{:04x}", item_type)]
    UnknownCriticalExtension { item_type: u16 },
    #[fail(display = "peer versions disagree: {} seen first, then {}", first, observed)]
    VersionMismatch { first: u8, observed: u8 },
    #[fail(display = "repeated contact exchange differs from the first")]
    ContactMismatch,
    #[fail(display = "contact header appeared although the version was already inferred")]
    ContactAfterInference,
    #[fail(display = "repeated session-init, first negotiated values win")]
    SessionReinit,
    #[fail(display = "byte range not recognized as a protocol message")]
    Undecoded,
    #[fail(display = "transfer {} still open at end of capture, {} bytes seen", id, seen)]
    TransferPending { id: u64, seen: u64 },
    #[fail(display = "reassembly buffer for transfer {} truncated at {} bytes", id, limit)]
    ReassemblyTruncated { id: u64, limit: u64 },
}

/// One finding, pinned to the message it belongs to. Findings are
/// surfaced alongside the decoded message, never instead of it.
#[derive(Debug, Clone, Fail, Eq, PartialEq)]
pub struct Diagnostic {
    pub location: FrameLocation,
    pub severity: Severity,
    pub kind: DiagnosticKind,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} (message #{})",
            self.severity, self.kind, self.location.message_index
        )
    }
}

impl Diagnostic {
    pub fn new(location: FrameLocation, severity: Severity, kind: DiagnosticKind) -> Self {
        Diagnostic {
            location,
            severity,
            kind,
        }
    }
}
