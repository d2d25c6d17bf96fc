// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use bytes::Buf;
use failure::Fail;
use std::task::Poll;
use crate::diagnostic::DiagnosticKind;
use crate::sdnv;

/// Shared by both generations, first bytes of every contact exchange.
pub const MAGIC: [u8; 4] = *b"dtn!";

/// Segment flags, same bit assignment in both generations.
pub const SEG_END: u8 = 0x01;
pub const SEG_START: u8 = 0x02;

/// Contact flags of the successor generation.
pub const CONTACT_CAN_TLS: u8 = 0x01;

/// A declared length larger than this is clamped before framing.
pub const MAX_FRAMED_PAYLOAD: usize = 0x0400_0000;

pub const EXT_TRANSFER_LENGTH: u16 = 0x0001;
pub const EXT_CRITICAL: u8 = 0x01;

// legacy message types, high nibble of the first byte
const V3_DATA_SEGMENT: u8 = 0x1;
const V3_ACK_SEGMENT: u8 = 0x2;
const V3_REFUSE_BUNDLE: u8 = 0x3;
const V3_KEEPALIVE: u8 = 0x4;
const V3_SHUTDOWN: u8 = 0x5;
const V3_LENGTH: u8 = 0x6;

// legacy shutdown flags
const V3_SHUTDOWN_HAS_REASON: u8 = 0x02;
const V3_SHUTDOWN_HAS_DELAY: u8 = 0x01;

// successor message types, the whole first byte
const V4_XFER_SEGMENT: u8 = 0x01;
const V4_XFER_ACK: u8 = 0x02;
const V4_XFER_REFUSE: u8 = 0x03;
const V4_KEEPALIVE: u8 = 0x04;
const V4_SESS_TERM: u8 = 0x05;
const V4_MSG_REJECT: u8 = 0x06;
const V4_SESS_INIT: u8 = 0x07;

#[derive(Debug, Fail, Eq, PartialEq)]
pub enum FramingError {
    #[fail(display = "unknown message type 0x{:02x}", _0)]
    UnknownType(u8),
    #[fail(display = "reserved flag bits set in 0x{:02x}", _0)]
    ReservedFlagBits(u8),
    #[fail(display = "contact exchange advertises unsupported version {}", _0)]
    UnsupportedVersion(u8),
    #[fail(display = "length field is not a valid variable-length integer")]
    BadLength,
    #[fail(display = "not recognized as either protocol generation")]
    Unrecognized,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContactHeaderV3 {
    pub flags: u8,
    pub keepalive: u16,
    pub eid: Vec<u8>,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ContactHeaderV4 {
    pub flags: u8,
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum ContactHeader {
    V3(ContactHeaderV3),
    V4(ContactHeaderV4),
}

impl ContactHeader {
    pub fn version(&self) -> u8 {
        match self {
            &ContactHeader::V3(_) => 3,
            &ContactHeader::V4(_) => 4,
        }
    }

    pub fn can_tls(&self) -> bool {
        match self {
            &ContactHeader::V3(_) => false,
            &ContactHeader::V4(ref h) => h.flags & CONTACT_CAN_TLS != 0,
        }
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ExtensionItem {
    pub flags: u8,
    pub item_type: u16,
    pub value: Vec<u8>,
}

impl ExtensionItem {
    /// The one item type this engine interprets itself: the
    /// out-of-band declared total length of a transfer.
    pub fn transfer_length(&self) -> Option<u64> {
        if self.item_type == EXT_TRANSFER_LENGTH && self.value.len() == 8 {
            Some((&self.value[..]).get_u64())
        } else {
            None
        }
    }
}

/// Payload bytes stay in the direction buffer, messages carry
/// the payload geometry instead of a copy.
#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MessageV3 {
    DataSegment {
        flags: u8,
        length: u64,
        data_offset: usize,
        data_len: usize,
    },
    AckSegment {
        length: u64,
    },
    RefuseBundle {
        reason: u8,
    },
    Keepalive,
    Shutdown {
        reason: Option<u8>,
        reconnect_delay: Option<u64>,
    },
    Length {
        total: u64,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum MessageV4 {
    SessInit {
        keepalive: u16,
        segment_mru: u64,
        transfer_mru: u64,
        node_id: Vec<u8>,
        extensions: Vec<ExtensionItem>,
    },
    SessTerm {
        flags: u8,
        reason: u8,
    },
    XferSegment {
        flags: u8,
        transfer_id: u64,
        extensions: Vec<ExtensionItem>,
        length: u64,
        data_offset: usize,
        data_len: usize,
    },
    XferAck {
        flags: u8,
        transfer_id: u64,
        length: u64,
    },
    XferRefuse {
        reason: u8,
        transfer_id: u64,
    },
    Keepalive,
    MsgReject {
        reason: u8,
        rejected: u8,
    },
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub enum Message {
    Contact(ContactHeader),
    V3(MessageV3),
    V4(MessageV4),
    /// Opaque pass-through found by a recovery check, the security
    /// collaborator owns these bytes.
    SecurityRecord {
        length: usize,
    },
}

/// One successfully framed message: what it is, how many bytes it
/// occupies, whether it was recognized by a recovery check rather
/// than a contact exchange, and any findings raised while framing.
#[derive(Debug, Eq, PartialEq)]
pub struct Framed {
    pub message: Message,
    pub consumed: usize,
    pub recovered: Option<u8>,
    pub notes: Vec<DiagnosticKind>,
}

impl Framed {
    fn plain(message: Message, consumed: usize) -> Self {
        Framed {
            message,
            consumed,
            recovered: None,
            notes: Vec::new(),
        }
    }
}

fn clamp_length(declared: u64, notes: &mut Vec<DiagnosticKind>) -> usize {
    if declared > MAX_FRAMED_PAYLOAD as u64 {
        notes.push(DiagnosticKind::DeclaredLengthClamped {
            declared,
            clamped: MAX_FRAMED_PAYLOAD as u64,
        });
        MAX_FRAMED_PAYLOAD
    } else {
        declared as usize
    }
}

fn decode_sdnv(buf: &[u8]) -> Poll<Result<(u64, usize), FramingError>> {
    match sdnv::decode(buf) {
        Poll::Pending => Poll::Pending,
        Poll::Ready(Ok(pair)) => Poll::Ready(Ok(pair)),
        Poll::Ready(Err(_)) => Poll::Ready(Err(FramingError::BadLength)),
    }
}

/// Parse the contact exchange of either generation. The caller has
/// already seen the magic prefix.
pub fn parse_contact(buf: &[u8]) -> Poll<Result<Framed, FramingError>> {
    if buf.len() < MAGIC.len() + 1 {
        return Poll::Pending;
    }
    match buf[4] {
        3 => {
            // magic, version, flags, keepalive interval, then the
            // variable-length endpoint identifier
            if buf.len() < 8 {
                return Poll::Pending;
            }
            let flags = buf[5];
            let keepalive = (&buf[6..8]).get_u16();
            let (eid_len, n) = match decode_sdnv(&buf[8..]) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Ready(Ok(pair)) => pair,
            };
            let mut notes = Vec::new();
            let eid_len = clamp_length(eid_len, &mut notes);
            let consumed = 8 + n + eid_len;
            if buf.len() < consumed {
                return Poll::Pending;
            }
            let eid = buf[(8 + n)..consumed].to_vec();
            Poll::Ready(Ok(Framed {
                message: Message::Contact(ContactHeader::V3(ContactHeaderV3 {
                    flags,
                    keepalive,
                    eid,
                })),
                consumed,
                recovered: None,
                notes,
            }))
        },
        4 => {
            if buf.len() < 6 {
                return Poll::Pending;
            }
            let header = ContactHeaderV4 { flags: buf[5] };
            Poll::Ready(Ok(Framed::plain(
                Message::Contact(ContactHeader::V4(header)),
                6,
            )))
        },
        v => Poll::Ready(Err(FramingError::UnsupportedVersion(v))),
    }
}

/// Legacy generation framing rule. One type+flags byte selects the
/// message, lengths are variable-length integers.
pub fn parse_v3(buf: &[u8]) -> Poll<Result<Framed, FramingError>> {
    if buf.is_empty() {
        return Poll::Pending;
    }
    let head = buf[0];
    let flags = head & 0x0f;
    match head >> 4 {
        V3_DATA_SEGMENT => {
            if flags & !(SEG_START | SEG_END) != 0 {
                return Poll::Ready(Err(FramingError::ReservedFlagBits(head)));
            }
            let (length, n) = match decode_sdnv(&buf[1..]) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Ready(Ok(pair)) => pair,
            };
            let mut notes = Vec::new();
            let data_len = clamp_length(length, &mut notes);
            let consumed = 1 + n + data_len;
            if buf.len() < consumed {
                return Poll::Pending;
            }
            Poll::Ready(Ok(Framed {
                message: Message::V3(MessageV3::DataSegment {
                    flags,
                    length,
                    data_offset: 1 + n,
                    data_len,
                }),
                consumed,
                recovered: None,
                notes,
            }))
        },
        V3_ACK_SEGMENT => {
            if flags != 0 {
                return Poll::Ready(Err(FramingError::ReservedFlagBits(head)));
            }
            let (length, n) = match decode_sdnv(&buf[1..]) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Ready(Ok(pair)) => pair,
            };
            Poll::Ready(Ok(Framed::plain(
                Message::V3(MessageV3::AckSegment { length }),
                1 + n,
            )))
        },
        V3_REFUSE_BUNDLE => Poll::Ready(Ok(Framed::plain(
            Message::V3(MessageV3::RefuseBundle { reason: flags }),
            1,
        ))),
        V3_KEEPALIVE => {
            if flags != 0 {
                return Poll::Ready(Err(FramingError::ReservedFlagBits(head)));
            }
            Poll::Ready(Ok(Framed::plain(Message::V3(MessageV3::Keepalive), 1)))
        },
        V3_SHUTDOWN => {
            if flags & !(V3_SHUTDOWN_HAS_REASON | V3_SHUTDOWN_HAS_DELAY) != 0 {
                return Poll::Ready(Err(FramingError::ReservedFlagBits(head)));
            }
            let mut pos = 1;
            let reason = if flags & V3_SHUTDOWN_HAS_REASON != 0 {
                if buf.len() < pos + 1 {
                    return Poll::Pending;
                }
                pos += 1;
                Some(buf[pos - 1])
            } else {
                None
            };
            let reconnect_delay = if flags & V3_SHUTDOWN_HAS_DELAY != 0 {
                let (delay, n) = match decode_sdnv(&buf[pos..]) {
                    Poll::Pending => return Poll::Pending,
                    Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                    Poll::Ready(Ok(pair)) => pair,
                };
                pos += n;
                Some(delay)
            } else {
                None
            };
            Poll::Ready(Ok(Framed::plain(
                Message::V3(MessageV3::Shutdown {
                    reason,
                    reconnect_delay,
                }),
                pos,
            )))
        },
        V3_LENGTH => {
            if flags != 0 {
                return Poll::Ready(Err(FramingError::ReservedFlagBits(head)));
            }
            let (total, n) = match decode_sdnv(&buf[1..]) {
                Poll::Pending => return Poll::Pending,
                Poll::Ready(Err(e)) => return Poll::Ready(Err(e)),
                Poll::Ready(Ok(pair)) => pair,
            };
            Poll::Ready(Ok(Framed::plain(
                Message::V3(MessageV3::Length { total }),
                1 + n,
            )))
        },
        _ => Poll::Ready(Err(FramingError::UnknownType(head))),
    }
}

fn parse_extensions(
    block: &[u8],
    extensions: &mut Vec<ExtensionItem>,
    notes: &mut Vec<DiagnosticKind>,
) {
    let mut pos = 0;
    while pos < block.len() {
        if pos + 5 > block.len() {
            notes.push(DiagnosticKind::ExtensionOverrun);
            return;
        }
        let flags = block[pos];
        let item_type = (&block[(pos + 1)..(pos + 3)]).get_u16();
        let len = (&block[(pos + 3)..(pos + 5)]).get_u16() as usize;
        pos += 5;
        if pos + len > block.len() {
            notes.push(DiagnosticKind::ExtensionOverrun);
            return;
        }
        extensions.push(ExtensionItem {
            flags,
            item_type,
            value: block[pos..(pos + len)].to_vec(),
        });
        pos += len;
    }
}

/// Successor generation framing rule. One type byte, fixed-width
/// big-endian lengths, optional extension block on session-init and
/// on the starting segment of a transfer.
pub fn parse_v4(buf: &[u8]) -> Poll<Result<Framed, FramingError>> {
    if buf.is_empty() {
        return Poll::Pending;
    }
    match buf[0] {
        V4_XFER_SEGMENT => {
            if buf.len() < 10 {
                return Poll::Pending;
            }
            let flags = buf[1];
            if flags & !(SEG_START | SEG_END) != 0 {
                return Poll::Ready(Err(FramingError::ReservedFlagBits(flags)));
            }
            let transfer_id = (&buf[2..10]).get_u64();
            let mut pos = 10;
            let mut notes = Vec::new();
            let mut extensions = Vec::new();
            if flags & SEG_START != 0 {
                if buf.len() < pos + 4 {
                    return Poll::Pending;
                }
                let ext_len = clamp_length(
                    u64::from((&buf[pos..(pos + 4)]).get_u32()),
                    &mut notes,
                );
                pos += 4;
                if buf.len() < pos + ext_len {
                    return Poll::Pending;
                }
                parse_extensions(&buf[pos..(pos + ext_len)], &mut extensions, &mut notes);
                pos += ext_len;
            }
            if buf.len() < pos + 8 {
                return Poll::Pending;
            }
            let length = (&buf[pos..(pos + 8)]).get_u64();
            let data_len = clamp_length(length, &mut notes);
            let data_offset = pos + 8;
            let consumed = data_offset + data_len;
            if buf.len() < consumed {
                return Poll::Pending;
            }
            Poll::Ready(Ok(Framed {
                message: Message::V4(MessageV4::XferSegment {
                    flags,
                    transfer_id,
                    extensions,
                    length,
                    data_offset,
                    data_len,
                }),
                consumed,
                recovered: None,
                notes,
            }))
        },
        V4_XFER_ACK => {
            if buf.len() < 18 {
                return Poll::Pending;
            }
            let flags = buf[1];
            if flags & !(SEG_START | SEG_END) != 0 {
                return Poll::Ready(Err(FramingError::ReservedFlagBits(flags)));
            }
            Poll::Ready(Ok(Framed::plain(
                Message::V4(MessageV4::XferAck {
                    flags,
                    transfer_id: (&buf[2..10]).get_u64(),
                    length: (&buf[10..18]).get_u64(),
                }),
                18,
            )))
        },
        V4_XFER_REFUSE => {
            if buf.len() < 10 {
                return Poll::Pending;
            }
            Poll::Ready(Ok(Framed::plain(
                Message::V4(MessageV4::XferRefuse {
                    reason: buf[1],
                    transfer_id: (&buf[2..10]).get_u64(),
                }),
                10,
            )))
        },
        V4_KEEPALIVE => Poll::Ready(Ok(Framed::plain(Message::V4(MessageV4::Keepalive), 1))),
        V4_SESS_TERM => {
            if buf.len() < 3 {
                return Poll::Pending;
            }
            Poll::Ready(Ok(Framed::plain(
                Message::V4(MessageV4::SessTerm {
                    flags: buf[1],
                    reason: buf[2],
                }),
                3,
            )))
        },
        V4_MSG_REJECT => {
            if buf.len() < 3 {
                return Poll::Pending;
            }
            Poll::Ready(Ok(Framed::plain(
                Message::V4(MessageV4::MsgReject {
                    reason: buf[1],
                    rejected: buf[2],
                }),
                3,
            )))
        },
        V4_SESS_INIT => {
            if buf.len() < 21 {
                return Poll::Pending;
            }
            let keepalive = (&buf[1..3]).get_u16();
            let segment_mru = (&buf[3..11]).get_u64();
            let transfer_mru = (&buf[11..19]).get_u64();
            let node_len = (&buf[19..21]).get_u16() as usize;
            let mut pos = 21;
            if buf.len() < pos + node_len {
                return Poll::Pending;
            }
            let node_id = buf[pos..(pos + node_len)].to_vec();
            pos += node_len;
            if buf.len() < pos + 4 {
                return Poll::Pending;
            }
            let mut notes = Vec::new();
            let ext_len = clamp_length(
                u64::from((&buf[pos..(pos + 4)]).get_u32()),
                &mut notes,
            );
            pos += 4;
            if buf.len() < pos + ext_len {
                return Poll::Pending;
            }
            let mut extensions = Vec::new();
            parse_extensions(&buf[pos..(pos + ext_len)], &mut extensions, &mut notes);
            pos += ext_len;
            Poll::Ready(Ok(Framed {
                message: Message::V4(MessageV4::SessInit {
                    keepalive,
                    segment_mru,
                    transfer_mru,
                    node_id,
                    extensions,
                }),
                consumed: pos,
                recovered: None,
                notes,
            }))
        },
        t => Poll::Ready(Err(FramingError::UnknownType(t))),
    }
}

#[cfg(test)]
mod tests {
    use std::task::Poll;
    use super::*;
    use crate::sdnv;

    fn framed(r: Poll<Result<Framed, FramingError>>) -> Framed {
        match r {
            Poll::Ready(Ok(f)) => f,
            other => panic!("expected a framed message, got {:?}", other),
        }
    }

    #[test]
    fn contact_v4_with_security_capability() {
        let f = framed(parse_contact(&[0x64, 0x74, 0x6e, 0x21, 0x04, 0x01]));
        assert_eq!(f.consumed, 6);
        match f.message {
            Message::Contact(ref h) => {
                assert_eq!(h.version(), 4);
                assert!(h.can_tls());
            },
            ref m => panic!("unexpected message {:?}", m),
        }
    }

    #[test]
    fn contact_v3_carries_identifier() {
        let mut buf = b"dtn!\x03\x05\x00\x1e".to_vec();
        buf.extend_from_slice(&sdnv::encode(9));
        buf.extend_from_slice(b"dtn://a/b");
        let f = framed(parse_contact(&buf));
        assert_eq!(f.consumed, buf.len());
        match f.message {
            Message::Contact(ContactHeader::V3(ref h)) => {
                assert_eq!(h.keepalive, 30);
                assert_eq!(h.eid, b"dtn://a/b");
            },
            ref m => panic!("unexpected message {:?}", m),
        }
    }

    #[test]
    fn contact_with_alien_version_is_invalid() {
        assert_eq!(
            parse_contact(&[0x64, 0x74, 0x6e, 0x21, 0x07, 0x00]),
            Poll::Ready(Err(FramingError::UnsupportedVersion(7))),
        );
    }

    #[test]
    fn v3_data_segment_consumes_header_and_payload() {
        let mut buf = vec![0x13];
        buf.extend_from_slice(&sdnv::encode(10));
        buf.extend_from_slice(&[0xaa; 10]);
        let f = framed(parse_v3(&buf));
        assert_eq!(f.consumed, 12);
        match f.message {
            Message::V3(MessageV3::DataSegment {
                flags,
                length,
                data_offset,
                data_len,
            }) => {
                assert_eq!(flags, SEG_START | SEG_END);
                assert_eq!(length, 10);
                assert_eq!(data_offset, 2);
                assert_eq!(data_len, 10);
            },
            ref m => panic!("unexpected message {:?}", m),
        }
    }

    #[test]
    fn v3_data_segment_short_payload_is_pending() {
        let mut buf = vec![0x13];
        buf.extend_from_slice(&sdnv::encode(10));
        buf.extend_from_slice(&[0xaa; 4]);
        assert_eq!(parse_v3(&buf), Poll::Pending);
    }

    #[test]
    fn v3_shutdown_optional_fields_follow_flags() {
        let f = framed(parse_v3(&[0x53, 0x02, 0x8a, 0x00]));
        assert_eq!(f.consumed, 4);
        assert_eq!(
            f.message,
            Message::V3(MessageV3::Shutdown {
                reason: Some(0x02),
                reconnect_delay: Some(0x500),
            }),
        );
    }

    #[test]
    fn v3_reserved_bits_do_not_frame() {
        assert_eq!(
            parse_v3(&[0x1c, 0x00]),
            Poll::Ready(Err(FramingError::ReservedFlagBits(0x1c))),
        );
        assert_eq!(
            parse_v3(&[0x41]),
            Poll::Ready(Err(FramingError::ReservedFlagBits(0x41))),
        );
    }

    #[test]
    fn v4_segment_with_transfer_length_extension() {
        let mut buf = vec![0x01, SEG_START];
        buf.extend_from_slice(&7u64.to_be_bytes());
        let mut item = vec![EXT_CRITICAL];
        item.extend_from_slice(&EXT_TRANSFER_LENGTH.to_be_bytes());
        item.extend_from_slice(&8u16.to_be_bytes());
        item.extend_from_slice(&20u64.to_be_bytes());
        buf.extend_from_slice(&(item.len() as u32).to_be_bytes());
        buf.extend_from_slice(&item);
        buf.extend_from_slice(&5u64.to_be_bytes());
        buf.extend_from_slice(&[0xbb; 5]);
        let f = framed(parse_v4(&buf));
        assert_eq!(f.consumed, buf.len());
        match f.message {
            Message::V4(MessageV4::XferSegment {
                transfer_id,
                ref extensions,
                length,
                data_len,
                ..
            }) => {
                assert_eq!(transfer_id, 7);
                assert_eq!(length, 5);
                assert_eq!(data_len, 5);
                assert_eq!(extensions.len(), 1);
                assert_eq!(extensions[0].transfer_length(), Some(20));
            },
            ref m => panic!("unexpected message {:?}", m),
        }
    }

    #[test]
    fn v4_continuation_segment_has_no_extension_block() {
        let mut buf = vec![0x01, 0x00];
        buf.extend_from_slice(&7u64.to_be_bytes());
        buf.extend_from_slice(&3u64.to_be_bytes());
        buf.extend_from_slice(&[0xcc; 3]);
        let f = framed(parse_v4(&buf));
        assert_eq!(f.consumed, 1 + 1 + 8 + 8 + 3);
    }

    #[test]
    fn v4_session_init_walks_extensions() {
        let mut buf = vec![0x07];
        buf.extend_from_slice(&45u16.to_be_bytes());
        buf.extend_from_slice(&1024u64.to_be_bytes());
        buf.extend_from_slice(&4096u64.to_be_bytes());
        let node = b"dtn://node";
        buf.extend_from_slice(&(node.len() as u16).to_be_bytes());
        buf.extend_from_slice(node);
        let mut item = vec![0x00];
        item.extend_from_slice(&0x7f00u16.to_be_bytes());
        item.extend_from_slice(&2u16.to_be_bytes());
        item.extend_from_slice(&[0x01, 0x02]);
        buf.extend_from_slice(&(item.len() as u32).to_be_bytes());
        buf.extend_from_slice(&item);
        let f = framed(parse_v4(&buf));
        assert_eq!(f.consumed, buf.len());
        match f.message {
            Message::V4(MessageV4::SessInit {
                keepalive,
                segment_mru,
                ref node_id,
                ref extensions,
                ..
            }) => {
                assert_eq!(keepalive, 45);
                assert_eq!(segment_mru, 1024);
                assert_eq!(node_id.as_slice(), node.as_ref());
                assert_eq!(extensions.len(), 1);
                assert_eq!(extensions[0].transfer_length(), None);
            },
            ref m => panic!("unexpected message {:?}", m),
        }
    }

    #[test]
    fn extension_block_overrun_is_a_note_not_a_failure() {
        let mut buf = vec![0x01, SEG_START];
        buf.extend_from_slice(&1u64.to_be_bytes());
        // declared block of 3 bytes cannot hold a 5-byte item header
        buf.extend_from_slice(&3u32.to_be_bytes());
        buf.extend_from_slice(&[0x00, 0x00, 0x01]);
        buf.extend_from_slice(&0u64.to_be_bytes());
        let f = framed(parse_v4(&buf));
        assert!(f.notes.contains(&crate::diagnostic::DiagnosticKind::ExtensionOverrun));
        assert_eq!(f.consumed, buf.len());
    }

    #[test]
    fn v4_ack_is_fixed_width() {
        let mut buf = vec![0x02, SEG_END];
        buf.extend_from_slice(&7u64.to_be_bytes());
        buf.extend_from_slice(&20u64.to_be_bytes());
        let f = framed(parse_v4(&buf));
        assert_eq!(f.consumed, 18);
        assert_eq!(parse_v4(&buf[..17]), Poll::Pending);
    }
}
