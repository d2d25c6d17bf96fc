// Copyright (c) SimpleStaking and Tezedge Contributors
// SPDX-License-Identifier: MIT

use std::task::Poll;
use crate::config::{Preferences, RecoveryMode};
use super::message::{
    self, Framed, FramingError, Message, MAGIC,
};
use super::peer::{ContactState, Peer};

/// Cut one message off the front of `buf`. `Poll::Pending` asks the
/// caller for more captured bytes, an error means the range cannot be
/// framed and falls back to opaque handling.
pub fn classify(peer: &Peer, prefs: &Preferences, buf: &[u8]) -> Poll<Result<Framed, FramingError>> {
    if buf.is_empty() {
        return Poll::Pending;
    }
    let probe = usize::min(buf.len(), MAGIC.len());
    let magic_prefix = buf[..probe] == MAGIC[..probe];
    match peer.contact {
        ContactState::Unknown => {
            if magic_prefix {
                message::parse_contact(buf)
            } else {
                recover(prefs, buf)
            }
        },
        _ => {
            // a repeated magic mid-stream means the exchange restarted
            if magic_prefix {
                if buf.len() < MAGIC.len() {
                    return Poll::Pending;
                }
                return message::parse_contact(buf);
            }
            match peer.version {
                Some(3) => message::parse_v3(buf),
                Some(4) => message::parse_v4(buf),
                _ => Poll::Ready(Err(FramingError::Unrecognized)),
            }
        },
    }
}

/// The contact exchange of this direction was never captured. Try the
/// configured checks in order; a transport-security record yields to
/// the external handshake decoder, a well-formed message of either
/// generation pins the version for the rest of the conversation.
fn recover(prefs: &Preferences, buf: &[u8]) -> Poll<Result<Framed, FramingError>> {
    let order: &[u8] = match prefs.recovery {
        RecoveryMode::Disabled => return Poll::Ready(Err(FramingError::Unrecognized)),
        RecoveryMode::V3First => &[3, 4],
        RecoveryMode::V4First => &[4, 3],
        RecoveryMode::V3Only => &[3],
        RecoveryMode::V4Only => &[4],
    };

    if buf[0] >= 0x14 && buf[0] <= 0x17 {
        if buf.len() < 3 {
            return Poll::Pending;
        }
        if buf[1] == 0x03 && buf[2] <= 0x04 {
            return Poll::Ready(Ok(Framed {
                message: Message::SecurityRecord { length: buf.len() },
                consumed: buf.len(),
                recovered: None,
                notes: Vec::new(),
            }));
        }
    }

    let mut undecided = false;
    for &generation in order {
        let attempt = match generation {
            3 => message::parse_v3(buf),
            _ => message::parse_v4(buf),
        };
        match attempt {
            Poll::Ready(Ok(f)) => {
                return Poll::Ready(Ok(Framed {
                    recovered: Some(generation),
                    ..f
                }));
            },
            Poll::Pending => undecided = true,
            Poll::Ready(Err(_)) => (),
        }
    }
    if undecided {
        Poll::Pending
    } else {
        Poll::Ready(Err(FramingError::Unrecognized))
    }
}
