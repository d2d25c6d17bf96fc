use capture_definitions::{NetworkPacket, TreePresenter};
use crate::config::Preferences;
use crate::diagnostic::Diagnostic;
use crate::sink::{PayloadSink, SecuritySink};
use super::addresses::{Addresses, Sender};
use super::context::ContextInner;
use super::direct_buffer::FramedRecord;
use super::peer::Peer;

/// One captured conversation. Created empty, the first packet decides
/// who the active side is.
pub struct Conversation {
    inner: Option<ContextInner>,
}

impl Conversation {
    pub fn new() -> Self {
        Conversation { inner: None }
    }

    /// Feed one observed byte range and render what became visible.
    /// Returns false once the packet's direction stopped being
    /// dissected, either upgraded to transport security or opaque.
    pub fn add<PS, SS, T>(
        &mut self,
        prefs: &Preferences,
        packet: &NetworkPacket,
        payload_sink: &mut PS,
        security_sink: &mut SS,
        output: &mut T,
    ) -> bool
    where
        PS: PayloadSink,
        SS: SecuritySink,
        T: TreePresenter,
    {
        let inner = self
            .inner
            .get_or_insert_with(|| ContextInner::new(packet));
        inner.consume(packet, prefs, payload_sink, security_sink);
        inner.visualize(packet, output);

        let sender = inner.addresses().sender(packet);
        !inner.peer(&sender).security_passthrough
    }

    /// End of capture, report what never completed.
    pub fn finish(&mut self) {
        if let Some(inner) = self.inner.as_mut() {
            inner.finish();
        }
    }

    pub fn addresses(&self) -> Option<&Addresses> {
        self.inner.as_ref().map(ContextInner::addresses)
    }

    pub fn peer(&self, sender: &Sender) -> Option<&Peer> {
        self.inner.as_ref().map(|inner| inner.peer(sender))
    }

    pub fn negotiated_keepalive(&self) -> Option<u16> {
        self.inner.as_ref().and_then(|inner| inner.negotiated().keepalive)
    }

    pub fn negotiated_security_upgrade(&self) -> Option<bool> {
        self.inner.as_ref().and_then(|inner| inner.negotiated().can_tls)
    }

    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.inner
            .as_ref()
            .map(ContextInner::diagnostics)
            .unwrap_or(&[])
    }

    pub fn records(&self, sender: &Sender) -> &[FramedRecord] {
        self.inner
            .as_ref()
            .map(|inner| inner.records(sender))
            .unwrap_or(&[])
    }
}
