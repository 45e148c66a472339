//! Message composer state machine.
//!
//! Tracks the attachments of one in-progress message through the
//! three-step upload protocol (request URL, direct PUT, confirm) and gates
//! submission. Each attachment's own sequence is strictly sequential;
//! distinct attachments may upload in parallel. The whole machine is pure
//! state; the caller drives the actual network steps.

use thiserror::Error;

use crate::domain::attachment::StorageKey;

/// Most attachments one composed message may carry.
pub const MAX_ATTACHMENTS: usize = 3;

/// Local handle for one attachment slot, valid for the life of the
/// composer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(u64);

/// Upload progress of one attachment slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    /// The three-step protocol is still running.
    Uploading,
    /// The upload confirmed; the key is usable in a message.
    Complete {
        /// Confirmed bucket key.
        key: StorageKey,
    },
}

/// One attachment slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    id: SlotId,
    status: SlotStatus,
    filename: String,
    content_type: String,
    size: u64,
}

impl Slot {
    /// Local handle.
    pub fn id(&self) -> SlotId {
        self.id
    }

    /// Upload progress.
    pub fn status(&self) -> &SlotStatus {
        &self.status
    }

    /// Original filename.
    pub fn filename(&self) -> &str {
        self.filename.as_str()
    }

    /// Declared MIME type.
    pub fn content_type(&self) -> &str {
        self.content_type.as_str()
    }

    /// Declared size in bytes.
    pub fn size(&self) -> u64 {
        self.size
    }
}

/// Errors raised by composer transitions.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ComposerError {
    /// The per-message attachment cap is already reached. Surfaced as a
    /// notice, not a failure of anything in flight.
    #[error("a message may carry at most {MAX_ATTACHMENTS} attachments")]
    AttachmentLimitReached,
    /// No slot exists under the given handle.
    #[error("unknown attachment slot")]
    UnknownSlot,
    /// The slot is not in the state the transition requires.
    #[error("attachment slot is not uploading")]
    NotUploading,
}

/// State of one message being composed.
#[derive(Debug, Default)]
pub struct Composer {
    slots: Vec<Slot>,
    next_slot: u64,
    request_in_flight: bool,
}

impl Composer {
    /// Fresh composer with no attachments.
    pub fn new() -> Self {
        Self::default()
    }

    /// Attachment slots in insertion order.
    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    /// Whether another file may be attached. Checked before the file
    /// picker opens.
    pub fn can_attach(&self) -> bool {
        self.slots.len() < MAX_ATTACHMENTS
    }

    /// Open a slot for a chosen file, in `Uploading` state.
    pub fn begin_attachment(
        &mut self,
        filename: impl Into<String>,
        content_type: impl Into<String>,
        size: u64,
    ) -> Result<SlotId, ComposerError> {
        if !self.can_attach() {
            return Err(ComposerError::AttachmentLimitReached);
        }
        let id = SlotId(self.next_slot);
        self.next_slot += 1;
        self.slots.push(Slot {
            id,
            status: SlotStatus::Uploading,
            filename: filename.into(),
            content_type: content_type.into(),
            size,
        });
        Ok(id)
    }

    /// Mark a slot confirmed with its bucket key.
    pub fn complete_attachment(
        &mut self,
        slot: SlotId,
        key: StorageKey,
    ) -> Result<(), ComposerError> {
        let found = self
            .slots
            .iter_mut()
            .find(|candidate| candidate.id == slot)
            .ok_or(ComposerError::UnknownSlot)?;
        if found.status != SlotStatus::Uploading {
            return Err(ComposerError::NotUploading);
        }
        found.status = SlotStatus::Complete { key };
        Ok(())
    }

    /// Drop a slot, whether because a step failed or the user removed it.
    pub fn remove_attachment(&mut self, slot: SlotId) -> Result<(), ComposerError> {
        let index = self
            .slots
            .iter()
            .position(|candidate| candidate.id == slot)
            .ok_or(ComposerError::UnknownSlot)?;
        self.slots.remove(index);
        Ok(())
    }

    /// Keys of all confirmed attachments, in insertion order.
    pub fn completed_keys(&self) -> Vec<StorageKey> {
        self.slots
            .iter()
            .filter_map(|slot| match &slot.status {
                SlotStatus::Complete { key } => Some(key.clone()),
                SlotStatus::Uploading => None,
            })
            .collect()
    }

    /// Whether the message may be submitted right now: something to send
    /// and nothing in flight.
    pub fn can_submit(&self, text: &str) -> bool {
        if self.request_in_flight {
            return false;
        }
        !text.trim().is_empty()
            || self
                .slots
                .iter()
                .any(|slot| matches!(slot.status, SlotStatus::Complete { .. }))
    }

    /// Record that a chat request left; submission locks until it
    /// settles.
    pub fn begin_request(&mut self) {
        self.request_in_flight = true;
    }

    /// Record that the in-flight chat request settled. On success the
    /// attachments have been consumed and the composer resets.
    pub fn finish_request(&mut self, consumed: bool) {
        self.request_in_flight = false;
        if consumed {
            self.slots.clear();
        }
    }
}
