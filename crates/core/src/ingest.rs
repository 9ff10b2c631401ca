//! Photo selection state for the current upload mode.

use std::collections::BTreeMap;

use crate::error::CoreError;
use crate::mode::{SlotRole, UploadMode};
use crate::slot::ImageSlot;

/// Holds the photos the user has picked, keyed by slot role.
///
/// Only roles that belong to the current mode can be filled. Switching
/// modes discards every slot.
#[derive(Debug, Clone, Default)]
pub struct MediaIngest {
    mode: UploadMode,
    slots: BTreeMap<SlotRole, ImageSlot>,
}

impl MediaIngest {
    pub fn new(mode: UploadMode) -> Self {
        Self {
            mode,
            slots: BTreeMap::new(),
        }
    }

    pub fn mode(&self) -> UploadMode {
        self.mode
    }

    /// Switch mode, clearing all slots. Clears even when `mode` is the
    /// current mode.
    pub fn set_mode(&mut self, mode: UploadMode) {
        self.mode = mode;
        self.slots.clear();
    }

    /// Store `slot` under its role, replacing any previous photo there.
    ///
    /// Returns the replaced slot, if any.
    pub fn select_image(&mut self, slot: ImageSlot) -> Result<Option<ImageSlot>, CoreError> {
        if slot.role.mode() != self.mode {
            return Err(CoreError::Validation(format!(
                "Slot '{}' is not available in {} mode",
                slot.role.name(),
                self.mode.name()
            )));
        }
        Ok(self.slots.insert(slot.role, slot))
    }

    /// Remove the photo for `role`. Returns the removed slot, if any.
    pub fn clear_image(&mut self, role: SlotRole) -> Option<ImageSlot> {
        self.slots.remove(&role)
    }

    pub fn slot(&self, role: SlotRole) -> Option<&ImageSlot> {
        self.slots.get(&role)
    }

    /// Filled slots in role order.
    pub fn slots(&self) -> impl Iterator<Item = &ImageSlot> {
        self.slots.values()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Whether every slot the current mode requires is filled.
    pub fn is_ready(&self) -> bool {
        self.mode
            .required_roles()
            .iter()
            .all(|role| self.slots.contains_key(role))
    }

    /// Both solo photos, when in solo mode and both are present.
    pub fn solo_pair(&self) -> Option<(&ImageSlot, &ImageSlot)> {
        if self.mode != UploadMode::Solo {
            return None;
        }
        Some((
            self.slots.get(&SlotRole::FirstPerson)?,
            self.slots.get(&SlotRole::SecondPerson)?,
        ))
    }
}
