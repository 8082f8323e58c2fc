//! Address filtering
//!
//! The bus is shared by every panel in the building and most traffic is for
//! someone else. A frame is kept only if it targets this unit's intercom
//! address, its concierge address (when one is configured), or broadcast.

use crate::frame::Frame;

/// Destination that every unit on the bus accepts
pub const BROADCAST_ADDRESS: u8 = 0xFF;

/// Placeholder address; as a concierge id it disables concierge forwarding
pub const NO_ADDRESS: u8 = 0x00;

/// The identities this unit answers to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DeviceIdentity {
    intercom_id: u8,
    concierge_id: u8,
}

impl DeviceIdentity {
    /// Create an identity; a `concierge_id` of [`NO_ADDRESS`] disables it
    pub const fn new(intercom_id: u8, concierge_id: u8) -> Self {
        Self {
            intercom_id,
            concierge_id,
        }
    }

    /// Address of the intercom unit
    pub const fn intercom_id(&self) -> u8 {
        self.intercom_id
    }

    /// Address of the concierge unit, if concierge forwarding is enabled
    pub const fn concierge_id(&self) -> Option<u8> {
        if self.concierge_id == NO_ADDRESS {
            None
        } else {
            Some(self.concierge_id)
        }
    }

    /// Where outgoing door commands are sent
    ///
    /// The concierge when one is configured, the intercom otherwise.
    pub const fn command_target(&self) -> u8 {
        match self.concierge_id() {
            Some(id) => id,
            None => self.intercom_id,
        }
    }

    /// True if `address` is one this unit listens to
    #[inline]
    pub fn accepts_address(&self, address: u8) -> bool {
        address == self.intercom_id
            || address == BROADCAST_ADDRESS
            || self.concierge_id().is_some_and(|id| id == address)
    }
}

/// Decide whether a frame is meant for this unit
///
/// Pure and allocation-free; this runs for every frame on the bus.
#[inline]
pub fn accept(frame: &Frame, identity: &DeviceIdentity) -> bool {
    identity.accepts_address(frame.destination)
}
