//! Command codes of the UNO bus
//!
//! The same code space is used for what this unit sends and what it hears:
//! the bus does not distinguish commands from events.

use crate::frame::Frame;

pub const CODE_CLEAR_BUS: u8 = 0x11;
pub const CODE_CONCIERGE_CALL: u8 = 0x22;
pub const CODE_INTERCOM_CALL: u8 = 0x37;
pub const CODE_UNLOCK: u8 = 0x90;

/// Commands this unit can put on the bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusCommand {
    /// Release the bus after a call or a door action
    ClearBus,
    /// Ring the concierge panel
    ConciergeCall,
    /// Ring an intercom unit
    IntercomCall,
    /// Pulse the door strike
    Unlock,
}

impl BusCommand {
    /// Parse a command from its wire code
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            CODE_CLEAR_BUS => Some(BusCommand::ClearBus),
            CODE_CONCIERGE_CALL => Some(BusCommand::ConciergeCall),
            CODE_INTERCOM_CALL => Some(BusCommand::IntercomCall),
            CODE_UNLOCK => Some(BusCommand::Unlock),
            _ => None,
        }
    }

    /// Wire code
    pub fn code(self) -> u8 {
        match self {
            BusCommand::ClearBus => CODE_CLEAR_BUS,
            BusCommand::ConciergeCall => CODE_CONCIERGE_CALL,
            BusCommand::IntercomCall => CODE_INTERCOM_CALL,
            BusCommand::Unlock => CODE_UNLOCK,
        }
    }

    /// Build the frame carrying this command
    pub fn to_frame(self, destination: u8, source: u8) -> Frame {
        Frame::empty(destination, source, self.code())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_codes() {
        let commands = [
            BusCommand::ClearBus,
            BusCommand::ConciergeCall,
            BusCommand::IntercomCall,
            BusCommand::Unlock,
        ];

        for cmd in commands {
            assert_eq!(BusCommand::from_code(cmd.code()), Some(cmd));
        }
        assert_eq!(BusCommand::from_code(0x00), None);
    }

    #[test]
    fn test_to_frame() {
        let frame = BusCommand::Unlock.to_frame(0x20, 0x10);
        assert_eq!(frame.destination, 0x20);
        assert_eq!(frame.code, CODE_UNLOCK);
        assert!(frame.payload.is_empty());
    }
}
