// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Decoder for the 32-byte status frames a QL printer sends back.

/// Every status frame has this length.
pub const STATUS_FRAME_LEN: usize = 32;

const PRINT_HEAD_MARK: u8 = 0x80;

const ERRORS_1: [&str; 8] = [
    "No media when printing",
    "End of media",
    "Tape cutter jam",
    "Not used",
    "Main unit in use",
    "Printer turned off",
    "High-voltage adapter",
    "Fan doesn't work",
];

const ERRORS_2: [&str; 8] = [
    "Replace media",
    "Expansion buffer full",
    "Communication error",
    "Communication buffer full",
    "Cover opened while printing",
    "Cancel key",
    "Media cannot be fed",
    "System error",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusType {
    Reply,
    PrintingCompleted,
    ErrorOccurred,
    TurnedOff,
    Notification,
    PhaseChange,
    Other(u8),
}

impl From<u8> for StatusType {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => Self::Reply,
            0x01 => Self::PrintingCompleted,
            0x02 => Self::ErrorOccurred,
            0x04 => Self::TurnedOff,
            0x05 => Self::Notification,
            0x06 => Self::PhaseChange,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    WaitingToReceive,
    Printing,
    Other(u8),
}

impl From<u8> for Phase {
    fn from(byte: u8) -> Self {
        match byte {
            0x00 => Self::WaitingToReceive,
            0x01 => Self::Printing,
            other => Self::Other(other),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrinterStatus {
    pub errors: Vec<String>,
    pub media_width_mm: u8,
    pub media_length_mm: u8,
    pub media_type: u8,
    pub status_type: StatusType,
    pub phase: Phase,
}

impl PrinterStatus {
    /// `None` for anything that is not a complete status frame.
    pub fn parse(frame: &[u8]) -> Option<Self> {
        if frame.len() != STATUS_FRAME_LEN || frame[0] != PRINT_HEAD_MARK || frame[1] != 0x20 {
            return None;
        }
        let mut errors = flags(frame[8], &ERRORS_1);
        errors.extend(flags(frame[9], &ERRORS_2));
        Some(Self {
            errors,
            media_width_mm: frame[10],
            media_type: frame[11],
            media_length_mm: frame[17],
            status_type: StatusType::from(frame[18]),
            phase: Phase::from(frame[19]),
        })
    }

    pub fn is_waiting_to_receive(&self) -> bool {
        self.status_type == StatusType::PhaseChange && self.phase == Phase::WaitingToReceive
    }
}

fn flags(byte: u8, names: &[&str; 8]) -> Vec<String> {
    (0..8)
        .filter(|bit| byte & (1 << bit) != 0)
        .map(|bit| names[bit].to_string())
        .collect()
}

/// Build a frame the way the printer would. Test helper for the transport
/// fakes.
#[cfg(test)]
pub fn frame(status_type: u8, phase: u8, errors1: u8, errors2: u8) -> [u8; STATUS_FRAME_LEN] {
    let mut frame = [0u8; STATUS_FRAME_LEN];
    frame[0] = PRINT_HEAD_MARK;
    frame[1] = 0x20;
    frame[2] = b'B';
    frame[3] = b'0';
    frame[8] = errors1;
    frame[9] = errors2;
    frame[10] = 103;
    frame[11] = 0x0B;
    frame[17] = 164;
    frame[18] = status_type;
    frame[19] = phase;
    frame
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_reply_has_no_errors() {
        let status = PrinterStatus::parse(&frame(0x00, 0x00, 0, 0)).unwrap();
        assert!(status.errors.is_empty());
        assert_eq!(status.status_type, StatusType::Reply);
        assert_eq!(status.phase, Phase::WaitingToReceive);
        assert_eq!((status.media_width_mm, status.media_length_mm), (103, 164));
    }

    #[test]
    fn error_bits_are_named() {
        let status = PrinterStatus::parse(&frame(0x02, 0x00, 0x01, 0x10)).unwrap();
        assert_eq!(status.status_type, StatusType::ErrorOccurred);
        assert_eq!(status.errors, vec!["No media when printing", "Cover opened while printing"]);
    }

    #[test]
    fn phase_change_to_waiting_is_ready() {
        assert!(PrinterStatus::parse(&frame(0x06, 0x00, 0, 0)).unwrap().is_waiting_to_receive());
        assert!(!PrinterStatus::parse(&frame(0x06, 0x01, 0, 0)).unwrap().is_waiting_to_receive());
        assert!(!PrinterStatus::parse(&frame(0x01, 0x00, 0, 0)).unwrap().is_waiting_to_receive());
    }

    #[test]
    fn short_or_foreign_frames_are_ignored() {
        assert!(PrinterStatus::parse(&[0x80, 0x20, 0x42]).is_none());
        let mut bad = frame(0x00, 0x00, 0, 0);
        bad[0] = 0x00;
        assert!(PrinterStatus::parse(&bad).is_none());
    }
}
