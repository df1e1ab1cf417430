use std::io::{self, Read, Write};

use serde::{Deserialize, Serialize};

use crate::capture::CaptureTime;
use crate::file::{read_fixed_str, write_fixed_str};

pub const LABEL_LEN: usize = 16;
pub const UOM_LEN: usize = 8;
pub const UNIT_LEN: usize = 8;
pub const BED_LEN: usize = 4;

pub const HEADER_SIZE: u64 = (LABEL_LEN + UOM_LEN + UNIT_LEN + BED_LEN + CaptureTime::SIZE) as u64;

/// Header of an event file. Text longer then its field is truncated
/// when written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventHeader {
    /// What was measured, at most 16 bytes.
    pub label: String,
    /// Unit of measure, at most 8 bytes.
    pub uom: String,
    /// Care unit (ward) the recording comes from, at most 8 bytes.
    pub unit: String,
    /// Bed within the care unit, at most 4 bytes.
    pub bed: String,
    pub start: CaptureTime,
}

impl EventHeader {
    pub(crate) fn read_from(r: &mut impl Read) -> io::Result<Self> {
        Ok(Self {
            label: read_fixed_str(r, LABEL_LEN)?,
            uom: read_fixed_str(r, UOM_LEN)?,
            unit: read_fixed_str(r, UNIT_LEN)?,
            bed: read_fixed_str(r, BED_LEN)?,
            start: CaptureTime::read_from(r)?,
        })
    }

    pub(crate) fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        write_fixed_str(w, &self.label, LABEL_LEN)?;
        write_fixed_str(w, &self.uom, UOM_LEN)?;
        write_fixed_str(w, &self.unit, UNIT_LEN)?;
        write_fixed_str(w, &self.bed, BED_LEN)?;
        self.start.write_to(w)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_is_64_bytes() {
        assert_eq!(HEADER_SIZE, 64);
        let mut buf = Vec::new();
        EventHeader::default().write_to(&mut buf).unwrap();
        assert_eq!(buf.len() as u64, HEADER_SIZE);
    }

    #[test]
    fn capture_time_starts_at_36() {
        let header = EventHeader {
            start: CaptureTime {
                year: 2019,
                ..CaptureTime::default()
            },
            ..EventHeader::default()
        };
        let mut buf = Vec::new();
        header.write_to(&mut buf).unwrap();
        assert_eq!(&buf[36..40], &2019i32.to_le_bytes());
    }
}
