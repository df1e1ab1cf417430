use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use chrono::{Datelike, NaiveDate, NaiveDateTime, TimeDelta, Timelike};
use serde::{Deserialize, Serialize};

/// Wall clock time the recording started, as stored in both file headers:
/// five 32 bit integers followed by the (fractional) second as a double.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct CaptureTime {
    pub year: i32,
    pub month: i32,
    pub day: i32,
    pub hour: i32,
    pub minute: i32,
    pub second: f64,
}

impl CaptureTime {
    /// 5 x int32 + 1 x double
    pub const SIZE: usize = 5 * 4 + 8;

    pub(crate) fn read_from(r: &mut impl Read) -> io::Result<Self> {
        Ok(Self {
            year: r.read_i32::<LittleEndian>()?,
            month: r.read_i32::<LittleEndian>()?,
            day: r.read_i32::<LittleEndian>()?,
            hour: r.read_i32::<LittleEndian>()?,
            minute: r.read_i32::<LittleEndian>()?,
            second: r.read_f64::<LittleEndian>()?,
        })
    }

    pub(crate) fn write_to(&self, w: &mut impl Write) -> io::Result<()> {
        w.write_i32::<LittleEndian>(self.year)?;
        w.write_i32::<LittleEndian>(self.month)?;
        w.write_i32::<LittleEndian>(self.day)?;
        w.write_i32::<LittleEndian>(self.hour)?;
        w.write_i32::<LittleEndian>(self.minute)?;
        w.write_f64::<LittleEndian>(self.second)
    }

    /// Returns `None` if the fields do not form a valid date and time
    /// (an all zero header for example).
    pub fn to_datetime(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(
            self.year,
            u32::try_from(self.month).ok()?,
            u32::try_from(self.day).ok()?,
        )?;
        if !(0.0..60.0).contains(&self.second) {
            return None;
        }
        let whole = self.second.trunc();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let micros = ((self.second - whole) * 1e6).round() as i64;
        let time = date.and_hms_opt(
            u32::try_from(self.hour).ok()?,
            u32::try_from(self.minute).ok()?,
            whole as u32,
        )?;
        Some(time + TimeDelta::microseconds(micros))
    }
}

impl From<NaiveDateTime> for CaptureTime {
    #[allow(clippy::cast_possible_wrap)]
    fn from(dt: NaiveDateTime) -> Self {
        Self {
            year: dt.year(),
            month: dt.month() as i32,
            day: dt.day() as i32,
            hour: dt.hour() as i32,
            minute: dt.minute() as i32,
            second: f64::from(dt.second()) + f64::from(dt.nanosecond()) / 1e9,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn fractional_seconds_survive_conversion() {
        let time = CaptureTime {
            year: 2013,
            month: 5,
            day: 12,
            hour: 19,
            minute: 13,
            second: 1.25,
        };
        let dt = time.to_datetime().unwrap();
        assert_eq!(dt.to_string(), "2013-05-12 19:13:01.250");
        assert_eq!(CaptureTime::from(dt), time);
    }

    #[test]
    fn zeroed_header_has_no_datetime() {
        assert!(CaptureTime::default().to_datetime().is_none());
    }

    #[test]
    fn encodes_to_28_bytes() {
        let mut buf = Vec::new();
        CaptureTime::default().write_to(&mut buf).unwrap();
        assert_eq!(buf.len(), CaptureTime::SIZE);
    }
}
