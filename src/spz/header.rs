use std::io::Write;

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};

use crate::SpzError;

/// "NGSP" read as a little endian u32.
pub const MAGIC: u32 = 0x5053474e;
pub const LATEST_VERSION: u32 = 3;
pub const MIN_VERSION: u32 = 1;
pub const HEADER_SIZE: usize = 16;
pub const FLAG_ANTIALIASED: u8 = 0x1;
/// Streams claiming more points than this are rejected as corrupt.
pub const MAX_POINTS: u32 = 10_000_000;

/// Point count for a header, rejecting clouds no reader would accept back.
pub(crate) fn checked_num_points(n: usize) -> Result<u32, SpzError> {
    u32::try_from(n)
        .ok()
        .filter(|&n| n <= MAX_POINTS)
        .ok_or_else(|| {
            SpzError::validation(format!(
                "Too many points for SPZ: {n}, the limit is {MAX_POINTS}"
            ))
        })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PackedHeader {
    pub version: u32,
    pub num_points: u32,
    pub sh_degree: u8,
    pub fractional_bits: u8,
    pub flags: u8,
}

impl PackedHeader {
    pub fn antialiased(&self) -> bool {
        self.flags & FLAG_ANTIALIASED != 0
    }

    pub fn write<W: Write>(&self, mut writer: W) -> Result<(), SpzError> {
        writer.write_u32::<LittleEndian>(MAGIC)?;
        writer.write_u32::<LittleEndian>(self.version)?;
        writer.write_u32::<LittleEndian>(self.num_points)?;
        writer.write_u8(self.sh_degree)?;
        writer.write_u8(self.fractional_bits)?;
        writer.write_u8(self.flags)?;
        // reserved
        writer.write_u8(0)?;
        Ok(())
    }

    /// Parse and validate the header at the start of a decompressed stream.
    pub fn read(data: &[u8]) -> Result<Self, SpzError> {
        if data.len() < HEADER_SIZE {
            return Err(SpzError::format(format!(
                "Stream too short for an SPZ header: {} bytes",
                data.len()
            )));
        }

        let mut reader = &data[..HEADER_SIZE];
        let magic = reader.read_u32::<LittleEndian>()?;
        let version = reader.read_u32::<LittleEndian>()?;
        let header = PackedHeader {
            version,
            num_points: reader.read_u32::<LittleEndian>()?,
            sh_degree: reader.read_u8()?,
            fractional_bits: reader.read_u8()?,
            flags: reader.read_u8()?,
        };

        if magic != MAGIC {
            return Err(SpzError::format(format!("Bad SPZ magic: {magic:#010x}")));
        }
        if !(MIN_VERSION..=LATEST_VERSION).contains(&version) {
            return Err(SpzError::unsupported(format!(
                "Unsupported SPZ version: {version}"
            )));
        }
        if header.num_points > MAX_POINTS {
            return Err(SpzError::format(format!(
                "Too many points: {}",
                header.num_points
            )));
        }
        if header.sh_degree > 3 {
            return Err(SpzError::format(format!(
                "Unsupported SH degree: {}",
                header.sh_degree
            )));
        }
        if header.fractional_bits > 23 {
            return Err(SpzError::format(format!(
                "Invalid fractional bits: {}",
                header.fractional_bits
            )));
        }
        Ok(header)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header() -> PackedHeader {
        PackedHeader {
            version: LATEST_VERSION,
            num_points: 42,
            sh_degree: 2,
            fractional_bits: 12,
            flags: FLAG_ANTIALIASED,
        }
    }

    #[test]
    fn test_header_layout() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        assert_eq!(buf.len(), HEADER_SIZE);
        assert_eq!(&buf[..4], b"NGSP");
        assert_eq!(buf[12], 2);
        assert_eq!(buf[14], FLAG_ANTIALIASED);
        assert_eq!(PackedHeader::read(&buf).unwrap(), header());
    }

    #[test]
    fn test_rejects_bad_magic() {
        let mut buf = Vec::new();
        header().write(&mut buf).unwrap();
        buf[0] = b'X';
        assert!(matches!(PackedHeader::read(&buf), Err(SpzError::Format(_))));
    }

    #[test]
    fn test_rejects_unknown_version() {
        for version in [0, LATEST_VERSION + 1] {
            let mut buf = Vec::new();
            PackedHeader { version, ..header() }.write(&mut buf).unwrap();
            assert!(matches!(
                PackedHeader::read(&buf),
                Err(SpzError::UnsupportedFormat(_))
            ));
        }
    }

    #[test]
    fn test_point_count_limit() {
        assert_eq!(checked_num_points(0).unwrap(), 0);
        assert_eq!(checked_num_points(MAX_POINTS as usize).unwrap(), MAX_POINTS);
        assert!(matches!(
            checked_num_points(MAX_POINTS as usize + 1),
            Err(SpzError::Validation(_))
        ));
        assert!(matches!(
            checked_num_points(usize::MAX),
            Err(SpzError::Validation(_))
        ));

        // One over the limit never makes it back through the reader.
        let mut buf = Vec::new();
        PackedHeader {
            num_points: MAX_POINTS + 1,
            ..header()
        }
        .write(&mut buf)
        .unwrap();
        assert!(matches!(PackedHeader::read(&buf), Err(SpzError::Format(_))));
    }

    #[test]
    fn test_rejects_short_stream() {
        assert!(matches!(PackedHeader::read(b"NGSP"), Err(SpzError::Format(_))));
    }

    #[test]
    fn test_rejects_bad_degree() {
        let mut buf = Vec::new();
        PackedHeader {
            sh_degree: 4,
            ..header()
        }
        .write(&mut buf)
        .unwrap();
        assert!(matches!(PackedHeader::read(&buf), Err(SpzError::Format(_))));
    }
}
