use log::debug;

use std::io::Read;

mod interface;

use interface::Interface;

use crate::error::Error;

/// One `{id, length, payload}` G12 record
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    pub id: u8,
    pub length: u8,
    pub payload: Vec<u8>,
}

/// [PacketReader] walks through an in-memory copy of the log,
/// which allows rewinding for the second pass and stepping back
/// by one record when an epoch boundary is detected.
pub struct PacketReader {
    /// Entire log content
    buffer: Vec<u8>,

    /// Read pointer
    ptr: usize,

    /// Offset of the latest record returned
    last: usize,
}

impl PacketReader {
    /// Loads a G12 log. "-" stands for standard input.
    pub fn open(fullpath: &str) -> Result<Self, Error> {
        let mut interface = if fullpath == "-" {
            Interface::stdin()
        } else {
            Interface::open(fullpath)?
        };

        let mut buffer = Vec::with_capacity(1 << 20);
        let size = interface.read_to_end(&mut buffer)?;

        debug!("loaded {} ({} bytes)", fullpath, size);

        Ok(Self::from_bytes(buffer))
    }

    /// Builds a [PacketReader] from raw bytes
    pub fn from_bytes(buffer: Vec<u8>) -> Self {
        Self {
            buffer,
            ptr: 0,
            last: 0,
        }
    }

    /// Restart from the very first record
    pub fn rewind(&mut self) {
        self.ptr = 0;
        self.last = 0;
    }

    /// Steps back by one record, so the next call to [Iterator::next]
    /// returns the latest record once again.
    pub fn step_back(&mut self) {
        self.ptr = self.last;
    }
}

impl Iterator for PacketReader {
    type Item = RawRecord;

    fn next(&mut self) -> Option<RawRecord> {
        let header = self.buffer.get(self.ptr..self.ptr + 2)?;
        let (id, length) = (header[0], header[1]);

        let start = self.ptr + 2;
        let end = start + length as usize;

        // truncated last record
        let payload = self.buffer.get(start..end)?.to_vec();

        self.last = self.ptr;
        self.ptr = end;

        Some(RawRecord {
            id,
            length,
            payload,
        })
    }
}

#[cfg(test)]
mod test {
    use super::{PacketReader, RawRecord};

    #[test]
    fn reader_steps_and_rewinds() {
        let bytes = vec![0x36, 2, 0xaa, 0xbb, 0x38, 1, 0xcc, 0x0e, 3, 0x01];
        let mut reader = PacketReader::from_bytes(bytes);

        assert_eq!(
            reader.next(),
            Some(RawRecord {
                id: 0x36,
                length: 2,
                payload: vec![0xaa, 0xbb],
            })
        );

        let second = reader.next().unwrap();
        assert_eq!(second.id, 0x38);
        assert_eq!(second.payload, vec![0xcc]);

        reader.step_back();
        assert_eq!(reader.next(), Some(second));

        // truncated record is dropped silently
        assert!(reader.next().is_none());
        assert!(reader.next().is_none());

        reader.rewind();
        assert_eq!(reader.count(), 2);
    }

    #[test]
    fn empty_log() {
        let mut reader = PacketReader::from_bytes(vec![]);
        assert!(reader.next().is_none());

        let mut reader = PacketReader::from_bytes(vec![0x38]);
        assert!(reader.next().is_none());
    }
}
