//! Record statistics: what a log actually contains.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{error::Error, reader::PacketReader};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordStats {
    /// Record id, "0x38" for example
    pub id: String,

    /// Number of occurrences
    pub count: usize,

    /// Observed payload lengths, in ascending order
    pub lengths: Vec<u8>,

    /// True when this id came with several lengths
    pub variable_length: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Statistics {
    pub records: Vec<RecordStats>,

    /// Total number of records
    pub total: usize,
}

impl Statistics {
    /// Walks the whole log, then rewinds the reader
    pub fn collect(reader: &mut PacketReader) -> Self {
        let mut counts = BTreeMap::<u8, (usize, Vec<u8>)>::new();
        let mut total = 0;

        reader.rewind();

        for raw in reader.by_ref() {
            let (count, lengths) = counts.entry(raw.id).or_default();
            *count += 1;

            if !lengths.contains(&raw.length) {
                lengths.push(raw.length);
            }

            total += 1;
        }

        reader.rewind();

        let records = counts
            .into_iter()
            .map(|(id, (count, mut lengths))| {
                lengths.sort_unstable();
                RecordStats {
                    id: format!("0x{:02x}", id),
                    count,
                    variable_length: lengths.len() > 1,
                    lengths,
                }
            })
            .collect();

        Self { records, total }
    }

    /// Pretty JSON document
    pub fn to_json(&self) -> Result<String, Error> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod test {
    use super::Statistics;
    use crate::reader::PacketReader;

    #[test]
    fn record_statistics() {
        let bytes = vec![
            0x38, 2, 0, 0, //
            0x36, 1, 0, //
            0x38, 3, 0, 0, 0, //
            0x38, 2, 0, 0,
        ];

        let mut reader = PacketReader::from_bytes(bytes);
        let stats = Statistics::collect(&mut reader);

        assert_eq!(stats.total, 4);
        assert_eq!(stats.records.len(), 2);

        assert_eq!(stats.records[0].id, "0x36");
        assert_eq!(stats.records[0].count, 1);
        assert!(!stats.records[0].variable_length);

        assert_eq!(stats.records[1].id, "0x38");
        assert_eq!(stats.records[1].count, 3);
        assert_eq!(stats.records[1].lengths, vec![2, 3]);
        assert!(stats.records[1].variable_length);

        // reader was rewound
        assert_eq!(reader.count(), 4);

        let json = stats.to_json().unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["total"], 4);
        assert_eq!(value["records"][1]["lengths"][1], 3);
    }
}
