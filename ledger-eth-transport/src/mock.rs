use crate::{Transport, TransportError};
use regex::Regex;
use std::str::FromStr;

/// Recorded `=> command` / `<= answer` exchanges, hex encoded, one per line.
///
/// ```text
/// => e002000015058000002c8000003c800000000000000000000000
/// <= 4104...9000
/// ```
#[derive(Debug, Default, Clone)]
pub struct RecordStore {
    pub queue: Vec<(Vec<u8>, Vec<u8>)>,
}

impl RecordStore {
    pub fn new() -> RecordStore {
        RecordStore { queue: Vec::new() }
    }

    pub fn push(&mut self, command: Vec<u8>, answer: Vec<u8>) {
        self.queue.push((command, answer));
    }
}

impl FromStr for RecordStore {
    type Err = TransportError;

    fn from_str(s: &str) -> Result<RecordStore, Self::Err> {
        let record = Regex::new(r"^(=>|<=)([0-9a-fA-F]+)$")
            .map_err(|e| TransportError::InvalidRecord(e.to_string()))?;
        let mut store = RecordStore::new();
        let mut command: Option<Vec<u8>> = None;
        for line in s.lines() {
            let line = line.replace(' ', "");
            let Some(captures) = record.captures(&line) else { continue };
            let bytes = hex::decode(&captures[2])
                .map_err(|e| TransportError::InvalidRecord(format!("{line}: {e}")))?;
            if &captures[1] == "=>" {
                command = Some(bytes);
            } else {
                let command = command.take().ok_or_else(|| {
                    TransportError::InvalidRecord(format!("answer without a command: {line}"))
                })?;
                store.push(command, bytes);
            }
        }

        Ok(store)
    }
}

/// Replays a [`RecordStore`]: every command must match a recorded one byte for byte.
#[derive(Debug)]
pub struct TransportReplayer {
    store: RecordStore,
}

impl TransportReplayer {
    pub fn new(store: RecordStore) -> TransportReplayer {
        TransportReplayer { store }
    }
}

impl Transport for TransportReplayer {
    fn exchange(&mut self, command: &[u8]) -> Result<Vec<u8>, TransportError> {
        self.store
            .queue
            .iter()
            .find(|(recorded, _)| recorded.as_slice() == command)
            .map(|(_, answer)| answer.clone())
            .ok_or_else(|| TransportError::ExchangeNotFound(hex::encode(command)))
    }
}
