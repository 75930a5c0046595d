use crate::{StatusWord, TransportError};

/// Largest data field of a short APDU, and the size every chunk of a long payload is cut to
pub const MAX_CHUNK_SIZE: usize = 255;

/// First chunk of a payload
const P1_FIRST: u8 = 0x00;
/// Every following chunk
const P1_MORE: u8 = 0x80;

/// A command APDU: `CLA INS P1 P2 Lc data [Le]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct APDUCommand {
    pub cla: u8,
    pub ins: u8,
    pub p1: u8,
    pub p2: u8,
    pub data: Vec<u8>,
    pub response_len: Option<u8>,
}

impl APDUCommand {
    /// Serializes the command, failing if the data does not fit a short APDU.
    pub fn serialize(&self) -> Result<Vec<u8>, TransportError> {
        if self.data.len() > MAX_CHUNK_SIZE {
            return Err(TransportError::CommandTooLong(self.data.len()))
        }
        let mut v = Vec::with_capacity(5 + self.data.len() + 1);
        v.extend_from_slice(&[self.cla, self.ins, self.p1, self.p2, self.data.len() as u8]);
        v.extend_from_slice(&self.data);
        if let Some(response_len) = self.response_len {
            v.push(response_len);
        }
        Ok(v)
    }
}

/// A response APDU split into its data and trailing status word
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct APDUAnswer {
    data: Vec<u8>,
    retcode: u16,
}

impl APDUAnswer {
    /// Splits the two byte status word off a raw response.
    pub fn from_answer(mut answer: Vec<u8>) -> Result<Self, TransportError> {
        if answer.len() < 2 {
            return Err(TransportError::ResponseTooShort)
        }
        let status = answer.split_off(answer.len() - 2);
        let retcode = u16::from_be_bytes([status[0], status[1]]);
        Ok(Self { data: answer, retcode })
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn into_data(self) -> Vec<u8> {
        self.data
    }

    pub fn retcode(&self) -> u16 {
        self.retcode
    }

    pub fn status(&self) -> StatusWord {
        self.retcode.into()
    }

    pub fn is_success(&self) -> bool {
        self.status() == StatusWord::Ok
    }
}

/// Splits `payload` into the ordered commands the Ledger Ethereum application expects.
///
/// The first command carries `P1 = 0x00`, every following one `P1 = 0x80`; each carries at
/// most [`MAX_CHUNK_SIZE`] bytes. An empty payload yields a single empty command. Whatever
/// prefixes the payload (the derivation path, a length field) therefore only appears in the
/// first chunk.
pub fn chunk_payload(cla: u8, ins: u8, p2: u8, payload: &[u8]) -> Vec<APDUCommand> {
    if payload.is_empty() {
        return vec![APDUCommand { cla, ins, p1: P1_FIRST, p2, data: vec![], response_len: None }]
    }
    payload
        .chunks(MAX_CHUNK_SIZE)
        .enumerate()
        .map(|(index, chunk)| APDUCommand {
            cla,
            ins,
            p1: if index == 0 { P1_FIRST } else { P1_MORE },
            p2,
            data: chunk.to_vec(),
            response_len: None,
        })
        .collect()
}
