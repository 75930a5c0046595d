#![allow(dead_code)]
//! An in-memory Ledger Ethereum app: derives keys from the requested path, reassembles chunked
//! payloads and answers with real signatures.
use ledger_eth_core::{
    k256::{
        ecdsa::SigningKey, elliptic_curve::sec1::ToEncodedPoint, PublicKey as K256PublicKey,
    },
    rlp,
    types::Address,
    utils::{hash_message, keccak256, typed_data_hash, verifying_key_to_address},
};
use ledger_eth_signers::{to_eip155_v, DerivationType};
use ledger_eth_transport::{Transport, TransportError};
use std::{
    sync::{Arc, Mutex, MutexGuard},
    thread,
    time::Duration,
};

pub const SW_OK: [u8; 2] = [0x90, 0x00];

/// How the mock device answers
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Normal,
    /// Signing commands are refused on the device
    Reject,
    /// Every command fails with `0x5515`
    Locked,
    /// The dashboard answers `0x6e00` to everything
    AppClosed,
    /// Signs with a key other than the one of the requested path
    WrongKey,
    /// Answers a truncated signature
    ShortSignature,
}

#[derive(Debug)]
pub struct MockState {
    pub seed: [u8; 32],
    pub version: [u8; 3],
    pub mode: Mode,
    pub delay: Option<Duration>,
    /// Every command received, serialized
    pub commands: Vec<Vec<u8>>,
    pending: Option<(u8, Vec<u8>)>,
}

/// Cheap to clone, every clone drives the same device
#[derive(Clone, Debug)]
pub struct MockLedger {
    state: Arc<Mutex<MockState>>,
}

impl Default for MockLedger {
    fn default() -> Self {
        Self::new()
    }
}

impl MockLedger {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                seed: [0x42; 32],
                version: [1, 10, 2],
                mode: Mode::Normal,
                delay: None,
                commands: vec![],
                pending: None,
            })),
        }
    }

    pub fn state(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap()
    }

    pub fn set_mode(&self, mode: Mode) {
        self.state().mode = mode;
    }

    pub fn set_version(&self, version: [u8; 3]) {
        self.state().version = version;
    }

    pub fn set_delay(&self, delay: Duration) {
        self.state().delay = Some(delay);
    }

    /// The commands received so far with the given instruction
    pub fn commands(&self, ins: u8) -> Vec<Vec<u8>> {
        self.state().commands.iter().filter(|c| c[1] == ins).cloned().collect()
    }

    /// The key the device holds at `derivation`
    pub fn key(&self, derivation: &DerivationType) -> SigningKey {
        let path = derivation.path().unwrap().to_bytes();
        key_at(&self.state().seed, &path)
    }

    pub fn address(&self, derivation: &DerivationType) -> Address {
        verifying_key_to_address(self.key(derivation).verifying_key())
    }

    fn answer(&self, apdu: &[u8]) -> Vec<u8> {
        let delay = self.state().delay;
        if let Some(delay) = delay {
            thread::sleep(delay);
        }

        let mut state = self.state();
        state.commands.push(apdu.to_vec());
        let (cla, ins, p1, data) = (apdu[0], apdu[1], apdu[2], &apdu[5..]);
        if cla != 0xe0 {
            return vec![0x6e, 0x00]
        }
        match state.mode {
            Mode::Locked => return vec![0x55, 0x15],
            Mode::AppClosed => return vec![0x6e, 0x00],
            _ => {}
        }

        match ins {
            0x06 => {
                let mut answer = vec![0x01];
                answer.extend_from_slice(&state.version);
                answer.extend_from_slice(&SW_OK);
                answer
            }
            0x02 => {
                let key = key_at(&state.seed, data);
                let public_key =
                    K256PublicKey::from(key.verifying_key()).to_encoded_point(false).as_bytes().to_vec();
                let address = hex::encode(verifying_key_to_address(key.verifying_key()));
                let mut answer = vec![public_key.len() as u8];
                answer.extend_from_slice(&public_key);
                answer.push(address.len() as u8);
                answer.extend_from_slice(address.as_bytes());
                answer.extend_from_slice(&SW_OK);
                answer
            }
            0x04 | 0x08 | 0x0c => {
                let mut payload = match (p1, state.pending.take()) {
                    (0x00, _) => data.to_vec(),
                    (0x80, Some((pending_ins, mut payload))) if pending_ins == ins => {
                        payload.extend_from_slice(data);
                        payload
                    }
                    _ => return vec![0x6b, 0x00],
                };
                let path_len = 1 + 4 * payload[0] as usize;
                let body = payload.split_off(path_len);
                let Some(complete) = payload_complete(ins, &body) else {
                    payload.extend_from_slice(&body);
                    state.pending = Some((ins, payload));
                    return SW_OK.to_vec()
                };
                if !complete {
                    return vec![0x67, 0x00]
                }
                if state.mode == Mode::Reject {
                    return vec![0x69, 0x85]
                }

                let key = if state.mode == Mode::WrongKey {
                    key_at(&[0x13; 32], &payload)
                } else {
                    key_at(&state.seed, &payload)
                };
                let mut answer = sign(ins, &key, &body);
                if state.mode == Mode::ShortSignature {
                    answer.truncate(33);
                }
                answer.extend_from_slice(&SW_OK);
                answer
            }
            _ => vec![0x6d, 0x00],
        }
    }
}

impl Transport for MockLedger {
    fn exchange(&mut self, apdu: &[u8]) -> Result<Vec<u8>, TransportError> {
        Ok(self.answer(apdu))
    }
}

fn key_at(seed: &[u8], path: &[u8]) -> SigningKey {
    let mut material = seed.to_vec();
    material.extend_from_slice(path);
    SigningKey::from_slice(&keccak256(material)).unwrap()
}

/// `None` while more chunks are expected, `Some(false)` when the payload overflowed
fn payload_complete(ins: u8, body: &[u8]) -> Option<bool> {
    let expected = match ins {
        0x04 => {
            let (offset, rlp_bytes) = match body.first() {
                Some(&ty) if ty < 0x7f => (1, &body[1..]),
                Some(_) => (0, body),
                None => return None,
            };
            let info = rlp::PayloadInfo::from(rlp_bytes).ok()?;
            offset + info.total()
        }
        0x08 => {
            let len: [u8; 4] = body.get(..4)?.try_into().ok()?;
            4 + u32::from_be_bytes(len) as usize
        }
        _ => 64,
    };
    match body.len() {
        len if len < expected => None,
        len => Some(len == expected),
    }
}

/// Signs a complete payload the way the app does, answering `v ‖ r ‖ s`
fn sign(ins: u8, key: &SigningKey, body: &[u8]) -> Vec<u8> {
    let typed = ins == 0x04 && body[0] < 0x7f;
    let (hash, chain_id) = match ins {
        0x04 if typed => (keccak256(body), None),
        0x04 => {
            // `[.., chain_id, 0, 0]` when replay protected
            let list = rlp::Rlp::new(body);
            let chain_id = match list.item_count().unwrap() {
                9 => Some(list.val_at::<u64>(6).unwrap()),
                _ => None,
            };
            (keccak256(body), chain_id)
        }
        0x08 => (hash_message(&body[4..]).0, None),
        _ => {
            let domain: [u8; 32] = body[..32].try_into().unwrap();
            let message: [u8; 32] = body[32..64].try_into().unwrap();
            (typed_data_hash(domain, message).0, None)
        }
    };

    let (signature, recovery_id) = key.sign_prehash_recoverable(&hash).unwrap();
    let parity = recovery_id.to_byte();
    let v = match chain_id {
        // the app only has room for the low byte of `v`
        Some(chain_id) => to_eip155_v(parity, chain_id) as u8,
        None if typed => parity,
        None => 27 + parity,
    };

    let mut answer = vec![v];
    answer.extend_from_slice(&signature.to_bytes());
    answer
}

/// Installs a test subscriber honoring `RUST_LOG`
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}
