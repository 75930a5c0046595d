use crate::types::{Address, H256};
use k256::{ecdsa::VerifyingKey, elliptic_curve::sec1::ToEncodedPoint, PublicKey as K256PublicKey};
use tiny_keccak::{Hasher, Keccak};

const EIP191_PREFIX: &str = "\x19Ethereum Signed Message:\n";

/// Builds the [EIP-191] (version `0x45`) personal message:
/// `"\x19Ethereum Signed Message:\n" + message.length + message`.
///
/// The Ledger Ethereum application applies this prefix on the device; hosts only need it to
/// verify the returned signature.
///
/// [EIP-191]: https://eips.ethereum.org/EIPS/eip-191
pub fn eip191_message<T: AsRef<[u8]>>(message: T) -> Vec<u8> {
    let message = message.as_ref();
    let len = message.len().to_string();

    let mut eth_message = Vec::with_capacity(EIP191_PREFIX.len() + len.len() + message.len());
    eth_message.extend_from_slice(EIP191_PREFIX.as_bytes());
    eth_message.extend_from_slice(len.as_bytes());
    eth_message.extend_from_slice(message);
    eth_message
}

/// Hash a message according to [EIP-191], see [`eip191_message`].
///
/// [EIP-191]: https://eips.ethereum.org/EIPS/eip-191
pub fn hash_message<T: AsRef<[u8]>>(message: T) -> H256 {
    H256(keccak256(eip191_message(message)))
}

/// The [EIP-712] signing digest `keccak256(0x19 ‖ 0x01 ‖ domainSeparator ‖ hashStruct(message))`.
///
/// [EIP-712]: https://eips.ethereum.org/EIPS/eip-712
pub fn typed_data_hash(domain_separator: [u8; 32], message_hash: [u8; 32]) -> H256 {
    let mut digest_input = [0u8; 2 + 32 + 32];
    digest_input[0] = 0x19;
    digest_input[1] = 0x01;
    digest_input[2..34].copy_from_slice(&domain_separator);
    digest_input[34..].copy_from_slice(&message_hash);
    H256(keccak256(digest_input))
}

/// Compute the Keccak-256 hash of input bytes.
pub fn keccak256<T: AsRef<[u8]>>(bytes: T) -> [u8; 32] {
    let mut output = [0u8; 32];

    let mut hasher = Keccak::v256();
    hasher.update(bytes.as_ref());
    hasher.finalize(&mut output);

    output
}

/// Converts an uncompressed SEC1 public key (`0x04 ‖ x ‖ y`, or the bare 64-byte `x ‖ y`) to
/// its Ethereum address. Returns `None` for any other length.
pub fn public_key_to_address(public_key: &[u8]) -> Option<Address> {
    let raw = match public_key.len() {
        65 if public_key[0] == 0x04 => &public_key[1..],
        64 => public_key,
        _ => return None,
    };
    let hash = keccak256(raw);
    Some(Address::from_slice(&hash[12..]))
}

/// Converts a k256 verifying key to its Ethereum address.
pub fn verifying_key_to_address(key: &VerifyingKey) -> Address {
    let public_key = K256PublicKey::from(key).to_encoded_point(/* compress = */ false);
    let public_key = public_key.as_bytes();
    debug_assert_eq!(public_key[0], 0x04);
    let hash = keccak256(&public_key[1..]);
    Address::from_slice(&hash[12..])
}

/// Converts an Ethereum address to the checksum encoding
/// Ref: <https://github.com/ethereum/EIPs/blob/master/EIPS/eip-55.md>
pub fn to_checksum(addr: &Address) -> String {
    let addr_hex = hex::encode(addr.as_bytes());
    let hash = hex::encode(keccak256(addr_hex.as_bytes()));

    addr_hex.as_bytes().iter().zip(hash.as_bytes()).fold(
        "0x".to_owned(),
        |mut encoded, (addr, hash)| {
            encoded.push(if *hash >= 56 {
                addr.to_ascii_uppercase() as char
            } else {
                addr.to_ascii_lowercase() as char
            });
            encoded
        },
    )
}
