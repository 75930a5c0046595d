use rlp::{Decodable, DecoderError, Encodable, Rlp, RlpStream};
use serde::{
    de::{Error, Unexpected},
    Deserialize, Deserializer, Serialize, Serializer,
};
use std::{
    fmt,
    ops::Deref,
    str::FromStr,
};

/// Wrapper type around [`bytes::Bytes`] which (de)serializes as a "0x" prefixed hex string
/// and RLP-encodes as a byte string.
#[derive(Clone, Default, PartialEq, Eq, Hash, Ord, PartialOrd, Serialize, Deserialize)]
pub struct Bytes(
    #[serde(serialize_with = "serialize_bytes", deserialize_with = "deserialize_bytes")]
    pub bytes::Bytes,
);

impl Bytes {
    /// Creates an empty byte buffer
    pub fn new() -> Self {
        Self(bytes::Bytes::new())
    }

    pub fn to_vec(&self) -> Vec<u8> {
        self.as_ref().to_vec()
    }
}

impl fmt::Debug for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Bytes(0x{})", hex::encode(self.as_ref()))
    }
}

impl fmt::Display for Bytes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.as_ref()))
    }
}

impl AsRef<[u8]> for Bytes {
    fn as_ref(&self) -> &[u8] {
        self.0.as_ref()
    }
}

impl Deref for Bytes {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        self.as_ref()
    }
}

impl From<bytes::Bytes> for Bytes {
    fn from(src: bytes::Bytes) -> Self {
        Self(src)
    }
}

impl From<Vec<u8>> for Bytes {
    fn from(src: Vec<u8>) -> Self {
        Self(src.into())
    }
}

impl From<&[u8]> for Bytes {
    fn from(src: &[u8]) -> Self {
        Self(bytes::Bytes::copy_from_slice(src))
    }
}

impl<const N: usize> From<[u8; N]> for Bytes {
    fn from(src: [u8; N]) -> Self {
        src.to_vec().into()
    }
}

impl FromStr for Bytes {
    type Err = hex::FromHexError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let value = value.strip_prefix("0x").unwrap_or(value);
        hex::decode(value).map(Into::into)
    }
}

impl Encodable for Bytes {
    fn rlp_append(&self, s: &mut RlpStream) {
        s.append(&self.as_ref());
    }
}

impl Decodable for Bytes {
    fn decode(rlp: &Rlp<'_>) -> Result<Self, DecoderError> {
        Ok(rlp.data()?.into())
    }
}

pub fn serialize_bytes<S, T>(x: T, s: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
    T: AsRef<[u8]>,
{
    s.serialize_str(&format!("0x{}", hex::encode(x.as_ref())))
}

pub fn deserialize_bytes<'de, D>(d: D) -> Result<bytes::Bytes, D::Error>
where
    D: Deserializer<'de>,
{
    let value = String::deserialize(d)?;
    if let Some(value) = value.strip_prefix("0x") {
        let bytes: Vec<u8> =
            hex::decode(value).map_err(|e| Error::custom(format!("Invalid hex: {e}")))?;
        Ok(bytes.into())
    } else {
        Err(Error::invalid_value(Unexpected::Str(&value), &"0x prefix"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_formatting() {
        let b = Bytes::from(vec![1, 35, 69, 103, 137, 171, 205, 239]);
        assert_eq!(b.to_string(), "0x0123456789abcdef");
        assert_eq!(format!("{b:?}"), "Bytes(0x0123456789abcdef)");
    }

    #[test]
    fn serde_requires_prefix() {
        let b: Bytes = serde_json::from_str("\"0xdead\"").unwrap();
        assert_eq!(b.as_ref(), &[0xde, 0xad]);
        assert_eq!(serde_json::to_string(&b).unwrap(), "\"0xdead\"");
        assert!(serde_json::from_str::<Bytes>("\"dead\"").is_err());
    }

    #[test]
    fn rlp_encodes_as_byte_string() {
        let empty = Bytes::new();
        assert_eq!(rlp::encode(&empty).to_vec(), vec![0x80]);

        let single = Bytes::from(vec![0x7f]);
        assert_eq!(rlp::encode(&single).to_vec(), vec![0x7f]);

        let decoded: Bytes = rlp::decode(&[0x82, 0xbe, 0xef]).unwrap();
        assert_eq!(decoded, Bytes::from(vec![0xbe, 0xef]));
    }
}
