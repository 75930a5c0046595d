//! Ledger HID framing.
//!
//! APDUs travel over USB HID in fixed-size reports. Each report starts with a 5 byte header,
//! `channel:u16be ‖ tag:u8 ‖ sequence:u16be`; the first report of a message then carries the
//! total message length as a `u16be`, followed by the message bytes. Trailing bytes of the last
//! report are zero padding.
use crate::TransportError;

pub const LEDGER_VENDOR_ID: u16 = 0x2c97;
pub const LEDGER_USAGE_PAGE: u16 = 0xffa0;
pub const LEDGER_CHANNEL: u16 = 0x0101;
pub const LEDGER_PACKET_SIZE: usize = 64;

/// Tag of APDU frames
const TAG_APDU: u8 = 0x05;
const HEADER_LEN: usize = 5;

/// Splits `apdu` into HID reports of `packet_size` bytes.
pub fn wrap_command_apdu(
    channel: u16,
    apdu: &[u8],
    packet_size: usize,
) -> Result<Vec<Vec<u8>>, TransportError> {
    if packet_size <= HEADER_LEN + 2 {
        return Err(TransportError::Framing(format!("packet size {packet_size} is too small")))
    }
    let length = u16::try_from(apdu.len()).map_err(|_| TransportError::CommandTooLong(apdu.len()))?;

    let mut message = Vec::with_capacity(apdu.len() + 2);
    message.extend_from_slice(&length.to_be_bytes());
    message.extend_from_slice(apdu);

    message
        .chunks(packet_size - HEADER_LEN)
        .enumerate()
        .map(|(sequence, chunk)| {
            let sequence = u16::try_from(sequence)
                .map_err(|_| TransportError::Framing("too many packets".to_string()))?;
            let mut packet = vec![0u8; packet_size];
            packet[..2].copy_from_slice(&channel.to_be_bytes());
            packet[2] = TAG_APDU;
            packet[3..HEADER_LEN].copy_from_slice(&sequence.to_be_bytes());
            packet[HEADER_LEN..HEADER_LEN + chunk.len()].copy_from_slice(chunk);
            Ok(packet)
        })
        .collect()
}

/// Incrementally reassembles a response from HID reports.
///
/// Reports may be shorter than the nominal packet size (partial reads); whatever follows the
/// header is taken up to the announced length.
#[derive(Debug)]
pub struct ResponseAssembler {
    channel: u16,
    sequence: u16,
    length: Option<usize>,
    data: Vec<u8>,
}

impl ResponseAssembler {
    pub fn new(channel: u16) -> Self {
        Self { channel, sequence: 0, length: None, data: Vec::new() }
    }

    /// Feeds one report. Returns the complete response once the announced length is reached.
    pub fn push(&mut self, packet: &[u8]) -> Result<Option<Vec<u8>>, TransportError> {
        if packet.len() < HEADER_LEN {
            return Err(TransportError::Framing(format!("short packet of {} bytes", packet.len())))
        }
        let channel = u16::from_be_bytes([packet[0], packet[1]]);
        if channel != self.channel {
            return Err(TransportError::Framing(format!(
                "unexpected channel {channel:#06x}, expected {:#06x}",
                self.channel
            )))
        }
        if packet[2] != TAG_APDU {
            return Err(TransportError::Framing(format!("unexpected tag {:#04x}", packet[2])))
        }
        let sequence = u16::from_be_bytes([packet[3], packet[4]]);
        if sequence != self.sequence {
            return Err(TransportError::Framing(format!(
                "unexpected sequence index {sequence}, expected {}",
                self.sequence
            )))
        }
        self.sequence = self.sequence.wrapping_add(1);

        let mut body = &packet[HEADER_LEN..];
        let length = match self.length {
            Some(length) => length,
            None => {
                if body.len() < 2 {
                    return Err(TransportError::Framing("first packet misses the length".to_string()))
                }
                let length = u16::from_be_bytes([body[0], body[1]]) as usize;
                body = &body[2..];
                self.data.reserve(length);
                self.length = Some(length);
                length
            }
        };

        let missing = length - self.data.len();
        self.data.extend_from_slice(&body[..body.len().min(missing)]);

        if self.data.len() == length {
            Ok(Some(std::mem::take(&mut self.data)))
        } else {
            Ok(None)
        }
    }
}

/// Reassembles a response from a sequence of reports. Returns `None` while the response is
/// incomplete.
pub fn unwrap_response_apdu<'a, I>(channel: u16, packets: I) -> Result<Option<Vec<u8>>, TransportError>
where
    I: IntoIterator<Item = &'a [u8]>,
{
    let mut assembler = ResponseAssembler::new(channel);
    for packet in packets {
        if let Some(response) = assembler.push(packet)? {
            return Ok(Some(response))
        }
    }
    Ok(None)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unwrap_all(packets: &[Vec<u8>]) -> Option<Vec<u8>> {
        unwrap_response_apdu(LEDGER_CHANNEL, packets.iter().map(Vec::as_slice)).unwrap()
    }

    #[test]
    fn first_packet_layout() {
        let packets = wrap_command_apdu(LEDGER_CHANNEL, &[0xe0, 0x06, 0x00, 0x00, 0x00], 64).unwrap();
        assert_eq!(packets.len(), 1);
        assert_eq!(&packets[0][..12], &[0x01, 0x01, 0x05, 0x00, 0x00, 0x00, 0x05, 0xe0, 0x06, 0x00, 0x00, 0x00]);
        assert!(packets[0][12..].iter().all(|b| *b == 0));
        assert_eq!(packets[0].len(), 64);
    }

    #[test]
    fn frames_reassemble() {
        let apdu: Vec<u8> = (0..300u32).map(|i| (i * 7) as u8).collect();
        let packets = wrap_command_apdu(LEDGER_CHANNEL, &apdu, LEDGER_PACKET_SIZE).unwrap();
        // 302 bytes of message over 59 byte bodies
        assert_eq!(packets.len(), 6);
        for (index, packet) in packets.iter().enumerate() {
            assert_eq!(u16::from_be_bytes([packet[3], packet[4]]) as usize, index);
        }
        assert_eq!(unwrap_all(&packets), Some(apdu.clone()));
        assert_eq!(unwrap_all(&packets[..5]), None);
    }

    #[test]
    fn handles_partial_reads() {
        let apdu = vec![0xab; 100];
        let packets = wrap_command_apdu(LEDGER_CHANNEL, &apdu, LEDGER_PACKET_SIZE).unwrap();
        let mut assembler = ResponseAssembler::new(LEDGER_CHANNEL);
        // a truncated first report only carries 20 data bytes
        assert_eq!(assembler.push(&packets[0][..27]).unwrap(), None);
        let mut second = vec![0x01, 0x01, 0x05, 0x00, 0x01];
        second.extend_from_slice(&[0xab; 59]);
        assert_eq!(assembler.push(&second).unwrap(), None);
        // trailing bytes past the announced length are padding
        let mut third = vec![0x01, 0x01, 0x05, 0x00, 0x02];
        third.extend_from_slice(&[0xab; 30]);
        assert_eq!(assembler.push(&third).unwrap(), Some(apdu));
    }

    #[test]
    fn rejects_bad_headers() {
        let packets = wrap_command_apdu(LEDGER_CHANNEL, &[0u8; 80], LEDGER_PACKET_SIZE).unwrap();

        let mut wrong_channel = packets[0].clone();
        wrong_channel[1] = 0x02;
        assert!(matches!(
            ResponseAssembler::new(LEDGER_CHANNEL).push(&wrong_channel),
            Err(TransportError::Framing(_))
        ));

        let mut wrong_tag = packets[0].clone();
        wrong_tag[2] = 0x02;
        assert!(ResponseAssembler::new(LEDGER_CHANNEL).push(&wrong_tag).is_err());

        let mut assembler = ResponseAssembler::new(LEDGER_CHANNEL);
        assert!(assembler.push(&packets[1]).is_err());

        assert!(ResponseAssembler::new(LEDGER_CHANNEL).push(&[0x01, 0x01]).is_err());
    }
}
