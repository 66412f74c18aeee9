//! ArtDMX packet encoding.
//!
//! One packet shape is emitted: ArtDMX (OpOutput), protocol version 14, full
//! 512-byte payload. Layout, byte for byte:
//!
//! ```text
//! offset  size  field
//!      0     8  "Art-Net\0"
//!      8     2  OpCode 0x5000, little-endian
//!     10     2  ProtVer 14, high byte first
//!     12     1  Sequence (0 = disabled)
//!     13     1  Physical
//!     14     2  15-bit universe, low byte (SubUni) first
//!     16     2  Length 512, high byte first
//!     18   512  channel data
//! ```

use crate::dmx::UNIVERSE_SIZE;
use crate::fixture::UniverseId;

/// Art-Net's registered UDP port.
pub const ARTNET_PORT: u16 = 6454;

/// "Art-Net" plus the terminating NUL.
pub const ARTNET_HEADER: [u8; 8] = *b"Art-Net\0";

/// OpOutput / ArtDMX opcode.
pub const OP_OUTPUT: u16 = 0x5000;

/// Protocol revision carried in every packet.
pub const PROTOCOL_VERSION: u16 = 14;

/// Total ArtDMX packet size: 18-byte header plus the full universe.
pub const ART_DMX_LEN: usize = 18 + UNIVERSE_SIZE;

/// Encodes one ArtDMX packet.
///
/// `sequence` 0 means sequencing disabled; the router hands out 1..=255.
pub fn encode_art_dmx(
    universe: UniverseId,
    sequence: u8,
    physical: u8,
    data: &[u8; UNIVERSE_SIZE],
) -> [u8; ART_DMX_LEN] {
    let mut packet = [0u8; ART_DMX_LEN];
    packet[0..8].copy_from_slice(&ARTNET_HEADER);
    packet[8..10].copy_from_slice(&OP_OUTPUT.to_le_bytes());
    packet[10..12].copy_from_slice(&PROTOCOL_VERSION.to_be_bytes());
    packet[12] = sequence;
    packet[13] = physical;
    // 15-bit port address: SubUni low byte, Net in the high byte's low 7 bits.
    let port_address = universe.get() & 0x7FFF;
    packet[14] = (port_address & 0xFF) as u8;
    packet[15] = (port_address >> 8) as u8;
    packet[16..18].copy_from_slice(&(UNIVERSE_SIZE as u16).to_be_bytes());
    packet[18..].copy_from_slice(data);
    packet
}

#[cfg(test)]
mod tests {
    use super::*;

    fn u(n: u16) -> UniverseId {
        UniverseId::new(n).unwrap()
    }

    #[test]
    fn test_header_bytes() {
        let data = [0u8; UNIVERSE_SIZE];
        let packet = encode_art_dmx(u(1), 0, 0, &data);
        assert_eq!(
            &packet[0..8],
            &[0x41, 0x72, 0x74, 0x2D, 0x4E, 0x65, 0x74, 0x00]
        );
    }

    #[test]
    fn test_opcode_little_endian() {
        let packet = encode_art_dmx(u(1), 0, 0, &[0u8; UNIVERSE_SIZE]);
        assert_eq!(packet[8], 0x00);
        assert_eq!(packet[9], 0x50);
    }

    #[test]
    fn test_protocol_version() {
        let packet = encode_art_dmx(u(1), 0, 0, &[0u8; UNIVERSE_SIZE]);
        assert_eq!(packet[10], 0x00);
        assert_eq!(packet[11], 0x0E);
    }

    #[test]
    fn test_universe_low_byte_first() {
        let packet = encode_art_dmx(u(5), 0, 0, &[0u8; UNIVERSE_SIZE]);
        assert_eq!(packet[14], 0x05);
        assert_eq!(packet[15], 0x00);

        // Universe 0x1234: SubUni 0x34, Net 0x12.
        let packet = encode_art_dmx(u(0x1234), 0, 0, &[0u8; UNIVERSE_SIZE]);
        assert_eq!(packet[14], 0x34);
        assert_eq!(packet[15], 0x12);
    }

    #[test]
    fn test_length_big_endian_512() {
        let packet = encode_art_dmx(u(1), 0, 0, &[0u8; UNIVERSE_SIZE]);
        assert_eq!(packet[16], 0x02);
        assert_eq!(packet[17], 0x00);
        assert_eq!(packet.len(), 530);
    }

    #[test]
    fn test_payload_follows_header() {
        let mut data = [0u8; UNIVERSE_SIZE];
        data[0] = 255;
        data[511] = 42;
        let packet = encode_art_dmx(u(1), 7, 0, &data);
        assert_eq!(packet[12], 7);
        assert_eq!(packet[18], 255);
        assert_eq!(packet[529], 42);
    }

    #[test]
    fn test_documented_wire_prefix() {
        // Universe 5, first channel 255: the documented on-wire prefix.
        let mut data = [0u8; UNIVERSE_SIZE];
        data[0] = 255;
        let packet = encode_art_dmx(u(5), 1, 0, &data);
        let expected: [u8; 19] = [
            0x41, 0x72, 0x74, 0x2D, 0x4E, 0x65, 0x74, 0x00, // "Art-Net\0"
            0x00, 0x50, // OpOutput
            0x00, 0x0E, // ProtVer 14
            0x01, // sequence
            0x00, // physical
            0x05, 0x00, // universe 5
            0x02, 0x00, // length 512
            0xFF, // channel 1
        ];
        assert_eq!(&packet[..19], &expected);
    }
}
