use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::ecf::{Crc16, ErrorControl};
use crate::error::{FrameError, Result};

/// Maximum size of a frame on the bus (header + payload + ECF).
pub const BUS_SIZE: usize = 127;

/// Packed header: type/APID byte + ECF flag/length byte.
pub const HEADER_SIZE: usize = 2;

/// Error Control Field: big-endian CRC-16.
pub const ECF_SIZE: usize = 2;

/// Maximum payload size.
pub const DATA_SIZE: usize = BUS_SIZE - ECF_SIZE - HEADER_SIZE;

/// Smallest valid frame (empty payload).
pub const MIN_FRAME_SIZE: usize = HEADER_SIZE + ECF_SIZE;

/// Highest APID addressable with 7 bits.
pub const MAX_APID: u8 = 0x7F;

/// Position of the flag bit (packet type, ECF flag) in each header byte.
const FLAG_SHIFT: u8 = 7;
const FIELD_MASK: u8 = 0x7F;

/// Value written in the ECF slot when no ECF is carried.
const ECF_SENTINEL: u16 = 0x0000;

/// Packet category, carried in the top bit of header byte 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum PacketType {
    /// Telemetry.
    Tm = 0,
    /// Telecommand.
    Tc = 1,
}

impl TryFrom<u8> for PacketType {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(PacketType::Tm),
            1 => Ok(PacketType::Tc),
            other => Err(FrameError::InvalidPacketType(other)),
        }
    }
}

impl From<PacketType> for u8 {
    fn from(value: PacketType) -> Self {
        value as u8
    }
}

/// Whether the ECF is meaningful, carried in the top bit of header byte 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
#[repr(u8)]
pub enum EcfFlag {
    Absent = 0,
    Present = 1,
}

impl TryFrom<u8> for EcfFlag {
    type Error = FrameError;

    fn try_from(value: u8) -> Result<Self> {
        match value {
            0 => Ok(EcfFlag::Absent),
            1 => Ok(EcfFlag::Present),
            other => Err(FrameError::InvalidEcfFlag(other)),
        }
    }
}

impl From<EcfFlag> for u8 {
    fn from(value: EcfFlag) -> Self {
        value as u8
    }
}

/// A logical bus packet.
///
/// `data` always has room for [`DATA_SIZE`] bytes; only `data[..length]` is
/// meaningful and the rest is zero. Fields are read-only so every instance,
/// whether built through [`Packet::new`] or [`decode`], keeps
/// `length <= DATA_SIZE`, `apid <= MAX_APID` and an ECF that matches its
/// header and payload.
///
/// ```compile_fail
/// use buspacket_frame::{EcfFlag, Packet, PacketType};
///
/// let mut packet = Packet::new(PacketType::Tm, 1, EcfFlag::Present, b"x").unwrap();
/// packet.length = 200;
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    packet_type: PacketType,
    apid: u8,
    ecf_flag: EcfFlag,
    length: u8,
    data: [u8; DATA_SIZE],
    ecf: u16,
}

impl Packet {
    /// Build a packet, computing the ECF with the bus CRC when requested.
    pub fn new(
        packet_type: PacketType,
        apid: u8,
        ecf_flag: EcfFlag,
        payload: &[u8],
    ) -> Result<Self> {
        Self::new_with(packet_type, apid, ecf_flag, payload, &Crc16)
    }

    /// Build a packet with an explicit checksum.
    pub fn new_with<C: ErrorControl + ?Sized>(
        packet_type: PacketType,
        apid: u8,
        ecf_flag: EcfFlag,
        payload: &[u8],
        checksum: &C,
    ) -> Result<Self> {
        check_apid(apid)?;
        if payload.len() > DATA_SIZE {
            return Err(FrameError::PayloadTooLarge {
                size: payload.len(),
                max: DATA_SIZE,
            });
        }

        let mut data = [0u8; DATA_SIZE];
        data[..payload.len()].copy_from_slice(payload);

        let mut packet = Self {
            packet_type,
            apid,
            ecf_flag,
            length: payload.len() as u8,
            data,
            ecf: ECF_SENTINEL,
        };
        if ecf_flag == EcfFlag::Present {
            let mut scratch = [0u8; BUS_SIZE];
            let covered = packet.write_covered(&mut scratch);
            packet.ecf = checksum.compute(&scratch[..covered]);
        }
        Ok(packet)
    }

    pub fn packet_type(&self) -> PacketType {
        self.packet_type
    }

    pub fn apid(&self) -> u8 {
        self.apid
    }

    pub fn ecf_flag(&self) -> EcfFlag {
        self.ecf_flag
    }

    /// Payload length in bytes.
    pub fn length(&self) -> u8 {
        self.length
    }

    /// Received or computed ECF. Zero when `ecf_flag` is absent.
    pub fn ecf(&self) -> u16 {
        self.ecf
    }

    /// The meaningful payload bytes.
    pub fn payload(&self) -> &[u8] {
        &self.data[..self.payload_len()]
    }

    /// Total wire size of this packet (header + payload + ECF).
    pub fn wire_size(&self) -> usize {
        HEADER_SIZE + self.payload_len() + ECF_SIZE
    }

    /// Packed header bytes.
    pub fn header(&self) -> [u8; HEADER_SIZE] {
        [
            (u8::from(self.packet_type) << FLAG_SHIFT) | (self.apid & FIELD_MASK),
            (u8::from(self.ecf_flag) << FLAG_SHIFT) | (self.length & FIELD_MASK),
        ]
    }

    /// Append the wire form of this packet to `dst`.
    ///
    /// ```text
    /// ┌────────────────┬─────────────────┬──────────────┬────────────┐
    /// │ byte 0         │ byte 1          │ payload      │ ECF        │
    /// │ type:1 apid:7  │ ecf:1 length:7  │ length bytes │ 2B BE      │
    /// └────────────────┴─────────────────┴──────────────┴────────────┘
    /// ```
    pub fn packetize(&self, dst: &mut BytesMut) {
        dst.reserve(self.wire_size());
        dst.put_slice(&self.header());
        dst.put_slice(self.payload());
        match self.ecf_flag {
            EcfFlag::Present => dst.put_u16(self.ecf),
            EcfFlag::Absent => dst.put_u16(ECF_SENTINEL),
        }
    }

    /// Wire form as an owned buffer.
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.packetize(&mut buf);
        buf.freeze()
    }

    fn payload_len(&self) -> usize {
        usize::from(self.length).min(DATA_SIZE)
    }

    // Header + payload into `scratch`, returning the covered length.
    fn write_covered(&self, scratch: &mut [u8; BUS_SIZE]) -> usize {
        let len = self.payload_len();
        scratch[..HEADER_SIZE].copy_from_slice(&self.header());
        scratch[HEADER_SIZE..HEADER_SIZE + len].copy_from_slice(self.payload());
        HEADER_SIZE + len
    }
}

/// Encode and packetize a payload into a wire frame of exactly
/// `data_length + 4` bytes.
///
/// Only the first `data_length` bytes of `data` are framed.
pub fn encode_packetize(
    packet_type: PacketType,
    apid: u8,
    ecf_flag: EcfFlag,
    data: &[u8],
    data_length: usize,
) -> Result<Bytes> {
    encode_packetize_with(packet_type, apid, ecf_flag, data, data_length, &Crc16)
}

/// [`encode_packetize`] with an explicit checksum.
pub fn encode_packetize_with<C: ErrorControl + ?Sized>(
    packet_type: PacketType,
    apid: u8,
    ecf_flag: EcfFlag,
    data: &[u8],
    data_length: usize,
    checksum: &C,
) -> Result<Bytes> {
    if data_length > DATA_SIZE {
        return Err(FrameError::PayloadTooLarge {
            size: data_length,
            max: DATA_SIZE,
        });
    }
    if data_length > data.len() {
        return Err(FrameError::LengthExceedsData {
            length: data_length,
            available: data.len(),
        });
    }

    let packet = Packet::new_with(packet_type, apid, ecf_flag, &data[..data_length], checksum)?;
    Ok(packet.to_bytes())
}

/// Decode and validate a frame.
///
/// `frame` may be longer than the frame it holds; trailing bytes are ignored.
///
/// A frame flagged `Absent` must carry `0x0000` in its ECF slot. The original
/// bus library never looked at that slot; checking it here means a flipped
/// ECF flag bit is still reported as an integrity failure.
pub fn decode(frame: &[u8]) -> Result<Packet> {
    decode_with(frame, &Crc16)
}

/// [`decode`] with an explicit checksum.
pub fn decode_with<C: ErrorControl + ?Sized>(frame: &[u8], checksum: &C) -> Result<Packet> {
    let total = frame_size(frame)?;
    if frame.len() < total {
        return Err(FrameError::Truncated {
            needed: total,
            available: frame.len(),
        });
    }

    let packet_type = PacketType::try_from(frame[0] >> FLAG_SHIFT)?;
    let apid = frame[0] & FIELD_MASK;
    let ecf_flag = EcfFlag::try_from(frame[1] >> FLAG_SHIFT)?;
    let length = frame[1] & FIELD_MASK;

    let covered = total - ECF_SIZE;
    let received = u16::from_be_bytes([frame[covered], frame[covered + 1]]);

    let expected = match ecf_flag {
        EcfFlag::Present => checksum.compute(&frame[..covered]),
        EcfFlag::Absent => ECF_SENTINEL,
    };
    if received != expected {
        return Err(FrameError::EcfMismatch { received, expected });
    }

    let mut data = [0u8; DATA_SIZE];
    data[..usize::from(length)].copy_from_slice(&frame[HEADER_SIZE..covered]);

    Ok(Packet {
        packet_type,
        apid,
        ecf_flag,
        length,
        data,
        ecf: received,
    })
}

/// Total frame size announced by a header.
///
/// Needs at least [`MIN_FRAME_SIZE`] bytes so the shortest legal frame is
/// covered; fails if the announced payload exceeds [`DATA_SIZE`].
pub fn frame_size(header: &[u8]) -> Result<usize> {
    if header.len() < MIN_FRAME_SIZE {
        return Err(FrameError::Truncated {
            needed: MIN_FRAME_SIZE,
            available: header.len(),
        });
    }
    let length = usize::from(header[1] & FIELD_MASK);
    if length > DATA_SIZE {
        return Err(FrameError::LengthOutOfRange {
            length,
            max: DATA_SIZE,
        });
    }
    Ok(HEADER_SIZE + length + ECF_SIZE)
}

fn check_apid(apid: u8) -> Result<()> {
    if apid > MAX_APID {
        return Err(FrameError::ApidOutOfRange {
            apid,
            max: MAX_APID,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    const SCENARIO: [u8; 6] = [100, 1, 12, 234, 34, 5];

    #[test]
    fn test_layout_constants() {
        assert_eq!(DATA_SIZE, 123);
        assert_eq!(MIN_FRAME_SIZE, 4);
        assert_eq!(HEADER_SIZE + DATA_SIZE + ECF_SIZE, BUS_SIZE);
    }

    #[test]
    fn test_telecommand_scenario_wire_bytes() {
        let frame = encode_packetize(PacketType::Tc, 40, EcfFlag::Present, &SCENARIO, 6).unwrap();

        assert_eq!(
            frame.as_ref(),
            &[0xA8, 0x86, 100, 1, 12, 234, 34, 5, 0x79, 0xE4]
        );
    }

    #[test]
    fn test_telecommand_scenario_roundtrip() {
        let frame = encode_packetize(PacketType::Tc, 40, EcfFlag::Present, &SCENARIO, 6).unwrap();
        assert_eq!(frame.len(), 10);

        let packet = decode(&frame).unwrap();
        assert_eq!(packet.packet_type, PacketType::Tc);
        assert_eq!(packet.apid, 40);
        assert_eq!(packet.ecf_flag, EcfFlag::Present);
        assert_eq!(packet.length, 6);
        assert_eq!(packet.payload(), &SCENARIO);
        assert_eq!(packet.ecf, 0x79E4);
    }

    #[test]
    fn test_empty_payload() {
        let frame = encode_packetize(PacketType::Tm, 0, EcfFlag::Absent, &[], 0).unwrap();
        assert_eq!(frame.as_ref(), &[0x00, 0x00, 0x00, 0x00]);

        let packet = decode(&frame).unwrap();
        assert_eq!(packet.packet_type, PacketType::Tm);
        assert_eq!(packet.length, 0);
        assert!(packet.payload().is_empty());
        assert_eq!(packet.ecf, 0);
    }

    #[test]
    fn test_max_payload() {
        let payload = [0x5A; DATA_SIZE];
        let frame =
            encode_packetize(PacketType::Tm, MAX_APID, EcfFlag::Present, &payload, DATA_SIZE)
                .unwrap();
        assert_eq!(frame.len(), BUS_SIZE);

        let packet = decode(&frame).unwrap();
        assert_eq!(packet.apid, MAX_APID);
        assert_eq!(packet.payload(), &payload[..]);
    }

    #[test]
    fn test_encode_payload_too_large() {
        let payload = [0u8; DATA_SIZE + 1];
        let err = encode_packetize(PacketType::Tm, 1, EcfFlag::Present, &payload, DATA_SIZE + 1)
            .unwrap_err();
        assert!(matches!(
            err,
            FrameError::PayloadTooLarge { size: 124, max: 123 }
        ));
        assert_eq!(err.kind(), ErrorKind::InvalidArgument);
    }

    #[test]
    fn test_encode_apid_out_of_range() {
        let err = encode_packetize(PacketType::Tc, 128, EcfFlag::Absent, &[1], 1).unwrap_err();
        assert!(matches!(err, FrameError::ApidOutOfRange { apid: 128, .. }));
    }

    #[test]
    fn test_encode_length_exceeds_data() {
        let err = encode_packetize(PacketType::Tc, 1, EcfFlag::Absent, &[1, 2], 3).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LengthExceedsData {
                length: 3,
                available: 2
            }
        ));
    }

    #[test]
    fn test_encode_uses_data_length_prefix() {
        let frame = encode_packetize(PacketType::Tm, 3, EcfFlag::Absent, &[9, 8, 7, 6], 2).unwrap();
        assert_eq!(frame.len(), 6);
        assert_eq!(decode(&frame).unwrap().payload(), &[9, 8]);
    }

    #[test]
    fn test_decode_too_short() {
        let err = decode(&[0x00, 0x00, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                needed: 4,
                available: 3
            }
        ));
        assert_eq!(err.kind(), ErrorKind::Malformed);
    }

    #[test]
    fn test_decode_length_out_of_range() {
        let mut buf = [0u8; BUS_SIZE + 4];
        buf[1] = 0x7C; // 124
        let err = decode(&buf).unwrap_err();
        assert!(matches!(
            err,
            FrameError::LengthOutOfRange {
                length: 124,
                max: 123
            }
        ));
    }

    #[test]
    fn test_decode_truncated_payload() {
        let frame = encode_packetize(PacketType::Tc, 40, EcfFlag::Present, &SCENARIO, 6).unwrap();
        let err = decode(&frame[..8]).unwrap_err();
        assert!(matches!(
            err,
            FrameError::Truncated {
                needed: 10,
                available: 8
            }
        ));
    }

    #[test]
    fn test_decode_ignores_trailing_bytes() {
        let frame = encode_packetize(PacketType::Tc, 40, EcfFlag::Present, &SCENARIO, 6).unwrap();
        let mut padded = [0u8; BUS_SIZE];
        padded[..frame.len()].copy_from_slice(&frame);

        let packet = decode(&padded).unwrap();
        assert_eq!(packet.payload(), &SCENARIO);
    }

    #[test]
    fn test_decode_detects_payload_corruption() {
        let frame = encode_packetize(PacketType::Tc, 40, EcfFlag::Present, &SCENARIO, 6).unwrap();
        let mut corrupt = frame.to_vec();
        corrupt[4] ^= 0x01;

        let err = decode(&corrupt).unwrap_err();
        assert!(matches!(err, FrameError::EcfMismatch { received: 0x79E4, .. }));
        assert_eq!(err.kind(), ErrorKind::Integrity);
    }

    #[test]
    fn test_decode_every_single_bit_flip_fails() {
        let frame = encode_packetize(PacketType::Tc, 40, EcfFlag::Present, &SCENARIO, 6).unwrap();
        for bit in 0..(frame.len() - ECF_SIZE) * 8 {
            let mut corrupt = frame.to_vec();
            corrupt[bit / 8] ^= 1 << (bit % 8);
            assert!(decode(&corrupt).is_err(), "bit {bit} flip went undetected");
        }
    }

    #[test]
    fn test_decode_absent_ecf_requires_sentinel() {
        let mut frame = encode_packetize(PacketType::Tm, 5, EcfFlag::Absent, &[1, 2, 3], 3)
            .unwrap()
            .to_vec();
        assert_eq!(&frame[5..], &[0x00, 0x00]);

        frame[6] = 0x01;
        let err = decode(&frame).unwrap_err();
        assert!(matches!(
            err,
            FrameError::EcfMismatch {
                received: 0x0001,
                expected: 0x0000
            }
        ));
    }

    #[test]
    fn test_packet_new_and_packetize_match_encode() {
        let packet = Packet::new(PacketType::Tc, 40, EcfFlag::Present, &SCENARIO).unwrap();
        assert_eq!(packet.ecf, 0x79E4);
        assert_eq!(packet.wire_size(), 10);
        assert_eq!(packet.header(), [0xA8, 0x86]);

        let mut buf = BytesMut::new();
        packet.packetize(&mut buf);
        let direct = encode_packetize(PacketType::Tc, 40, EcfFlag::Present, &SCENARIO, 6).unwrap();
        assert_eq!(buf.as_ref(), direct.as_ref());
    }

    #[test]
    fn test_packet_data_is_zero_padded() {
        let packet = Packet::new(PacketType::Tm, 1, EcfFlag::Absent, &[0xFF; 3]).unwrap();
        assert!(packet.data[3..].iter().all(|b| *b == 0));
        assert_eq!(packet.ecf, 0);
    }

    #[test]
    fn test_decoded_packet_reserializes_to_same_frame() {
        let frame =
            encode_packetize(PacketType::Tm, 127, EcfFlag::Present, &[0x5A; DATA_SIZE], 123)
                .unwrap();
        let packet = decode(&frame).unwrap();

        assert_eq!(packet.length(), 123);
        assert_eq!(packet.header()[1] & FIELD_MASK, packet.length());
        assert_eq!(packet.to_bytes(), frame);

        // clones carry the same header, payload and ECF
        let copy = packet.clone();
        assert_eq!(copy.to_bytes().len(), BUS_SIZE);
        assert_eq!(decode(&copy.to_bytes()).unwrap(), packet);
    }

    #[test]
    fn test_packet_new_rejects_unrepresentable_fields() {
        assert!(matches!(
            Packet::new(PacketType::Tm, 200, EcfFlag::Present, b"x"),
            Err(FrameError::ApidOutOfRange { apid: 200, .. })
        ));
        assert!(matches!(
            Packet::new(PacketType::Tm, 1, EcfFlag::Present, &[0u8; 200]),
            Err(FrameError::PayloadTooLarge { size: 200, .. })
        ));
    }

    #[test]
    fn test_frame_size() {
        assert_eq!(frame_size(&[0x00, 0x86, 0, 0]).unwrap(), 10);
        assert_eq!(frame_size(&[0x00, 0x7B, 0, 0]).unwrap(), BUS_SIZE);
        assert!(frame_size(&[0x00, 0x7C, 0, 0]).is_err());
        assert!(frame_size(&[0x00]).is_err());
    }

    #[test]
    fn test_raw_field_conversions() {
        assert_eq!(PacketType::try_from(1).unwrap(), PacketType::Tc);
        assert_eq!(EcfFlag::try_from(0).unwrap(), EcfFlag::Absent);
        assert!(matches!(
            PacketType::try_from(2),
            Err(FrameError::InvalidPacketType(2))
        ));
        assert!(matches!(
            EcfFlag::try_from(7),
            Err(FrameError::InvalidEcfFlag(7))
        ));
        assert_eq!(u8::from(PacketType::Tc), 1);
        assert_eq!(u8::from(EcfFlag::Present), 1);
    }

    #[test]
    fn test_custom_checksum() {
        let constant = |_: &[u8]| 0xBEEFu16;
        let frame = encode_packetize_with(
            PacketType::Tm,
            2,
            EcfFlag::Present,
            &[1, 2],
            2,
            &constant,
        )
        .unwrap();
        assert_eq!(&frame[4..], &[0xBE, 0xEF]);
        assert_eq!(decode_with(&frame, &constant).unwrap().ecf, 0xBEEF);
        assert!(decode(&frame).is_err());
    }
}
