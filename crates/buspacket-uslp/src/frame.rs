use buspacket_frame::{Crc16, ErrorControl};
use bytes::{BufMut, Bytes, BytesMut};
use serde::Serialize;

use crate::error::{Result, UslpError};

/// Largest transfer frame on the ground link.
pub const MAX_SIZE: usize = 256;
pub const ECF_SIZE: usize = 2;
pub const TRUNCATED_HEADER_SIZE: usize = 4;
pub const BASE_HEADER_SIZE: usize = 7;
pub const DATA_HEADER_SIZE: usize = 1;
/// The VC data length is a 3-bit field.
pub const VC_DATA_MAX_SIZE: usize = 7;
pub const DATA_MAX_SIZE: usize = MAX_SIZE - TRUNCATED_HEADER_SIZE - DATA_HEADER_SIZE - ECF_SIZE;

/// Transfer Frame Version Number for USLP.
pub const TFVN: u8 = 0b1100;
pub const DEFAULT_SCID: u16 = 0x5553;
pub const DEFAULT_VCID: u8 = 0b11_1000;
pub const DEFAULT_MAP_ID: u8 = 0;
pub const DEFAULT_PROTOCOL_ID: u8 = 0;
pub const DEFAULT_CONSTRUCTION_RULE: u8 = 0b111;

const MAX_TFVN: u8 = 0x0F;
const MAX_VCID: u8 = 0x3F;
const MAX_MAP_ID: u8 = 0x0F;
const MAX_CONSTRUCTION_RULE: u8 = 0x07;
const MAX_PROTOCOL_ID: u8 = 0x1F;

/// Whether the SCID names the source or the destination of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    #[default]
    Source,
    Destination,
}

/// Fields common to both header forms.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PrimaryHeader {
    pub tfvn: u8,
    pub scid: u16,
    pub direction: Direction,
    pub vcid: u8,
    pub map_id: u8,
}

impl Default for PrimaryHeader {
    fn default() -> Self {
        Self {
            tfvn: TFVN,
            scid: DEFAULT_SCID,
            direction: Direction::Source,
            vcid: DEFAULT_VCID,
            map_id: DEFAULT_MAP_ID,
        }
    }
}

/// Extra fields carried by the full (non-truncated) header.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
pub struct FrameControl {
    /// Bypass sequence control (expedited service).
    pub expedited: bool,
    /// Frame carries protocol control commands instead of user data.
    pub protocol_command: bool,
    /// An Operational Control Field follows the data field.
    pub ocf_present: bool,
    /// Virtual channel frame data, at most [`VC_DATA_MAX_SIZE`] bytes.
    pub vc_data: Vec<u8>,
}

/// A transfer frame.
///
/// `control` is `None` for the truncated header form.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferFrame {
    pub header: PrimaryHeader,
    pub control: Option<FrameControl>,
    pub construction_rule: u8,
    pub protocol_id: u8,
    pub data: Bytes,
}

impl TransferFrame {
    /// Truncated frame with default data field header.
    pub fn truncated(header: PrimaryHeader, data: impl Into<Bytes>) -> Self {
        Self {
            header,
            control: None,
            construction_rule: DEFAULT_CONSTRUCTION_RULE,
            protocol_id: DEFAULT_PROTOCOL_ID,
            data: data.into(),
        }
    }

    /// Full-header frame with default data field header.
    pub fn full(header: PrimaryHeader, control: FrameControl, data: impl Into<Bytes>) -> Self {
        Self {
            header,
            control: Some(control),
            construction_rule: DEFAULT_CONSTRUCTION_RULE,
            protocol_id: DEFAULT_PROTOCOL_ID,
            data: data.into(),
        }
    }

    pub fn is_truncated(&self) -> bool {
        self.control.is_none()
    }

    /// Primary header size including the VC data zone.
    pub fn header_size(&self) -> usize {
        match &self.control {
            None => TRUNCATED_HEADER_SIZE,
            Some(control) => BASE_HEADER_SIZE + control.vc_data.len(),
        }
    }

    /// Total wire size of this frame.
    pub fn wire_size(&self) -> usize {
        self.header_size() + DATA_HEADER_SIZE + self.data.len() + ECF_SIZE
    }

    /// Append the wire form of this frame to `dst`.
    ///
    /// ```text
    /// byte 0  : tfvn:4 scid[15:12]
    /// byte 1  : scid[11:4]
    /// byte 2  : scid[3:0] direction:1 vcid[5:3]
    /// byte 3  : vcid[2:0] map_id:4 truncated:1
    /// full header only:
    /// byte 4-5: frame length (total bytes, BE)
    /// byte 6  : expedited:1 command:1 spare:2 ocf:1 vc_length:3
    /// byte 7..: vc data
    /// then    : construction_rule:3 protocol_id:5, data, ECF (2B BE)
    /// ```
    pub fn encode(&self, dst: &mut BytesMut) -> Result<()> {
        self.validate()?;
        let h = &self.header;
        let start = dst.len();
        dst.reserve(self.wire_size());

        dst.put_u8((h.tfvn << 4) | (h.scid >> 12) as u8);
        dst.put_u8((h.scid >> 4) as u8);
        dst.put_u8((((h.scid & 0x000F) as u8) << 4) | (direction_bit(h.direction) << 3) | (h.vcid >> 3));
        dst.put_u8(((h.vcid & 0x07) << 5) | (h.map_id << 1) | u8::from(self.is_truncated()));

        if let Some(control) = &self.control {
            dst.put_u16(self.wire_size() as u16);
            dst.put_u8(
                (u8::from(control.expedited) << 7)
                    | (u8::from(control.protocol_command) << 6)
                    | (u8::from(control.ocf_present) << 3)
                    | control.vc_data.len() as u8,
            );
            dst.put_slice(&control.vc_data);
        }

        dst.put_u8((self.construction_rule << 5) | self.protocol_id);
        dst.put_slice(&self.data);

        let ecf = Crc16.compute(&dst[start..]);
        dst.put_u16(ecf);
        Ok(())
    }

    /// Wire form as an owned buffer.
    pub fn to_bytes(&self) -> Result<Bytes> {
        let mut buf = BytesMut::with_capacity(self.wire_size());
        self.encode(&mut buf)?;
        Ok(buf.freeze())
    }

    /// Decode and validate a transfer frame.
    ///
    /// A full-header frame may be followed by trailing bytes; a truncated
    /// frame spans the whole buffer.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < TRUNCATED_HEADER_SIZE {
            return Err(UslpError::Truncated {
                needed: TRUNCATED_HEADER_SIZE,
                available: buf.len(),
            });
        }

        let header = PrimaryHeader {
            tfvn: buf[0] >> 4,
            scid: (u16::from(buf[0] & 0x0F) << 12)
                | (u16::from(buf[1]) << 4)
                | u16::from(buf[2] >> 4),
            direction: if buf[2] & 0x08 != 0 {
                Direction::Destination
            } else {
                Direction::Source
            },
            vcid: ((buf[2] & 0x07) << 3) | (buf[3] >> 5),
            map_id: (buf[3] >> 1) & 0x0F,
        };
        let truncated = buf[3] & 0x01 != 0;

        let (control, data_start, total) = if truncated {
            let total = buf.len();
            let min = TRUNCATED_HEADER_SIZE + DATA_HEADER_SIZE + ECF_SIZE;
            if total < min {
                return Err(UslpError::Truncated {
                    needed: min,
                    available: total,
                });
            }
            if total > MAX_SIZE {
                return Err(UslpError::InvalidLength { length: total });
            }
            (None, TRUNCATED_HEADER_SIZE, total)
        } else {
            if buf.len() < BASE_HEADER_SIZE {
                return Err(UslpError::Truncated {
                    needed: BASE_HEADER_SIZE,
                    available: buf.len(),
                });
            }
            let total = usize::from(u16::from_be_bytes([buf[4], buf[5]]));
            let flags = buf[6];
            let vc_length = usize::from(flags & 0x07);
            let header_size = BASE_HEADER_SIZE + vc_length;
            if total < header_size + DATA_HEADER_SIZE + ECF_SIZE || total > MAX_SIZE {
                return Err(UslpError::InvalidLength { length: total });
            }
            if buf.len() < total {
                return Err(UslpError::Truncated {
                    needed: total,
                    available: buf.len(),
                });
            }
            let control = FrameControl {
                expedited: flags & 0x80 != 0,
                protocol_command: flags & 0x40 != 0,
                ocf_present: flags & 0x08 != 0,
                vc_data: buf[BASE_HEADER_SIZE..header_size].to_vec(),
            };
            (Some(control), header_size, total)
        };

        let covered = total - ECF_SIZE;
        let received = u16::from_be_bytes([buf[covered], buf[covered + 1]]);
        let expected = Crc16.compute(&buf[..covered]);
        if received != expected {
            return Err(UslpError::EcfMismatch { received, expected });
        }

        let data_header = buf[data_start];
        Ok(Self {
            header,
            control,
            construction_rule: data_header >> 5,
            protocol_id: data_header & MAX_PROTOCOL_ID,
            data: Bytes::copy_from_slice(&buf[data_start + DATA_HEADER_SIZE..covered]),
        })
    }

    fn validate(&self) -> Result<()> {
        let h = &self.header;
        check_field("tfvn", h.tfvn, MAX_TFVN)?;
        check_field("vcid", h.vcid, MAX_VCID)?;
        check_field("map_id", h.map_id, MAX_MAP_ID)?;
        check_field(
            "construction_rule",
            self.construction_rule,
            MAX_CONSTRUCTION_RULE,
        )?;
        check_field("protocol_id", self.protocol_id, MAX_PROTOCOL_ID)?;

        if let Some(control) = &self.control {
            if control.vc_data.len() > VC_DATA_MAX_SIZE {
                return Err(UslpError::DataTooLarge {
                    size: control.vc_data.len(),
                    max: VC_DATA_MAX_SIZE,
                });
            }
        }

        let max = MAX_SIZE - (self.header_size() + DATA_HEADER_SIZE + ECF_SIZE);
        if self.data.len() > max {
            return Err(UslpError::DataTooLarge {
                size: self.data.len(),
                max,
            });
        }
        Ok(())
    }
}

fn direction_bit(direction: Direction) -> u8 {
    match direction {
        Direction::Source => 0,
        Direction::Destination => 1,
    }
}

fn check_field(field: &'static str, value: u8, max: u8) -> Result<()> {
    if value > max {
        return Err(UslpError::FieldOutOfRange {
            field,
            value: u32::from(value),
            max: u32::from(max),
        });
    }
    Ok(())
}
