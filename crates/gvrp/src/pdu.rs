//! GVRP PDU encoding and decoding.
//!
//! ```text
//!   ┌──────────────┬──────┬──────────────────────────────┬─────┬─────┐
//!   │ protocol id  │ type │ records ...                  │ 0x00│ 0x00│
//!   │ 0x00 0x01    │ 0x01 │ [len, event, vlan_hi, vlan_lo]│ end │ end │
//!   │              │      │ [2, LeaveAll]                │ attr│ PDU │
//!   └──────────────┴──────┴──────────────────────────────┴─────┴─────┘
//! ```
//!
//! Record lengths count the length octet itself.

use bytes::{BufMut, Bytes, BytesMut};
use rapidspan_garp::AttributeMessage;
use rapidspan_types::VlanId;
use thiserror::Error;

/// GARP protocol identifier.
pub const PROTOCOL_ID: u16 = 0x0001;

/// GVRP's single attribute type.
pub const VLAN_ATTRIBUTE: u8 = 0x01;

/// Largest PDU ever produced.
pub const MAX_PDU_LEN: usize = 1500;

const END_MARK: u8 = 0x00;
const LEAVE_ALL_LEN: u8 = 2;
const VLAN_RECORD_LEN: u8 = 4;

// IEEE 802.1D attribute event codes.
const EVENT_LEAVE_ALL: u8 = 0;
const EVENT_JOIN_EMPTY: u8 = 1;
const EVENT_JOIN_IN: u8 = 2;
const EVENT_LEAVE_EMPTY: u8 = 3;
const EVENT_LEAVE_IN: u8 = 4;
const EVENT_EMPTY: u8 = 5;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PduError {
    #[error("GVRP PDU truncated")]
    Truncated,

    #[error("Unexpected GARP protocol id {0:#06x}")]
    BadProtocolId(u16),

    #[error("Bad attribute length {length} for event {event}")]
    BadAttributeLength { length: u8, event: u8 },
}

/// One decoded or to-be-encoded attribute record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PduRecord {
    LeaveAll,
    Vlan {
        vlan: VlanId,
        message: AttributeMessage,
    },
}

impl PduRecord {
    fn encoded_len(&self) -> usize {
        match self {
            PduRecord::LeaveAll => LEAVE_ALL_LEN as usize,
            PduRecord::Vlan { .. } => VLAN_RECORD_LEN as usize,
        }
    }

    fn put(&self, buf: &mut BytesMut) {
        match self {
            PduRecord::LeaveAll => {
                buf.put_u8(LEAVE_ALL_LEN);
                buf.put_u8(EVENT_LEAVE_ALL);
            }
            PduRecord::Vlan { vlan, message } => {
                buf.put_u8(VLAN_RECORD_LEN);
                buf.put_u8(event_code(*message));
                buf.put_u16(vlan.0);
            }
        }
    }
}

fn event_code(message: AttributeMessage) -> u8 {
    match message {
        AttributeMessage::JoinEmpty => EVENT_JOIN_EMPTY,
        AttributeMessage::JoinIn => EVENT_JOIN_IN,
        AttributeMessage::LeaveEmpty => EVENT_LEAVE_EMPTY,
        AttributeMessage::LeaveIn => EVENT_LEAVE_IN,
        AttributeMessage::Empty => EVENT_EMPTY,
    }
}

fn message_for(code: u8) -> Option<AttributeMessage> {
    match code {
        EVENT_JOIN_EMPTY => Some(AttributeMessage::JoinEmpty),
        EVENT_JOIN_IN => Some(AttributeMessage::JoinIn),
        EVENT_LEAVE_EMPTY => Some(AttributeMessage::LeaveEmpty),
        EVENT_LEAVE_IN => Some(AttributeMessage::LeaveIn),
        EVENT_EMPTY => Some(AttributeMessage::Empty),
        _ => None,
    }
}

/// Incrementally builds one PDU, refusing records that would overflow it.
pub struct PduBuilder {
    buf: BytesMut,
    records: usize,
}

impl Default for PduBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl PduBuilder {
    pub fn new() -> Self {
        let mut buf = BytesMut::with_capacity(64);
        buf.put_u16(PROTOCOL_ID);
        buf.put_u8(VLAN_ATTRIBUTE);
        Self { buf, records: 0 }
    }

    /// Whether `record` still fits, leaving room for the two end marks.
    pub fn fits(&self, record: &PduRecord) -> bool {
        self.buf.len() + record.encoded_len() < MAX_PDU_LEN - 2
    }

    pub fn push(&mut self, record: PduRecord) {
        record.put(&mut self.buf);
        self.records += 1;
    }

    pub fn is_empty(&self) -> bool {
        self.records == 0
    }

    pub fn finish(mut self) -> Bytes {
        self.buf.put_u8(END_MARK);
        self.buf.put_u8(END_MARK);
        self.buf.freeze()
    }
}

/// Encode a complete PDU. Records beyond the size limit are dropped.
pub fn encode(records: &[PduRecord]) -> Bytes {
    let mut builder = PduBuilder::new();
    for record in records {
        if !builder.fits(record) {
            break;
        }
        builder.push(*record);
    }
    builder.finish()
}

struct Reader<'a> {
    buf: &'a [u8],
}

impl<'a> Reader<'a> {
    /// Next octet; a missing trailing end mark reads as one.
    fn next_or_end(&mut self) -> u8 {
        match self.buf.split_first() {
            Some((&b, rest)) => {
                self.buf = rest;
                b
            }
            None => END_MARK,
        }
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8], PduError> {
        if self.buf.len() < n {
            return Err(PduError::Truncated);
        }
        let (head, rest) = self.buf.split_at(n);
        self.buf = rest;
        Ok(head)
    }
}

/// Decode a received PDU into the VLAN records it carries.
///
/// Attribute lists of other types and records with unknown event codes are
/// skipped by their lengths.
pub fn decode(frame: &[u8]) -> Result<Vec<PduRecord>, PduError> {
    let mut reader = Reader { buf: frame };
    let id = reader.take(2)?;
    let protocol_id = u16::from_be_bytes([id[0], id[1]]);
    if protocol_id != PROTOCOL_ID {
        return Err(PduError::BadProtocolId(protocol_id));
    }

    let mut records = Vec::new();
    loop {
        let attribute_type = reader.next_or_end();
        if attribute_type == END_MARK {
            break;
        }
        loop {
            let length = reader.next_or_end();
            if length == END_MARK {
                break;
            }
            if length < 2 {
                return Err(PduError::BadAttributeLength { length, event: 0 });
            }
            let body = reader.take(length as usize - 1)?;
            let event = body[0];
            let value = &body[1..];
            if attribute_type != VLAN_ATTRIBUTE {
                continue;
            }
            if event == EVENT_LEAVE_ALL {
                if length != LEAVE_ALL_LEN {
                    return Err(PduError::BadAttributeLength { length, event });
                }
                records.push(PduRecord::LeaveAll);
                continue;
            }
            let Some(message) = message_for(event) else {
                continue;
            };
            if length != VLAN_RECORD_LEN {
                return Err(PduError::BadAttributeLength { length, event });
            }
            records.push(PduRecord::Vlan {
                vlan: VlanId(u16::from_be_bytes([value[0], value[1]])),
                message,
            });
        }
    }
    Ok(records)
}
