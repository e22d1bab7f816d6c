//! BPDU encoding and decoding.
//!
//! # Wire Format
//!
//! All multi-octet fields are big-endian. No padding.
//!
//! ```text
//!  offset  size  field
//!  0       2     protocol id (0)
//!  2       1     protocol version (0 = STP, 2 = RST)
//!  3       1     type (0x00 Config, 0x02 RST, 0x80 TCN)
//!  ── TCN ends here (4 octets) ──
//!  4       1     flags
//!  5       8     root id        (priority u16, MAC 6)
//!  13      4     root path cost
//!  17      8     bridge id      (priority u16, MAC 6)
//!  25      2     port id        (priority u8, number u8)
//!  27      2     message age    (1/256 s)
//!  29      2     max age
//!  31      2     hello time
//!  33      2     forward delay
//!  ── Config ends here (35 octets) ──
//!  35      1     version 1 length (0)
//!  ── RST ends here (36 octets) ──
//! ```

use crate::BpduFlags;
use bytes::{Buf, BufMut, Bytes, BytesMut};
use rapidspan_types::{BpduTime, MacAddress, PortId, PortNumber, Priority, SwitchId, Times};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Protocol identifier shared by every BPDU.
pub const PROTOCOL_ID: u16 = 0x0000;

/// Protocol version of STP Config and TCN BPDUs.
pub const VERSION_STP: u8 = 0;

/// Protocol version of RST BPDUs.
pub const VERSION_RST: u8 = 2;

const TYPE_CONFIG: u8 = 0x00;
const TYPE_RST: u8 = 0x02;
const TYPE_TCN: u8 = 0x80;

/// Encoded length of a TCN BPDU.
pub const TCN_LEN: usize = 4;

/// Encoded length of a Config BPDU.
pub const CONFIG_LEN: usize = 35;

/// Encoded length of an RST BPDU.
pub const RST_LEN: usize = 36;

/// Errors that reject a received BPDU.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BpduError {
    #[error("BPDU too short: {0} octets")]
    TooShort(usize),

    #[error("Unexpected protocol id {0:#06x}")]
    BadProtocolId(u16),

    #[error("Unknown BPDU version {version} / type {kind:#04x}")]
    UnknownType { version: u8, kind: u8 },

    #[error("BPDU has wrong length: expected {expected}, got {actual}")]
    BadLength { expected: usize, actual: usize },

    #[error("Message age {message_age:?} not below max age {max_age:?}")]
    MessageAgeExceeded {
        message_age: BpduTime,
        max_age: BpduTime,
    },
}

/// BPDU kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BpduType {
    Config,
    Rst,
    Tcn,
}

/// Body shared by Config and RST BPDUs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConfigBody {
    pub flags: BpduFlags,
    pub root_id: SwitchId,
    pub root_path_cost: u32,
    pub switch_id: SwitchId,
    pub port_id: PortId,
    pub message_age: BpduTime,
    pub max_age: BpduTime,
    pub hello_time: BpduTime,
    pub forward_delay: BpduTime,
}

impl ConfigBody {
    /// Build a body from an advertised priority and timer set.
    pub fn from_priority(flags: BpduFlags, priority: &Priority, times: &Times) -> Self {
        Self {
            flags,
            root_id: priority.root_id,
            root_path_cost: priority.root_path_cost,
            switch_id: priority.designated_switch_id,
            port_id: priority.designated_port_id,
            message_age: BpduTime::from_duration(times.message_age),
            max_age: BpduTime::from_duration(times.max_age),
            hello_time: BpduTime::from_duration(times.hello_time),
            forward_delay: BpduTime::from_duration(times.forward_delay),
        }
    }

    /// The four-field priority carried by this BPDU.
    pub fn priority(&self) -> Priority {
        Priority::new(self.root_id, self.root_path_cost, self.switch_id, self.port_id)
    }

    /// The timer set carried by this BPDU, converted back to durations.
    pub fn times(&self) -> Times {
        Times::new(
            self.message_age.to_duration(),
            self.max_age.to_duration(),
            self.hello_time.to_duration(),
            self.forward_delay.to_duration(),
        )
    }

    fn put(&self, buf: &mut BytesMut) {
        buf.put_u8(self.flags.0);
        put_switch_id(buf, &self.root_id);
        buf.put_u32(self.root_path_cost);
        put_switch_id(buf, &self.switch_id);
        buf.put_u8(self.port_id.priority);
        buf.put_u8(self.port_id.number.0);
        buf.put_u16(self.message_age.0);
        buf.put_u16(self.max_age.0);
        buf.put_u16(self.hello_time.0);
        buf.put_u16(self.forward_delay.0);
    }

    fn get(buf: &mut &[u8]) -> Self {
        let flags = BpduFlags(buf.get_u8());
        let root_id = get_switch_id(buf);
        let root_path_cost = buf.get_u32();
        let switch_id = get_switch_id(buf);
        let port_id = PortId::new(buf.get_u8(), PortNumber(buf.get_u8()));
        Self {
            flags,
            root_id,
            root_path_cost,
            switch_id,
            port_id,
            message_age: BpduTime(buf.get_u16()),
            max_age: BpduTime(buf.get_u16()),
            hello_time: BpduTime(buf.get_u16()),
            forward_delay: BpduTime(buf.get_u16()),
        }
    }
}

fn put_switch_id(buf: &mut BytesMut, id: &SwitchId) {
    buf.put_u16(id.priority);
    buf.put_slice(id.address.as_bytes());
}

fn get_switch_id(buf: &mut &[u8]) -> SwitchId {
    let priority = buf.get_u16();
    let mut address = [0u8; 6];
    buf.copy_to_slice(&mut address);
    SwitchId::new(priority, MacAddress(address))
}

/// A decoded bridge protocol data unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Bpdu {
    Config(ConfigBody),
    Rst(ConfigBody),
    Tcn,
}

impl Bpdu {
    pub fn kind(&self) -> BpduType {
        match self {
            Bpdu::Config(_) => BpduType::Config,
            Bpdu::Rst(_) => BpduType::Rst,
            Bpdu::Tcn => BpduType::Tcn,
        }
    }

    /// Protocol version octet this BPDU is sent with.
    pub fn version(&self) -> u8 {
        match self {
            Bpdu::Rst(_) => VERSION_RST,
            Bpdu::Config(_) | Bpdu::Tcn => VERSION_STP,
        }
    }

    /// Config/RST body, absent for TCN.
    pub fn body(&self) -> Option<&ConfigBody> {
        match self {
            Bpdu::Config(body) | Bpdu::Rst(body) => Some(body),
            Bpdu::Tcn => None,
        }
    }

    /// Encoded length in octets.
    pub fn encoded_len(&self) -> usize {
        match self {
            Bpdu::Config(_) => CONFIG_LEN,
            Bpdu::Rst(_) => RST_LEN,
            Bpdu::Tcn => TCN_LEN,
        }
    }

    /// Encode to wire format.
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.encoded_len());
        buf.put_u16(PROTOCOL_ID);
        buf.put_u8(self.version());
        match self {
            Bpdu::Config(body) => {
                buf.put_u8(TYPE_CONFIG);
                body.put(&mut buf);
            }
            Bpdu::Rst(body) => {
                buf.put_u8(TYPE_RST);
                body.put(&mut buf);
                // Version 1 length.
                buf.put_u8(0);
            }
            Bpdu::Tcn => buf.put_u8(TYPE_TCN),
        }
        buf.freeze()
    }

    /// Decode and validate a received frame.
    ///
    /// Rejects unknown protocol ids, unknown version/type pairs, frames whose
    /// length does not match their type exactly, and Config/RST BPDUs whose
    /// message age is not strictly below max age.
    pub fn decode(frame: &[u8]) -> Result<Self, BpduError> {
        if frame.len() < TCN_LEN {
            return Err(BpduError::TooShort(frame.len()));
        }
        let mut buf = frame;
        let protocol_id = buf.get_u16();
        if protocol_id != PROTOCOL_ID {
            return Err(BpduError::BadProtocolId(protocol_id));
        }
        let version = buf.get_u8();
        let kind = buf.get_u8();

        let expected = match (version, kind) {
            (VERSION_STP, TYPE_CONFIG) => CONFIG_LEN,
            (VERSION_STP, TYPE_TCN) => TCN_LEN,
            (VERSION_RST, TYPE_RST) => RST_LEN,
            _ => return Err(BpduError::UnknownType { version, kind }),
        };
        if frame.len() != expected {
            return Err(BpduError::BadLength {
                expected,
                actual: frame.len(),
            });
        }

        if kind == TYPE_TCN {
            return Ok(Bpdu::Tcn);
        }

        let body = ConfigBody::get(&mut buf);
        if body.message_age >= body.max_age {
            return Err(BpduError::MessageAgeExceeded {
                message_age: body.message_age,
                max_age: body.max_age,
            });
        }
        Ok(if kind == TYPE_RST {
            Bpdu::Rst(body)
        } else {
            Bpdu::Config(body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;
    use std::time::Duration;

    fn sample_body() -> ConfigBody {
        ConfigBody {
            flags: BpduFlags::empty()
                .with_role(rapidspan_types::PortRole::Designated)
                .with_proposal(true),
            root_id: SwitchId::new(4096, MacAddress([0, 1, 2, 3, 4, 5])),
            root_path_cost: 20_000,
            switch_id: SwitchId::new(32768, MacAddress([0xa, 0xb, 0xc, 0xd, 0xe, 0xf])),
            port_id: PortId::new(128, PortNumber(3)),
            message_age: BpduTime(256),
            max_age: BpduTime(20 * 256),
            hello_time: BpduTime(2 * 256),
            forward_delay: BpduTime(15 * 256),
        }
    }

    #[test]
    fn test_config_layout_is_bit_exact() {
        let bytes = Bpdu::Config(sample_body()).encode();
        assert_eq!(bytes.len(), CONFIG_LEN);
        let expected: [u8; CONFIG_LEN] = [
            0x00, 0x00, // protocol id
            0x00, // version
            0x00, // type
            0x0e, // flags: proposal + designated
            0x10, 0x00, 0, 1, 2, 3, 4, 5, // root id
            0x00, 0x00, 0x4e, 0x20, // cost 20000
            0x80, 0x00, 0xa, 0xb, 0xc, 0xd, 0xe, 0xf, // bridge id
            0x80, 0x03, // port id
            0x01, 0x00, // message age 1s
            0x14, 0x00, // max age 20s
            0x02, 0x00, // hello 2s
            0x0f, 0x00, // forward delay 15s
        ];
        assert_eq!(&bytes[..], &expected[..]);
    }

    #[test]
    fn test_rst_and_tcn_layout() {
        let rst = Bpdu::Rst(sample_body()).encode();
        assert_eq!(rst.len(), RST_LEN);
        assert_eq!(&rst[..4], &[0, 0, 2, 2]);
        assert_eq!(rst[35], 0);

        let tcn = Bpdu::Tcn.encode();
        assert_eq!(&tcn[..], &[0, 0, 0, 0x80]);
        assert_eq!(Bpdu::decode(&tcn), Ok(Bpdu::Tcn));
    }

    #[test]
    fn test_round_trip_random_bodies() {
        let mut rng = ChaCha8Rng::seed_from_u64(7);
        for i in 0..500 {
            let max_age_secs = rng.gen_range(6..=40u64);
            let original = Times::new(
                Duration::from_millis(rng.gen_range(0..max_age_secs * 1000 - 10)),
                Duration::from_secs(max_age_secs),
                Duration::from_millis(rng.gen_range(1000..=10_000)),
                Duration::from_millis(rng.gen_range(4000..=30_000)),
            );
            let priority = Priority::new(
                SwitchId::new(rng.gen(), MacAddress(rng.gen())),
                rng.gen(),
                SwitchId::new(rng.gen(), MacAddress(rng.gen())),
                PortId::new(rng.gen(), PortNumber(rng.gen())),
            );
            let flags = BpduFlags(rng.gen());
            let body = ConfigBody::from_priority(flags, &priority, &original);
            let bpdu = if i % 2 == 0 {
                Bpdu::Config(body)
            } else {
                Bpdu::Rst(body)
            };

            let decoded = Bpdu::decode(&bpdu.encode()).unwrap();
            assert_eq!(decoded, bpdu);

            let decoded_body = decoded.body().unwrap();
            assert_eq!(decoded_body.priority(), priority);
            assert_eq!(decoded_body.flags, flags);

            let times = decoded_body.times();
            for (got, want) in [
                (times.message_age, original.message_age),
                (times.max_age, original.max_age),
                (times.hello_time, original.hello_time),
                (times.forward_delay, original.forward_delay),
            ] {
                assert!(got <= want, "time rounded up: {got:?} > {want:?}");
                assert!(want - got < Duration::from_nanos(3_906_250));
            }
            // Whole seconds are multiples of 1/256 s.
            assert_eq!(times.max_age, original.max_age);
        }
    }

    #[test]
    fn test_rejects_bad_protocol_id() {
        let mut bytes = Bpdu::Config(sample_body()).encode().to_vec();
        bytes[1] = 0x01;
        assert_eq!(Bpdu::decode(&bytes), Err(BpduError::BadProtocolId(1)));
    }

    #[test]
    fn test_rejects_unknown_version_type_pairs() {
        for (version, kind) in [(0u8, 2u8), (2, 0), (2, 0x80), (1, 0), (3, 2)] {
            let frame = [0, 0, version, kind];
            assert_eq!(
                Bpdu::decode(&frame),
                Err(BpduError::UnknownType { version, kind })
            );
        }
    }

    #[test]
    fn test_rejects_wrong_length() {
        let config = Bpdu::Config(sample_body()).encode();
        assert_eq!(
            Bpdu::decode(&config[..34]),
            Err(BpduError::BadLength {
                expected: CONFIG_LEN,
                actual: 34
            })
        );

        let mut rst = Bpdu::Rst(sample_body()).encode().to_vec();
        rst.push(0);
        assert!(matches!(
            Bpdu::decode(&rst),
            Err(BpduError::BadLength { expected: RST_LEN, .. })
        ));

        assert_eq!(Bpdu::decode(&[0, 0, 0]), Err(BpduError::TooShort(3)));
        assert!(matches!(
            Bpdu::decode(&[0, 0, 0, 0x80, 0]),
            Err(BpduError::BadLength { expected: TCN_LEN, .. })
        ));
    }

    #[test]
    fn test_rejects_message_age_at_max_age() {
        let mut body = sample_body();
        body.message_age = body.max_age;
        assert_eq!(
            Bpdu::decode(&Bpdu::Config(body).encode()),
            Err(BpduError::MessageAgeExceeded {
                message_age: body.max_age,
                max_age: body.max_age
            })
        );

        body.message_age = BpduTime(body.max_age.0 - 1);
        assert!(Bpdu::decode(&Bpdu::Rst(body).encode()).is_ok());
    }
}
