//! Bridge protocol data units.
//!
//! Bit-exact encoding and validation of the three BPDU kinds exchanged by
//! spanning tree bridges:
//!
//! ```text
//!   ┌────────┬─────────┬────────┬──────────────────────────────┐
//!   │ kind   │ version │ type   │ length                       │
//!   ├────────┼─────────┼────────┼──────────────────────────────┤
//!   │ Config │ 0       │ 0x00   │ 35                           │
//!   │ TCN    │ 0       │ 0x80   │ 4                            │
//!   │ RST    │ 2       │ 0x02   │ 36                           │
//!   └────────┴─────────┴────────┴──────────────────────────────┘
//! ```
//!
//! Decoding is strict: anything that does not match one of the rows above
//! exactly is rejected with a [`BpduError`].

mod codec;
mod flags;

pub use codec::{
    Bpdu, BpduError, BpduType, ConfigBody, CONFIG_LEN, PROTOCOL_ID, RST_LEN, TCN_LEN,
    VERSION_RST, VERSION_STP,
};
pub use flags::BpduFlags;
