//! GID per-attribute state machine.
//!
//! Each attribute on each port carries an applicant (what this participant
//! declares) and a registrar (what it has heard declared). Both are driven by
//! the same event stream but transition independently through fixed lookup
//! tables indexed by `[event][state]`.
//!
//! State names follow the IEEE 802.1D Annex notation:
//!
//! ```text
//!   applicant:  V/A/Q/L = Very anxious, Anxious, Quiet, Leaving
//!               a/p/o   = active member, passive member, observer
//!               n       = non-participant
//!
//!   registrar:  In/Lv/L3/L2/L1/Mt  = In, Leaving (four stages), Empty
//!               suffix r = registration fixed, f = registration forbidden
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Applicant state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicantState {
    Va,
    Aa,
    Qa,
    La,
    Vp,
    Ap,
    Qp,
    Vo,
    Ao,
    Qo,
    Lo,
    Von,
    Aon,
    Qon,
}

impl ApplicantState {
    pub const ALL: [ApplicantState; 14] = [
        Self::Va,
        Self::Aa,
        Self::Qa,
        Self::La,
        Self::Vp,
        Self::Ap,
        Self::Qp,
        Self::Vo,
        Self::Ao,
        Self::Qo,
        Self::Lo,
        Self::Von,
        Self::Aon,
        Self::Qon,
    ];

    /// Whether the applicant takes part in the protocol.
    pub fn management(self) -> ApplicantManagement {
        match self {
            Self::Von | Self::Aon | Self::Qon => ApplicantManagement::NoProtocol,
            _ => ApplicantManagement::Normal,
        }
    }
}

/// Registrar state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrarState {
    Inn,
    Lv,
    L3,
    L2,
    L1,
    Mt,
    Inr,
    Lvr,
    L3r,
    L2r,
    L1r,
    Mtr,
    Inf,
    Lvf,
    L3f,
    L2f,
    L1f,
    Mtf,
}

impl RegistrarState {
    pub const ALL: [RegistrarState; 18] = [
        Self::Inn,
        Self::Lv,
        Self::L3,
        Self::L2,
        Self::L1,
        Self::Mt,
        Self::Inr,
        Self::Lvr,
        Self::L3r,
        Self::L2r,
        Self::L1r,
        Self::Mtr,
        Self::Inf,
        Self::Lvf,
        Self::L3f,
        Self::L2f,
        Self::L1f,
        Self::Mtf,
    ];

    /// Registration status: In, one of the leaving stages, or Empty.
    pub fn status(self) -> RegistrarStatus {
        match self {
            Self::Inn | Self::Inr | Self::Inf => RegistrarStatus::In,
            Self::Mt | Self::Mtr | Self::Mtf => RegistrarStatus::Empty,
            _ => RegistrarStatus::Leave,
        }
    }

    /// Which management family this state belongs to.
    pub fn management(self) -> RegistrarManagement {
        match self as usize / 6 {
            0 => RegistrarManagement::Normal,
            1 => RegistrarManagement::Fixed,
            _ => RegistrarManagement::Forbidden,
        }
    }
}

/// Coarse registrar status used for reporting and for choosing In/Empty messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrarStatus {
    In,
    Leave,
    Empty,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RegistrarManagement {
    Normal,
    Fixed,
    Forbidden,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ApplicantManagement {
    Normal,
    NoProtocol,
}

/// Events that drive a GID machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GidEvent {
    Null,
    RxLeaveEmpty,
    RxLeaveIn,
    RxEmpty,
    RxJoinEmpty,
    RxJoinIn,
    Join,
    Leave,
    NormalOperation,
    NoProtocol,
    NormalRegistration,
    FixRegistration,
    ForbidRegistration,
}

impl GidEvent {
    pub const ALL: [GidEvent; 13] = [
        Self::Null,
        Self::RxLeaveEmpty,
        Self::RxLeaveIn,
        Self::RxEmpty,
        Self::RxJoinEmpty,
        Self::RxJoinIn,
        Self::Join,
        Self::Leave,
        Self::NormalOperation,
        Self::NoProtocol,
        Self::NormalRegistration,
        Self::FixRegistration,
        Self::ForbidRegistration,
    ];
}

impl fmt::Display for GidEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Registrar indication produced by a transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Indication {
    #[default]
    None,
    Join,
    Leave,
}

/// Message kind chosen by the applicant transmit table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum TxMessage {
    None,
    Join,
    Leave,
}

/// Message for one attribute as placed in a PDU.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AttributeMessage {
    JoinEmpty,
    JoinIn,
    LeaveEmpty,
    LeaveIn,
    Empty,
}

impl AttributeMessage {
    /// The GID event a receiver applies for this message.
    pub fn received_event(self) -> GidEvent {
        match self {
            Self::JoinEmpty => GidEvent::RxJoinEmpty,
            Self::JoinIn => GidEvent::RxJoinIn,
            Self::LeaveEmpty => GidEvent::RxLeaveEmpty,
            Self::LeaveIn => GidEvent::RxLeaveIn,
            Self::Empty => GidEvent::RxEmpty,
        }
    }

    pub fn is_join(self) -> bool {
        matches!(self, Self::JoinEmpty | Self::JoinIn)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Transition tables
// ═══════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy)]
struct ApplicantEntry {
    next: ApplicantState,
    start_join_timer: bool,
}

#[derive(Debug, Clone, Copy)]
struct RegistrarEntry {
    next: RegistrarState,
    indication: Indication,
    start_leave_timer: bool,
}

#[derive(Debug, Clone, Copy)]
struct TxEntry {
    next: ApplicantState,
    message: TxMessage,
    start_join_timer: bool,
}

const fn a(next: ApplicantState) -> ApplicantEntry {
    ApplicantEntry {
        next,
        start_join_timer: false,
    }
}

const fn aj(next: ApplicantState) -> ApplicantEntry {
    ApplicantEntry {
        next,
        start_join_timer: true,
    }
}

const fn r(next: RegistrarState) -> RegistrarEntry {
    RegistrarEntry {
        next,
        indication: Indication::None,
        start_leave_timer: false,
    }
}

const fn ji(next: RegistrarState) -> RegistrarEntry {
    RegistrarEntry {
        next,
        indication: Indication::Join,
        start_leave_timer: false,
    }
}

const fn li(next: RegistrarState) -> RegistrarEntry {
    RegistrarEntry {
        next,
        indication: Indication::Leave,
        start_leave_timer: false,
    }
}

const fn lt(next: RegistrarState) -> RegistrarEntry {
    RegistrarEntry {
        next,
        indication: Indication::None,
        start_leave_timer: true,
    }
}

const fn tx(next: ApplicantState, message: TxMessage, start_join_timer: bool) -> TxEntry {
    TxEntry {
        next,
        message,
        start_join_timer,
    }
}

use ApplicantState::{Aa, Ao, Aon, Ap, La, Lo, Qa, Qo, Qon, Qp, Va, Vo, Von, Vp};
use RegistrarState::{
    Inf, Inn, Inr, L1f, L1r, L2f, L2r, L3f, L3r, Lvf, Lvr, Mtf, Mtr, L1, L2, L3, Lv, Mt,
};

const APPLICANT_IDLE: [ApplicantEntry; 14] = [
    a(Va), a(Aa), a(Qa), a(La), a(Vp), a(Ap), a(Vp), a(Vo), a(Ao), a(Qo), a(Lo), a(Von), a(Aon), a(Qon),
];

#[rustfmt::skip]
static APPLICANT_TABLE: [[ApplicantEntry; 14]; 13] = [
    //  Va       Aa      Qa       La      Vp      Ap      Qp       Vo       Ao       Qo       Lo      Von      Aon      Qon
    APPLICANT_IDLE,
    [a(Vp),  a(Vp), aj(Vp),  a(Vo), a(Vp), a(Vp), aj(Vp), aj(Lo),  aj(Lo),  aj(Lo),  a(Vo), a(Von), a(Von), a(Von)],   // rx LeaveEmpty
    [a(Va),  a(Va), aj(Vp),  a(La), a(Vp), a(Vp), aj(Vp), a(Lo),   a(Lo),   aj(Lo),  a(Vo), a(Von), a(Von), a(Von)],   // rx LeaveIn
    [a(Va),  a(Va), aj(Va),  a(La), a(Vp), a(Vp), aj(Vp), a(Vo),   a(Vo),   a(Vo),   a(Vo), a(Von), a(Von), a(Von)],   // rx Empty
    [a(Va),  a(Va), aj(Va),  a(Vo), a(Vp), a(Vp), aj(Vp), a(Vo),   a(Vo),   aj(Vo),  a(Vo), a(Von), a(Von), aj(Von)],  // rx JoinEmpty
    [a(Aa),  a(Qa), a(Qa),   a(La), a(Ap), a(Qp), a(Qp),  a(Ao),   a(Qo),   a(Qo),   a(Ao), a(Aon), a(Qon), a(Qon)],   // rx JoinIn
    [a(Va),  a(Aa), a(Qa),   a(Va), a(Vp), a(Ap), a(Qp),  aj(Vp),  aj(Ap),  a(Qp),   a(Vp), a(Von), a(Aon), a(Qon)],   // Join
    [a(La),  a(La), aj(La),  a(La), a(Vo), a(Ao), a(Qo),  a(Vo),   a(Ao),   a(Qo),   a(Lo), a(Von), a(Aon), a(Qon)],   // Leave
    [a(Vp),  a(Vp), aj(Vp),  a(La), a(Vp), a(Vp), aj(Vp), a(Va),   a(Va),   aj(Va),  a(Lo), a(Va),  a(Va),  aj(Va)],   // NormalOperation
    [a(Von), a(Aon), a(Qon), a(Von), a(Von), a(Aon), a(Qon), a(Von), a(Aon), a(Qon), a(Von), a(Von), a(Aon), a(Qon)], // NoProtocol
    APPLICANT_IDLE,
    APPLICANT_IDLE,
    APPLICANT_IDLE,
];

const REGISTRAR_IDLE: [RegistrarEntry; 18] = [
    r(Inn), r(Lv), r(L3), r(L2), r(L1), r(Mt),
    r(Inr), r(Lvr), r(L3r), r(L2r), r(L1r), r(Mtr),
    r(Inf), r(Lvf), r(L3f), r(L2f), r(L1f), r(Mtf),
];

const REGISTRAR_RX_LEAVE: [RegistrarEntry; 18] = [
    lt(Lv), r(Lv), r(L3), r(L2), r(L1), r(Mt),
    lt(Lvr), r(Lvr), r(L3r), r(L2r), r(L1r), r(Mtr),
    lt(Lvf), r(Lvf), r(L3f), r(L2f), r(L1f), r(Mtf),
];

const REGISTRAR_RX_JOIN: [RegistrarEntry; 18] = [
    r(Inn), r(Inn), r(Inn), r(Inn), r(Inn), ji(Inn),
    r(Inr), r(Inr), r(Inr), r(Inr), r(Inr), r(Inr),
    r(Inf), r(Inf), r(Inf), r(Inf), r(Inf), r(Inf),
];

#[rustfmt::skip]
static REGISTRAR_TABLE: [[RegistrarEntry; 18]; 13] = [
    REGISTRAR_IDLE,     // Null
    REGISTRAR_RX_LEAVE, // rx LeaveEmpty
    REGISTRAR_RX_LEAVE, // rx LeaveIn
    REGISTRAR_IDLE,     // rx Empty
    REGISTRAR_RX_JOIN,  // rx JoinEmpty
    REGISTRAR_RX_JOIN,  // rx JoinIn
    REGISTRAR_IDLE,     // Join
    REGISTRAR_IDLE,     // Leave
    REGISTRAR_IDLE,     // NormalOperation
    REGISTRAR_IDLE,     // NoProtocol
    [   // NormalRegistration
        r(Inn),  r(Lv),  r(L3),  r(L2),  r(L1),  r(Mt),
        r(Inn),  r(Lv),  r(L3),  r(L2),  r(L1),  li(Mt),
        ji(Inn), ji(Lv), ji(L3), ji(L2), ji(L1), r(Mt),
    ],
    [   // FixRegistration
        r(Inr),  r(Lvr),  r(L3r),  r(L2r),  r(L1r),  ji(Mtr),
        r(Inr),  r(Lvr),  r(L3r),  r(L2r),  r(L1r),  r(Mtr),
        ji(Inr), ji(Lvr), ji(L3r), ji(L2r), ji(L1r), ji(Mtr),
    ],
    [   // ForbidRegistration
        li(Inf), li(Lvf), li(L3f), li(L2f), li(L1f), r(Mtf),
        li(Inr), li(Lvr), li(L3r), li(L2r), li(L1r), li(Mtr),
        r(Inf),  r(Lvf),  r(L3f),  r(L2f),  r(L1f),  r(Mtf),
    ],
];

#[rustfmt::skip]
static TX_TABLE: [TxEntry; 14] = [
    tx(Aa, TxMessage::Join, true),   // Va
    tx(Qa, TxMessage::Join, false),  // Aa
    tx(Qa, TxMessage::None, false),  // Qa
    tx(Vo, TxMessage::Leave, false), // La
    tx(Aa, TxMessage::Join, true),   // Vp
    tx(Qa, TxMessage::Join, false),  // Ap
    tx(Qp, TxMessage::None, false),  // Qp
    tx(Vo, TxMessage::None, false),  // Vo
    tx(Ao, TxMessage::None, false),  // Ao
    tx(Qo, TxMessage::None, false),  // Qo
    tx(Vo, TxMessage::None, false),  // Lo
    tx(Von, TxMessage::None, false), // Von
    tx(Aon, TxMessage::None, false), // Aon
    tx(Qon, TxMessage::None, false), // Qon
];

#[rustfmt::skip]
static LEAVE_TIMER_TABLE: [RegistrarEntry; 18] = [
    r(Inn), lt(L3),  lt(L2),  lt(L1),  li(Mt), r(Mt),
    r(Inr), lt(L3r), lt(L2r), lt(L1r), r(Mtr), r(Mtr),
    r(Inf), lt(L3f), lt(L2f), lt(L1f), r(Mtf), r(Mtf),
];

// ═══════════════════════════════════════════════════════════════════════════
// Machine
// ═══════════════════════════════════════════════════════════════════════════

/// Side effects of one transition, to be folded into the owning port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Transition {
    pub indication: Indication,
    pub start_join_timer: bool,
    pub start_leave_timer: bool,
}

/// Outcome of asking the applicant what to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TxOutcome {
    pub message: Option<AttributeMessage>,
    pub start_join_timer: bool,
}

/// Applicant/registrar pair for one attribute on one port.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GidMachine {
    pub applicant: ApplicantState,
    pub registrar: RegistrarState,
}

impl Default for GidMachine {
    fn default() -> Self {
        Self {
            applicant: ApplicantState::Vo,
            registrar: RegistrarState::Mt,
        }
    }
}

impl GidMachine {
    /// Apply one event through both tables.
    pub fn apply(&mut self, event: GidEvent) -> Transition {
        if event == GidEvent::Null {
            return Transition::default();
        }
        let applicant = APPLICANT_TABLE[event as usize][self.applicant as usize];
        let registrar = REGISTRAR_TABLE[event as usize][self.registrar as usize];
        self.applicant = applicant.next;
        self.registrar = registrar.next;
        Transition {
            indication: registrar.indication,
            start_join_timer: applicant.start_join_timer,
            start_leave_timer: registrar.start_leave_timer,
        }
    }

    /// Run the applicant transmit table.
    ///
    /// Join and Leave become their In variant while the registrar is not Empty.
    pub(crate) fn transmit(&mut self) -> TxOutcome {
        let entry = TX_TABLE[self.applicant as usize];
        self.applicant = entry.next;
        let registered = self.registrar.status() != RegistrarStatus::Empty;
        let message = match entry.message {
            TxMessage::None => None,
            TxMessage::Join if registered => Some(AttributeMessage::JoinIn),
            TxMessage::Join => Some(AttributeMessage::JoinEmpty),
            TxMessage::Leave if registered => Some(AttributeMessage::LeaveIn),
            TxMessage::Leave => Some(AttributeMessage::LeaveEmpty),
        };
        TxOutcome {
            message,
            start_join_timer: entry.start_join_timer,
        }
    }

    /// Advance the registrar one leave-timer stage.
    pub fn leave_timer_expired(&mut self) -> Transition {
        let entry = LEAVE_TIMER_TABLE[self.registrar as usize];
        self.registrar = entry.next;
        Transition {
            indication: entry.indication,
            start_join_timer: false,
            start_leave_timer: entry.start_leave_timer,
        }
    }

    /// Anything other than a very anxious observer with an empty registrar.
    pub fn is_active(&self) -> bool {
        !(self.applicant == ApplicantState::Vo && self.registrar == RegistrarState::Mt)
    }

    /// Registered, or pinned registered by management.
    pub fn registered_here(&self) -> bool {
        self.registrar.status() != RegistrarStatus::Empty
            || self.registrar.management() == RegistrarManagement::Fixed
    }

    pub fn states(&self) -> AttributeState {
        AttributeState {
            applicant: self.applicant,
            applicant_management: self.applicant.management(),
            registrar: self.registrar.status(),
            registrar_management: self.registrar.management(),
        }
    }
}

/// Reportable view of one attribute's machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttributeState {
    pub applicant: ApplicantState,
    pub applicant_management: ApplicantManagement,
    pub registrar: RegistrarStatus,
    pub registrar_management: RegistrarManagement,
}
