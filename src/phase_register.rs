use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

/// Lifecycle phase a component may support
///
/// Every phase owns an independent 4-bit slot of a [`PhaseRegister`]:
///
/// ```text
///  bit 15    12 11     8 7      4 3      0
///     [health ] [shutdn ] [ run  ] [ init ]
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Healthcheck,
    Init,
    Run,
    Shutdown,
}

impl Phase {
    pub const ALL: [Phase; 4] = [Phase::Healthcheck, Phase::Init, Phase::Run, Phase::Shutdown];

    const fn shift(self) -> u32 {
        match self {
            Phase::Init => 0,
            Phase::Run => 4,
            Phase::Shutdown => 8,
            Phase::Healthcheck => 12,
        }
    }

    /// Mask selecting this phase's slot
    pub const fn mask(self) -> u64 {
        0b1111 << self.shift()
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Healthcheck => "healthcheck",
            Phase::Init => "init",
            Phase::Run => "run",
            Phase::Shutdown => "shutdown",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// State of a single phase slot. An all-zero slot means the phase is not
/// applicable to the component and is represented as `None` by the accessors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhaseState {
    Ready,
    InProcess,
    Done,
    Failed,
}

impl PhaseState {
    const fn bits(self) -> u64 {
        match self {
            PhaseState::Ready => 0b0001,
            PhaseState::InProcess => 0b0010,
            PhaseState::Done => 0b0100,
            PhaseState::Failed => 0b1000,
        }
    }

    /// This state's bit pattern positioned inside `phase`'s slot
    pub const fn in_slot(self, phase: Phase) -> u64 {
        self.bits() << phase.shift()
    }

    fn from_slot(word: u64, phase: Phase) -> Option<Self> {
        match (word & phase.mask()) >> phase.shift() {
            0b0001 => Some(PhaseState::Ready),
            0b0010 => Some(PhaseState::InProcess),
            0b0100 => Some(PhaseState::Done),
            0b1000 => Some(PhaseState::Failed),
            _ => None,
        }
    }
}

/// Lock-free word holding four independent masked sub-registers.
///
/// All writes go through compare-and-swap, so any number of callers may
/// touch the register concurrently; operations on one slot never disturb the
/// bits of another.
#[derive(Debug, Default)]
pub struct PhaseRegister {
    word: AtomicU64,
}

// status 1010 mask 0011 set 0101 -> 1001
fn set_with_mask(current: u64, value: u64, mask: u64) -> u64 {
    (current & !mask) | (value & mask)
}

impl PhaseRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> u64 {
        self.word.load(Ordering::Acquire)
    }

    /// Overwrite the masked bits, retrying until the swap wins
    pub fn set(&self, value: u64, mask: u64) {
        while !self.try_set(value, mask) {
            std::hint::spin_loop();
        }
    }

    /// Single swap attempt; returns whether it won
    pub fn try_set(&self, value: u64, mask: u64) -> bool {
        let current = self.word.load(Ordering::Acquire);
        let next = set_with_mask(current, value, mask);
        self.word
            .compare_exchange(current, next, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Replace the masked bits with `next` only while they equal `expected`.
    ///
    /// Concurrent writes to other slots cause a retry, never a false negative;
    /// the call returns `false` only when the masked bits differ from
    /// `expected`.
    pub fn compare_and_transition(&self, expected: u64, next: u64, mask: u64) -> bool {
        let mut current = self.word.load(Ordering::Acquire);
        loop {
            if current & mask != expected & mask {
                return false;
            }
            let updated = set_with_mask(current, next, mask);
            match self.word.compare_exchange_weak(
                current,
                updated,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Current state of `phase`, `None` when the slot is empty
    pub fn state(&self, phase: Phase) -> Option<PhaseState> {
        PhaseState::from_slot(self.get(), phase)
    }

    /// Exact masked equality against `state`
    pub fn is(&self, phase: Phase, state: PhaseState) -> bool {
        self.get() & phase.mask() == state.in_slot(phase)
    }

    pub fn is_applicable(&self, phase: Phase) -> bool {
        self.get() & phase.mask() != 0
    }

    pub(crate) fn seed(&self, phase: Phase) {
        self.set(PhaseState::Ready.in_slot(phase), phase.mask());
    }
}
