use crate::phase_register::{Phase, PhaseRegister, PhaseState};
use std::sync::Arc;

/// Typed view of one phase of a component.
///
/// `try_set_in_process` is the only legal entry into a phase: exactly one
/// caller wins it, and only the winner may call `set_done`/`set_failed` or
/// invoke the handle.
pub struct PhaseView<'a, T: ?Sized> {
    register: &'a PhaseRegister,
    phase: Phase,
    handle: Option<&'a Arc<T>>,
}

impl<'a, T: ?Sized> PhaseView<'a, T> {
    pub(super) fn new(register: &'a PhaseRegister, phase: Phase, handle: Option<&'a Arc<T>>) -> Self {
        Self {
            register,
            phase,
            handle,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn state(&self) -> Option<PhaseState> {
        self.register.state(self.phase)
    }

    pub fn is_ready(&self) -> bool {
        self.register.is(self.phase, PhaseState::Ready)
    }

    pub fn is_in_process(&self) -> bool {
        self.register.is(self.phase, PhaseState::InProcess)
    }

    pub fn is_done(&self) -> bool {
        self.register.is(self.phase, PhaseState::Done)
    }

    pub fn is_failed(&self) -> bool {
        self.register.is(self.phase, PhaseState::Failed)
    }

    /// Ready -> InProcess, at most once per component and phase
    pub fn try_set_in_process(&self) -> bool {
        self.register.compare_and_transition(
            PhaseState::Ready.in_slot(self.phase),
            PhaseState::InProcess.in_slot(self.phase),
            self.phase.mask(),
        )
    }

    pub fn set_done(&self) {
        self.register
            .set(PhaseState::Done.in_slot(self.phase), self.phase.mask());
    }

    pub fn set_failed(&self) {
        self.register
            .set(PhaseState::Failed.in_slot(self.phase), self.phase.mask());
    }

    /// Handle for invoking the phase, `None` when the component lacks it
    pub fn get(&self) -> Option<Arc<T>> {
        self.handle.cloned()
    }

    /// Win the phase and hand back the handle to invoke.
    ///
    /// Returns `None` when the phase is unsupported or someone else already
    /// entered it.
    pub fn claim(&self) -> Option<Arc<T>> {
        let handle = self.handle?;
        if self.try_set_in_process() {
            Some(Arc::clone(handle))
        } else {
            None
        }
    }

    /// Like `claim`, but only while `barrier` has not been entered.
    ///
    /// Both slots are checked in a single swap, so a concurrent claim of
    /// `barrier` either precedes this one and blocks it, or follows it.
    pub fn claim_before(&self, barrier: Phase) -> Option<Arc<T>> {
        let handle = self.handle?;
        let guarded = match self.register.state(barrier) {
            None => 0,
            Some(PhaseState::Ready) => PhaseState::Ready.in_slot(barrier),
            Some(_) => return None,
        };
        let mask = self.phase.mask() | barrier.mask();
        let won = self.register.compare_and_transition(
            PhaseState::Ready.in_slot(self.phase) | guarded,
            PhaseState::InProcess.in_slot(self.phase) | guarded,
            mask,
        );
        won.then(|| Arc::clone(handle))
    }
}
