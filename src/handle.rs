use std::cell::RefCell;

use gssbind_core::{ContextState, Mechanism, Role, SecurityContext};

use crate::Error;

/// The host object behind a context handle.
///
/// A round run on an existing handle takes the context out and puts the
/// stepped context back, so the host keeps one object per context. If the
/// round fails the context is gone and the cell stays empty.
pub struct ContextHandle<M: Mechanism>(RefCell<Option<SecurityContext<M>>>);

impl<M: Mechanism> ContextHandle<M> {
    pub fn new(context: SecurityContext<M>) -> Self {
        Self(RefCell::new(Some(context)))
    }
    pub fn is_released(&self) -> bool {
        self.0.borrow().is_none()
    }
    pub fn state(&self) -> Option<ContextState> {
        self.0.borrow().as_ref().map(SecurityContext::state)
    }
    pub fn role(&self) -> Option<Role> {
        self.0.borrow().as_ref().map(SecurityContext::role)
    }

    /// Takes the context for another `role` round. A context that may not
    /// be stepped stays in place.
    pub(crate) fn take_for_round(&self, role: Role) -> Result<SecurityContext<M>, Error> {
        let mut slot = self.0.borrow_mut();
        slot.as_ref().ok_or(Error::ContextReleased)?.ensure_steppable(role)?;
        slot.take().ok_or(Error::ContextReleased)
    }
    pub(crate) fn restore(&self, context: SecurityContext<M>) {
        *self.0.borrow_mut() = Some(context);
    }
    pub(crate) fn with_context<R>(
        &self,
        f: impl FnOnce(&mut SecurityContext<M>) -> Result<R, Error>,
    ) -> Result<R, Error> {
        let mut slot = self.0.borrow_mut();
        f(slot.as_mut().ok_or(Error::ContextReleased)?)
    }
}
