//! When conversation state is created, preserved, rebuilt or dropped.
//!
//! ```text
//! Uninitialized ──initialize(p)──▶ Active(p)
//! Discarded     ──initialize(p)──▶ Active(p)
//! Active(p)     ──switch(q≠p)────▶ Active(q)   (state rebuilt)
//! Active(p)     ──leave──────────▶ Discarded
//! any           ──reset──────────▶ Uninitialized
//! ```

use super::error::SessionError;
use super::state::PersonaId;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Lifecycle {
    #[default]
    Uninitialized,
    Active(PersonaId),
    Discarded,
}

/// What a lifecycle request does to the session state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleAction {
    /// Build fresh state for the persona.
    Create,
    /// Keep the current state untouched.
    Preserve,
    /// Discard the current state and build fresh state.
    Rebuild,
}

impl Lifecycle {
    pub fn name(&self) -> &'static str {
        match self {
            Lifecycle::Uninitialized => "uninitialized",
            Lifecycle::Active(_) => "active",
            Lifecycle::Discarded => "discarded",
        }
    }

    pub fn persona(&self) -> Option<&PersonaId> {
        match self {
            Lifecycle::Active(p) => Some(p),
            _ => None,
        }
    }

    /// Entering a persona's chat.
    ///
    /// Re-entering the active persona preserves its state; entering a
    /// different one while active must go through [`Lifecycle::plan_switch`].
    pub fn plan_initialize(&self, persona: &PersonaId) -> Result<LifecycleAction, SessionError> {
        match self {
            Lifecycle::Uninitialized | Lifecycle::Discarded => Ok(LifecycleAction::Create),
            Lifecycle::Active(current) if current == persona => Ok(LifecycleAction::Preserve),
            Lifecycle::Active(current) => Err(SessionError::InvalidTransition {
                from: format!("active({current})"),
                action: "initialize",
            }),
        }
    }

    /// Selecting a persona from anywhere.
    pub fn plan_switch(&self, persona: &PersonaId) -> LifecycleAction {
        match self {
            Lifecycle::Uninitialized | Lifecycle::Discarded => LifecycleAction::Create,
            Lifecycle::Active(current) if current == persona => LifecycleAction::Preserve,
            Lifecycle::Active(_) => LifecycleAction::Rebuild,
        }
    }

    /// Leaving the chat view; only valid while active.
    pub fn plan_leave(&self) -> Result<(), SessionError> {
        match self {
            Lifecycle::Active(_) => Ok(()),
            other => Err(SessionError::InvalidTransition {
                from: other.name().to_string(),
                action: "leave",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(id: &str) -> PersonaId {
        PersonaId::new(id)
    }

    #[test]
    fn initialize_from_idle_states_creates() {
        assert_eq!(
            Lifecycle::Uninitialized.plan_initialize(&p("a")).unwrap(),
            LifecycleAction::Create
        );
        assert_eq!(
            Lifecycle::Discarded.plan_initialize(&p("a")).unwrap(),
            LifecycleAction::Create
        );
    }

    #[test]
    fn initialize_same_persona_preserves() {
        let active = Lifecycle::Active(p("a"));
        assert_eq!(
            active.plan_initialize(&p("a")).unwrap(),
            LifecycleAction::Preserve
        );
    }

    #[test]
    fn initialize_other_persona_while_active_is_rejected() {
        let err = Lifecycle::Active(p("a"))
            .plan_initialize(&p("b"))
            .unwrap_err();
        assert!(matches!(
            err,
            SessionError::InvalidTransition { action: "initialize", .. }
        ));
    }

    #[test]
    fn switch_rules() {
        let active = Lifecycle::Active(p("a"));
        assert_eq!(active.plan_switch(&p("a")), LifecycleAction::Preserve);
        assert_eq!(active.plan_switch(&p("b")), LifecycleAction::Rebuild);
        assert_eq!(
            Lifecycle::Uninitialized.plan_switch(&p("b")),
            LifecycleAction::Create
        );
    }

    #[test]
    fn leave_requires_active() {
        assert!(Lifecycle::Active(p("a")).plan_leave().is_ok());
        assert!(Lifecycle::Uninitialized.plan_leave().is_err());
        assert!(Lifecycle::Discarded.plan_leave().is_err());
    }
}
