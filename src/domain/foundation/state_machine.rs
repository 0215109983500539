//! State machine trait for status enums.
//!
//! Provides a consistent interface for checking state transitions on
//! lifecycle statuses. Call statuses are reported by the telephony
//! provider, which may deliver them late or out of order, so callers use
//! `can_transition_to` to detect stale updates rather than to reject them.

/// Trait for status enums that represent state machines.
///
/// # Example
///
/// ```ignore
/// impl StateMachine for CallStatus {
///     fn can_transition_to(&self, target: &Self) -> bool { ... }
///     fn valid_transitions(&self) -> Vec<Self> { ... }
/// }
///
/// if !current.can_transition_to(&incoming) {
///     tracing::warn!("out-of-order status");
/// }
/// ```
pub trait StateMachine: Sized + Copy + PartialEq + std::fmt::Debug {
    /// Returns true if transition from self to target is valid.
    fn can_transition_to(&self, target: &Self) -> bool;

    /// Returns all valid target states from current state.
    fn valid_transitions(&self) -> Vec<Self>;

    /// Checks if current state is terminal (no valid outgoing transitions).
    fn is_terminal(&self) -> bool {
        self.valid_transitions().is_empty()
    }
}
