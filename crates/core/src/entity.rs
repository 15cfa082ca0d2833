//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Roles and permissions are owned by the identity service; locally they are
/// looked up by identifier, never by structural equality.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> &Self::Id;
}
