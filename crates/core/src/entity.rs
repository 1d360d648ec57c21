//! Entities: things with identity.

/// A domain object whose identity outlives its attribute values.
///
/// A purchase record is an entity: the sweet it refers to may be renamed or
/// archived later, and it is still the same purchase. Contrast with
/// [`crate::ValueObject`], where the attributes are the whole story.
pub trait Entity {
    type Id: Clone + Eq + core::hash::Hash + core::fmt::Debug;

    fn id(&self) -> &Self::Id;
}
