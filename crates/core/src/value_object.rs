//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are immutable and compared by their attribute values; two
/// instances with the same values are the same value. `Money { cents: 200 }`
/// is a value object; a catalog item with an id is an entity.
///
/// To "modify" a value object, construct a new one. Immutability keeps values
/// safe to copy across threads and into events.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
