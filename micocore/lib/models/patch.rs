use serde::{Deserialize, Deserializer, Serialize, Serializer};

//--------------------------------------------------------------------------------------------------
// Types
//--------------------------------------------------------------------------------------------------

/// A single field of a partial update.
///
/// `Keep` leaves the stored value untouched and `Set` overwrites it. For optional fields,
/// `Set(None)` clears the stored value, which keeps "not provided" distinct from "cleared".
///
/// When deserializing, a missing field becomes `Keep` (use `#[serde(default)]` on the field) and
/// any present value, including an explicit `null`, becomes `Set`.
///
/// ## Examples
///
/// ```
/// use micocore::models::Patch;
///
/// let mut replicas = Some(3);
/// Patch::Keep.apply(&mut replicas);
/// assert_eq!(replicas, Some(3));
///
/// Patch::Set(None).apply(&mut replicas);
/// assert_eq!(replicas, None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Patch<T> {
    /// Leave the stored value as it is.
    #[default]
    Keep,

    /// Replace the stored value.
    Set(T),
}

//--------------------------------------------------------------------------------------------------
// Methods
//--------------------------------------------------------------------------------------------------

impl<T> Patch<T> {
    /// Whether the field was left out of the update.
    pub fn is_keep(&self) -> bool {
        matches!(self, Patch::Keep)
    }

    /// Overwrites `target` if the field was provided.
    pub fn apply(self, target: &mut T) {
        if let Patch::Set(value) = self {
            *target = value;
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Trait Implementations
//--------------------------------------------------------------------------------------------------

impl<T> From<T> for Patch<T> {
    fn from(value: T) -> Self {
        Patch::Set(value)
    }
}

impl<'de, T> Deserialize<'de> for Patch<T>
where
    T: Deserialize<'de>,
{
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        T::deserialize(deserializer).map(Patch::Set)
    }
}

impl<T> Serialize for Patch<T>
where
    T: Serialize,
{
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Keep => serializer.serialize_none(),
            Patch::Set(value) => value.serialize(serializer),
        }
    }
}

//--------------------------------------------------------------------------------------------------
// Tests
//--------------------------------------------------------------------------------------------------
