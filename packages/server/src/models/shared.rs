use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// One field of a partial update.
///
/// * JSON field absent  => `Absent`
/// * JSON field = null  => `Absent`
/// * JSON field = value => `Value(v)`
///
/// Use with `#[serde(default)]` so missing keys decode as `Absent`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Patch<T> {
    #[default]
    Absent,
    Value(T),
}

impl<T> Patch<T> {
    pub fn is_absent(&self) -> bool {
        matches!(self, Patch::Absent)
    }

    /// Overwrite `target` when a value was supplied; leave it untouched otherwise.
    pub fn apply(self, target: &mut T) {
        if let Patch::Value(value) = self {
            *target = value;
        }
    }
}

impl<'de, T: Deserialize<'de>> Deserialize<'de> for Patch<T> {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Option::<T>::deserialize(deserializer)? {
            Some(value) => Patch::Value(value),
            None => Patch::Absent,
        })
    }
}

impl<T: Serialize> Serialize for Patch<T> {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match self {
            Patch::Absent => serializer.serialize_none(),
            Patch::Value(value) => serializer.serialize_some(value),
        }
    }
}

/// Body of responses that only carry a confirmation message.
#[derive(Serialize, utoipa::ToSchema)]
pub struct MessageEnvelope {
    #[schema(example = "grenade successfully deleted")]
    pub message: String,
}
