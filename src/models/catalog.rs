use serde::{Deserialize, Deserializer, Serialize};

/// A named category of deletable or analyzable data, as served by `GET /api/cleaners`.
///
/// Cleaners are immutable once fetched. A successful catalog fetch replaces the previous
/// snapshot wholesale; nothing is merged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cleaner {
    pub id: String,
    pub name: String,

    #[serde(default)]
    pub description: String,

    /// Set by the backend while it is scanning with this cleaner
    #[serde(default)]
    pub running: bool,

    #[serde(default, deserialize_with = "null_as_default")]
    pub options: Vec<CleanerOption>,
}

impl Cleaner {
    /// Look up one of this cleaner's options by id
    pub fn option(&self, option_id: &str) -> Option<&CleanerOption> {
        self.options.iter().find(|o| o.id == option_id)
    }
}

/// A selectable unit of work within a [`Cleaner`]
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CleanerOption {
    pub id: String,
    pub label: String,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub warning: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub actions: Vec<Action>,
}

/// One backend step of an option.
///
/// The client never interprets these; they are carried so the presentation layer can show
/// what an option will touch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Action {
    pub command: String,

    #[serde(default)]
    pub search: String,

    #[serde(default)]
    pub path: String,

    #[serde(
        default,
        deserialize_with = "null_as_default",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub os: Vec<String>,
}

/// A (cleaner, option) pair chosen by the user; also the request body element for
/// preview and clean calls.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SelectionEntry {
    pub cleaner_id: String,
    pub option_id: String,
}

impl SelectionEntry {
    pub fn new(cleaner_id: impl Into<String>, option_id: impl Into<String>) -> Self {
        Self {
            cleaner_id: cleaner_id.into(),
            option_id: option_id.into(),
        }
    }
}

/// Decode an explicit `null` the same as a missing field.
///
/// The backend serializes empty lists as `null`, so `#[serde(default)]` alone is not enough.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Find a cleaner in a catalog snapshot
pub fn find_cleaner<'a>(catalog: &'a [Cleaner], cleaner_id: &str) -> Option<&'a Cleaner> {
    catalog.iter().find(|c| c.id == cleaner_id)
}
