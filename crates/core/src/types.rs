use chrono::SubsecRound;
use serde::{Deserialize, Deserializer};

/// All timestamps are UTC.
pub type Timestamp = chrono::DateTime<chrono::Utc>;

/// Current UTC time truncated to whole seconds.
///
/// Design timestamps are stored at second precision so that a value read
/// back from the structured store compares equal to the one written.
pub fn now() -> Timestamp {
    chrono::Utc::now().trunc_subsecs(0)
}

/// Read an explicit `null` as the empty value. Older documents and the
/// editor write unset lists and maps as `null`.
pub(crate) fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
