use std::time::SystemTime;

use serde::ser;

/// Serializes a `SystemTime` as unix seconds.
///
/// Whole seconds are written as integers, anything else as a float. Times
/// before the epoch cannot be sent and fail serialization.
pub fn serialize_timestamp<S>(st: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
where
    S: ser::Serializer,
{
    let duration = st
        .duration_since(SystemTime::UNIX_EPOCH)
        .map_err(|_| {
            <S::Error as ser::Error>::custom(format!("timestamp before the unix epoch: {st:?}"))
        })?;
    if duration.subsec_nanos() == 0 {
        serializer.serialize_u64(duration.as_secs())
    } else {
        serializer.serialize_f64(duration.as_secs_f64())
    }
}
