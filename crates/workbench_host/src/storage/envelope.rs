//! Versioned envelopes for persisted records and schema migration helpers.

use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::Value;

use super::scoped::ScopedValueStore;
use super::StoreError;
use crate::scope::StoreScope;

/// Version for [`ValueEnvelope`] metadata serialization.
pub const VALUE_ENVELOPE_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
/// Versioned envelope for persisted record payloads.
pub struct ValueEnvelope {
    /// Envelope schema version.
    pub envelope_version: u32,
    /// Namespace identifying the owning domain.
    pub namespace: String,
    /// Domain-defined schema version for the payload.
    pub schema_version: u32,
    /// Last update time in unix milliseconds.
    pub updated_at_unix_ms: u64,
    /// Serialized payload.
    pub payload: Value,
}

impl ValueEnvelope {
    /// Creates a new envelope and stamps it with a monotonic timestamp.
    pub fn new(namespace: impl Into<String>, schema_version: u32, payload: Value) -> Self {
        Self {
            envelope_version: VALUE_ENVELOPE_VERSION,
            namespace: namespace.into(),
            schema_version,
            updated_at_unix_ms: crate::time::next_monotonic_timestamp_ms(),
            payload,
        }
    }
}

/// Builds a versioned [`ValueEnvelope`] from a serializable payload.
///
/// # Errors
///
/// Returns [`StoreError::Serialize`] when `payload` cannot be converted to JSON.
pub fn build_value_envelope<T: Serialize>(
    namespace: &str,
    schema_version: u32,
    payload: &T,
) -> Result<ValueEnvelope, StoreError> {
    let payload = serde_json::to_value(payload).map_err(|err| StoreError::Serialize {
        key: namespace.to_string(),
        message: err.to_string(),
    })?;
    Ok(ValueEnvelope::new(namespace, schema_version, payload))
}

/// Deserializes an envelope payload into a target type.
///
/// # Errors
///
/// Returns [`StoreError::Deserialize`] when the payload does not match `T`.
pub fn migrate_envelope_payload<T: DeserializeOwned>(
    envelope: &ValueEnvelope,
) -> Result<T, StoreError> {
    serde_json::from_value(envelope.payload.clone()).map_err(|err| StoreError::Deserialize {
        key: envelope.namespace.clone(),
        message: err.to_string(),
    })
}

/// Loads an envelope stored under `key` and decodes its payload.
///
/// Payloads at `current_schema` decode directly; older or foreign schema versions go through
/// `migrate`, which returns `Ok(None)` for versions it cannot upgrade. A stored value that is not
/// an envelope at all is handed to `migrate` as schema version 0 with the raw value as payload.
///
/// # Errors
///
/// Propagates store failures and decode errors for the current schema.
pub async fn load_envelope_with_migration<S, St, T, F>(
    store: &St,
    scope: &S,
    key: &str,
    current_schema: u32,
    migrate: F,
) -> Result<Option<T>, StoreError>
where
    S: StoreScope,
    St: ScopedValueStore<S> + ?Sized,
    T: DeserializeOwned,
    F: FnOnce(u32, &ValueEnvelope) -> Result<Option<T>, StoreError>,
{
    let Some(raw) = store.get_value(scope, key).await? else {
        return Ok(None);
    };

    let envelope = match serde_json::from_value::<ValueEnvelope>(raw.clone()) {
        Ok(envelope) => envelope,
        Err(_) => ValueEnvelope {
            envelope_version: VALUE_ENVELOPE_VERSION,
            namespace: key.to_string(),
            schema_version: 0,
            updated_at_unix_ms: 0,
            payload: raw,
        },
    };

    if envelope.schema_version == current_schema {
        return migrate_envelope_payload(&envelope).map(Some);
    }
    migrate(envelope.schema_version, &envelope)
}
