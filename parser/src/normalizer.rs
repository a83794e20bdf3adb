use crate::node_directory::NodeDirectory;
use crate::timestamp::{TimestampResolver, DATETIME_FORMAT};
use crate::{NormalizeError, NormalizedEvent, RawEventPayload, ReceiptTime, RESERVED_KEYS};
use std::sync::Arc;
use tracing::debug;

/// Turns a decoded payload and its receipt time into an output row.
///
/// The node directory is shared read-only, so one directory can back
/// several normalizers running over different files.
#[derive(Debug, Clone)]
pub struct EventNormalizer {
    resolver: TimestampResolver,
    directory: Arc<NodeDirectory>,
}

impl EventNormalizer {
    pub fn new(resolver: TimestampResolver, directory: Arc<NodeDirectory>) -> Self {
        Self {
            resolver,
            directory,
        }
    }

    pub fn resolver(&self) -> &TimestampResolver {
        &self.resolver
    }

    pub fn directory(&self) -> &NodeDirectory {
        &self.directory
    }

    pub fn normalize(
        &self,
        receipt: &ReceiptTime,
        payload: &RawEventPayload,
    ) -> Result<NormalizedEvent, NormalizeError> {
        let event_ts = required(payload, "ts")?;
        let ne_id = required(payload, "id")?;
        let mt = required(payload, "mt")?;

        let times = self.resolver.resolve(receipt, event_ts)?;
        let (ne_code, ne_name) = self.directory.describe(ne_id);

        let fields = payload
            .iter()
            .filter(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()))
            .map(|(key, value)| (key.clone(), value.clone()))
            .collect();

        let event = NormalizedEvent {
            receipt_dt: times.receipt_local.format(DATETIME_FORMAT).to_string(),
            receipt_dt_utc: times.receipt_utc.format(DATETIME_FORMAT).to_string(),
            event_ts: event_ts.to_string(),
            event_dt: times.event_local.format(DATETIME_FORMAT).to_string(),
            event_dt_utc: times.event_utc.format(DATETIME_FORMAT).to_string(),
            evt_to_rcpt_sec: times.evt_to_rcpt_sec,
            time_ok: times.time_ok,
            ne_id: ne_id.to_string(),
            ne_code,
            ne_name,
            mt: mt.to_string(),
            fields,
        };

        for (key, _) in event.extra_fields() {
            debug!("Payload key '{}' has no output column", key);
        }

        Ok(event)
    }
}

fn required<'a>(payload: &'a RawEventPayload, key: &'static str) -> Result<&'a str, NormalizeError> {
    payload
        .get(key)
        .map(String::as_str)
        .ok_or(NormalizeError::MissingField(key))
}
