use std::sync::Arc;
use std::time::Duration;

use super::error::IndexerError;
use super::filter_store::FilterStore;
use super::types::{Log, TxWithBlock};
use crate::ccip::ExtOutLogBucket;
use crate::cell::Cell;
use crate::error::{CodecError, CodecErrorKind, ResultExt};
use crate::models::{MsgInfo, StdAddr};

/// Converts transactions into logs of the matching filters.
pub struct Indexer {
    filters: Arc<dyn FilterStore>,
    retention: Option<Duration>,
}

impl Indexer {
    pub fn new(filters: Arc<dyn FilterStore>) -> Self {
        Self {
            filters,
            retention: None,
        }
    }

    /// Sets the lifetime of logs whose filter has no retention.
    ///
    /// Without it such logs are left to the log store retention.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = Some(retention);
        self
    }

    /// Produces logs for all external out messages which match a filter.
    ///
    /// Messages which cannot be decoded produce error logs instead.
    pub fn index(&self, txs: &[TxWithBlock]) -> Result<Vec<Log>, IndexerError> {
        let now = super::now_sec();

        let mut logs = Vec::new();
        for item in txs {
            let address = match StdAddr::try_new(item.block.shard.workchain(), item.tx.account) {
                Ok(address) => address,
                Err(_) => {
                    tracing::warn!(
                        workchain = item.block.shard.workchain(),
                        lt = item.tx.lt,
                        "skipped transaction outside of std workchains"
                    );
                    continue;
                }
            };
            let make_log = |event_topic: u32, data: Cell| Log {
                filter_id: None,
                event_topic,
                address,
                data,
                tx_hash: item.hash,
                tx_lt: item.tx.lt,
                tx_timestamp: item.tx.now,
                block: item.block,
                expires_at: None,
                error: None,
            };

            let messages = match item.tx.load_out_msgs().context("out messages") {
                Ok(messages) => messages,
                Err(e) => {
                    tracing::warn!(%address, lt = item.tx.lt, "failed to load out messages: {e}");
                    logs.push(Log {
                        error: Some(e.to_string()),
                        ..make_log(0, Cell::empty_cell())
                    });
                    continue;
                }
            };

            for message in messages {
                let (info, body) = match &message.info {
                    MsgInfo::ExtOut(info) => (info, &message.body),
                    // Internal messages are not indexed
                    MsgInfo::Int(_) | MsgInfo::ExtIn(_) => continue,
                };

                let bucket = info
                    .dst
                    .as_ref()
                    .ok_or_else(|| {
                        CodecError::new(CodecErrorKind::BadAddress, "missing log bucket")
                    })
                    .and_then(ExtOutLogBucket::from_ext_addr);
                let topic = match bucket {
                    Ok(bucket) => bucket.topic,
                    Err(e) => {
                        let e = IndexerError::TopicDecodeFailed(e);
                        tracing::warn!(
                            %address,
                            lt = item.tx.lt,
                            created_lt = info.created_lt,
                            "skipped message: {e}"
                        );
                        logs.push(Log {
                            error: Some(e.to_string()),
                            ..make_log(0, body.clone())
                        });
                        continue;
                    }
                };

                for matched in self.filters.matching(&address, topic)? {
                    logs.push(Log {
                        filter_id: Some(matched.id),
                        expires_at: matched
                            .filter
                            .retention
                            .or(self.retention)
                            .map(|retention| now.saturating_add(retention.as_secs())),
                        ..make_log(topic, body.clone())
                    });
                }
            }
        }

        tracing::debug!(txs = txs.len(), logs = logs.len(), "indexed transactions");
        Ok(logs)
    }
}
