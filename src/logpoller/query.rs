use std::cmp::Ordering;
use std::marker::PhantomData;

use ahash::HashMap;

use super::error::QueryError;
use super::log_store::LogStore;
use super::types::{FilterId, Log};
use crate::ccip::Event;
use crate::cell::{HashBytes, Load};
use crate::error::ResultExt;
use crate::models::StdAddr;

/// Comparison operator of a [`ByteFilter`].
#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ByteOp {
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl ByteOp {
    fn matches(self, ord: Ordering) -> bool {
        match self {
            Self::Eq => ord.is_eq(),
            Self::Ne => ord.is_ne(),
            Self::Lt => ord.is_lt(),
            Self::Le => ord.is_le(),
            Self::Gt => ord.is_gt(),
            Self::Ge => ord.is_ge(),
        }
    }
}

/// Compares bytes of the log payload at the offset with the value.
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct ByteFilter {
    pub offset: usize,
    pub op: ByteOp,
    pub value: Vec<u8>,
}

impl ByteFilter {
    pub fn new(offset: usize, op: ByteOp, value: impl Into<Vec<u8>>) -> Self {
        Self {
            offset,
            op,
            value: value.into(),
        }
    }

    /// Returns whether the payload satisfies the filter.
    ///
    /// Payloads shorter than `offset + value.len()` never match.
    pub fn matches(&self, payload: &[u8]) -> bool {
        let Some(end) = self.offset.checked_add(self.value.len()) else {
            return false;
        };
        match payload.get(self.offset..end) {
            Some(bytes) => self.op.matches(bytes.cmp(&self.value)),
            None => false,
        }
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum SortBy {
    TxLt,
}

#[derive(Debug, Default, Clone, Copy, Eq, PartialEq)]
pub enum SortDir {
    #[default]
    Asc,
    Desc,
}

/// Pagination and ordering of the query results.
#[derive(Debug, Default, Clone, Eq, PartialEq)]
pub struct QueryOptions {
    /// Maximum number of results, `0` for no limit.
    pub limit: usize,
    pub offset: usize,
    pub sort: Vec<(SortBy, SortDir)>,
}

/// A page of matched logs with their decoded events.
#[derive(Debug, Clone)]
pub struct QueryResult<T> {
    pub logs: Vec<Log>,
    pub events: Vec<T>,
    /// The number of matched logs before pagination.
    pub total: usize,
    pub has_more: bool,
    pub offset: usize,
    pub limit: usize,
}

type TypedFilter<T> = Box<dyn Fn(&T) -> bool + Send + Sync>;

/// Log query builder.
///
/// Logs are decoded as `T`, so all matched logs must contain valid `T`.
pub struct Query<T> {
    address: Option<StdAddr>,
    topic: Option<u32>,
    typed_filter: Option<TypedFilter<T>>,
    byte_filters: Vec<ByteFilter>,
    options: QueryOptions,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Default for Query<T> {
    fn default() -> Self {
        Self {
            address: None,
            topic: None,
            typed_filter: None,
            byte_filters: Vec::new(),
            options: QueryOptions::default(),
            _marker: PhantomData,
        }
    }
}

impl<T: Event> Query<T> {
    /// Creates a query for the events of the contract.
    pub fn for_event(address: StdAddr) -> Self {
        Self::new().with_address(address).with_topic(T::topic())
    }
}

impl<T> Query<T>
where
    for<'a> T: Load<'a>,
{
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_address(mut self, address: StdAddr) -> Self {
        self.address = Some(address);
        self
    }

    pub fn with_topic(mut self, topic: u32) -> Self {
        self.topic = Some(topic);
        self
    }

    pub fn with_typed_filter<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.typed_filter = Some(Box::new(f));
        self
    }

    pub fn with_byte_filter(mut self, filter: ByteFilter) -> Self {
        self.byte_filters.push(filter);
        self
    }

    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.options.limit = limit;
        self
    }

    pub fn sort_by(mut self, by: SortBy, dir: SortDir) -> Self {
        self.options.sort.push((by, dir));
        self
    }

    /// Runs the query against the store.
    ///
    /// An event which matched several filters is stored once per filter,
    /// only the copy of the first filter is returned.
    pub fn execute(&self, store: &dyn LogStore) -> Result<QueryResult<T>, QueryError> {
        let Some(address) = &self.address else {
            return Err(QueryError::InvalidQuery("address is required"));
        };
        let Some(topic) = self.topic else {
            return Err(QueryError::InvalidQuery("event topic is required"));
        };

        let mut owners = HashMap::<(HashBytes, HashBytes), Option<FilterId>>::default();
        let mut matched = Vec::new();
        for log in store.logs(address, topic)? {
            if log.is_error() {
                continue;
            }

            let owner = owners
                .entry((log.tx_hash, *log.data.repr_hash()))
                .or_insert(log.filter_id);
            if *owner != log.filter_id {
                continue;
            }

            let payload = log.data.data();
            if !self.byte_filters.iter().all(|f| f.matches(payload)) {
                continue;
            }

            let event = match log.data.parse::<T>().context("log data") {
                Ok(event) => event,
                Err(e) => return Err(QueryError::ParseError(e)),
            };
            if let Some(typed_filter) = &self.typed_filter {
                if !typed_filter(&event) {
                    continue;
                }
            }

            matched.push((log, event));
        }

        if !self.options.sort.is_empty() {
            matched.sort_by(|(a, _), (b, _)| {
                for (by, dir) in &self.options.sort {
                    let ord = match by {
                        SortBy::TxLt => a.tx_lt.cmp(&b.tx_lt),
                    };
                    let ord = match dir {
                        SortDir::Asc => ord,
                        SortDir::Desc => ord.reverse(),
                    };
                    if ord.is_ne() {
                        return ord;
                    }
                }
                Ordering::Equal
            });
        }

        let total = matched.len();
        let QueryOptions { limit, offset, .. } = self.options;
        let page = matched.into_iter().skip(offset);
        let (logs, events): (Vec<_>, Vec<_>) = if limit > 0 {
            page.take(limit).unzip()
        } else {
            page.unzip()
        };

        Ok(QueryResult {
            has_more: offset + logs.len() < total,
            logs,
            events,
            total,
            offset,
            limit,
        })
    }
}
