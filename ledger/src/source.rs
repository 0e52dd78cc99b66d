use std::{
    collections::{HashSet, VecDeque},
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use chrono::Utc;
use tokio::sync::broadcast::{
    self,
    error::{RecvError, TryRecvError},
};
use tracing::{debug, warn};

use crate::{
    codec,
    config::WallConfig,
    constants::DISCRIMINATOR_SIZE,
    errors::SourceError,
    offsets::{ByteRange, RecordFilter},
    structures::{DecodedRecord, Pubkey},
};

const EVENT_BUFFER: usize = 1024;

/// Terminal status of one submitted record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SubmitOutcome {
    Accepted,
    Rejected(String),
    Timeout,
}

/// The remote ledger, as seen by the wall client.
#[allow(async_fn_in_trait)]
pub trait RecordSource {
    /// Raw `slice` of every record matching `filter`, in ledger order.
    async fn query_records(
        &self,
        filter: &RecordFilter,
        slice: ByteRange,
    ) -> Result<Vec<Vec<u8>>, SourceError>;

    /// Submits one full record on behalf of `submitter`.
    async fn submit_record(
        &self,
        raw: Vec<u8>,
        submitter: Pubkey,
    ) -> Result<SubmitOutcome, SourceError>;

    /// Live feed of records accepted from now on.
    fn subscribe(&self) -> Subscription;
}

/// A live event stream. Dropping it unsubscribes.
pub struct Subscription {
    receiver: broadcast::Receiver<DecodedRecord>,
}

impl Subscription {
    pub fn new(receiver: broadcast::Receiver<DecodedRecord>) -> Self {
        Self { receiver }
    }

    /// Waits for the next live record.
    pub async fn next(&mut self) -> Result<DecodedRecord, SourceError> {
        loop {
            match self.receiver.recv().await {
                Ok(record) => return Ok(record),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(skipped, "live subscription lagged, events were dropped")
                }
                Err(RecvError::Closed) => return Err(SourceError::Closed),
            }
        }
    }

    /// Next record if one is already buffered.
    pub fn try_next(&mut self) -> Result<Option<DecodedRecord>, SourceError> {
        loop {
            match self.receiver.try_recv() {
                Ok(record) => return Ok(Some(record)),
                Err(TryRecvError::Empty) => return Ok(None),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(skipped, "live subscription lagged, events were dropped")
                }
                Err(TryRecvError::Closed) => return Err(SourceError::Closed),
            }
        }
    }

    /// Stops receiving live records. Nothing buffered is delivered afterwards.
    pub fn unsubscribe(self) {
        debug!(pending = self.receiver.len(), "closing live subscription");
        drop(self.receiver);
    }
}

/// What the in-memory ledger does with the next submission, instead of
/// validating it normally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScriptedOutcome {
    /// Validates and stores as if nothing was scripted.
    Accept,
    Reject(String),
    /// Reports a timeout without storing the record.
    Timeout,
    /// Stores and broadcasts the record but reports a timeout.
    DropResponse,
    Transient(String),
}

#[derive(Default)]
struct LedgerState {
    records: Vec<Vec<u8>>,
    ids: HashSet<[u8; 32]>,
    script: VecDeque<ScriptedOutcome>,
    unavailable: bool,
    last_timestamp: i64,
    submissions: usize,
}

/// An in-process ledger. Stores full records and serves filtered slices the
/// way a remote would.
pub struct MemorySource {
    config: Arc<WallConfig>,
    epoch: u64,
    state: Mutex<LedgerState>,
    events: broadcast::Sender<DecodedRecord>,
}

impl MemorySource {
    pub fn new(config: Arc<WallConfig>) -> Self {
        let (events, _) = broadcast::channel(EVENT_BUFFER);
        Self {
            config,
            epoch: 0,
            state: Mutex::new(LedgerState::default()),
            events,
        }
    }

    /// Seeds the ledger with records that were accepted elsewhere, e.g. read
    /// back from an archive.
    pub fn with_records(config: Arc<WallConfig>, records: Vec<Vec<u8>>) -> Self {
        let source = Self::new(config);
        {
            let mut state = source.state();
            for raw in records {
                if let Ok(record) = source.decode(&raw) {
                    state.last_timestamp = state.last_timestamp.max(record.timestamp);
                    if let Some(id) = record.id {
                        state.ids.insert(id);
                    }
                }
                state.records.push(raw);
            }
        }
        source
    }

    pub fn with_epoch(mut self, epoch: u64) -> Self {
        self.epoch = epoch;
        self
    }

    /// Full raw records in acceptance order.
    pub fn records(&self) -> Vec<Vec<u8>> {
        self.state().records.clone()
    }

    /// Submission attempts seen so far, scripted or not.
    pub fn submissions(&self) -> usize {
        self.state().submissions
    }

    pub fn set_available(&self, available: bool) {
        self.state().unavailable = !available;
    }

    pub fn script(&self, outcome: ScriptedOutcome) {
        self.state().script.push_back(outcome);
    }

    fn state(&self) -> MutexGuard<'_, LedgerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn decode(&self, raw: &[u8]) -> Result<DecodedRecord, String> {
        if raw.len() != self.config.layout.record_size() {
            return Err(format!(
                "record is {} bytes, expected {}",
                raw.len(),
                self.config.layout.record_size()
            ));
        }
        if raw[..DISCRIMINATOR_SIZE] != self.config.discriminator {
            return Err("unknown record discriminator".to_string());
        }

        let first = self
            .config
            .layout
            .schema()
            .fields
            .first()
            .map(|f| f.name.clone())
            .ok_or_else(|| "record schema has no fields".to_string())?;
        codec::decode_record(&raw[DISCRIMINATOR_SIZE..], &self.config, &first)
            .map_err(|err| err.to_string())
    }

    /// Overwrites a field in place with ledger-assigned bytes.
    fn stamp(&self, raw: &mut [u8], field: &str, bytes: &[u8]) -> Result<(), String> {
        let offset = self
            .config
            .layout
            .field_offset(field)
            .map_err(|err| err.to_string())?;
        raw[offset..offset + bytes.len()].copy_from_slice(bytes);
        Ok(())
    }

    fn accept(
        &self,
        state: &mut LedgerState,
        mut raw: Vec<u8>,
        submitter: Pubkey,
    ) -> Result<(), String> {
        // Validate before stamping so size checks run on the caller's bytes.
        self.decode(&raw)?;

        let timestamp = Utc::now().timestamp().max(state.last_timestamp + 1);
        self.stamp(&mut raw, "timestamp", &timestamp.to_le_bytes())?;
        self.stamp(&mut raw, "epoch", &self.epoch.to_le_bytes())?;
        self.stamp(&mut raw, "payer", &submitter.0)?;

        let record = self.decode(&raw)?;
        if let Some(id) = record.id {
            if !state.ids.insert(id) {
                return Err(format!("duplicate record id {}", bs58::encode(id).into_string()));
            }
        }

        state.last_timestamp = timestamp;
        state.records.push(raw);
        debug!(timestamp, pixels = record.pixels.len(), "ledger accepted record");

        // No subscribers is not an error.
        let _ = self.events.send(record);
        Ok(())
    }
}

impl RecordSource for MemorySource {
    async fn query_records(
        &self,
        filter: &RecordFilter,
        slice: ByteRange,
    ) -> Result<Vec<Vec<u8>>, SourceError> {
        let state = self.state();
        if state.unavailable {
            return Err(SourceError::EndpointUnavailable(
                "in-memory ledger switched off".to_string(),
            ));
        }

        Ok(state
            .records
            .iter()
            .filter(|raw| filter.matches(raw))
            .filter_map(|raw| raw.get(slice.offset..slice.end()).map(<[u8]>::to_vec))
            .collect())
    }

    async fn submit_record(
        &self,
        raw: Vec<u8>,
        submitter: Pubkey,
    ) -> Result<SubmitOutcome, SourceError> {
        let mut state = self.state();
        if state.unavailable {
            return Err(SourceError::EndpointUnavailable(
                "in-memory ledger switched off".to_string(),
            ));
        }
        state.submissions += 1;

        match state.script.pop_front() {
            Some(ScriptedOutcome::Reject(reason)) => Ok(SubmitOutcome::Rejected(reason)),
            Some(ScriptedOutcome::Timeout) => Ok(SubmitOutcome::Timeout),
            Some(ScriptedOutcome::Transient(reason)) => Err(SourceError::Transient(reason)),
            Some(ScriptedOutcome::DropResponse) => {
                if let Err(reason) = self.accept(&mut state, raw, submitter) {
                    return Ok(SubmitOutcome::Rejected(reason));
                }
                Ok(SubmitOutcome::Timeout)
            }
            Some(ScriptedOutcome::Accept) | None => match self.accept(&mut state, raw, submitter) {
                Ok(()) => Ok(SubmitOutcome::Accepted),
                Err(reason) => Ok(SubmitOutcome::Rejected(reason)),
            },
        }
    }

    fn subscribe(&self) -> Subscription {
        Subscription::new(self.events.subscribe())
    }
}

impl<S: RecordSource> RecordSource for Arc<S> {
    async fn query_records(
        &self,
        filter: &RecordFilter,
        slice: ByteRange,
    ) -> Result<Vec<Vec<u8>>, SourceError> {
        S::query_records(self, filter, slice).await
    }

    async fn submit_record(
        &self,
        raw: Vec<u8>,
        submitter: Pubkey,
    ) -> Result<SubmitOutcome, SourceError> {
        S::submit_record(self, raw, submitter).await
    }

    fn subscribe(&self) -> Subscription {
        S::subscribe(self)
    }
}
