use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    chunking::chunk,
    codec::{encode_data, encode_record, encode_socials},
    config::WallConfig,
    constants::MAX_RETRY_ATTEMPTS,
    errors::{EncodeError, FailureReason, SourceError, SubmissionFailure, SubmitError},
    source::{RecordSource, SubmitOutcome, Subscription},
    structures::{default_token, EditSet, Pubkey, Record, SocialBundle},
};

/// Who is painting and what they attach to every record of the paint action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubmitRequest {
    pub payer: Pubkey,
    pub token: Pubkey,
    pub mint: Pubkey,
    pub bump: u8,
    pub socials: SocialBundle,
}

impl SubmitRequest {
    pub fn new(payer: Pubkey) -> Self {
        Self {
            payer,
            token: default_token(),
            mint: Pubkey::default(),
            bump: 0,
            socials: SocialBundle::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkProgress {
    /// One-based.
    pub chunk: usize,
    pub total: usize,
    pub retries: u32,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmissionReport {
    pub total_chunks: usize,
    /// Ids of the accepted records, in submission order.
    pub ids: Vec<[u8; 32]>,
    pub retries: u32,
    /// Chunks whose submission timed out but that showed up on the live feed.
    pub reconciled: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedChunk {
    pub id: [u8; 32],
    pub pixels: usize,
    pub raw: Vec<u8>,
}

pub struct Submitter<S> {
    source: S,
    config: Arc<WallConfig>,
    max_retries: u32,
}

impl<S: RecordSource> Submitter<S> {
    pub fn new(source: S, config: Arc<WallConfig>) -> Self {
        Self {
            source,
            config,
            max_retries: MAX_RETRY_ATTEMPTS,
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    /// Splits the edit set and encodes one record per chunk, each with a fresh id.
    pub fn prepare(
        &self,
        edits: &EditSet,
        request: &SubmitRequest,
    ) -> Result<Vec<PreparedChunk>, EncodeError> {
        if edits.is_empty() {
            return Err(EncodeError::EmptyEditSet);
        }

        let constants = &self.config.constants;
        let socials = encode_socials(&request.socials, constants)?;

        chunk(edits, constants.capacity_pixels())
            .into_iter()
            .map(|pixels| {
                let id = rand::random::<[u8; 32]>();
                let record = Record {
                    bump: request.bump,
                    id,
                    version: constants.version,
                    epoch: 0,
                    mint: request.mint,
                    timestamp: 0,
                    payer: request.payer,
                    token: request.token,
                    data: encode_data(pixels.iter().map(|(i, c)| (*i, *c)), constants)?,
                    socials: socials.clone(),
                };

                Ok(PreparedChunk {
                    id,
                    pixels: pixels.len(),
                    raw: encode_record(&record, &self.config)?,
                })
            })
            .collect()
    }

    /// Submits the chunks one after another. Each chunk is retried with the
    /// same id; the first chunk to run out of retries ends the submission.
    pub async fn submit<F>(
        &self,
        edits: &EditSet,
        request: &SubmitRequest,
        mut on_progress: F,
    ) -> Result<SubmissionReport, SubmitError>
    where
        F: FnMut(ChunkProgress),
    {
        let chunks = self.prepare(edits, request)?;
        let total = chunks.len();
        let mut subscription = self.source.subscribe();
        let mut report = SubmissionReport {
            total_chunks: total,
            ..SubmissionReport::default()
        };

        for (index, prepared) in chunks.into_iter().enumerate() {
            let number = index + 1;
            let mut retries = 0;

            loop {
                on_progress(ChunkProgress {
                    chunk: number,
                    total,
                    retries,
                });

                let reason = match self
                    .source
                    .submit_record(prepared.raw.clone(), request.payer)
                    .await
                {
                    Ok(SubmitOutcome::Accepted) => break,
                    Ok(SubmitOutcome::Timeout) => {
                        if landed(&mut subscription, &prepared.id) {
                            debug!(chunk = number, "timed out chunk found on the live feed");
                            report.reconciled += 1;
                            break;
                        }
                        FailureReason::Timeout
                    }
                    // A retry of a record that did land is rejected as a duplicate.
                    Ok(SubmitOutcome::Rejected(_)) if landed(&mut subscription, &prepared.id) => {
                        debug!(chunk = number, "rejected chunk found on the live feed");
                        report.reconciled += 1;
                        break;
                    }
                    Ok(SubmitOutcome::Rejected(reason)) => FailureReason::Rejected(reason),
                    Err(err @ SourceError::Transient(_)) => FailureReason::Source(err),
                    Err(err) => {
                        return Err(self.failure(number, total, index, retries, FailureReason::Source(err)))
                    }
                };

                if retries >= self.max_retries {
                    return Err(self.failure(number, total, index, retries, reason));
                }
                retries += 1;
                report.retries += 1;
                warn!(chunk = number, total, retries, %reason, "retrying chunk");
            }

            debug!(chunk = number, total, pixels = prepared.pixels, "chunk accepted");
            report.ids.push(prepared.id);
        }

        info!(
            chunks = total,
            retries = report.retries,
            reconciled = report.reconciled,
            "submission complete"
        );
        Ok(report)
    }

    fn failure(
        &self,
        chunk: usize,
        total_chunks: usize,
        succeeded: usize,
        retries: u32,
        reason: FailureReason,
    ) -> SubmitError {
        let failure = SubmissionFailure {
            chunk,
            total_chunks,
            succeeded,
            attempts: retries + 1,
            reason,
        };
        warn!(%failure, "submission failed");
        failure.into()
    }
}

/// Looks through live events already delivered for a record with `id`.
fn landed(subscription: &mut Subscription, id: &[u8; 32]) -> bool {
    loop {
        match subscription.try_next() {
            Ok(Some(record)) if record.id.as_ref() == Some(id) => return true,
            Ok(Some(_)) => continue,
            Ok(None) | Err(_) => return false,
        }
    }
}
