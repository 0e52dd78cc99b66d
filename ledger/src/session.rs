use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::{
    canvas::{ApplyReport, Canvas},
    codec,
    config::WallConfig,
    constants::READ_FROM_FIELD,
    errors::SourceError,
    source::{RecordSource, Subscription},
    structures::DecodedRecord,
};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RebuildSummary {
    /// Records returned by the source.
    pub fetched: usize,
    /// Records fed to the reducer before the budget ran out.
    pub applied: usize,
    /// Records that failed to decode.
    pub skipped: usize,
    pub rejected_pixels: usize,
    /// Pixels no record claimed; they keep the default color.
    pub remaining: usize,
}

/// Reads every current-version record and reduces them onto a fresh canvas,
/// newest first. The previous canvas is never touched.
pub async fn rebuild<S: RecordSource>(
    source: &S,
    config: &WallConfig,
) -> Result<(Canvas, RebuildSummary), SourceError> {
    let raw_records = source
        .query_records(&config.version_filter, config.read_slice)
        .await?;

    let mut summary = RebuildSummary {
        fetched: raw_records.len(),
        ..RebuildSummary::default()
    };

    let mut records: Vec<DecodedRecord> = Vec::with_capacity(raw_records.len());
    for raw in &raw_records {
        match codec::decode_record(raw, config, READ_FROM_FIELD) {
            Ok(record) => records.push(record),
            Err(err) => {
                summary.skipped += 1;
                warn!(%err, "skipping record");
            }
        }
    }

    // Stable, so records sharing a timestamp keep ledger order.
    records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));

    let mut canvas = Canvas::from_constants(&config.constants);
    let mut pass = canvas.rebuild();
    for record in &records {
        if pass.is_complete() {
            debug!("canvas fully claimed, ignoring older records");
            break;
        }

        let report = pass.apply(record);
        summary.applied += 1;
        if !report.is_clean() {
            summary.rejected_pixels += report.rejected.len();
            warn!(
                payer = %record.payer,
                timestamp = record.timestamp,
                rejected = report.rejected.len(),
                "record has pixels outside the canvas"
            );
        }
    }
    summary.remaining = pass.remaining();

    info!(
        fetched = summary.fetched,
        applied = summary.applied,
        skipped = summary.skipped,
        remaining = summary.remaining,
        "rebuilt canvas"
    );

    Ok((canvas, summary))
}

/// A canvas kept current against a record source: one full rebuild, then
/// live events applied as they arrive.
pub struct WallSession<S> {
    source: S,
    config: Arc<WallConfig>,
    canvas: Canvas,
    subscription: Option<Subscription>,
    summary: Option<RebuildSummary>,
    warning: Option<String>,
}

impl<S: RecordSource> WallSession<S> {
    pub async fn open(source: S, config: Arc<WallConfig>) -> Result<Self, SourceError> {
        let canvas = Canvas::from_constants(&config.constants);
        let mut session = Self {
            source,
            config,
            canvas,
            subscription: None,
            summary: None,
            warning: None,
        };
        session.reload().await?;
        Ok(session)
    }

    /// Rebuilds from scratch and resubscribes once the rebuild has settled.
    ///
    /// An unreachable source keeps the current canvas and sets a warning.
    /// Any other failure leaves the session exactly as it was.
    pub async fn reload(&mut self) -> Result<(), SourceError> {
        match rebuild(&self.source, &self.config).await {
            Ok((canvas, summary)) => {
                self.canvas = canvas;
                self.summary = Some(summary);
                self.warning = None;
            }
            Err(SourceError::EndpointUnavailable(reason)) => {
                warn!(%reason, "could not reach the ledger, keeping the current canvas");
                self.summary = None;
                self.warning = Some(format!(
                    "The wall could not be loaded ({}). Showing the last known canvas.",
                    reason
                ));
            }
            Err(err) => return Err(err),
        }

        self.subscription = Some(self.source.subscribe());
        Ok(())
    }

    pub fn canvas(&self) -> &Canvas {
        &self.canvas
    }

    pub fn config(&self) -> &Arc<WallConfig> {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn summary(&self) -> Option<&RebuildSummary> {
        self.summary.as_ref()
    }

    /// User-visible message when the last rebuild fell back.
    pub fn warning(&self) -> Option<&str> {
        self.warning.as_deref()
    }

    pub fn apply_event(&mut self, record: &DecodedRecord) -> ApplyReport {
        let report = self.canvas.apply_live(record);
        debug!(
            payer = %record.payer,
            painted = report.painted,
            "applied live record"
        );
        report
    }

    /// Waits for the next live record and applies it.
    pub async fn next_event(&mut self) -> Result<ApplyReport, SourceError> {
        let record = self
            .subscription
            .as_mut()
            .ok_or(SourceError::Closed)?
            .next()
            .await?;
        Ok(self.apply_event(&record))
    }

    /// Applies every live record already delivered. Returns how many.
    pub fn drain_events(&mut self) -> Result<usize, SourceError> {
        let mut applied = 0;
        loop {
            let next = self
                .subscription
                .as_mut()
                .ok_or(SourceError::Closed)?
                .try_next()?;
            match next {
                Some(record) => {
                    self.apply_event(&record);
                    applied += 1;
                }
                None => return Ok(applied),
            }
        }
    }

    /// Stops listening and hands back the final canvas.
    pub fn close(mut self) -> Canvas {
        if let Some(subscription) = self.subscription.take() {
            subscription.unsubscribe();
        }
        self.canvas
    }
}
