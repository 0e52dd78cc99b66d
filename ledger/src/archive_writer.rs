use std::io::{Cursor, Write};

use chrono::Utc;
use mla::{config::ArchiveWriterConfig, ArchiveWriter};
use tracing::debug;

use crate::{
    canvas::Canvas,
    config::WallConfig,
    constants::BINCODE_CONFIG,
    errors::ArchiveError,
    structures::ArchiveMeta,
};

pub const META_FILE: &str = "meta";
pub const SNAPSHOT_FILE: &str = "snapshot.png";

pub fn record_file(index: u32) -> String {
    format!("records/{}", index)
}

/// Writes a ledger snapshot: every raw record plus an optional rendered canvas.
pub struct LedgerArchiveWriter<'a, W: Write> {
    mla: ArchiveWriter<'a, W>,
    meta: ArchiveMeta,
}

impl<'a, W: Write> LedgerArchiveWriter<'a, W> {
    pub fn new(dest: W, config: &WallConfig) -> Result<Self, ArchiveError> {
        let mut mla_config = ArchiveWriterConfig::new();
        mla_config.disable_layer(mla::Layers::ENCRYPT);
        let mla = ArchiveWriter::from_config(dest, mla_config)?;

        let meta = ArchiveMeta {
            version: config.constants.version,
            record_size: config.layout.record_size() as u32,
            record_count: 0,
            px_width: config.constants.px_width as u16,
            px_height: config.constants.px_height as u16,
            created_at: Utc::now().timestamp(),
            has_snapshot: false,
        };

        Ok(Self { mla, meta })
    }

    pub fn add_record(&mut self, raw: &[u8]) -> Result<(), ArchiveError> {
        if raw.len() != self.meta.record_size as usize {
            return Err(ArchiveError::RecordSize {
                len: raw.len(),
                expected: self.meta.record_size as usize,
            });
        }

        let name = record_file(self.meta.record_count);
        self.mla.add_file(&name, raw.len() as u64, raw)?;
        self.meta.record_count += 1;
        Ok(())
    }

    pub fn add_snapshot(&mut self, canvas: &Canvas) -> Result<(), ArchiveError> {
        let mut png = Cursor::new(Vec::new());
        canvas
            .to_image()
            .write_to(&mut png, image::ImageOutputFormat::Png)?;
        let png = png.into_inner();

        self.mla.add_file(SNAPSHOT_FILE, png.len() as u64, png.as_slice())?;
        self.meta.has_snapshot = true;
        Ok(())
    }

    pub fn finalize(mut self) -> Result<ArchiveMeta, ArchiveError> {
        let mut meta_buf = Vec::new();
        bincode::encode_into_std_write(&self.meta, &mut meta_buf, BINCODE_CONFIG)?;
        self.mla
            .add_file(META_FILE, meta_buf.len() as u64, meta_buf.as_slice())?;
        self.mla.finalize()?;

        debug!(records = self.meta.record_count, "wrote ledger archive");
        Ok(self.meta)
    }
}
