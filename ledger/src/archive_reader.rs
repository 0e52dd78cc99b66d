use std::io::{Read, Seek};

use image::RgbImage;
use mla::{config::ArchiveReaderConfig, ArchiveReader};

use crate::{
    archive_writer::{record_file, META_FILE, SNAPSHOT_FILE},
    config::WallConfig,
    constants::BINCODE_CONFIG,
    errors::ArchiveError,
    structures::ArchiveMeta,
};

/// Reads a ledger snapshot back. Iterating yields raw records in the order
/// they were written.
pub struct LedgerArchiveReader<'a, R: Read + Seek> {
    mla: ArchiveReader<'a, R>,
    pub meta: ArchiveMeta,
    next_record: u32,
}

impl<'a, R: Read + Seek + 'a> LedgerArchiveReader<'a, R> {
    pub fn new(reader: R) -> Result<Self, ArchiveError> {
        let mut mla = ArchiveReader::from_config(reader, ArchiveReaderConfig::new())?;

        let meta: ArchiveMeta = {
            let mut meta_file = mla
                .get_file(META_FILE.to_string())?
                .ok_or(ArchiveError::MissingMetaFile)?;
            bincode::decode_from_std_read(&mut meta_file.data, BINCODE_CONFIG)?
        };

        Ok(Self {
            mla,
            meta,
            next_record: 0,
        })
    }

    /// Fails when the archive was written with a layout other than `config`'s.
    pub fn check_layout(&self, config: &WallConfig) -> Result<(), ArchiveError> {
        if self.meta.record_size as usize != config.layout.record_size() {
            return Err(ArchiveError::LayoutMismatch(format!(
                "{}-byte records, expected {}",
                self.meta.record_size,
                config.layout.record_size()
            )));
        }
        if self.meta.version != config.constants.version {
            return Err(ArchiveError::LayoutMismatch(format!(
                "version {}, expected {}",
                self.meta.version, config.constants.version
            )));
        }
        Ok(())
    }

    pub fn read_record(&mut self, index: u32) -> Result<Vec<u8>, ArchiveError> {
        let mut file = self
            .mla
            .get_file(record_file(index))?
            .ok_or(ArchiveError::MissingRecord(index))?;

        let mut buf = Vec::with_capacity(self.meta.record_size as usize);
        file.data.read_to_end(&mut buf)?;
        Ok(buf)
    }

    pub fn snapshot(&mut self) -> Result<Option<RgbImage>, ArchiveError> {
        if !self.meta.has_snapshot {
            return Ok(None);
        }

        let mut file = self
            .mla
            .get_file(SNAPSHOT_FILE.to_string())?
            .ok_or(ArchiveError::MissingSnapshot)?;
        let mut buf = Vec::new();
        file.data.read_to_end(&mut buf)?;

        Ok(Some(image::load_from_memory(&buf)?.to_rgb8()))
    }
}

impl<'a, R: Read + Seek + 'a> Iterator for LedgerArchiveReader<'a, R> {
    type Item = Result<Vec<u8>, ArchiveError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.next_record >= self.meta.record_count {
            return None;
        }

        let index = self.next_record;
        self.next_record += 1;
        Some(self.read_record(index))
    }
}
