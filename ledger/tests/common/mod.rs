#![allow(dead_code)]

use std::{collections::HashMap, sync::Arc};

use ledger::{
    codec, Color, DecodedRecord, EditSet, MemorySource, Pubkey, Record, SocialBundle,
    SubmitRequest, Submitter, WallConfig,
};

pub fn config() -> Arc<WallConfig> {
    WallConfig::builtin().unwrap()
}

pub fn source(config: &Arc<WallConfig>) -> Arc<MemorySource> {
    Arc::new(MemorySource::new(Arc::clone(config)))
}

pub fn submitter(
    source: &Arc<MemorySource>,
    config: &Arc<WallConfig>,
) -> Submitter<Arc<MemorySource>> {
    Submitter::new(Arc::clone(source), Arc::clone(config))
}

pub fn request(payer: u8) -> SubmitRequest {
    SubmitRequest {
        socials: SocialBundle {
            name: Some(format!("painter {}", payer)),
            ..SocialBundle::default()
        },
        ..SubmitRequest::new(Pubkey([payer; 32]))
    }
}

pub fn edits(pixels: &[(u32, u32, &str)]) -> EditSet {
    pixels
        .iter()
        .map(|&(x, y, hex)| (x + y * 100, hex.parse::<Color>().unwrap()))
        .collect()
}

/// `len` distinct pixels, all one color.
pub fn block(len: u32, hex: &str) -> EditSet {
    let color: Color = hex.parse().unwrap();
    (0..len).map(|i| (i, color)).collect::<HashMap<_, _>>()
}

/// A raw record as the ledger would store it.
pub fn raw_record(config: &WallConfig, version: u8, timestamp: i64, edits: &EditSet) -> Vec<u8> {
    let mut pixels: Vec<(u32, Color)> = edits.iter().map(|(i, c)| (*i, *c)).collect();
    pixels.sort_by_key(|(i, _)| *i);

    let record = Record {
        bump: 1,
        id: rand::random(),
        version,
        epoch: 1,
        mint: Pubkey::default(),
        timestamp,
        payer: Pubkey([timestamp as u8; 32]),
        token: Pubkey::default(),
        data: codec::encode_data(pixels, &config.constants).unwrap(),
        socials: codec::encode_socials(&SocialBundle::default(), &config.constants).unwrap(),
    };
    codec::encode_record(&record, config).unwrap()
}

pub fn decode_stored(config: &WallConfig, raw: &[u8]) -> DecodedRecord {
    codec::decode_record(&raw[8..], config, "bump").unwrap()
}
