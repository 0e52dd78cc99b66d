use std::sync::Arc;

use image::{Rgb, RgbImage};
use structures::WallConstants;
use tracing::{debug, warn};

use crate::{
    errors::OutOfBounds,
    structures::{Attribution, Color, DecodedRecord, PixelEdit},
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pixel {
    pub color: Color,
    pub owner: Arc<Attribution>,
}

/// Result of applying one record to the canvas.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    pub painted: usize,
    /// Pixels already claimed by a newer record during a rebuild.
    pub shadowed: usize,
    pub rejected: Vec<OutOfBounds>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.rejected.is_empty()
    }
}

/// The shared W×H grid. Only the reducer entry points below mutate it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Canvas {
    width: usize,
    height: usize,
    pixels: Vec<Pixel>,
}

impl Canvas {
    pub fn new(width: usize, height: usize) -> Self {
        let owner = Arc::new(Attribution::default_wall());
        let pixels = vec![
            Pixel {
                color: Color::default_wall(),
                owner,
            };
            width * height
        ];

        Self {
            width,
            height,
            pixels,
        }
    }

    pub fn from_constants(constants: &WallConstants) -> Self {
        Self::new(constants.px_width, constants.px_height)
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn len(&self) -> usize {
        self.pixels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pixels.is_empty()
    }

    pub fn index_of(&self, x: u8, y: u8) -> Result<usize, OutOfBounds> {
        let (col, row) = (x as usize, y as usize);
        if col >= self.width || row >= self.height {
            return Err(OutOfBounds {
                x,
                y,
                width: self.width,
                height: self.height,
            });
        }
        Ok(col + row * self.width)
    }

    pub fn get(&self, x: u8, y: u8) -> Option<&Pixel> {
        self.index_of(x, y).ok().map(|i| &self.pixels[i])
    }

    pub fn pixel_at(&self, index: usize) -> Option<&Pixel> {
        self.pixels.get(index)
    }

    pub fn pixels(&self) -> &[Pixel] {
        &self.pixels
    }

    /// Applies a live record: every valid pixel is overwritten, whatever was
    /// painted there before.
    pub fn apply_live(&mut self, record: &DecodedRecord) -> ApplyReport {
        let owner = Arc::new(record.attribution());
        let mut report = ApplyReport::default();

        for edit in &record.pixels {
            match self.index_of(edit.x, edit.y) {
                Ok(index) => {
                    self.paint(index, edit, &owner);
                    report.painted += 1;
                }
                Err(err) => reject(&mut report, err),
            }
        }

        report
    }

    /// Starts a bounded rebuild pass over this canvas.
    pub fn rebuild(&mut self) -> Rebuild<'_> {
        let size = self.pixels.len();
        Rebuild {
            canvas: self,
            claimed: vec![false; size],
            remaining: size,
        }
    }

    pub fn to_image(&self) -> RgbImage {
        let mut image = RgbImage::new(self.width as u32, self.height as u32);
        for (index, pixel) in self.pixels.iter().enumerate() {
            let (x, y) = (index % self.width, index / self.width);
            let Color { r, g, b } = pixel.color;
            image.put_pixel(x as u32, y as u32, Rgb([r, g, b]));
        }
        image
    }

    fn paint(&mut self, index: usize, edit: &PixelEdit, owner: &Arc<Attribution>) {
        let pixel = &mut self.pixels[index];
        pixel.color = edit.color;
        pixel.owner = Arc::clone(owner);
    }
}

fn reject(report: &mut ApplyReport, err: OutOfBounds) {
    warn!("{}", err);
    report.rejected.push(err);
}

/// One full-rebuild pass. Owns the claim set and the remaining pixel budget,
/// both dropped when the pass ends.
///
/// Records must be fed newest-first: the first record to reach an index
/// claims it, and later (older) records cannot repaint it.
pub struct Rebuild<'a> {
    canvas: &'a mut Canvas,
    claimed: Vec<bool>,
    remaining: usize,
}

impl Rebuild<'_> {
    pub fn apply(&mut self, record: &DecodedRecord) -> ApplyReport {
        let owner = Arc::new(record.attribution());
        let mut report = ApplyReport::default();

        for edit in &record.pixels {
            if self.remaining == 0 {
                debug!("canvas fully claimed, stopping mid-record");
                break;
            }

            let index = match self.canvas.index_of(edit.x, edit.y) {
                Ok(index) => index,
                Err(err) => {
                    reject(&mut report, err);
                    continue;
                }
            };

            if self.claimed[index] {
                report.shadowed += 1;
                continue;
            }

            self.canvas.paint(index, edit, &owner);
            self.claimed[index] = true;
            self.remaining -= 1;
            report.painted += 1;
        }

        report
    }

    pub fn remaining(&self) -> usize {
        self.remaining
    }

    pub fn is_complete(&self) -> bool {
        self.remaining == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::structures::{Pubkey, SocialBundle};

    fn record(payer: u8, timestamp: i64, pixels: &[(u8, u8, Color)]) -> DecodedRecord {
        DecodedRecord {
            bump: None,
            id: None,
            version: None,
            epoch: None,
            mint: None,
            timestamp,
            payer: Pubkey([payer; 32]),
            token: Pubkey([9; 32]),
            pixels: pixels
                .iter()
                .map(|&(x, y, color)| PixelEdit { x, y, color })
                .collect(),
            socials: SocialBundle::default(),
        }
    }

    const RED: Color = Color::new(255, 0, 0);
    const BLUE: Color = Color::new(0, 0, 255);

    #[test]
    fn test_new_canvas_is_default() {
        let canvas = Canvas::new(100, 100);

        assert_eq!(canvas.len(), 10_000);
        let pixel = canvas.get(99, 99).unwrap();
        assert_eq!(pixel.color.to_string(), "1b1d28");
        assert_eq!(*pixel.owner, Attribution::default_wall());
        assert!(canvas.get(100, 0).is_none());
    }

    #[test]
    fn test_newest_record_wins_during_rebuild() {
        let mut canvas = Canvas::new(100, 100);
        let newer = record(2, 20, &[(5, 5, BLUE)]);
        let older = record(1, 10, &[(5, 5, RED), (6, 5, RED)]);

        let mut pass = canvas.rebuild();
        assert_eq!(pass.apply(&newer).painted, 1);
        let report = pass.apply(&older);
        assert_eq!(report.painted, 1);
        assert_eq!(report.shadowed, 1);
        assert_eq!(pass.remaining(), 10_000 - 2);

        let pixel = canvas.get(5, 5).unwrap();
        assert_eq!(pixel.color, BLUE);
        assert_eq!(pixel.owner.payer, Pubkey([2; 32]));
        assert_eq!(canvas.get(6, 5).unwrap().color, RED);
    }

    #[test]
    fn test_budget_stops_mid_record() {
        let mut canvas = Canvas::new(2, 2);
        let first = record(1, 30, &[(0, 0, RED), (1, 0, RED), (0, 1, RED)]);
        let second = record(2, 20, &[(1, 1, BLUE), (0, 0, BLUE)]);
        let third = record(3, 10, &[(1, 1, Color::new(1, 1, 1))]);

        let mut pass = canvas.rebuild();
        pass.apply(&first);
        let report = pass.apply(&second);
        assert_eq!(report.painted, 1);
        assert_eq!(report.shadowed, 0);
        assert!(pass.is_complete());

        assert_eq!(pass.apply(&third).painted, 0);
        assert_eq!(canvas.get(1, 1).unwrap().color, BLUE);
        assert_eq!(canvas.get(0, 0).unwrap().color, RED);
    }

    #[test]
    fn test_out_of_bounds_pixel_is_rejected_alone() {
        let mut canvas = Canvas::new(100, 100);
        let edits = record(1, 10, &[(1, 1, RED), (255, 3, BLUE), (2, 2, RED)]);

        let report = canvas.rebuild().apply(&edits);
        assert_eq!(report.painted, 2);
        assert_eq!(
            report.rejected,
            vec![OutOfBounds {
                x: 255,
                y: 3,
                width: 100,
                height: 100
            }]
        );
        assert!(!report.is_clean());
        assert_eq!(canvas.get(1, 1).unwrap().color, RED);
        assert_eq!(canvas.get(2, 2).unwrap().color, RED);

        let report = canvas.apply_live(&record(2, 11, &[(100, 0, BLUE)]));
        assert_eq!(report.painted, 0);
        assert_eq!(report.rejected.len(), 1);
    }

    #[test]
    fn test_live_apply_overwrites_unconditionally() {
        let mut canvas = Canvas::new(100, 100);
        canvas.rebuild().apply(&record(1, 50, &[(7, 7, RED)]));

        // Live events bypass claims, even when their timestamp is older.
        let report = canvas.apply_live(&record(2, 5, &[(7, 7, BLUE)]));
        assert_eq!(report.painted, 1);

        let pixel = canvas.get(7, 7).unwrap();
        assert_eq!(pixel.color, BLUE);
        assert_eq!(pixel.owner.payer, Pubkey([2; 32]));
    }

    #[test]
    fn test_claims_do_not_leak_between_passes() {
        let mut canvas = Canvas::new(10, 10);
        canvas.rebuild().apply(&record(1, 50, &[(3, 3, RED)]));

        let mut pass = canvas.rebuild();
        assert_eq!(pass.remaining(), 100);
        assert_eq!(pass.apply(&record(2, 40, &[(3, 3, BLUE)])).painted, 1);
        assert_eq!(canvas.get(3, 3).unwrap().color, BLUE);
    }

    #[test]
    fn test_to_image() {
        let mut canvas = Canvas::new(4, 3);
        canvas.apply_live(&record(1, 1, &[(3, 2, RED)]));
        let image = canvas.to_image();

        assert_eq!(image.dimensions(), (4, 3));
        assert_eq!(image.get_pixel(3, 2), &Rgb([255, 0, 0]));
        assert_eq!(image.get_pixel(0, 0), &Rgb([0x1b, 0x1d, 0x28]));
    }
}
