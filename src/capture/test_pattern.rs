//! Synthetic camera source
//!
//! Produces BGR frames with a bar that sweeps across the image, for running
//! without capture hardware.

use super::traits::{CameraSource, CaptureResult, Frame, PixelFormat};

const BAR_WIDTH: u32 = 16;

pub struct TestPatternSource {
    width: u32,
    height: u32,
    /// Background colour, BGR
    background: [u8; 3],
    tick: u64,
}

impl TestPatternSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            background: [40, 40, 40],
            tick: 0,
        }
    }

    /// Tint the background so simulated cameras are told apart
    pub fn with_seed(mut self, seed: u32) -> Self {
        let seed = seed as u8;
        self.background = [
            40u8.wrapping_add(seed.wrapping_mul(53)),
            40u8.wrapping_add(seed.wrapping_mul(97)),
            40u8.wrapping_add(seed.wrapping_mul(29)),
        ];
        self
    }

    fn render(&self) -> Vec<u8> {
        let mut data = Vec::with_capacity((self.width * self.height * 3) as usize);
        let bar_start = (self.tick * 4 % self.width.max(1) as u64) as u32;

        for _ in 0..self.height {
            for x in 0..self.width {
                let on_bar = x >= bar_start && x < bar_start + BAR_WIDTH;
                if on_bar {
                    data.extend_from_slice(&[255, 255, 255]);
                } else {
                    data.extend_from_slice(&self.background);
                }
            }
        }

        data
    }
}

impl CameraSource for TestPatternSource {
    fn next_frame(&mut self) -> CaptureResult<Option<Frame>> {
        let frame = Frame::new(self.render(), self.width, self.height, PixelFormat::Bgr24);
        self.tick += 1;
        Ok(Some(frame))
    }
}
