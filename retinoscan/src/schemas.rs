use crate::Stage;
use serde::{Deserialize, Serialize};

/// Confidence in tenths of a percent, `0..=1000`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Confidence(u16);

impl Confidence {
    pub const MAX: Confidence = Confidence(1000);

    /// `100 × score` rounded to one decimal place, clamped to `[0, 100]`.
    pub fn from_score(score: f32) -> Self {
        let tenths = (score * 1000.0).round().clamp(0.0, 1000.0);
        Confidence(tenths as u16)
    }

    #[inline]
    pub const fn tenths(self) -> u16 {
        self.0
    }

    pub fn percent(self) -> f32 {
        self.0 as f32 / 10.0
    }
}

impl std::fmt::Display for Confidence {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}", self.0 / 10, self.0 % 10)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prediction {
    pub stage: Stage,
    pub confidence: Confidence,
}

/// Memory layout of the model input tensor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Layout {
    /// `[1, H, W, C]`, the layout of graphs exported from tensorflow.
    #[default]
    Nhwc,
    /// `[1, C, H, W]`
    Nchw,
}

impl Layout {
    pub const fn shape(self, height: usize, width: usize, channels: usize) -> [usize; 4] {
        match self {
            Layout::Nhwc => [1, height, width, channels],
            Layout::Nchw => [1, channels, height, width],
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct ClassifierOptions {
    pub layout: Layout,
}
