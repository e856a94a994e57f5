use crate::{Prediction, SourceKind};
use std::fmt;

const DISCLAIMER: &str = "Screening aid only. Not a diagnosis; \
    confirm every result with a qualified ophthalmologist.";

/// Plain-text screening summary of one prediction.
#[derive(Debug, Clone, Copy)]
pub struct Report<'a> {
    pub prediction: &'a Prediction,
    pub source: SourceKind,
}

impl<'a> Report<'a> {
    pub fn new(prediction: &'a Prediction, source: SourceKind) -> Self {
        Self { prediction, source }
    }

    pub fn file_name(&self) -> String {
        let slug: String = self
            .prediction
            .stage
            .name()
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_lowercase() } else { '-' })
            .collect();
        format!("retinoscan-{slug}.txt")
    }
}

impl fmt::Display for Report<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = self.prediction.stage;
        let info = stage.info();
        let source = match self.source {
            SourceKind::Image => "uploaded image",
            SourceKind::Camera => "camera frame",
        };
        writeln!(f, "RetinoScan AI screening report")?;
        writeln!(f)?;
        writeln!(f, "Source:      {source}")?;
        writeln!(f, "Stage:       {} (class {})", info.name, stage.index())?;
        writeln!(f, "Risk tier:   {}", info.risk.label())?;
        writeln!(f, "Confidence:  {}%", self.prediction.confidence)?;
        writeln!(f, "Notes:       {}", info.description)?;
        writeln!(f)?;
        writeln!(f, "{DISCLAIMER}")
    }
}
