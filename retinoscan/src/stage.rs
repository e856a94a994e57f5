use serde::{Deserialize, Serialize};

/// Number of classes the graph model scores.
pub const NUM_STAGES: usize = 5;

/// Severity stage of diabetic retinopathy, in class-index order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Stage {
    NoRetinopathy,
    MildNpdr,
    ModerateNpdr,
    SevereNpdr,
    ProliferativeDr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum RiskTier {
    None,
    Low,
    Moderate,
    High,
    Critical,
}

/// Display record of a stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StageInfo {
    pub name: &'static str,
    pub risk: RiskTier,
    pub description: &'static str,
    /// CSS color of the result label.
    pub color: &'static str,
    pub icon: &'static str,
}

const STAGE_TABLE: [StageInfo; NUM_STAGES] = [
    StageInfo {
        name: "No Diabetic Retinopathy",
        risk: RiskTier::None,
        description: "No visible signs of diabetic retinopathy.",
        color: "#16a34a",
        icon: "✔",
    },
    StageInfo {
        name: "Mild NPDR",
        risk: RiskTier::Low,
        description: "Microaneurysms only. Routine annual screening.",
        color: "#ca8a04",
        icon: "●",
    },
    StageInfo {
        name: "Moderate NPDR",
        risk: RiskTier::Moderate,
        description: "More than microaneurysms but less than severe NPDR.",
        color: "#ea580c",
        icon: "▲",
    },
    StageInfo {
        name: "Severe NPDR",
        risk: RiskTier::High,
        description: "Extensive intraretinal hemorrhages or venous beading.",
        color: "#dc2626",
        icon: "■",
    },
    StageInfo {
        name: "Proliferative DR",
        risk: RiskTier::Critical,
        description: "Neovascularization or vitreous hemorrhage. Urgent referral.",
        color: "#7f1d1d",
        icon: "✖",
    },
];

impl Stage {
    pub const ALL: [Stage; NUM_STAGES] = [
        Stage::NoRetinopathy,
        Stage::MildNpdr,
        Stage::ModerateNpdr,
        Stage::SevereNpdr,
        Stage::ProliferativeDr,
    ];

    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }

    #[inline]
    pub fn info(self) -> &'static StageInfo {
        &STAGE_TABLE[self.index()]
    }

    pub fn name(self) -> &'static str {
        self.info().name
    }

    pub fn risk(self) -> RiskTier {
        self.info().risk
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl RiskTier {
    pub fn label(self) -> &'static str {
        match self {
            RiskTier::None => "none",
            RiskTier::Low => "low",
            RiskTier::Moderate => "moderate",
            RiskTier::High => "high",
            RiskTier::Critical => "critical",
        }
    }
}
