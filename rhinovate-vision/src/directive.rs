//! Correction directives: the contract between the rules engine and the warp
//! engine.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Rule that produced a directive. Declaration order is evaluation order and
/// therefore warp application order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Rule {
    Symmetry,
    Nose,
    Jaw,
    Chin,
    FacialThirds,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    Face,
    Nose,
    NoseTip,
    NoseBridge,
    Jaw,
    Chin,
    UpperThird,
    MiddleThird,
    LowerThird,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    SymmetryBlend,
    WidthNarrow,
    TipRefine,
    BridgeRefine,
    LateralShift,
    ForwardProject,
    BrowLift,
    CheekFill,
    VerticalStretch,
    ProportionBalance,
}

/// Already-clamped correction size.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "unit", content = "value")]
pub enum Magnitude {
    /// Fraction of the region's baseline extent, 0.15 is 15%.
    Fraction(f32),
    Millimeters(f32),
}

impl Magnitude {
    pub fn value(&self) -> f32 {
        match *self {
            Magnitude::Fraction(v) | Magnitude::Millimeters(v) => v,
        }
    }
}

impl fmt::Display for Magnitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Magnitude::Fraction(v) => write!(f, "{:.0}%", v * 100.0),
            Magnitude::Millimeters(v) => write!(f, "{:.1}mm", v),
        }
    }
}

/// Image-space direction of a move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Left,
    Right,
    Up,
    Down,
}

impl Direction {
    /// Sign along the image axis the direction runs on (x grows right, y down).
    pub fn sign(self) -> f32 {
        match self {
            Direction::Left | Direction::Up => -1.0,
            Direction::Right | Direction::Down => 1.0,
        }
    }
}

/// Why a disclosed directive has no visual effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NonVisualReason {
    /// Change is beyond what a non-surgical simulation should show.
    SurgeryOnly,
}

impl fmt::Display for NonVisualReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NonVisualReason::SurgeryOnly => f.write_str("surgery only, not rendered"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "reason")]
pub enum Rendering {
    Visual,
    NonVisual(NonVisualReason),
}

/// One bounded, disclosed correction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Directive {
    pub rule: Rule,
    pub region: Region,
    pub operation: Operation,
    pub magnitude: Magnitude,
    pub direction: Option<Direction>,
    pub rendering: Rendering,
    pub disclosure: String,
    pub label: String,
}

impl Directive {
    pub fn is_visual(&self) -> bool {
        self.rendering == Rendering::Visual
    }

    /// Magnitude the warp engine should render; zero for placeholders.
    pub fn effective_magnitude(&self) -> f32 {
        if self.is_visual() {
            self.magnitude.value().max(0.0)
        } else {
            0.0
        }
    }
}

impl fmt::Display for Directive {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:?}/{:?} {}",
            self.region, self.operation, self.magnitude
        )?;
        if let Rendering::NonVisual(reason) = self.rendering {
            write!(f, " ({})", reason)?;
        }
        Ok(())
    }
}
