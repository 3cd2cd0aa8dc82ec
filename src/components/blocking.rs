//! Blocking behavior classification.
//!
//! Every event carries a [`BlockingBehavior`]. Each value has a numeric rank
//! and two behaviors block each other when the sum of their ranks exceeds
//! [`BLOCK_THRESHOLD`]. This replaces an explicit blocking matrix:
//!
//! - `FlyingHigh`/`FlyingLow` for birds and airships. A low flyer passes low
//!   buildings, a high flyer passes high ones too.
//! - `PassesAllBarriers`, `PassesLowBarrier`, `PassesNoBarrier` for walkers.
//! - `BarrierLow`/`BarrierHigh` to lock walkers into an area. Lowering a
//!   barrier lets `PassesLowBarrier` walkers through without touching anyone
//!   else's behavior.
//! - `BuildingLow`/`BuildingHigh` for houses and walls.
//! - `All` blocks everything except `None`; `None` blocks nothing and can
//!   leave the map.
//!
//! Category-level exemptions (e.g. two players never block each other) are
//! not encoded here, see [`BlockingRules`](crate::resources::blockingrules::BlockingRules).

use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Two behaviors block each other iff `rank(a) + rank(b) > BLOCK_THRESHOLD`.
pub const BLOCK_THRESHOLD: i32 = 99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum BlockingBehavior {
    None,
    FlyingHigh,
    FlyingLow,
    BarrierLow,
    BarrierHigh,
    PassesAllBarriers,
    PassesLowBarrier,
    PassesNoBarrier,
    #[default]
    BuildingLow,
    BuildingHigh,
    All,
}

impl BlockingBehavior {
    pub const ALL_VALUES: [BlockingBehavior; 11] = [
        BlockingBehavior::None,
        BlockingBehavior::FlyingHigh,
        BlockingBehavior::FlyingLow,
        BlockingBehavior::BarrierLow,
        BlockingBehavior::BarrierHigh,
        BlockingBehavior::PassesAllBarriers,
        BlockingBehavior::PassesLowBarrier,
        BlockingBehavior::PassesNoBarrier,
        BlockingBehavior::BuildingLow,
        BlockingBehavior::BuildingHigh,
        BlockingBehavior::All,
    ];

    pub const fn rank(self) -> i32 {
        match self {
            BlockingBehavior::None => 0,
            BlockingBehavior::FlyingHigh => 5,
            BlockingBehavior::FlyingLow => 15,
            BlockingBehavior::BarrierLow => 35,
            BlockingBehavior::BarrierHigh => 45,
            BlockingBehavior::PassesAllBarriers => 50,
            BlockingBehavior::PassesLowBarrier => 60,
            BlockingBehavior::PassesNoBarrier => 70,
            BlockingBehavior::BuildingLow => 80,
            BlockingBehavior::BuildingHigh => 90,
            BlockingBehavior::All => 99,
        }
    }

    pub const fn blocks(self, other: BlockingBehavior) -> bool {
        blocks(self, other)
    }

    /// Parses a behavior name (`"BARRIER_LOW"`, `"barrierlow"`). The legacy
    /// boolean map property is accepted too: `"true"` is `BuildingLow`,
    /// `"false"` is `FlyingHigh`.
    pub fn parse(value: &str) -> Result<Self, EngineError> {
        let normalized = value.trim().to_ascii_uppercase().replace('_', "");
        let behavior = match normalized.as_str() {
            "TRUE" => BlockingBehavior::BuildingLow,
            "FALSE" => BlockingBehavior::FlyingHigh,
            "NONE" => BlockingBehavior::None,
            "FLYINGHIGH" => BlockingBehavior::FlyingHigh,
            "FLYINGLOW" => BlockingBehavior::FlyingLow,
            "BARRIERLOW" => BlockingBehavior::BarrierLow,
            "BARRIERHIGH" => BlockingBehavior::BarrierHigh,
            "PASSESALLBARRIERS" => BlockingBehavior::PassesAllBarriers,
            "PASSESLOWBARRIER" => BlockingBehavior::PassesLowBarrier,
            "PASSESNOBARRIER" => BlockingBehavior::PassesNoBarrier,
            "BUILDINGLOW" => BlockingBehavior::BuildingLow,
            "BUILDINGHIGH" => BlockingBehavior::BuildingHigh,
            "ALL" => BlockingBehavior::All,
            _ => {
                return Err(EngineError::Parse {
                    kind: "blocking behavior",
                    value: value.to_string(),
                });
            }
        };
        Ok(behavior)
    }
}

/// Whether an entity with behavior `a` and one with behavior `b` physically
/// impede each other. Symmetric.
pub const fn blocks(a: BlockingBehavior, b: BlockingBehavior) -> bool {
    a.rank() + b.rank() > BLOCK_THRESHOLD
}
