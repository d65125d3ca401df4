pub mod cooldown;
pub mod engine;
pub mod gating;
pub mod rebalance;
pub mod scoring;
pub mod sizing;
pub mod tick_strategy;

pub use engine::{Decision, TickInput};
pub use tick_strategy::TickStrategy;
