pub mod unfollow_flow;

pub use unfollow_flow::{UnfollowFlow, UnfollowOutcome};
