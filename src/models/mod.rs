pub mod profile;

pub use profile::{Collection, ProfileSummary};
