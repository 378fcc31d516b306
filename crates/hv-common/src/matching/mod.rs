pub mod buckets;
pub mod pipeline;
pub mod scoring;
pub mod skills;
pub mod weights;

// Keep re-exports unique so downstream crates see a single symbol per item.
pub use buckets::{DurationPreference, ExperienceLevel, duration_demand};
pub use pipeline::{RankedOpportunity, RankedVolunteer};
pub use scoring::{MAX_SCORE, MatchEngine, MatchOutcome};
pub use weights::{DEFAULT_WEIGHTS, RuleWeights};
