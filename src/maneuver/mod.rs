pub mod classifier;
pub mod signature;
pub mod source;

pub use classifier::{Candidate, ManeuverClassifier, RecognitionResult};
pub use signature::{alpha_distance, normalize_to_alpha_mask, ManeuverSignature, NormalizeParams};
pub use source::{IconDirectory, IconSource, NoIcons, CANONICAL_MANEUVERS};
