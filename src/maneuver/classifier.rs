use std::sync::OnceLock;

use image::RgbaImage;
use log::{info, warn};
use serde::Serialize;

use super::signature::{alpha_distance, normalize_to_alpha_mask, ManeuverSignature, NormalizeParams};
use super::source::IconSource;

const TOP_CANDIDATES: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Candidate {
    pub name: String,
    pub distance: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RecognitionResult {
    /// Empty when the reference library is empty.
    pub best_name: String,
    pub best_distance: u64,
    /// Up to three closest references, ascending by distance.
    pub top: Vec<Candidate>,
    /// Normalized alpha mask of the analyzed icon.
    #[serde(skip)]
    pub mask: Vec<u8>,
}

impl RecognitionResult {
    pub fn is_match(&self) -> bool {
        !self.best_name.is_empty()
    }
}

/// Nearest-neighbour classifier over reference maneuver icons.
///
/// The reference library is built on first use and kept for the lifetime of
/// the classifier.
pub struct ManeuverClassifier {
    source: Box<dyn IconSource>,
    params: NormalizeParams,
    library: OnceLock<Vec<ManeuverSignature>>,
}

impl ManeuverClassifier {
    pub fn new(source: Box<dyn IconSource>) -> Self {
        Self::with_params(source, NormalizeParams::default())
    }

    pub fn with_params(source: Box<dyn IconSource>, params: NormalizeParams) -> Self {
        Self {
            source,
            params,
            library: OnceLock::new(),
        }
    }

    pub fn signatures(&self) -> &[ManeuverSignature] {
        self.library.get_or_init(|| self.build_library())
    }

    pub fn analyze(&self, image: &RgbaImage) -> RecognitionResult {
        let mask = normalize_to_alpha_mask(image, &self.params);
        let references = self.signatures();

        let mut best_name = "";
        let mut best_distance = u64::MAX;
        let mut top: Vec<Candidate> = Vec::with_capacity(TOP_CANDIDATES);

        for reference in references {
            let distance = alpha_distance(&mask, &reference.mask);
            if distance < best_distance {
                best_distance = distance;
                best_name = &reference.name;
            }

            let worst = top.last().map(|candidate| candidate.distance);
            if top.len() < TOP_CANDIDATES || worst.map_or(false, |worst| distance < worst) {
                if top.len() == TOP_CANDIDATES {
                    top.pop();
                }
                top.push(Candidate {
                    name: reference.name.clone(),
                    distance,
                });
                top.sort_by_key(|candidate| candidate.distance);
            }
        }

        RecognitionResult {
            best_name: best_name.to_string(),
            best_distance,
            top,
            mask,
        }
    }

    fn build_library(&self) -> Vec<ManeuverSignature> {
        let names = self.source.names();
        let mut signatures = Vec::with_capacity(names.len());
        for name in names {
            match self.source.render(&name, self.params.render_size) {
                Ok(image) => {
                    let mask = normalize_to_alpha_mask(&image, &self.params);
                    signatures.push(ManeuverSignature { name, mask });
                }
                Err(err) => warn!("Skipping maneuver reference '{}': {:#}", name, err),
            }
        }
        info!("Built maneuver library with {} reference(s)", signatures.len());
        signatures
    }
}
