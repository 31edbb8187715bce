//! Nearest-neighbour correspondence matching between landmark sets.
//!
//! For every fixed landmark the closest moving landmark is looked up in a
//! k-d tree; pairs closer than the configured distance are kept. Matching is
//! one-directional and not deduplicated: one moving landmark may be the
//! partner of several fixed landmarks.

use glam::DVec2;

use crate::registration::config::MatchConfig;
use crate::registration::result::{MIN_POINTS, RegistrationError};
use crate::registration::spatial::KdTree;


/// Index-aligned matched landmark pairs.
///
/// `fixed[i]` and `moving[i]` are believed to be the same physical structure.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Correspondences {
    pub fixed: Vec<DVec2>,
    pub moving: Vec<DVec2>,
    /// Euclidean distance of each pair.
    pub distances: Vec<f64>,
}

impl Correspondences {
    pub fn len(&self) -> usize {
        self.fixed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty()
    }
}

/// Pair every fixed landmark with its nearest moving landmark.
///
/// Pairs at distance `>= config.max_distance` are dropped. The order of
/// `fixed` is preserved in the output. Never fails; see
/// [`match_landmarks`] for the checked variant.
pub fn nearest_correspondences(
    fixed: &[DVec2],
    moving: &[DVec2],
    config: &MatchConfig,
) -> Correspondences {
    let Some(tree) = KdTree::build(moving) else {
        return Correspondences::default();
    };

    let max_dist_sq = config.max_distance * config.max_distance;
    let mut result = Correspondences::default();

    for &f in fixed {
        let Some(nearest) = tree.nearest(f) else {
            continue;
        };
        if nearest.dist_sq < max_dist_sq {
            result.fixed.push(f);
            result.moving.push(moving[nearest.index]);
            result.distances.push(nearest.dist_sq.sqrt());
        }
    }

    result
}

/// Match landmarks and require enough pairs for an affine fit.
///
/// Fails with [`RegistrationError::InsufficientCorrespondence`] when fewer
/// than three pairs survive the distance filter.
pub fn match_landmarks(
    fixed: &[DVec2],
    moving: &[DVec2],
    config: &MatchConfig,
) -> Result<Correspondences, RegistrationError> {
    let matches = nearest_correspondences(fixed, moving, config);

    tracing::debug!(
        fixed = fixed.len(),
        moving = moving.len(),
        matched = matches.len(),
        max_distance = config.max_distance,
        "Landmark correspondences"
    );

    if matches.len() < MIN_POINTS {
        return Err(RegistrationError::InsufficientCorrespondence {
            found: matches.len(),
            required: MIN_POINTS,
        });
    }

    Ok(matches)
}
