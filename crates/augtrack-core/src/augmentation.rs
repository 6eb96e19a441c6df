//! A single tracked augmentation instance and its per-frame update
//! algorithm.

use crate::affine::{self, Correspondence};
use crate::config::Config;
use crate::ellipse::point_in_ellipse;
use crate::error::AugmentError;
use crate::refset::{ReferenceSet, D_MAX};
use crate::types::{AffineTransform, Ellipse, Keypoint, DESCRIPTOR_DIM};

/// Above this skew magnitude a candidate transform is rejected as a
/// tracking failure rather than committed.
pub const MAX_SKEW: f32 = 1000.0;

/// Above this scale-ratio magnitude a candidate transform is rejected as
/// a tracking failure rather than committed.
pub const MAX_SCALE_RATIO: f32 = 1000.0;

/// Maximum number of correspondences fed to the affine solver, ranked by
/// ascending match distance. Surplus matches beyond this are still used
/// to refresh reference descriptors; they just don't feed the fit.
pub const K_MAX: usize = 256;

/// A single registered, trackable planar surface.
pub struct Augmentation {
    /// The ellipse the instance was registered against, in the instance's
    /// own reference frame. Re-gathered every frame by mapping the current
    /// frame's keypoints back through `transform_inverse`.
    region: Ellipse,
    reference: ReferenceSet,
    transform: AffineTransform,
    transform_inverse: AffineTransform,
    tracking: bool,
    enabled: bool,
    config: Config,
}

impl Augmentation {
    /// Register a new augmentation from the keypoints found inside
    /// `region` at the current frame. The transform starts at the zero
    /// matrix (not identity), so its pseudoinverse is zero too; the
    /// first successful `update` is what gives the augmentation a real
    /// pose. Until then, every keypoint untransforms to the same fixed
    /// point, so the first frame's patch-local gather comes up empty and
    /// `update` falls back to the full frame.
    pub fn create(region: &Ellipse, frame_keypoints: &[Keypoint], config: Config) -> Result<Self, AugmentError> {
        let inside: Vec<Keypoint> = frame_keypoints
            .iter()
            .copied()
            .filter(|k| point_in_ellipse(k.x, k.y, region))
            .collect();

        let reference = ReferenceSet::seed(&inside, config.min_registration_keypoints, config.max_reference_keypoints)?;
        Ok(Self {
            region: *region,
            reference,
            transform: AffineTransform::ZERO,
            transform_inverse: AffineTransform::ZERO.pseudo_inverse(),
            tracking: false,
            enabled: true,
            config,
        })
    }

    /// Pause or resume per-frame updates for this augmentation without
    /// freeing its slot or discarding its reference set.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn transform(&self) -> AffineTransform {
        self.transform
    }

    pub fn transform_inverse(&self) -> AffineTransform {
        self.transform_inverse
    }

    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn reference_keypoint_count(&self) -> usize {
        self.reference.len()
    }

    /// Map a point from the registration ellipse's frame into the current
    /// frame, via the committed transform.
    pub fn transform_point(&self, x: f32, y: f32) -> (f32, f32) {
        self.transform.apply(x, y)
    }

    /// Map a point from the current frame back into the registration
    /// ellipse's frame, via the inverse of the committed transform.
    pub fn untransform_point(&self, x: f32, y: f32) -> (f32, f32) {
        self.transform_inverse.apply(x, y)
    }

    /// Run one frame of the tracking algorithm.
    ///
    /// 1. Gather this frame's patch-local candidates by mapping every
    ///    keypoint in `full_frame_keypoints` back through
    ///    `transform_inverse` and testing it against the registration
    ///    ellipse.
    /// 2. Ratio-match those candidates against the confirmed reference
    ///    set. If too few match, fall back to matching the full frame
    ///    directly (the augmentation has drifted, or this is the first
    ///    frame after registration, where the zero transform makes the
    ///    patch-local gather come up empty).
    /// 3. Rank the accepted correspondences by ascending match distance
    ///    and keep the best [`K_MAX`].
    /// 4. Solve the affine fit; reject on too few correspondences.
    /// 5. Validate skew/scale; reject transforms that are clearly wrong
    ///    rather than committing them.
    /// 6. Commit the transform, refresh matched reference descriptors
    ///    (position untouched), and advance the two-frame confirmation
    ///    queue with the keypoints that weren't close to any known
    ///    reference point.
    ///
    /// Returns `Ok(true)` if the transform was updated this frame,
    /// `Ok(false)` if tracking was lost, leaving the previous transform
    /// in place.
    pub fn update(&mut self, full_frame_keypoints: &[Keypoint]) -> Result<bool, AugmentError> {
        if !self.enabled {
            return Ok(false);
        }

        let region_keypoints: Vec<Keypoint> = full_frame_keypoints
            .iter()
            .copied()
            .filter(|k| {
                let (ux, uy) = self.untransform_point(k.x, k.y);
                point_in_ellipse(ux, uy, &self.region)
            })
            .collect();

        let mut run = self.try_match(&region_keypoints);
        if run.correspondences.len() < self.config.min_matches {
            run = self.try_match(full_frame_keypoints);
        }

        run.correspondences.sort_by(|a, b| a.0.partial_cmp(&b.0).expect("match distances are never NaN"));
        run.correspondences.truncate(K_MAX);
        let correspondences: Vec<Correspondence> = run.correspondences.iter().map(|(_, c)| *c).collect();

        let candidate = match affine::solve_affine(&correspondences, self.config.min_matches) {
            Ok(t) => t,
            Err(_) => {
                self.tracking = false;
                return Ok(false);
            }
        };

        if candidate.skew() > self.config.max_skew || candidate.scale_ratio() > self.config.max_scale_ratio {
            self.tracking = false;
            return Ok(false);
        }

        self.transform = candidate;
        self.transform_inverse = candidate.pseudo_inverse();
        self.tracking = true;

        for (index, descriptor) in run.matched_refresh {
            self.reference.refresh(index, descriptor);
        }
        self.reference.stage(&run.novel, D_MAX);

        Ok(true)
    }

    fn try_match(&self, probes: &[Keypoint]) -> MatchRun {
        let mut correspondences = Vec::with_capacity(probes.len());
        let mut matched_refresh = Vec::new();
        let mut novel = Vec::new();

        for probe in probes {
            let outcome = self.reference.match_probe(probe, self.config.unique_match_ratio);

            if let Some(index) = outcome.index {
                let reference_point = self.reference.keypoints().nth(index).expect("index from match_probe is in range");
                correspondences.push((
                    outcome.distance,
                    Correspondence { ref_x: reference_point.x, ref_y: reference_point.y, obs_x: probe.x, obs_y: probe.y },
                ));
                matched_refresh.push((index, probe.descriptor));
            }

            // Classified independently of the ratio-test accept/reject
            // decision above: a keypoint is novel whenever its nearest
            // reference point is far away, even if the ratio test
            // happened to accept an ambiguous close match.
            if outcome.distance > D_MAX {
                novel.push(*probe);
            }
        }

        MatchRun { correspondences, matched_refresh, novel }
    }
}

struct MatchRun {
    correspondences: Vec<(f32, Correspondence)>,
    matched_refresh: Vec<(usize, [f32; DESCRIPTOR_DIM])>,
    novel: Vec<Keypoint>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn descriptor_for(seed: usize) -> [f32; DESCRIPTOR_DIM] {
        let mut d = [0.0f32; DESCRIPTOR_DIM];
        d[seed % DESCRIPTOR_DIM] = 100.0;
        d
    }

    fn registration_keypoints() -> Vec<Keypoint> {
        (0..12)
            .map(|i| Keypoint::new(i as f32, i as f32, descriptor_for(i)))
            .collect()
    }

    #[test]
    fn create_starts_with_zero_transform_and_not_tracking() {
        let region = Ellipse::new(5.0, 5.0, 20.0, 20.0, 0.0);
        let aug = Augmentation::create(&region, &registration_keypoints(), Config::default()).unwrap();
        assert_eq!(aug.transform(), AffineTransform::ZERO);
        assert_eq!(aug.transform_inverse(), AffineTransform::ZERO);
        assert!(!aug.is_tracking());
    }

    #[test]
    fn create_rejects_regions_with_too_few_keypoints() {
        let region = Ellipse::new(5.0, 5.0, 1.0, 1.0, 0.0);
        let sparse = vec![Keypoint::new(5.0, 5.0, descriptor_for(0))];
        assert!(matches!(Augmentation::create(&region, &sparse, Config::default()), Err(AugmentError::TooFewKeypoints)));
    }

    #[test]
    fn identity_tracking_recovers_the_identity_transform() {
        let region = Ellipse::new(5.5, 5.5, 20.0, 20.0, 0.0);
        let regn = registration_keypoints();
        let mut aug = Augmentation::create(&region, &regn, Config::default()).unwrap();

        // Same keypoints observed again unchanged; the zero transform on
        // frame one forces the full-frame fallback.
        let updated = aug.update(&regn).unwrap();
        assert!(updated);
        assert!(aug.is_tracking());
        let t = aug.transform();
        assert!((t.m00 - 1.0).abs() < 1e-2);
        assert!((t.m11 - 1.0).abs() < 1e-2);
        assert!(t.tx.abs() < 1e-2 && t.ty.abs() < 1e-2);
    }

    #[test]
    fn pure_translation_is_tracked() {
        let region = Ellipse::new(5.5, 5.5, 20.0, 20.0, 0.0);
        let regn = registration_keypoints();
        let mut aug = Augmentation::create(&region, &regn, Config::default()).unwrap();

        let translated: Vec<Keypoint> = regn.iter().map(|k| Keypoint::new(k.x + 30.0, k.y - 15.0, k.descriptor)).collect();

        let updated = aug.update(&translated).unwrap();
        assert!(updated);
        let t = aug.transform();
        assert!((t.tx - 30.0).abs() < 1e-1);
        assert!((t.ty - (-15.0)).abs() < 1e-1);
    }

    #[test]
    fn falls_back_to_full_frame_when_patch_local_candidates_are_insufficient() {
        let region = Ellipse::new(5.5, 5.5, 20.0, 20.0, 0.0);
        let regn = registration_keypoints();
        let mut aug = Augmentation::create(&region, &regn, Config::default()).unwrap();

        // First update commits a real (identity-ish) transform so the
        // second update's patch-local gather is meaningful rather than
        // forced empty by the zero transform.
        assert!(aug.update(&regn).unwrap());

        // Move the surface far enough that the predicted ellipse (still
        // centered near the old position) no longer contains most
        // keypoints; the full-frame fallback must recover tracking.
        let translated: Vec<Keypoint> = regn.iter().map(|k| Keypoint::new(k.x + 500.0, k.y + 500.0, k.descriptor)).collect();
        let updated = aug.update(&translated).unwrap();
        assert!(updated);
        assert!(aug.is_tracking());
    }

    #[test]
    fn too_few_matches_even_after_fallback_loses_tracking() {
        let region = Ellipse::new(5.5, 5.5, 20.0, 20.0, 0.0);
        let regn = registration_keypoints();
        let mut aug = Augmentation::create(&region, &regn, Config::default()).unwrap();

        let unrelated: Vec<Keypoint> = (100..102).map(|i| Keypoint::new(i as f32, i as f32, descriptor_for(i))).collect();
        let updated = aug.update(&unrelated).unwrap();
        assert!(!updated);
        assert!(!aug.is_tracking());
        // previous (zero) transform is retained rather than clobbered
        assert_eq!(aug.transform(), AffineTransform::ZERO);
    }

    #[test]
    fn descriptor_refresh_leaves_reference_position_untouched() {
        let region = Ellipse::new(5.5, 5.5, 20.0, 20.0, 0.0);
        let regn = registration_keypoints();
        let mut aug = Augmentation::create(&region, &regn, Config::default()).unwrap();
        assert!(aug.update(&regn).unwrap());

        // Reference positions are registration-frame coordinates and must
        // never be overwritten by a later frame's observed coordinates.
        let original_xs: Vec<f32> = regn.iter().map(|k| k.x).collect();
        let refreshed_xs: Vec<f32> = aug.reference.keypoints().map(|k| k.x).collect();
        assert_eq!(original_xs, refreshed_xs);
    }

    #[test]
    fn a_novel_keypoint_does_not_join_the_reference_set_on_first_sight() {
        let region = Ellipse::new(5.5, 5.5, 40.0, 40.0, 0.0);
        let mut regn = registration_keypoints();
        let mut aug = Augmentation::create(&region, &regn, Config::default()).unwrap();
        let before = aug.reference_keypoint_count();

        // Add a keypoint far from every reference descriptor (index 50 is
        // well outside the 0..12 range the seeded references occupy).
        regn.push(Keypoint::new(6.0, 6.0, descriptor_for(50)));
        assert!(aug.update(&regn).unwrap());
        assert_eq!(aug.reference_keypoint_count(), before, "a novel point needs a second consecutive sighting to confirm");
    }
}
