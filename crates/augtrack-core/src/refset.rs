//! Reference keypoint set: a ring-buffered gallery plus a "potential"
//! staging queue for keypoints seen but not yet confirmed.

use std::collections::VecDeque;

use crate::error::AugmentError;
use crate::matcher::{best_match, MatchOutcome};
use crate::types::{Keypoint, DESCRIPTOR_DIM};

/// Default capacity of both the reference set and the potential-keypoint queue.
pub const MAX_KEYPOINTS: usize = 512;

/// Default minimum number of keypoints required to seed a new augmentation.
pub const MIN_REGISTRATION_KEYPOINTS: usize = 10;

/// Maximum positional distance between a newly observed keypoint and a
/// potential keypoint staged on the previous frame for the two to be
/// treated as the same candidate surviving into a second consecutive frame.
pub const D_MAX: f32 = 2.0;

/// The confirmed reference keypoints for one augmentation, plus a bounded
/// FIFO queue of candidates staged on the *previous* frame, awaiting
/// confirmation on this one.
///
/// Both `keypoints` and `potential` are ring buffers of capacity
/// `capacity`: once full, the oldest entry is evicted to make room for the
/// newest, rather than rejecting the insert.
pub struct ReferenceSet {
    keypoints: VecDeque<Keypoint>,
    potential: VecDeque<Keypoint>,
    capacity: usize,
}

impl ReferenceSet {
    /// Seed a fresh reference set from the keypoints found inside the
    /// registration ellipse. Requires at least `min_registration`
    /// keypoints; excess keypoints beyond `capacity` are silently dropped
    /// (oldest-first ring semantics do not apply at seed time, since there
    /// is no prior history to preserve).
    pub fn seed(keypoints: &[Keypoint], min_registration: usize, capacity: usize) -> Result<Self, AugmentError> {
        if keypoints.len() < min_registration {
            return Err(AugmentError::TooFewKeypoints);
        }
        let kept: VecDeque<Keypoint> = keypoints.iter().copied().take(capacity).collect();
        Ok(Self { keypoints: kept, potential: VecDeque::new(), capacity })
    }

    pub fn len(&self) -> usize {
        self.keypoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keypoints.is_empty()
    }

    pub fn potential_len(&self) -> usize {
        self.potential.len()
    }

    pub fn keypoints(&self) -> impl Iterator<Item = &Keypoint> {
        self.keypoints.iter()
    }

    /// Match a probe descriptor against the confirmed reference set.
    pub fn match_probe(&self, probe: &Keypoint, tau: f32) -> MatchOutcome {
        let contiguous: Vec<Keypoint> = self.keypoints.iter().copied().collect();
        best_match(&probe.descriptor, &contiguous, tau)
    }

    /// Overwrite only the descriptor of an already-confirmed reference
    /// keypoint with the freshly observed one. This happens on every
    /// accepted match regardless of whether the keypoint survives into the
    /// committed top-K correspondence set, keeping the gallery tracking
    /// slow appearance drift. The reference-frame position is never
    /// touched here — it would otherwise be overwritten with a
    /// current-frame coordinate, corrupting the next frame's fit.
    pub fn refresh(&mut self, index: usize, descriptor: [f32; DESCRIPTOR_DIM]) {
        if let Some(slot) = self.keypoints.get_mut(index) {
            slot.descriptor = descriptor;
        }
    }

    /// Advance the two-frame confirmation state machine with this frame's
    /// novel (non-reference) keypoints.
    ///
    /// A novel keypoint confirms and is promoted straight into the
    /// confirmed set when it lies within `d_max` of a keypoint staged on
    /// the *previous* frame; otherwise it becomes this frame's staged
    /// candidate, replacing the previous potential list outright (a
    /// candidate gets exactly one frame to be confirmed before it is
    /// dropped).
    pub fn stage(&mut self, novel_this_frame: &[Keypoint], d_max: f32) {
        let previous_potential: Vec<Keypoint> = self.potential.drain(..).collect();
        let mut claimed = vec![false; previous_potential.len()];
        let mut next_potential: VecDeque<Keypoint> = VecDeque::new();

        for candidate in novel_this_frame {
            let mut nearest: Option<(usize, f32)> = None;
            for (i, prev) in previous_potential.iter().enumerate() {
                if claimed[i] {
                    continue;
                }
                let dx = candidate.x - prev.x;
                let dy = candidate.y - prev.y;
                let dist = (dx * dx + dy * dy).sqrt();
                if dist <= d_max && nearest.map_or(true, |(_, best)| dist < best) {
                    nearest = Some((i, dist));
                }
            }

            if let Some((i, _)) = nearest {
                claimed[i] = true;
                if self.keypoints.len() == self.capacity {
                    self.keypoints.pop_front();
                }
                self.keypoints.push_back(*candidate);
            } else {
                next_potential.push_back(*candidate);
            }
        }

        while next_potential.len() > self.capacity {
            next_potential.pop_front();
        }
        self.potential = next_potential;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: f32) -> Keypoint {
        Keypoint::new(x, 0.0, [0.0; DESCRIPTOR_DIM])
    }

    #[test]
    fn seed_rejects_below_minimum() {
        let few: Vec<Keypoint> = (0..MIN_REGISTRATION_KEYPOINTS - 1).map(|i| kp(i as f32)).collect();
        assert!(matches!(
            ReferenceSet::seed(&few, MIN_REGISTRATION_KEYPOINTS, MAX_KEYPOINTS),
            Err(AugmentError::TooFewKeypoints)
        ));
    }

    #[test]
    fn seed_accepts_exactly_minimum() {
        let exact: Vec<Keypoint> = (0..MIN_REGISTRATION_KEYPOINTS).map(|i| kp(i as f32)).collect();
        let set = ReferenceSet::seed(&exact, MIN_REGISTRATION_KEYPOINTS, MAX_KEYPOINTS).unwrap();
        assert_eq!(set.len(), MIN_REGISTRATION_KEYPOINTS);
    }

    #[test]
    fn refresh_overwrites_only_the_descriptor() {
        let seed: Vec<Keypoint> = (0..MIN_REGISTRATION_KEYPOINTS).map(|i| kp(i as f32)).collect();
        let mut set = ReferenceSet::seed(&seed, MIN_REGISTRATION_KEYPOINTS, MAX_KEYPOINTS).unwrap();
        let mut new_descriptor = [0.0f32; DESCRIPTOR_DIM];
        new_descriptor[5] = 42.0;
        set.refresh(0, new_descriptor);
        let refreshed = set.keypoints().next().unwrap();
        assert_eq!(refreshed.x, 0.0, "position must survive a descriptor refresh unchanged");
        assert_eq!(refreshed.descriptor[5], 42.0);
    }

    #[test]
    fn a_novel_point_is_not_confirmed_on_first_sight() {
        let seed: Vec<Keypoint> = (0..MIN_REGISTRATION_KEYPOINTS).map(|i| kp(i as f32)).collect();
        let mut set = ReferenceSet::seed(&seed, MIN_REGISTRATION_KEYPOINTS, MAX_KEYPOINTS).unwrap();
        set.stage(&[kp(500.0)], D_MAX);
        assert_eq!(set.len(), MIN_REGISTRATION_KEYPOINTS, "first sighting must only populate the potential queue");
        assert_eq!(set.potential_len(), 1);
    }

    #[test]
    fn a_novel_point_confirms_on_the_second_consecutive_frame() {
        let seed: Vec<Keypoint> = (0..MIN_REGISTRATION_KEYPOINTS).map(|i| kp(i as f32)).collect();
        let mut set = ReferenceSet::seed(&seed, MIN_REGISTRATION_KEYPOINTS, MAX_KEYPOINTS).unwrap();
        set.stage(&[kp(500.0)], D_MAX);
        set.stage(&[kp(500.5)], D_MAX);
        assert_eq!(set.len(), MIN_REGISTRATION_KEYPOINTS + 1);
        assert_eq!(set.potential_len(), 0);
    }

    #[test]
    fn a_candidate_beyond_d_max_does_not_confirm_and_replaces_the_stale_entry() {
        let seed: Vec<Keypoint> = (0..MIN_REGISTRATION_KEYPOINTS).map(|i| kp(i as f32)).collect();
        let mut set = ReferenceSet::seed(&seed, MIN_REGISTRATION_KEYPOINTS, MAX_KEYPOINTS).unwrap();
        set.stage(&[kp(500.0)], D_MAX);
        set.stage(&[kp(600.0)], D_MAX);
        assert_eq!(set.len(), MIN_REGISTRATION_KEYPOINTS, "unrelated candidate must not confirm the stale one");
        assert_eq!(set.potential_len(), 1, "the stale candidate is dropped, only the new one is staged");
    }

    #[test]
    fn potential_queue_never_exceeds_capacity() {
        let seed: Vec<Keypoint> = (0..MIN_REGISTRATION_KEYPOINTS).map(|i| kp(i as f32)).collect();
        let mut set = ReferenceSet::seed(&seed, MIN_REGISTRATION_KEYPOINTS, MAX_KEYPOINTS).unwrap();
        let novel: Vec<Keypoint> = (0..MAX_KEYPOINTS + 10).map(|i| kp(1000.0 + i as f32)).collect();
        set.stage(&novel, D_MAX);
        assert_eq!(set.potential_len(), MAX_KEYPOINTS);
    }

    #[test]
    fn confirmed_set_never_exceeds_capacity_after_two_frame_confirmation() {
        let seed: Vec<Keypoint> = (0..MIN_REGISTRATION_KEYPOINTS).map(|i| kp(i as f32)).collect();
        let mut set = ReferenceSet::seed(&seed, MIN_REGISTRATION_KEYPOINTS, MAX_KEYPOINTS).unwrap();
        let frame_one: Vec<Keypoint> = (0..MAX_KEYPOINTS + 50).map(|i| kp(1000.0 + i as f32)).collect();
        let frame_two: Vec<Keypoint> = (0..MAX_KEYPOINTS + 50).map(|i| kp(1000.0 + i as f32)).collect();
        set.stage(&frame_one, D_MAX);
        set.stage(&frame_two, D_MAX);
        assert_eq!(set.len(), MAX_KEYPOINTS);
    }
}
