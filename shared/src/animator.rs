use std::f64::consts::TAU;

use chrono::Utc;
use log::{debug, trace};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::selector::select;
use crate::shared_wheel_game::{Slice, SpinResult, WheelConfig, WheelError};

/// Receives one call per sector boundary the pointer passes.
pub trait SpinObserver {
    fn on_boundary_crossed(&mut self, sector: usize);
}

impl<F: FnMut(usize)> SpinObserver for F {
    fn on_boundary_crossed(&mut self, sector: usize) {
        self(sector)
    }
}

/// Observer for callers that only want frames.
pub struct NoopObserver;

impl SpinObserver for NoopObserver {
    fn on_boundary_crossed(&mut self, _sector: usize) {}
}

// Ease-out: fast start, hard stop at 1
pub fn ease_out(progress: f64, exponent: i32) -> f64 {
    let p = progress.clamp(0.0, 1.0);
    1.0 - (1.0 - p).powi(exponent)
}

pub fn sector_width(slice_count: usize) -> f64 {
    TAU / slice_count as f64
}

/// Index of the slice under the pointer at `rotation`. An empty wheel reports 0.
pub fn sector_at(rotation: f64, slice_count: usize, pointer_angle: f64) -> usize {
    if slice_count == 0 {
        return 0;
    }
    let position = (pointer_angle - rotation).rem_euclid(TAU);
    let index = (position / sector_width(slice_count)).floor() as usize;
    // rem_euclid may round up to exactly TAU
    index.min(slice_count - 1)
}

/// Sector index without the modulo, so boundaries passed can be counted.
fn unwrapped_sector(rotation: f64, width: f64, pointer_angle: f64) -> i64 {
    ((pointer_angle - rotation) / width).floor() as i64
}

/// Where a spin will stop and how far it turns to get there.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpinPlan {
    pub winner: usize,
    pub slice_count: usize,
    pub sector_width: f64,
    /// Landing point measured from the winning sector's leading edge.
    pub landing_offset: f64,
    pub target_mod: f64,
    pub forward_delta: f64,
    pub extra_spins: u32,
    pub total_rotation: f64,
}

impl SpinPlan {
    pub fn compute<R: Rng + ?Sized>(
        start_rotation: f64,
        slice_count: usize,
        winner: usize,
        config: &WheelConfig,
        rng: &mut R,
    ) -> Self {
        let unit = rng.gen::<f64>();
        let extra_spins = rng.gen_range(config.extra_spins_min..=config.extra_spins_max);
        Self::from_draws(start_rotation, slice_count, winner, unit, extra_spins, config)
    }

    /// Same as `compute` with the two random draws supplied. `unit` is in `[0, 1)`.
    pub fn from_draws(
        start_rotation: f64,
        slice_count: usize,
        winner: usize,
        unit: f64,
        extra_spins: u32,
        config: &WheelConfig,
    ) -> Self {
        let width = sector_width(slice_count);
        let padding = width * config.slice_padding;
        let landing_offset = padding + unit * (width - 2.0 * padding);

        let target_mod =
            (config.pointer_angle - (winner as f64 * width + landing_offset)).rem_euclid(TAU);
        let start_mod = start_rotation.rem_euclid(TAU);

        let mut forward_delta = target_mod - start_mod;
        if forward_delta <= 0.0 {
            forward_delta += TAU;
        }

        Self {
            winner,
            slice_count,
            sector_width: width,
            landing_offset,
            target_mod,
            forward_delta,
            extra_spins,
            total_rotation: forward_delta + extra_spins as f64 * TAU,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
pub enum SpinPhase {
    Idle,
    Spinning,
    Settled,
}

/// Per-spin bookkeeping, owned by the animator while a spin is in flight.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationState {
    pub slices: Vec<Slice>,
    pub plan: SpinPlan,
    pub start_rotation: f64,
    pub start_time: Option<f64>,
    pub last_sector: usize,
    last_unwrapped: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SpinRequest {
    Started(SpinPlan),
    /// A spin was already in flight; nothing changed.
    Ignored,
}

/// What one tick produced.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame {
    pub rotation: f64,
    pub progress: f64,
    pub sector: usize,
    pub crossings: u32,
    pub result: Option<SpinResult>,
}

/// Drives one wheel through `Idle -> Spinning -> Settled`. It only moves when
/// `tick` is called.
#[derive(Debug, Clone)]
pub struct SpinAnimator {
    config: WheelConfig,
    rotation: f64,
    phase: SpinPhase,
    state: Option<AnimationState>,
}

impl SpinAnimator {
    pub fn new(config: WheelConfig) -> Result<Self, WheelError> {
        config.validate()?;
        Ok(Self {
            config,
            rotation: 0.0,
            phase: SpinPhase::Idle,
            state: None,
        })
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn rotation(&self) -> f64 {
        self.rotation
    }

    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    pub fn is_spinning(&self) -> bool {
        self.phase == SpinPhase::Spinning
    }

    pub fn animation(&self) -> Option<&AnimationState> {
        self.state.as_ref()
    }

    pub fn sector_under_pointer(&self, slice_count: usize) -> Option<usize> {
        if slice_count == 0 {
            return None;
        }
        Some(sector_at(self.rotation, slice_count, self.config.pointer_angle))
    }

    pub fn spin<R: Rng + ?Sized>(
        &mut self,
        slices: &[Slice],
        rng: &mut R,
    ) -> Result<SpinRequest, WheelError> {
        self.spin_with(slices, rng, |s, r| select(s, r))
    }

    /// Starts a spin using `selector` to pick the winner. The winner is final
    /// from this point on; the animation only presents it.
    pub fn spin_with<R, F>(
        &mut self,
        slices: &[Slice],
        rng: &mut R,
        selector: F,
    ) -> Result<SpinRequest, WheelError>
    where
        R: Rng + ?Sized,
        F: FnOnce(&[Slice], &mut R) -> Result<usize, WheelError>,
    {
        if self.is_spinning() {
            debug!("spin requested while spinning, ignoring");
            return Ok(SpinRequest::Ignored);
        }
        if slices.is_empty() {
            return Err(WheelError::EmptySlices);
        }

        let winner = selector(slices, rng)?;
        if winner >= slices.len() {
            return Err(WheelError::WinnerOutOfRange { index: winner, len: slices.len() });
        }

        let plan = SpinPlan::compute(self.rotation, slices.len(), winner, &self.config, rng);
        let unwrapped = unwrapped_sector(self.rotation, plan.sector_width, self.config.pointer_angle);

        debug!(
            "spin started: winner {} of {}, {} extra spins, {:.3} rad total",
            winner,
            slices.len(),
            plan.extra_spins,
            plan.total_rotation
        );

        self.state = Some(AnimationState {
            slices: slices.to_vec(),
            plan,
            start_rotation: self.rotation,
            start_time: None,
            last_sector: unwrapped.rem_euclid(slices.len() as i64) as usize,
            last_unwrapped: unwrapped,
        });
        self.phase = SpinPhase::Spinning;
        Ok(SpinRequest::Started(plan))
    }

    /// Advances the spin to `now_ms` (any monotonic millisecond clock). The
    /// first tick of a spin fixes its start time. Returns `None` when idle.
    pub fn tick<O: SpinObserver + ?Sized>(&mut self, now_ms: f64, observer: &mut O) -> Option<Frame> {
        if self.phase != SpinPhase::Spinning {
            return None;
        }
        let state = self.state.as_mut()?;

        let start = *state.start_time.get_or_insert(now_ms);
        let elapsed = (now_ms - start).max(0.0);
        let progress = (elapsed / self.config.spin_duration_ms).min(1.0);
        let eased = ease_out(progress, self.config.ease_exponent);
        // A clock that steps back must not turn the wheel backward.
        let rotation = (state.start_rotation + state.plan.total_rotation * eased).max(self.rotation);

        let count = state.slices.len();
        let unwrapped = unwrapped_sector(rotation, state.plan.sector_width, self.config.pointer_angle);
        let mut crossings = 0;
        if count > 1 {
            let mut k = state.last_unwrapped;
            while k > unwrapped {
                k -= 1;
                crossings += 1;
                let sector = k.rem_euclid(count as i64) as usize;
                trace!("pointer entered sector {}", sector);
                observer.on_boundary_crossed(sector);
            }
        }
        state.last_unwrapped = unwrapped;
        state.last_sector = unwrapped.rem_euclid(count as i64) as usize;
        self.rotation = rotation;

        let sector = sector_at(rotation, count, self.config.pointer_angle);
        let mut frame = Frame {
            rotation,
            progress,
            sector,
            crossings,
            result: None,
        };

        if progress >= 1.0 {
            let state = self.state.take()?;
            let winner = state.plan.winner;
            let slice = state.slices.into_iter().nth(winner)?;
            debug!("spin settled on slice {} ({})", winner, slice.label);
            frame.result = Some(SpinResult {
                index: winner,
                slice,
                timestamp: Utc::now(),
            });
            self.phase = SpinPhase::Settled;
        }

        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn wheel(count: usize) -> Vec<Slice> {
        (0..count)
            .map(|i| Slice::new(&i.to_string(), &format!("Prize {}", i), 100 * i as u64, "🎁", 10.0, "#005BAA"))
            .collect()
    }

    fn run_to_end(animator: &mut SpinAnimator, frame_ms: f64, events: &mut Vec<usize>) -> SpinResult {
        let mut now = 1_000.0;
        loop {
            let frame = animator
                .tick(now, &mut |s: usize| events.push(s))
                .expect("spin should be in flight");
            if let Some(result) = frame.result {
                return result;
            }
            now += frame_ms;
        }
    }

    #[test]
    fn test_ease_out_endpoints() {
        assert_eq!(ease_out(0.0, 5), 0.0);
        assert_eq!(ease_out(1.0, 5), 1.0);
        assert!((ease_out(0.5, 5) - (1.0 - 0.5f64.powi(5))).abs() < 1e-12);
        assert_eq!(ease_out(3.0, 4), 1.0);
    }

    #[test]
    fn test_sector_at_unrotated_wheel() {
        // Pointer at 1.5π on a 4-slice wheel sits in sector 3 (1.5π..2π).
        assert_eq!(sector_at(0.0, 4, 1.5 * std::f64::consts::PI), 3);
        assert_eq!(sector_at(0.0, 4, 0.25 * std::f64::consts::PI), 0);
        assert_eq!(sector_at(1.0, 0, 1.5 * std::f64::consts::PI), 0);
    }

    #[test]
    fn test_forward_delta_is_positive_and_bounded() {
        let config = WheelConfig::default();
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..2_000 {
            let count = rng.gen_range(2..=16);
            let winner = rng.gen_range(0..count);
            let start = rng.gen_range(0.0..500.0);
            let plan = SpinPlan::compute(start, count, winner, &config, &mut rng);
            assert!(plan.forward_delta > 0.0 && plan.forward_delta <= TAU);
            assert!((config.extra_spins_min..=config.extra_spins_max).contains(&plan.extra_spins));
            let expected = plan.forward_delta + plan.extra_spins as f64 * TAU;
            assert!((plan.total_rotation - expected).abs() < 1e-9);
        }
    }

    #[test]
    fn test_landing_is_strictly_inside_winning_sector() {
        let config = WheelConfig::default();
        for seed in 0..300u64 {
            let mut rng = StdRng::seed_from_u64(seed);
            let count = 2 + (seed as usize % 11);
            let winner = rng.gen_range(0..count);
            let start = rng.gen_range(0.0..1_000.0);
            let plan = SpinPlan::compute(start, count, winner, &config, &mut rng);

            let end = start + plan.total_rotation;
            assert_eq!(sector_at(end, count, config.pointer_angle), winner);

            let position = (config.pointer_angle - end).rem_euclid(TAU);
            let inside = position - winner as f64 * plan.sector_width;
            let margin = plan.sector_width * config.slice_padding * 0.99;
            assert!(inside > margin && inside < plan.sector_width - margin, "seed {}", seed);
        }
    }

    #[test]
    fn test_extreme_draws_stay_off_boundaries() {
        let config = WheelConfig::default();
        for count in 2..=12 {
            for winner in 0..count {
                for unit in [0.0, 0.999_999] {
                    let plan = SpinPlan::from_draws(3.7, count, winner, unit, 10, &config);
                    assert_eq!(sector_at(3.7 + plan.total_rotation, count, config.pointer_angle), winner);
                }
            }
        }
    }

    #[test]
    fn test_crossings_match_rotation_at_any_frame_rate() {
        for frame_ms in [1.0, 16.0, 33.3, 250.0, 1_000.0, 7_000.0] {
            let mut rng = StdRng::seed_from_u64(5);
            let mut animator = SpinAnimator::new(WheelConfig::default()).unwrap().with_rotation(2.0);
            let slices = wheel(6);
            let plan = match animator.spin(&slices, &mut rng).unwrap() {
                SpinRequest::Started(plan) => plan,
                SpinRequest::Ignored => panic!("idle wheel ignored a spin"),
            };

            let mut events = Vec::new();
            run_to_end(&mut animator, frame_ms, &mut events);

            let boundaries = (plan.total_rotation / plan.sector_width).floor() as usize;
            assert!(
                events.len() == boundaries || events.len() == boundaries + 1,
                "frame {} ms: {} events for {} boundaries",
                frame_ms,
                events.len(),
                boundaries
            );
            // Sectors are entered in descending order, wrapping around.
            for pair in events.windows(2) {
                assert_eq!(pair[1], (pair[0] + 6 - 1) % 6);
            }
        }
    }

    #[test]
    fn test_completed_spin_reports_selected_index() {
        let slices = wheel(6);
        for (duration, exponent) in [(7_000.0, 5), (1.0, 2), (300.0, 4)] {
            let config = WheelConfig {
                spin_duration_ms: duration,
                ease_exponent: exponent,
                ..WheelConfig::default()
            };
            let mut animator = SpinAnimator::new(config).unwrap();
            let mut rng = StdRng::seed_from_u64(99);
            let plan = match animator.spin(&slices, &mut rng).unwrap() {
                SpinRequest::Started(plan) => plan,
                SpinRequest::Ignored => panic!("idle wheel ignored a spin"),
            };

            let result = run_to_end(&mut animator, 16.0, &mut Vec::new());
            assert_eq!(result.index, plan.winner);
            assert_eq!(result.slice, slices[plan.winner]);
            assert_eq!(animator.phase(), SpinPhase::Settled);
            assert!(animator.tick(1e9, &mut NoopObserver).is_none());
        }
    }

    #[test]
    fn test_injected_selector_decides_winner() {
        let slices = wheel(6);
        let mut animator = SpinAnimator::new(WheelConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        animator.spin_with(&slices, &mut rng, |_, _| Ok(4)).unwrap();
        let result = run_to_end(&mut animator, 50.0, &mut Vec::new());
        assert_eq!(result.index, 4);
        assert_eq!(animator.sector_under_pointer(6), Some(4));

        let err = animator.spin_with(&slices, &mut rng, |_, _| Ok(6));
        assert_eq!(err, Err(WheelError::WinnerOutOfRange { index: 6, len: 6 }));
    }

    #[test]
    fn test_spin_while_spinning_is_ignored() {
        let slices = wheel(6);
        let mut animator = SpinAnimator::new(WheelConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(21);
        animator.spin(&slices, &mut rng).unwrap();
        animator.tick(0.0, &mut NoopObserver);
        animator.tick(500.0, &mut NoopObserver);

        let before = animator.animation().cloned();
        let rotation = animator.rotation();
        assert_eq!(animator.spin(&slices, &mut rng), Ok(SpinRequest::Ignored));
        assert_eq!(animator.animation().cloned(), before);
        assert_eq!(animator.rotation(), rotation);
        assert!(animator.is_spinning());
    }

    #[test]
    fn test_configuration_errors_leave_wheel_idle() {
        let mut animator = SpinAnimator::new(WheelConfig::default()).unwrap().with_rotation(1.25);
        let mut rng = StdRng::seed_from_u64(1);

        assert_eq!(animator.spin(&[], &mut rng), Err(WheelError::EmptySlices));
        let mut zeroed = wheel(3);
        for slice in &mut zeroed {
            slice.weight = 0.0;
        }
        assert_eq!(animator.spin(&zeroed, &mut rng), Err(WheelError::NoPositiveWeight));

        assert_eq!(animator.phase(), SpinPhase::Idle);
        assert_eq!(animator.rotation(), 1.25);
        assert!(animator.animation().is_none());
        assert!(animator.tick(10.0, &mut NoopObserver).is_none());
    }

    #[test]
    fn test_rotation_only_moves_forward_across_spins() {
        let slices = wheel(8);
        let mut animator = SpinAnimator::new(WheelConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(8);
        let mut last = animator.rotation();
        for _ in 0..3 {
            animator.spin(&slices, &mut rng).unwrap();
            let mut now = 0.0;
            while let Some(frame) = animator.tick(now, &mut NoopObserver) {
                assert!(frame.rotation >= last);
                last = frame.rotation;
                if frame.result.is_some() {
                    break;
                }
                now += 40.0;
            }
        }
        assert!(last > 30.0 * TAU);
    }

    #[test]
    fn test_first_tick_fixes_start_time() {
        let slices = wheel(4);
        let mut animator = SpinAnimator::new(WheelConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(2);
        animator.spin(&slices, &mut rng).unwrap();
        let frame = animator.tick(123_456.0, &mut NoopObserver).unwrap();
        assert_eq!(frame.progress, 0.0);
        assert_eq!(frame.rotation, 0.0);
        assert_eq!(frame.crossings, 0);
        let half = animator.tick(123_456.0 + 3_500.0, &mut NoopObserver).unwrap();
        assert!((half.progress - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_single_slice_wheel_never_crosses() {
        let slices = wheel(1);
        let mut animator = SpinAnimator::new(WheelConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(17);
        animator.spin(&slices, &mut rng).unwrap();

        let mut events = Vec::new();
        let result = run_to_end(&mut animator, 16.0, &mut events);
        assert!(events.is_empty());
        assert_eq!(result.index, 0);
        assert!(animator.rotation() > 10.0 * TAU);
    }

    #[test]
    fn test_earlier_timestamp_does_not_turn_wheel_back() {
        let slices = wheel(6);
        let mut animator = SpinAnimator::new(WheelConfig::default()).unwrap();
        let mut rng = StdRng::seed_from_u64(4);
        animator.spin(&slices, &mut rng).unwrap();
        animator.tick(0.0, &mut NoopObserver);

        let ahead = animator.tick(3_000.0, &mut NoopObserver).unwrap();
        let mut events = Vec::new();
        let behind = animator.tick(1_000.0, &mut |s: usize| events.push(s)).unwrap();

        assert_eq!(behind.rotation, ahead.rotation);
        assert_eq!(behind.sector, ahead.sector);
        assert_eq!(behind.crossings, 0);
        assert!(events.is_empty());
        assert_eq!(animator.rotation(), ahead.rotation);
    }
}
