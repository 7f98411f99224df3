use std::collections::BTreeSet;

use crate::config::WheelConfig;
use crate::error::SessionError;

/// Angle covered by one sector, in degrees.
pub fn sector_angle(sector_count: usize) -> f64 {
    360.0 / sector_count as f64
}

/// Maps any angle into `[0, 360)`.
pub fn normalize_degrees(angle: f64) -> f64 {
    ((angle % 360.0) + 360.0) % 360.0
}

/// Wheel rotation that puts the centre of sector `index` under the pointer.
pub fn rotation_for_index(pointer_angle: f64, index: usize, sector_count: usize) -> f64 {
    if sector_count == 0 {
        return 0.0;
    }
    let center = (index as f64 + 0.5) * sector_angle(sector_count);
    normalize_degrees(pointer_angle - center + 360.0)
}

/// Sector under the pointer for a given wheel rotation.
pub fn landed_index(pointer_angle: f64, rotation: f64, sector_count: usize) -> usize {
    if sector_count == 0 {
        return 0;
    }
    let at_pointer = normalize_degrees(pointer_angle - rotation + 360.0);
    (at_pointer / sector_angle(sector_count)).floor() as usize % sector_count
}

/// Starts with positive velocity and comes to rest at `t = 1`.
pub fn ease_out_cubic(t: f64) -> f64 {
    1.0 - (1.0 - t).powi(3)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkOutcome {
    Free { index: usize, steps: usize },
    Exhausted,
}

/// Steps forward from `landed` to the first sector not in `used`.
///
/// Gives up after one full revolution, in which case the caller keeps the
/// sector it originally landed on.
pub fn next_free_index(landed: usize, used: &BTreeSet<usize>, sector_count: usize) -> WalkOutcome {
    (1..sector_count)
        .map(|steps| ((landed + steps) % sector_count, steps))
        .find(|(index, _)| !used.contains(index))
        .map(|(index, steps)| WalkOutcome::Free { index, steps })
        .unwrap_or(WalkOutcome::Exhausted)
}

/// One forward-only rotation, sampled as a pure function of elapsed time.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinAnimation {
    pub start_rotation: f64,
    pub delta: f64,
    pub duration_ms: f64,
}

impl SpinAnimation {
    /// Full spin from the current rotation onto the centre of `target`.
    pub fn initial(current_rotation: f64, target: usize, sector_count: usize, config: &WheelConfig) -> Self {
        let start_rotation = normalize_degrees(current_rotation);
        let end_rotation = rotation_for_index(config.pointer_angle, target, sector_count);
        let delta = normalize_degrees(end_rotation - start_rotation + 360.0)
            + 360.0 * config.extra_rotations as f64;
        Self {
            start_rotation,
            delta,
            duration_ms: config.spin_duration_ms,
        }
    }

    /// Short continuation that carries the wheel onto the centre of `target`.
    pub fn walk(
        current_rotation: f64,
        target: usize,
        steps: usize,
        sector_count: usize,
        config: &WheelConfig,
    ) -> Self {
        let start_rotation = normalize_degrees(current_rotation);
        let end_rotation = rotation_for_index(config.pointer_angle, target, sector_count);
        let mut delta = normalize_degrees(end_rotation - start_rotation + 360.0);
        if delta < 1e-9 {
            delta += 360.0;
        }
        Self {
            start_rotation,
            delta,
            duration_ms: config.walk_duration_ms(steps),
        }
    }

    pub fn progress(&self, elapsed_ms: f64) -> f64 {
        if self.duration_ms <= 0.0 {
            return 1.0;
        }
        (elapsed_ms / self.duration_ms).clamp(0.0, 1.0)
    }

    /// Unwrapped rotation after `elapsed_ms`; never decreases.
    pub fn rotation_at(&self, elapsed_ms: f64) -> f64 {
        self.start_rotation + self.delta * ease_out_cubic(self.progress(elapsed_ms))
    }

    pub fn end_rotation(&self) -> f64 {
        self.start_rotation + self.delta
    }

    pub fn is_complete(&self, elapsed_ms: f64) -> bool {
        self.progress(elapsed_ms) >= 1.0
    }
}

/// Per-display wheel facts the engine reads and settles into.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WheelState {
    pub sector_count: usize,
    pub rotation: f64,
    pub used: BTreeSet<usize>,
}

impl WheelState {
    pub fn new(sector_count: usize) -> Self {
        Self {
            sector_count,
            ..Self::default()
        }
    }

    /// Snap (without animating) so the pointer sits on the centre of `index`.
    pub fn align_to_index(&mut self, index: usize, pointer_angle: f64) {
        if self.sector_count == 0 {
            return;
        }
        self.rotation = rotation_for_index(pointer_angle, index, self.sector_count);
    }

    pub fn landed_index(&self, pointer_angle: f64) -> usize {
        landed_index(pointer_angle, self.rotation, self.sector_count)
    }

    pub fn is_used(&self, index: usize) -> bool {
        self.used.contains(&index)
    }

    pub fn reset(&mut self) {
        self.used.clear();
        self.rotation = 0.0;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SpinPhase {
    Idle,
    Spinning,
    Resolving,
}

/// The spin currently being animated.
#[derive(Debug, Clone, PartialEq)]
pub struct SpinSession {
    pub target_index: usize,
    pub used: BTreeSet<usize>,
    pub start_rotation: f64,
    pub final_index: Option<usize>,
}

/// Reported once per spin when the wheel comes to rest.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpinSettled {
    pub final_index: usize,
    pub rotation: f64,
}

/// Drives `Idle -> Spinning -> Resolving -> Idle` for one display.
#[derive(Debug, Clone)]
pub struct WheelSpinEngine {
    config: WheelConfig,
    phase: SpinPhase,
    awaiting_ack: bool,
    session: Option<SpinSession>,
    animation: Option<SpinAnimation>,
    phase_started_at_ms: f64,
    walked_steps: usize,
}

impl WheelSpinEngine {
    pub fn new(config: WheelConfig) -> Self {
        Self {
            config,
            phase: SpinPhase::Idle,
            awaiting_ack: false,
            session: None,
            animation: None,
            phase_started_at_ms: 0.0,
            walked_steps: 0,
        }
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn phase(&self) -> SpinPhase {
        self.phase
    }

    pub fn session(&self) -> Option<&SpinSession> {
        self.session.as_ref()
    }

    /// True while a spin is requested, animating, or walking.
    pub fn is_busy(&self) -> bool {
        self.awaiting_ack || self.phase != SpinPhase::Idle
    }

    pub fn awaiting_ack(&self) -> bool {
        self.awaiting_ack
    }

    /// Claims the spin trigger before the request goes to the server.
    pub fn request_spin(&mut self) -> Result<(), SessionError> {
        if self.is_busy() {
            log::warn!("spin request ignored, wheel is {:?}", self.phase);
            return Err(SessionError::SpinInFlight);
        }
        self.awaiting_ack = true;
        Ok(())
    }

    /// Server refused the spin: stay idle and hand back its reason.
    pub fn spin_rejected(&mut self, reason: Option<String>) -> SessionError {
        self.awaiting_ack = false;
        let reason = reason.unwrap_or_else(|| crate::constants::SPIN_FAILED_ERROR.to_string());
        log::warn!("spin rejected: {}", reason);
        SessionError::SpinRejected(reason)
    }

    /// Starts animating towards `target`. Returns false if a spin is already running.
    pub fn begin(&mut self, wheel: &WheelState, target: usize, now_ms: f64) -> bool {
        if self.phase != SpinPhase::Idle {
            log::debug!("spin to {} ignored, already {:?}", target, self.phase);
            return false;
        }
        if target >= wheel.sector_count {
            log::warn!("spin target {} outside wheel of {} sectors", target, wheel.sector_count);
            self.awaiting_ack = false;
            return false;
        }

        let animation = SpinAnimation::initial(wheel.rotation, target, wheel.sector_count, &self.config);
        self.session = Some(SpinSession {
            target_index: target,
            used: wheel.used.clone(),
            start_rotation: animation.start_rotation,
            final_index: None,
        });
        self.animation = Some(animation);
        self.phase_started_at_ms = now_ms;
        self.walked_steps = 0;
        self.awaiting_ack = false;
        self.phase = SpinPhase::Spinning;
        log::debug!("spinning to sector {}", target);
        true
    }

    /// Rotation to draw at `now_ms`.
    pub fn rotation_at(&self, wheel: &WheelState, now_ms: f64) -> f64 {
        match &self.animation {
            Some(animation) => animation.rotation_at(now_ms - self.phase_started_at_ms),
            None => wheel.rotation,
        }
    }

    /// Moves the animation to `now_ms`, settling the spin if it has finished.
    pub fn advance(&mut self, wheel: &mut WheelState, now_ms: f64) -> Option<SpinSettled> {
        loop {
            let animation = self.animation?;
            let elapsed = now_ms - self.phase_started_at_ms;
            if !animation.is_complete(elapsed) {
                wheel.rotation = normalize_degrees(animation.rotation_at(elapsed));
                return None;
            }

            wheel.rotation = normalize_degrees(animation.end_rotation());
            let landed = wheel.landed_index(self.config.pointer_angle);
            let walk = self
                .session
                .as_ref()
                .filter(|session| session.used.contains(&landed) && self.walked_steps < wheel.sector_count)
                .map(|session| next_free_index(landed, &session.used, wheel.sector_count));
            let Some(outcome) = walk else {
                return Some(self.settle(wheel, landed));
            };

            match outcome {
                WalkOutcome::Free { index, steps } => {
                    log::debug!("sector {} taken, walking {} step(s) to {}", landed, steps, index);
                    self.animation = Some(SpinAnimation::walk(
                        wheel.rotation,
                        index,
                        steps,
                        wheel.sector_count,
                        &self.config,
                    ));
                    self.phase_started_at_ms += animation.duration_ms;
                    self.walked_steps += steps;
                    self.phase = SpinPhase::Resolving;
                }
                WalkOutcome::Exhausted => {
                    log::info!("no free sector left, keeping {}", landed);
                    return Some(self.settle(wheel, landed));
                }
            }
        }
    }

    /// Drops an in-flight spin without reporting it.
    pub fn abort(&mut self) {
        self.phase = SpinPhase::Idle;
        self.awaiting_ack = false;
        self.session = None;
        self.animation = None;
        self.walked_steps = 0;
    }

    fn settle(&mut self, wheel: &mut WheelState, final_index: usize) -> SpinSettled {
        if let Some(session) = self.session.as_mut() {
            session.final_index = Some(final_index);
        }
        wheel.used.insert(final_index);
        self.session = None;
        self.animation = None;
        self.phase = SpinPhase::Idle;
        log::info!("wheel settled on sector {}", final_index);
        SpinSettled {
            final_index,
            rotation: wheel.rotation,
        }
    }
}
