//! Locomotion state machine: continuous world position and heading across
//! discrete, resumable step/turn/jump gestures.
//!
//! `position`/`heading` always hold the last committed (gesture-complete)
//! pose. A gesture in flight interpolates between its own `from`/`to` without
//! touching the committed state; it commits when progress reaches 1 or when a
//! new gesture forces a commit-before-switch.

use glam::Vec2;

use crate::config::AvatarConfig;

#[derive(Debug, Clone, PartialEq)]
pub enum Gesture {
    Stepping {
        key: &'static str,
        from: Vec2,
        to: Vec2,
        start: f64,
        duration: f64,
    },
    Turning {
        key: &'static str,
        from: f32,
        to: f32,
        start: f64,
        duration: f64,
    },
    Leaping {
        start: f64,
        duration: f64,
    },
}

/// Transient pose sampled mid-gesture. `progress` is 1.0 when idle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpatialSample {
    pub position: Vec2,
    pub heading: f32,
    pub progress: f32,
}

#[derive(Debug, Clone, Default)]
pub struct SpatialState {
    pub position: Vec2,
    pub heading: f32,
    gesture: Option<Gesture>,
}

/// Smoothstep easing: p^2 (3 - 2p).
fn smoothstep(p: f32) -> f32 {
    let p = p.clamp(0.0, 1.0);
    p * p * (3.0 - 2.0 * p)
}

/// Local step vector rotated into world space by the current heading.
/// Heading 0 faces +z, so "step-front" moves toward +z.
fn rotate_into_world(local: Vec2, heading: f32) -> Vec2 {
    let (sin, cos) = heading.sin_cos();
    Vec2::new(
        local.x * cos + local.y * sin,
        local.y * cos - local.x * sin,
    )
}

fn step_local(key: &str) -> Option<(&'static str, Vec2)> {
    match key {
        "step-front" => Some(("step-front", Vec2::new(0.0, 1.0))),
        "step-back" => Some(("step-back", Vec2::new(0.0, -1.0))),
        "step-left" => Some(("step-left", Vec2::new(-1.0, 0.0))),
        "step-right" => Some(("step-right", Vec2::new(1.0, 0.0))),
        _ => None,
    }
}

impl SpatialState {
    /// Start the gesture for a body key if it is a locomotion key, first
    /// committing any gesture already in flight. Re-selecting the key of the
    /// in-flight gesture restarts it from the frozen pose rather than
    /// no-opping. Returns whether the key drove locomotion.
    pub fn begin(&mut self, key: &str, now: f64, duration: f64, config: &AvatarConfig) -> bool {
        self.commit(now);

        if let Some((key, local)) = step_local(key) {
            let from = self.position;
            let world = rotate_into_world(local * config.step_size, self.heading);
            let to = (from + world).clamp(
                Vec2::splat(-config.world_bounds),
                Vec2::splat(config.world_bounds),
            );
            self.gesture = Some(Gesture::Stepping {
                key,
                from,
                to,
                start: now,
                duration,
            });
            return true;
        }

        match key {
            "turn-left" | "turn-right" => {
                let sign = if key == "turn-left" { 1.0 } else { -1.0 };
                self.gesture = Some(Gesture::Turning {
                    key: if key == "turn-left" { "turn-left" } else { "turn-right" },
                    from: self.heading,
                    to: self.heading + sign * config.turn_angle,
                    start: now,
                    duration,
                });
                true
            }
            "jump" | "jump-fwd" => {
                self.gesture = Some(Gesture::Leaping {
                    start: now,
                    duration,
                });
                true
            }
            _ => false,
        }
    }

    /// Freeze any in-flight gesture at its current interpolated value and
    /// make that the committed baseline. Never jumps to the gesture's
    /// original `from` or final `to`.
    pub fn commit(&mut self, now: f64) {
        if self.gesture.is_some() {
            let sample = self.peek(now);
            self.position = sample.position;
            self.heading = sample.heading;
            self.gesture = None;
        }
    }

    /// Sample the transient pose at `now`, committing the gesture once its
    /// progress reaches 1 so subsequent frames hold the terminal pose.
    pub fn sample(&mut self, now: f64) -> SpatialSample {
        let sample = self.peek(now);
        if self.gesture.is_some() && sample.progress >= 1.0 {
            self.position = sample.position;
            self.heading = sample.heading;
            self.gesture = None;
        }
        sample
    }

    fn peek(&self, now: f64) -> SpatialSample {
        match &self.gesture {
            None => SpatialSample {
                position: self.position,
                heading: self.heading,
                progress: 1.0,
            },
            Some(Gesture::Stepping {
                from, to, start, duration, ..
            }) => {
                let progress = gesture_progress(now, *start, *duration);
                SpatialSample {
                    position: from.lerp(*to, smoothstep(progress)),
                    heading: self.heading,
                    progress,
                }
            }
            Some(Gesture::Turning {
                from, to, start, duration, ..
            }) => {
                let progress = gesture_progress(now, *start, *duration);
                SpatialSample {
                    position: self.position,
                    heading: from + (to - from) * smoothstep(progress),
                    progress,
                }
            }
            Some(Gesture::Leaping { start, duration }) => SpatialSample {
                position: self.position,
                heading: self.heading,
                progress: gesture_progress(now, *start, *duration),
            },
        }
    }

    /// The generic heading update must not fight an in-flight turn.
    pub fn is_turning(&self) -> bool {
        matches!(self.gesture, Some(Gesture::Turning { .. }))
    }

    pub fn gesture(&self) -> Option<&Gesture> {
        self.gesture.as_ref()
    }

    /// Back to the idle baseline: origin, zero heading, no gesture.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

fn gesture_progress(now: f64, start: f64, duration: f64) -> f32 {
    if duration <= 0.0 {
        return 1.0;
    }
    (((now - start) / duration) as f32).clamp(0.0, 1.0)
}
