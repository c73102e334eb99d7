//! The capability boundary between the character logic and the engine.
//!
//! The controller only ever talks to the world through [`HostActorCapabilities`],
//! so it can run against the avian-backed character in `player` or against
//! a plain recording double in tests.

use bevy::prelude::*;

/// Identifies one cosmetic effect emitter owned by a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EffectHandle(pub Entity);

/// Operations the engine exposes to the per-frame character update.
///
/// All calls are synchronous and happen on the main simulation thread.
/// In the side view, `x` is the lateral axis and `y` is vertical.
pub trait HostActorCapabilities {
    /// Current linear velocity after the engine's own movement integration.
    fn velocity(&self) -> Vec2;

    /// Jumps performed since the character last left the ground.
    fn airborne_jump_count(&self) -> u32;

    fn set_airborne_jump_count(&mut self, count: u32);

    /// Whether the movement mode is airborne.
    fn is_falling(&self) -> bool;

    /// Whether the root collision shape is registered with physics.
    fn is_collision_registered(&self) -> bool;

    fn set_gravity_scale(&mut self, scale: f32);

    /// Set the control yaw in degrees (0 faces +x, 180 faces -x).
    fn set_facing_rotation(&mut self, degrees: f32);

    /// Feed the engine's movement-input accumulator for this frame.
    fn add_movement_input(&mut self, direction: Vec2, magnitude: f32);

    fn activate_effect(&mut self, handle: EffectHandle, active: bool);
}
