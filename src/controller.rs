//! Per-frame soaring, facing and turn-jump rules for the side-scrolling character.

use bevy::prelude::*;

use crate::config::SoaringConfig;
use crate::host::{EffectHandle, HostActorCapabilities};

pub const FACING_POSITIVE_X: f32 = 0.0;
pub const FACING_NEGATIVE_X: f32 = 180.0;

/// Direction the horizontal axis pushes the character along.
pub const MOVE_RIGHT_DIRECTION: Vec2 = Vec2::X;

/// The cosmetic emitters toggled together with the glide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EffectHandles {
    pub left_leg: Option<EffectHandle>,
    pub right_leg: Option<EffectHandle>,
    pub glide_audio: Option<EffectHandle>,
}

impl EffectHandles {
    fn resolved(&self) -> Option<[EffectHandle; 3]> {
        Some([self.left_leg?, self.right_leg?, self.glide_audio?])
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CharacterState {
    /// Toggled by the glide input, cleared on landing.
    pub glide_requested: bool,
    /// Mid-air direction reversals since the last landing. Only the parity matters.
    pub turn_jump_parity: u32,
    /// Whether the last horizontal axis value was non-zero.
    pub moving_along_axis: bool,
}

impl CharacterState {
    pub fn input_inverted(&self) -> bool {
        self.turn_jump_parity % 2 == 1
    }
}

/// Owns the character state and re-derives gravity, facing and effects every tick.
#[derive(Component, Debug, Clone)]
pub struct CharacterUpdateController {
    state: CharacterState,
    config: SoaringConfig,
    effects: EffectHandles,
    // Last activation pushed to the host, so repeated toggles stay silent.
    effects_active: Option<bool>,
}

impl CharacterUpdateController {
    pub fn new(config: SoaringConfig, effects: EffectHandles) -> Self {
        Self {
            state: CharacterState::default(),
            config,
            effects,
            effects_active: None,
        }
    }

    pub fn state(&self) -> &CharacterState {
        &self.state
    }

    /// Run once per frame, after the host's movement integration.
    pub fn update(&mut self, host: &mut impl HostActorCapabilities, _delta_secs: f32) {
        let velocity = host.velocity();

        let gliding = self.state.glide_requested && velocity.y < 0.0;
        host.set_gravity_scale(if gliding {
            self.config.glide_gravity_scale
        } else {
            self.config.normal_gravity_scale
        });

        let lateral = velocity.x;
        if lateral < 0.0 {
            host.set_facing_rotation(FACING_NEGATIVE_X);
        } else if lateral > 0.0 {
            host.set_facing_rotation(FACING_POSITIVE_X);
        }

        let jump_count = host.airborne_jump_count();
        if jump_count > 1 && lateral == 0.0 && self.state.moving_along_axis {
            if host.is_collision_registered() {
                self.state.turn_jump_parity += 1;
                host.set_airborne_jump_count(jump_count - 1);
                debug!(
                    "turn jump: parity {} jumps {}",
                    self.state.turn_jump_parity,
                    jump_count - 1
                );
            }
        } else if !host.is_falling() {
            self.state.turn_jump_parity = 0;
            self.state.glide_requested = false;
            self.toggle_effects(host);
        }
    }

    /// Handle one frame of the `MoveRight` axis.
    pub fn apply_horizontal_input(&mut self, host: &mut impl HostActorCapabilities, value: f32) {
        let value = if self.state.input_inverted() {
            -value
        } else {
            value
        };
        self.state.moving_along_axis = value != 0.0;
        host.add_movement_input(MOVE_RIGHT_DIRECTION, value);
    }

    pub fn glide_pressed(&mut self, host: &mut impl HostActorCapabilities) {
        self.state.glide_requested = !self.state.glide_requested;
        debug!("glide requested: {}", self.state.glide_requested);
        self.toggle_effects(host);
    }

    /// Gravity and effects are re-derived every tick, so release changes nothing.
    pub fn glide_released(&mut self, _host: &mut impl HostActorCapabilities) {}

    /// Bring the emitters in line with `glide_requested`.
    pub fn toggle_effects(&mut self, host: &mut impl HostActorCapabilities) {
        let Some(handles) = self.effects.resolved() else {
            debug!("soaring effects not resolved, skipping toggle");
            return;
        };
        let active = self.state.glide_requested;
        if self.effects_active == Some(active) {
            return;
        }
        for handle in handles {
            host.activate_effect(handle, active);
        }
        self.effects_active = Some(active);
    }
}
