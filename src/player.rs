use avian2d::{math::*, prelude::*};
use bevy::{ecs::query::Has, prelude::*};
use std::collections::HashMap;

use crate::config::MovementConfig;
use crate::controller::CharacterUpdateController;
use crate::effects::{animate_particles, sync_effects, EffectToggled};
use crate::game::{follow_camera, spawn_gamepad_characters};
use crate::host::{EffectHandle, HostActorCapabilities};
use crate::input::{gamepad_input, keyboard_input};

pub struct CharacterControllerPlugin;

impl Plugin for CharacterControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<PlayerAction>()
            .add_event::<EffectToggled>()
            .add_systems(
                Update,
                (
                    keyboard_input,
                    gamepad_input,
                    // After input, so the South press that joins a pad is not also its first jump.
                    spawn_gamepad_characters,
                    update_grounded,
                    reset_jumps_on_landing,
                    dispatch_actions,
                    integrate_movement_input,
                    apply_movement_damping,
                    update_character,
                    apply_facing,
                    sync_effects,
                    animate_particles,
                    follow_camera,
                )
                    .chain(),
            );
    }
}

// An event sent for each bound input action or axis.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub enum PlayerAction {
    // Sent every frame, including zero, so the controller sees the axis go idle.
    MoveRight(Entity, Scalar),
    Jump(Entity),
    StopJump(Entity),
    Soaring(Entity),
    StopSoaring(Entity),
}

#[derive(Resource, Default)]
pub struct PlayerAssignments {
    // Map each Gamepad to its spawned character
    pub players: HashMap<u32, Entity>,
    // The default pawn driven by the keyboard.
    pub keyboard: Option<Entity>,
}

// A marker component indicating that an entity is using a character controller.
#[derive(Component)]
pub struct CharacterController;

// A marker component indicating that an entity is on the ground.
#[derive(Component)]
#[component(storage = "SparseSet")]
pub struct Grounded;

// The child entity holding the character's mesh, mirrored by `Facing`.
#[derive(Component)]
pub struct CharacterVisual;

// The acceleration used for character movement.
#[derive(Component)]
pub struct MovementAcceleration(pub Scalar);

// Fraction of the acceleration available while airborne.
#[derive(Component)]
pub struct AirControl(pub Scalar);

#[derive(Component)]
pub struct MaxWalkSpeed(pub Scalar);

// Slows down lateral movement and brings it to a full stop at low speed.
#[derive(Component)]
pub struct MovementDamping {
    pub factor: Scalar,
    pub stop_speed: Scalar,
}

// The strength of a jump.
#[derive(Component)]
pub struct JumpImpulse(pub Scalar);

// The maximum angle a slope can have for a character controller
// to be able to climb and jump. If the slope is steeper than this angle,
// the character will slide down.
#[derive(Component)]
pub struct MaxSlopeAngle(pub Scalar);

// Jumps performed since leaving the ground.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct AirborneJumps {
    pub count: u32,
    pub max: u32,
    // Set while the jump button is held so one press yields one jump.
    pub held: bool,
    // Grounded state seen last frame; credits come back on the landing edge only.
    pub was_grounded: bool,
}

impl AirborneJumps {
    pub fn new(max: u32) -> Self {
        Self {
            count: 0,
            max,
            held: false,
            was_grounded: false,
        }
    }

    pub fn press(&mut self) -> bool {
        if self.held {
            return false;
        }
        self.held = true;
        if self.count >= self.max {
            return false;
        }
        self.count += 1;
        true
    }

    pub fn release(&mut self) {
        self.held = false;
    }
}

// Movement input accumulated this frame, consumed by `integrate_movement_input`.
#[derive(Component, Default, Debug)]
pub struct MovementInput(pub Vector);

// Control yaw in degrees.
#[derive(Component, Default, Debug, PartialEq)]
pub struct Facing(pub Scalar);

// A bundle that contains the components needed for a basic
// dynamic character controller.
#[derive(Bundle)]
pub struct CharacterControllerBundle {
    character_controller: CharacterController,
    rigid_body: RigidBody,
    collider: Collider,
    ground_caster: ShapeCaster,
    locked_axes: LockedAxes,
    gravity_scale: GravityScale,
    movement: MovementBundle,
}

// A bundle that contains components for character movement.
#[derive(Bundle)]
pub struct MovementBundle {
    acceleration: MovementAcceleration,
    air_control: AirControl,
    max_walk_speed: MaxWalkSpeed,
    damping: MovementDamping,
    jump_impulse: JumpImpulse,
    max_slope_angle: MaxSlopeAngle,
    jumps: AirborneJumps,
    input: MovementInput,
    facing: Facing,
}

impl MovementBundle {
    pub fn new(config: &MovementConfig) -> Self {
        Self {
            acceleration: MovementAcceleration(config.acceleration),
            air_control: AirControl(config.air_control),
            max_walk_speed: MaxWalkSpeed(config.max_walk_speed),
            damping: MovementDamping {
                factor: config.damping,
                stop_speed: config.stop_speed,
            },
            jump_impulse: JumpImpulse(config.jump_impulse),
            max_slope_angle: MaxSlopeAngle(config.max_slope_angle_degrees.to_radians()),
            jumps: AirborneJumps::new(config.max_jumps),
            input: MovementInput::default(),
            facing: Facing::default(),
        }
    }
}

impl Default for MovementBundle {
    fn default() -> Self {
        Self::new(&MovementConfig::default())
    }
}

impl CharacterControllerBundle {
    pub fn new(collider: Collider, gravity_scale: Scalar) -> Self {
        // Create shape caster as a slightly smaller version of collider
        let mut caster_shape = collider.clone();
        caster_shape.set_scale(Vector::ONE * 0.99, 10);

        Self {
            character_controller: CharacterController,
            rigid_body: RigidBody::Dynamic,
            collider,
            ground_caster: ShapeCaster::new(caster_shape, Vector::ZERO, 0.0, Dir2::NEG_Y)
                .with_max_distance(10.0),
            locked_axes: LockedAxes::ROTATION_LOCKED,
            gravity_scale: GravityScale(gravity_scale),
            movement: MovementBundle::default(),
        }
    }

    pub fn with_movement(mut self, config: &MovementConfig) -> Self {
        self.movement = MovementBundle::new(config);
        self
    }
}

/// One character's components seen through [`HostActorCapabilities`].
pub struct CharacterHost<'a, 'w> {
    velocity: &'a mut LinearVelocity,
    gravity_scale: &'a mut GravityScale,
    jumps: &'a mut AirborneJumps,
    // Kept behind `Mut` so an unchanged yaw does not trip `Changed<Facing>`.
    facing: &'a mut Mut<'w, Facing>,
    movement_input: &'a mut MovementInput,
    grounded: bool,
    collision_registered: bool,
    toggled: Vec<EffectToggled>,
}

impl<'a, 'w> CharacterHost<'a, 'w> {
    pub fn new(
        velocity: &'a mut LinearVelocity,
        gravity_scale: &'a mut GravityScale,
        jumps: &'a mut AirborneJumps,
        facing: &'a mut Mut<'w, Facing>,
        movement_input: &'a mut MovementInput,
        grounded: bool,
        collision_registered: bool,
    ) -> Self {
        Self {
            velocity,
            gravity_scale,
            jumps,
            facing,
            movement_input,
            grounded,
            collision_registered,
            toggled: Vec::new(),
        }
    }

    // The engine's built-in jump, bound directly to the Jump action.
    fn jump(&mut self, impulse: Scalar) {
        if self.jumps.press() {
            self.velocity.y = impulse;
            debug!("jump {} of {}", self.jumps.count, self.jumps.max);
        }
    }

    fn stop_jumping(&mut self) {
        self.jumps.release();
    }

    fn into_effect_toggles(self) -> Vec<EffectToggled> {
        self.toggled
    }
}

impl HostActorCapabilities for CharacterHost<'_, '_> {
    fn velocity(&self) -> Vec2 {
        self.velocity.0
    }

    fn airborne_jump_count(&self) -> u32 {
        self.jumps.count
    }

    fn set_airborne_jump_count(&mut self, count: u32) {
        self.jumps.count = count;
    }

    fn is_falling(&self) -> bool {
        !self.grounded
    }

    fn is_collision_registered(&self) -> bool {
        self.collision_registered
    }

    fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale.0 = scale;
    }

    fn set_facing_rotation(&mut self, degrees: f32) {
        self.facing.set_if_neq(Facing(degrees));
    }

    fn add_movement_input(&mut self, direction: Vec2, magnitude: f32) {
        self.movement_input.0 += direction * magnitude;
    }

    fn activate_effect(&mut self, handle: EffectHandle, active: bool) {
        self.toggled.push(EffectToggled { handle, active });
    }
}

type CharacterQueryData = (
    &'static mut CharacterUpdateController,
    &'static mut LinearVelocity,
    &'static mut GravityScale,
    &'static mut AirborneJumps,
    &'static mut Facing,
    &'static mut MovementInput,
    &'static JumpImpulse,
    Has<Grounded>,
    Has<Collider>,
);

fn update_grounded(
  mut commands: Commands,
  mut query: Query<
      (Entity, &ShapeHits, &Rotation, Option<&MaxSlopeAngle>),
      With<CharacterController>,
  >,
) {
  for (entity, hits, rotation, max_slope_angle) in &mut query {
      // The character is grounded if the shape caster has a hit with a normal
      // that isn't too steep.
      let is_grounded = hits.iter().any(|hit| {
          if let Some(angle) = max_slope_angle {
              (rotation * -hit.normal2).angle_to(Vector::Y).abs() <= angle.0
          } else {
              true
          }
      });

      if is_grounded {
          commands.entity(entity).insert(Grounded);
      } else {
          commands.entity(entity).remove::<Grounded>();
      }
  }
}

// Landing gives back all jump credits. The ground caster still hits for a few
// frames after a jump, so only the airborne to grounded edge counts as landing.
fn reset_jumps_on_landing(mut query: Query<(&mut AirborneJumps, Has<Grounded>)>) {
  for (mut jumps, grounded) in &mut query {
      if grounded && !jumps.was_grounded && jumps.count != 0 {
          debug!("landed, {} jump credits restored", jumps.count);
          jumps.count = 0;
      }
      if jumps.was_grounded != grounded {
          jumps.was_grounded = grounded;
      }
  }
}

// Routes [`PlayerAction`] events to the character's input handlers.
fn dispatch_actions(
  mut actions: EventReader<PlayerAction>,
  mut effects: EventWriter<EffectToggled>,
  mut characters: Query<CharacterQueryData>,
) {
  for action in actions.read() {
      let entity = match *action {
          PlayerAction::MoveRight(e, _)
          | PlayerAction::Jump(e)
          | PlayerAction::StopJump(e)
          | PlayerAction::Soaring(e)
          | PlayerAction::StopSoaring(e) => e,
      };
      let Ok((
          mut controller,
          mut velocity,
          mut gravity_scale,
          mut jumps,
          mut facing,
          mut input,
          jump_impulse,
          grounded,
          has_collider,
      )) = characters.get_mut(entity)
      else {
          continue;
      };
      let mut host = CharacterHost::new(
          &mut velocity,
          &mut gravity_scale,
          &mut jumps,
          &mut facing,
          &mut input,
          grounded,
          has_collider,
      );
      match *action {
          PlayerAction::MoveRight(_, value) => controller.apply_horizontal_input(&mut host, value),
          PlayerAction::Jump(_) => host.jump(jump_impulse.0),
          PlayerAction::StopJump(_) => host.stop_jumping(),
          PlayerAction::Soaring(_) => controller.glide_pressed(&mut host),
          PlayerAction::StopSoaring(_) => controller.glide_released(&mut host),
      }
      effects.send_batch(host.into_effect_toggles());
  }
}

// Turns the accumulated movement input into lateral velocity.
fn integrate_movement_input(
  time: Res<Time>,
  mut query: Query<(
      &MovementAcceleration,
      &AirControl,
      &MaxWalkSpeed,
      &mut MovementInput,
      &mut LinearVelocity,
      Has<Grounded>,
  )>,
) {
  // Precision is adjusted so this works with both the `f32` and `f64` features.
  let delta_time = time.delta_secs_f64().adjust_precision();
  for (acceleration, air_control, max_speed, mut input, mut velocity, grounded) in &mut query {
      let input_x = input.0.clamp_length_max(1.0).x;
      input.0 = Vector::ZERO;
      if input_x == 0.0 {
          continue;
      }
      let control = if grounded { 1.0 } else { air_control.0 };
      velocity.x = (velocity.x + input_x * acceleration.0 * control * delta_time)
          .clamp(-max_speed.0, max_speed.0);
  }
}

// Slows down movement in the X direction.
fn apply_movement_damping(mut query: Query<(&MovementDamping, &mut LinearVelocity)>) {
  for (damping, mut linear_velocity) in &mut query {
      // We could use `LinearDamping`, but we don't want to dampen movement along the Y axis
      linear_velocity.x *= damping.factor;
      if linear_velocity.x.abs() < damping.stop_speed {
          linear_velocity.x = 0.0;
      }
  }
}

// The once-per-frame character update, after movement has been integrated.
fn update_character(
  time: Res<Time>,
  mut effects: EventWriter<EffectToggled>,
  mut characters: Query<CharacterQueryData>,
) {
  let delta_time = time.delta_secs();
  for (
      mut controller,
      mut velocity,
      mut gravity_scale,
      mut jumps,
      mut facing,
      mut input,
      _,
      grounded,
      has_collider,
  ) in &mut characters
  {
      let mut host = CharacterHost::new(
          &mut velocity,
          &mut gravity_scale,
          &mut jumps,
          &mut facing,
          &mut input,
          grounded,
          has_collider,
      );
      controller.update(&mut host, delta_time);
      effects.send_batch(host.into_effect_toggles());
  }
}

// Mirrors the visual child so the character faces its direction of travel.
fn apply_facing(
  characters: Query<(&Facing, &Children), Changed<Facing>>,
  mut visuals: Query<&mut Transform, With<CharacterVisual>>,
) {
  for (facing, children) in &characters {
      for child in children.iter() {
          if let Ok(mut transform) = visuals.get_mut(*child) {
              transform.rotation = Quat::from_rotation_y(facing.0.to_radians());
          }
      }
  }
}
