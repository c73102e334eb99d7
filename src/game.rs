use avian2d::{math::*, prelude::*};
use bevy::{
  prelude::*,
  render::{render_asset::RenderAssetUsages, render_resource::PrimitiveTopology},
};

use crate::config::GameConfig;
use crate::controller::{CharacterUpdateController, EffectHandles};
use crate::effects::{EffectEmitter, EffectKind};
use crate::host::EffectHandle;
use crate::player::{CharacterControllerBundle, CharacterVisual, PlayerAssignments};

const SPAWN_POINT: Vec3 = Vec3::new(50.0, -100.0, 0.0);

// The character the side-view camera follows.
#[derive(Component)]
pub struct CameraTarget;

pub fn setup(
  mut commands: Commands,
  mut meshes: ResMut<Assets<Mesh>>,
  mut materials: ResMut<Assets<ColorMaterial>>,
  mut assignments: ResMut<PlayerAssignments>,
  asset_server: Res<AssetServer>,
  config: Res<GameConfig>,
) {
  // Platforms
  for (size, position) in [
      (Vec2::new(1100.0, 50.0), Vec2::new(0.0, -175.0)),
      (Vec2::new(300.0, 25.0), Vec2::new(175.0, -35.0)),
      (Vec2::new(300.0, 25.0), Vec2::new(-175.0, 0.0)),
      (Vec2::new(150.0, 80.0), Vec2::new(475.0, -110.0)),
      (Vec2::new(150.0, 80.0), Vec2::new(-475.0, -110.0)),
  ] {
      commands.spawn((
          Sprite {
              color: Color::srgb(0.7, 0.7, 0.8),
              custom_size: Some(size),
              ..default()
          },
          Transform::from_translation(position.extend(0.0)),
          RigidBody::Static,
          Collider::rectangle(size.x, size.y),
      ));
  }

  // Ramps
  spawn_ramp(
      &mut commands,
      &mut meshes,
      &mut materials,
      [Vector::new(-125.0, 80.0), Vector::NEG_X * 125.0, Vector::X * 125.0],
      Vec3::new(-275.0, -150.0, 0.0),
  );
  spawn_ramp(
      &mut commands,
      &mut meshes,
      &mut materials,
      [
          Vector::new(20.0, -40.0),
          Vector::new(20.0, 40.0),
          Vector::new(-20.0, -40.0),
      ],
      Vec3::new(380.0, -110.0, 0.0),
  );

  // Camera
  commands.spawn((Camera2d, Transform::from_translation(SPAWN_POINT)));

  // The default pawn, driven by the keyboard
  let entity = spawn_player_character(
      &mut commands,
      &mut meshes,
      &mut materials,
      &asset_server,
      &config,
  );
  commands.entity(entity).insert(CameraTarget);
  assignments.keyboard = Some(entity);
  info!("spawned default pawn {:?}", entity);
}

fn spawn_ramp(
  commands: &mut Commands,
  meshes: &mut Assets<Mesh>,
  materials: &mut Assets<ColorMaterial>,
  [a, b, c]: [Vector; 3],
  position: Vec3,
) {
  let mut ramp_mesh = Mesh::new(
      PrimitiveTopology::TriangleList,
      RenderAssetUsages::default(),
  );

  ramp_mesh.insert_attribute(
      Mesh::ATTRIBUTE_POSITION,
      vec![[a.x, a.y, 0.0], [b.x, b.y, 0.0], [c.x, c.y, 0.0]],
  );

  commands.spawn((
      Mesh2d(meshes.add(ramp_mesh)),
      MeshMaterial2d(materials.add(Color::srgb(0.4, 0.4, 0.5))),
      Transform::from_translation(position),
      RigidBody::Static,
      Collider::triangle(a, b, c),
  ));
}

// Spawns a character with its visual, leg particle emitters and glide audio,
// and wires the emitters into its update controller.
pub fn spawn_player_character(
  commands: &mut Commands,
  meshes: &mut Assets<Mesh>,
  materials: &mut Assets<ColorMaterial>,
  asset_server: &AssetServer,
  config: &GameConfig,
) -> Entity {
  let mut handles = EffectHandles::default();
  let entity = commands
      .spawn((
          Transform::from_translation(SPAWN_POINT),
          Visibility::default(),
          CharacterControllerBundle::new(
              Collider::capsule(12.5, 20.0),
              config.soaring.normal_gravity_scale,
          )
          .with_movement(&config.movement),
          Friction::ZERO.with_combine_rule(CoefficientCombine::Min),
          Restitution::ZERO.with_combine_rule(CoefficientCombine::Min),
          ColliderDensity(2.0),
      ))
      .with_children(|parent| {
          parent
              .spawn((
                  Mesh2d(meshes.add(Capsule2d::new(12.5, 20.0))),
                  MeshMaterial2d(materials.add(Color::srgb(0.6, 0.35, 0.15))),
                  Transform::default(),
                  CharacterVisual,
              ))
              .with_children(|visual| {
                  for (kind, x) in [
                      (EffectKind::LeftLegParticles, -6.0),
                      (EffectKind::RightLegParticles, 6.0),
                  ] {
                      let emitter = visual
                          .spawn((
                              Sprite {
                                  color: Color::srgb(1.0, 0.75, 0.3),
                                  custom_size: Some(Vec2::new(6.0, 14.0)),
                                  ..default()
                              },
                              Transform::from_xyz(x, -28.0, -0.1),
                              Visibility::Hidden,
                              EffectEmitter::new(kind),
                          ))
                          .id();
                      match kind {
                          EffectKind::LeftLegParticles => {
                              handles.left_leg = Some(EffectHandle(emitter))
                          }
                          _ => handles.right_leg = Some(EffectHandle(emitter)),
                      }
                  }
              });

          let audio = parent
              .spawn((
                  AudioPlayer::new(asset_server.load(config.effects.soaring_audio.clone())),
                  PlaybackSettings::LOOP.paused(),
                  Transform::default(),
                  Visibility::default(),
                  EffectEmitter::new(EffectKind::SoaringAudio),
              ))
              .id();
          handles.glide_audio = Some(EffectHandle(audio));
      })
      .id();

  commands
      .entity(entity)
      .insert(CharacterUpdateController::new(config.soaring, handles));
  entity
}

// Gamepads join by pressing South and get their own character.
pub fn spawn_gamepad_characters(
  mut commands: Commands,
  mut assignments: ResMut<PlayerAssignments>,
  gamepads: Query<(Entity, &Gamepad)>,
  mut meshes: ResMut<Assets<Mesh>>,
  mut materials: ResMut<Assets<ColorMaterial>>,
  asset_server: Res<AssetServer>,
  config: Res<GameConfig>,
) {
  for (entity, gamepad) in &gamepads {
      let gid = entity.index();
      if gamepad.just_pressed(GamepadButton::South) && !assignments.players.contains_key(&gid) {
          let entity = spawn_player_character(
              &mut commands,
              &mut meshes,
              &mut materials,
              &asset_server,
              &config,
          );
          info!("gamepad {} joined as {:?}", gid, entity);
          assignments.players.insert(gid, entity);
      }
  }
}

// Keeps the side-view camera on its target, like a camera boom with lag.
pub fn follow_camera(
  time: Res<Time>,
  config: Res<GameConfig>,
  targets: Query<&Transform, (With<CameraTarget>, Without<Camera2d>)>,
  mut cameras: Query<&mut Transform, With<Camera2d>>,
) {
  let Ok(target) = targets.get_single() else {
      return;
  };
  let goal = target.translation.truncate()
      + Vec2::new(config.camera.offset_x, config.camera.offset_y);
  let blend = (config.camera.follow_speed * time.delta_secs()).clamp(0.0, 1.0);
  for mut camera in &mut cameras {
      let position = camera.translation.truncate().lerp(goal, blend);
      camera.translation.x = position.x;
      camera.translation.y = position.y;
  }
}
