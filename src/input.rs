use avian2d::math::*;
use bevy::prelude::*;

use crate::player::{PlayerAction, PlayerAssignments};

const STICK_DEAD_ZONE: f32 = 0.01;

pub fn gamepad_input(
  mut action_writer: EventWriter<PlayerAction>,
  assignments: Res<PlayerAssignments>,
  gamepads: Query<(Entity, &Gamepad)>,
) {
  for (entity, gamepad) in &gamepads {
      let gid = entity.index();
      if let Some(entity) = assignments.players.get(&gid) {
          // Movement
          let x = gamepad.get(GamepadAxis::LeftStickX).unwrap_or(0.0);
          let x = if x.abs() > STICK_DEAD_ZONE { x } else { 0.0 };
          action_writer.send(PlayerAction::MoveRight(*entity, x.into()));

          if gamepad.just_pressed(GamepadButton::South) {
              action_writer.send(PlayerAction::Jump(*entity));
          }
          if gamepad.just_released(GamepadButton::South) {
              action_writer.send(PlayerAction::StopJump(*entity));
          }
          if gamepad.just_pressed(GamepadButton::West) {
              action_writer.send(PlayerAction::Soaring(*entity));
          }
          if gamepad.just_released(GamepadButton::West) {
              action_writer.send(PlayerAction::StopSoaring(*entity));
          }
      }
  }
}

pub fn keyboard_input(
  mut action_writer: EventWriter<PlayerAction>,
  keyboard_input: Res<ButtonInput<KeyCode>>,
  assignments: Res<PlayerAssignments>,
) {
  let Some(entity) = assignments.keyboard else {
      return;
  };

  let left = keyboard_input.any_pressed([KeyCode::KeyA, KeyCode::ArrowLeft]);
  let right = keyboard_input.any_pressed([KeyCode::KeyD, KeyCode::ArrowRight]);

  let horizontal = right as i8 - left as i8;
  action_writer.send(PlayerAction::MoveRight(entity, horizontal as Scalar));

  if keyboard_input.just_pressed(KeyCode::Space) {
      action_writer.send(PlayerAction::Jump(entity));
  }
  if keyboard_input.just_released(KeyCode::Space) {
      action_writer.send(PlayerAction::StopJump(entity));
  }

  if keyboard_input.just_pressed(KeyCode::KeyQ) {
      action_writer.send(PlayerAction::Soaring(entity));
  }
  if keyboard_input.just_released(KeyCode::KeyQ) {
      action_writer.send(PlayerAction::StopSoaring(entity));
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn create_test_app(keyboard: Option<Entity>) -> App {
      let mut app = App::new();
      app.add_plugins(MinimalPlugins)
          .add_event::<PlayerAction>()
          .init_resource::<ButtonInput<KeyCode>>()
          .insert_resource(PlayerAssignments {
              keyboard,
              ..default()
          })
          .add_systems(Update, keyboard_input);
      app
  }

  fn sent_actions(app: &mut App) -> Vec<PlayerAction> {
      app.world_mut()
          .resource_mut::<Events<PlayerAction>>()
          .drain()
          .collect()
  }

  #[test]
  fn idle_keyboard_still_sends_axis() {
      let mut app = create_test_app(Some(Entity::from_raw(7)));
      app.update();

      assert_eq!(
          sent_actions(&mut app),
          vec![PlayerAction::MoveRight(Entity::from_raw(7), 0.0)]
      );
  }

  #[test]
  fn keys_map_to_bound_actions() {
      let player = Entity::from_raw(7);
      let mut app = create_test_app(Some(player));
      {
          let mut keys = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
          keys.press(KeyCode::ArrowLeft);
          keys.press(KeyCode::Space);
          keys.press(KeyCode::KeyQ);
      }
      app.update();

      assert_eq!(
          sent_actions(&mut app),
          vec![
              PlayerAction::MoveRight(player, -1.0),
              PlayerAction::Jump(player),
              PlayerAction::Soaring(player),
          ]
      );
  }

  #[test]
  fn releases_send_stop_actions() {
      let player = Entity::from_raw(7);
      let mut app = create_test_app(Some(player));
      {
          let mut keys = app.world_mut().resource_mut::<ButtonInput<KeyCode>>();
          keys.press(KeyCode::Space);
          keys.press(KeyCode::KeyQ);
          keys.clear();
          keys.release(KeyCode::Space);
          keys.release(KeyCode::KeyQ);
      }
      app.update();

      assert_eq!(
          sent_actions(&mut app),
          vec![
              PlayerAction::MoveRight(player, 0.0),
              PlayerAction::StopJump(player),
              PlayerAction::StopSoaring(player),
          ]
      );
  }

  #[test]
  fn join_press_is_not_a_jump() {
      let mut app = App::new();
      app.add_plugins(MinimalPlugins)
          .add_event::<PlayerAction>()
          .init_resource::<PlayerAssignments>()
          .add_systems(Update, gamepad_input);
      let mut gamepad = Gamepad::default();
      gamepad.digital_mut().press(GamepadButton::South);
      let pad = app.world_mut().spawn(gamepad).id();

      // Unassigned pads produce no actions, even on the press that joins them.
      app.update();
      assert!(sent_actions(&mut app).is_empty());

      let player = Entity::from_raw(7);
      app.world_mut()
          .resource_mut::<PlayerAssignments>()
          .players
          .insert(pad.index(), player);
      // Next frame the button is still held but no longer just pressed.
      app.world_mut()
          .get_mut::<Gamepad>(pad)
          .unwrap()
          .digital_mut()
          .clear();
      app.update();

      assert_eq!(
          sent_actions(&mut app),
          vec![PlayerAction::MoveRight(player, 0.0)]
      );
  }

  #[test]
  fn unassigned_keyboard_sends_nothing() {
      let mut app = create_test_app(None);
      app.update();

      assert!(sent_actions(&mut app).is_empty());
  }
}
