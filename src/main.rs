//! A side-scrolling steampunk character built on a dynamic rigid body.
//!
//! This showcases the following:
//!
//! - Double jumping, with a mid-air turn-around that inverts horizontal input
//! - "Soaring": a toggled glide that cuts gravity while descending
//! - Leg particles and a looping audio cue that follow the glide state
//! - Support for both keyboard and gamepad input
//!
//! The per-frame character rules live in the `controller` module and only see
//! the world through the `host` capability trait; `player` implements that
//! trait on top of avian2d.

use std::path::Path;

use avian2d::{math::*, prelude::*};
use bevy::{log::LogPlugin, prelude::*};

mod config;
mod controller;
mod effects;
mod game;
mod host;
mod input;
mod player;

use config::{load_config_or_default, report_config_source, DEFAULT_CONFIG_PATH};
use player::{CharacterControllerPlugin, PlayerAssignments};

use game::setup;

fn main() {
    let (config, source) = load_config_or_default(Path::new(DEFAULT_CONFIG_PATH));

    App::new()
        .add_plugins((
            DefaultPlugins.set(LogPlugin {
                filter: config.log.filter.clone(),
                ..default()
            }),
            // Add physics plugins and specify a units-per-meter scaling factor, 1 meter = 20 pixels.
            // The unit allows the engine to tune its parameters for the scale of the world, improving stability.
            PhysicsPlugins::default().with_length_unit(20.0),
            CharacterControllerPlugin,
        ))
        .insert_resource(ClearColor(Color::srgb(0.12, 0.09, 0.07)))
        .insert_resource(PlayerAssignments::default())
        .insert_resource(Gravity(Vector::NEG_Y * 1000.0))
        .insert_resource(config)
        .insert_resource(source)
        .add_systems(Startup, (report_config_source, setup))
        .run();
}
