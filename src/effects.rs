use bevy::prelude::*;

use crate::host::EffectHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectKind {
    LeftLegParticles,
    RightLegParticles,
    SoaringAudio,
}

// A cosmetic emitter attached to a character.
#[derive(Component, Debug)]
pub struct EffectEmitter {
    pub kind: EffectKind,
    pub active: bool,
}

impl EffectEmitter {
    pub fn new(kind: EffectKind) -> Self {
        Self {
            kind,
            active: false,
        }
    }
}

// Sent by the character host whenever an emitter should start or stop.
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct EffectToggled {
    pub handle: EffectHandle,
    pub active: bool,
}

pub fn sync_effects(
    mut toggles: EventReader<EffectToggled>,
    mut emitters: Query<(&mut EffectEmitter, &mut Visibility, Option<&AudioSink>)>,
) {
    for toggle in toggles.read() {
        // Cosmetics are best effort: a despawned emitter is simply skipped.
        let Ok((mut emitter, mut visibility, sink)) = emitters.get_mut(toggle.handle.0) else {
            continue;
        };
        emitter.active = toggle.active;
        match emitter.kind {
            EffectKind::LeftLegParticles | EffectKind::RightLegParticles => {
                *visibility = if toggle.active {
                    Visibility::Inherited
                } else {
                    Visibility::Hidden
                };
            }
            EffectKind::SoaringAudio => {
                if let Some(sink) = sink {
                    if toggle.active {
                        sink.play();
                    } else {
                        sink.pause();
                    }
                }
            }
        }
    }
}

// Flickers active leg emitters so the trail reads as particles rather than a solid block.
pub fn animate_particles(
    time: Res<Time>,
    mut emitters: Query<(&EffectEmitter, &mut Sprite)>,
) {
    let t = time.elapsed_secs();
    for (emitter, mut sprite) in &mut emitters {
        if !emitter.active {
            continue;
        }
        let phase = match emitter.kind {
            EffectKind::LeftLegParticles => 0.0,
            EffectKind::RightLegParticles => std::f32::consts::PI,
            EffectKind::SoaringAudio => continue,
        };
        let alpha = 0.55 + 0.35 * (t * 18.0 + phase).sin();
        sprite.color = sprite.color.with_alpha(alpha);
    }
}
