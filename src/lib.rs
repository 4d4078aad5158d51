//! Animation core for an interactive 3D cartoon avatar.
//!
//! Four animation layers (body, arms, face, full-body override) resolve into
//! a pose every frame, on either a procedural primitive rig or a skeletal
//! mesh driven by blended clips. A locomotion state machine carries world
//! position and heading across step/turn/jump gestures, and the autopilot
//! sequencer plays streamed command sequences with speech-synced timing.

pub mod animations;
pub mod autopilot;
pub mod avatar;
pub mod blend;
pub mod clips;
pub mod compositor;
pub mod config;
pub mod error;
pub mod loader;
pub mod locomotion;
pub mod rig;
pub mod skeleton;
pub mod target;
pub mod tts;

pub use autopilot::{AnimationCommand, AutopilotStatus, Sequencer};
pub use avatar::{Avatar, Backend};
pub use compositor::{FrameInput, LayerState};
pub use config::AvatarConfig;
pub use error::AvatarError;
pub use loader::AssetLoader;
pub use locomotion::SpatialState;
pub use rig::PrimitiveRig;
pub use target::{PoseTarget, SkeletalAvatar};
