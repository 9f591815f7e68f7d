pub mod animator;
pub mod constants;
pub mod render;
pub mod selector;
pub mod shared_wheel_game;
pub mod validation;
