pub mod shared_wheel_game;
