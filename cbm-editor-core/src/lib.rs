pub mod color;
pub mod color_key;
pub mod io;
pub mod orchestrator;
pub mod sample;
pub mod session;
pub mod state;
