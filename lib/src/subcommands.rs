pub use predict::*;
pub use server::*;
pub use train::*;

pub mod predict;
pub mod server;
pub mod train;
