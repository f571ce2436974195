//! Static hazards that react to pawns crossing them

pub mod laser;

pub use laser::LaserEmitter;
