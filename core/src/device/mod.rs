pub mod apu_stub;
pub mod cartridge;
pub mod controller;
pub mod dma;
pub mod ppu;

pub use apu_stub::ApuStub;
pub use cartridge::{CartKind, Cartridge, CartridgeError};
pub use controller::{Button, Controller};
pub use dma::Dma;
pub use ppu::Ppu;
