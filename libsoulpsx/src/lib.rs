/* PS1 emulation core */
pub mod bus;
pub mod cpu;
pub mod error;
pub mod gpu;
pub mod r3000;
pub mod system;

pub use bus::Bus;
pub use bus::bios::BIOS;
pub use error::{PsxError, Result};
pub use system::System;
