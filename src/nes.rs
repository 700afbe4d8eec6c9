//! Top-level NES aggregate: owns the CPU and bus, and exposes the handful of
//! operations a host (CLI, or any other frontend) needs — load, reset, step,
//! run for a span of wall-clock time, feed controller input, read a frame.

use log::info;

use crate::bus::Bus;
use crate::cartridge::{Cartridge, LoadError};
use crate::cpu::Cpu;

/// CPU clock rate of the NTSC NES, in Hz.
pub const CPU_CLOCK_HZ: f64 = 1_789_773.0;

pub struct Nes {
    cpu: Cpu,
    bus: Bus,
}

impl Nes {
    /// Loads an iNES ROM from raw bytes and resets the system to its
    /// power-on state.
    pub fn new(rom_data: &[u8]) -> Result<Self, LoadError> {
        let cartridge = Cartridge::from_bytes(rom_data)?;
        let mut nes = Nes {
            cpu: Cpu::new(),
            bus: Bus::new(cartridge),
        };
        nes.reset();
        Ok(nes)
    }

    pub fn reset(&mut self) {
        self.bus.reset();
        self.cpu.reset(&mut self.bus);
        info!("system reset");
    }

    /// Executes exactly one CPU instruction (or one stalled cycle), advancing
    /// the PPU and mapper in lockstep, and returns the number of CPU cycles
    /// it took.
    pub fn step(&mut self) -> u64 {
        let cpu_cycles = self.cpu.step(&mut self.bus);
        if self.bus.step_ppu((cpu_cycles * 3) as u32) {
            self.cpu.request_nmi();
        }
        cpu_cycles
    }

    /// Runs the system for approximately `seconds` of emulated wall-clock
    /// time, computed as `floor(CPU_CLOCK_HZ * seconds)` CPU cycles.
    pub fn run(&mut self, seconds: f64) {
        let budget = (CPU_CLOCK_HZ * seconds).floor() as u64;
        let mut elapsed = 0u64;
        while elapsed < budget {
            elapsed += self.step();
        }
    }

    /// Latches button state for `player` (0 or 1) in `[A, B, Select, Start,
    /// Up, Down, Left, Right]` order, each 0 (pressed) or 1 (released).
    pub fn set_buttons(&mut self, player: usize, buttons: [u8; 8]) {
        if let Some(controller) = self.bus.controllers.get_mut(player) {
            controller.set_buttons(buttons);
        }
    }

    /// The current front (display-ready) RGBA framebuffer, 256x240 pixels.
    pub fn pixel_buffer(&self) -> &[u8] {
        self.bus.ppu.front_buffer()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rom() -> Vec<u8> {
        let mut data = vec![0x4Eu8, 0x45, 0x53, 0x1A, 2, 1, 0x10, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
        let prg_size = 2 * 16 * 1024;
        data.resize(data.len() + prg_size, 0);
        data.resize(data.len() + 8 * 1024, 0);
        // Reset vector lives in the last 4 bytes of PRG-ROM (fixed bank in
        // MMC1's default prg_mode 3), not the end of the file.
        let reset_lo_offset = 16 + prg_size - 4;
        data[reset_lo_offset] = 0x00;
        data[reset_lo_offset + 1] = 0x80;
        data
    }

    #[test]
    fn new_nes_resets_pc_to_reset_vector() {
        let nes = Nes::new(&test_rom()).unwrap();
        assert_eq!(nes.cpu.pc, 0x8000);
    }

    #[test]
    fn step_runs_one_instruction_and_reports_cycles() {
        let rom = test_rom();
        let mut nes = Nes::new(&rom).unwrap();
        let cycles = nes.step();
        assert!(cycles > 0);
    }

    #[test]
    fn pixel_buffer_is_a_full_frame() {
        let nes = Nes::new(&test_rom()).unwrap();
        assert_eq!(nes.pixel_buffer().len(), 256 * 240 * 4);
    }
}
