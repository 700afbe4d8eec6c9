//! The CPU's 16-bit address space: RAM, PPU register mirror, APU/controller
//! stubs, and the cartridge window. Owns every component below the CPU so
//! neither the CPU nor the PPU needs a back-reference to reach it — see the
//! ownership note in the expanded specification.

use log::trace;

use crate::cartridge::Cartridge;
use crate::controller::Controller;
use crate::ppu::Ppu;

const RAM_SIZE: usize = 0x0800;

pub struct Bus {
    ram: [u8; RAM_SIZE],
    pub ppu: Ppu,
    pub cartridge: Cartridge,
    pub controllers: [Controller; 2],
    pending_oam_dma: Option<u8>,
}

impl Bus {
    pub fn new(cartridge: Cartridge) -> Self {
        Bus {
            ram: [0; RAM_SIZE],
            ppu: Ppu::new(),
            cartridge,
            controllers: [Controller::new(), Controller::new()],
            pending_oam_dma: None,
        }
    }

    pub fn reset(&mut self) {
        self.ram = [0; RAM_SIZE];
        self.ppu.reset();
        self.cartridge.reset();
        self.controllers[0].reset();
        self.controllers[1].reset();
        self.pending_oam_dma = None;
    }

    pub fn read(&mut self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr as usize) % RAM_SIZE],
            0x2000..=0x3FFF => {
                let reg = 0x2000 + (addr % 8);
                self.ppu.read_register(reg - 0x2000, &mut self.cartridge)
            }
            0x4016 => self.controllers[0].read(),
            0x4017 => self.controllers[1].read(),
            0x4000..=0x4013 | 0x4015 => 0,
            0x6000..=0xFFFF => self.cartridge.read_prg(addr),
            _ => {
                trace!("read from unmapped address ${:04X}", addr);
                0
            }
        }
    }

    /// Returns the value at `addr` without triggering read side effects
    /// (PPUSTATUS vblank clear, OAMDATA/PPUDATA latch advance, controller
    /// shift). Used only by OAM DMA, which reads straight out of CPU RAM.
    fn read_for_dma(&self, addr: u16) -> u8 {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr as usize) % RAM_SIZE],
            0x6000..=0xFFFF => self.cartridge.read_prg(addr),
            _ => 0,
        }
    }

    pub fn write(&mut self, addr: u16, value: u8) {
        match addr {
            0x0000..=0x1FFF => self.ram[(addr as usize) % RAM_SIZE] = value,
            0x2000..=0x3FFF => {
                let reg = addr % 8;
                self.ppu.write_register(reg, value, &mut self.cartridge);
            }
            0x4014 => self.pending_oam_dma = Some(value),
            0x4016 => {
                self.controllers[0].write(value);
                self.controllers[1].write(value);
            }
            0x4017 | 0x4000..=0x4013 | 0x4015 => {}
            0x6000..=0xFFFF => self.cartridge.write_prg(addr, value),
            _ => trace!("write to unmapped address ${:04X} = ${:02X}", addr, value),
        }
    }

    /// Advances the PPU (and mapper) by `n` dots, returning whether the CPU's
    /// pending NMI should be raised.
    pub fn step_ppu(&mut self, n: u32) -> bool {
        let mut nmi = false;
        for _ in 0..n {
            if self.ppu.step(&mut self.cartridge) {
                nmi = true;
            }
            self.cartridge.step_mapper();
        }
        nmi
    }

    /// Pulls a queued `$4014` OAM DMA request (if any), performs the 256-byte
    /// transfer, and returns the extra CPU stall cycles it costs: 513, or 514
    /// if `cpu_cycles_odd` (the DMA began on an odd CPU cycle).
    pub fn take_oam_dma(&mut self, cpu_cycles_odd: bool) -> Option<u32> {
        let page = self.pending_oam_dma.take()?;
        let base = (page as u16) << 8;
        for i in 0..256u16 {
            let byte = self.read_for_dma(base + i);
            self.ppu.oam_dma_write(byte);
        }
        Some(if cpu_cycles_odd { 514 } else { 513 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cartridge::Cartridge;

    fn test_cartridge() -> Cartridge {
        let mut data = vec![0x4Eu8, 0x45, 0x53, 0x1A, 2, 1, 0x10, 0x00, 0, 0, 0, 0, 0, 0, 0, 0];
        data.resize(data.len() + 2 * 16 * 1024, 0);
        data.resize(data.len() + 8 * 1024, 0);
        Cartridge::from_bytes(&data).unwrap()
    }

    #[test]
    fn ram_mirrors_every_0x0800() {
        let mut bus = Bus::new(test_cartridge());
        bus.write(0x0000, 0x42);
        assert_eq!(bus.read(0x0800), 0x42);
        assert_eq!(bus.read(0x1800), 0x42);
    }

    #[test]
    fn oam_dma_queues_and_transfers_256_bytes() {
        let mut bus = Bus::new(test_cartridge());
        for i in 0..256u16 {
            bus.ram[i as usize] = i as u8;
        }
        bus.write(0x4014, 0x00);
        let stall = bus.take_oam_dma(false);
        assert_eq!(stall, Some(513));
        // OAMADDR wrapped back to 0 after 256 writes, so OAMDATA now reads oam[0] == 0.
        assert_eq!(bus.ppu.read_register(4, &mut bus.cartridge), 0);
    }
}
