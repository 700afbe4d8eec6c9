//! iNES cartridge loading.
//!
//! Parses the 16-byte iNES header, slices PRG-ROM and CHR-ROM out of the
//! remaining file, and hands them to the MMC1 mapper. CHR-RAM is allocated
//! instead of CHR-ROM when the header reports zero CHR banks.

use std::fmt;

use log::info;
use thiserror::Error;

use crate::mappers::{Mapper, Mapper1};

const INES_HEADER_SIZE: usize = 16;
const PRG_ROM_BANK_SIZE: usize = 16 * 1024;
const CHR_BANK_SIZE: usize = 8 * 1024;
const SRAM_SIZE: usize = 8 * 1024;
const TRAINER_SIZE: usize = 512;

/// Errors from loading and parsing an iNES ROM image.
#[derive(Error, Debug)]
pub enum LoadError {
    #[error("not a valid iNES ROM (bad magic or truncated header)")]
    InvalidHeader,

    #[error("unsupported mapper: {0} (only MMC1 / mapper 1 is implemented)")]
    UnsupportedMapper(u8),

    #[error("ROM file is smaller than its header declares")]
    InvalidRomSize,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Nametable mirroring mode, either fixed by the header or overridden live
/// by the mapper (MMC1's control register can select single-screen mirroring
/// that the header cannot express).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mirroring {
    Horizontal,
    Vertical,
    SingleScreenA,
    SingleScreenB,
    FourScreen,
}

struct INesHeader {
    prg_rom_size: usize,
    chr_rom_size: usize,
    mapper: u8,
    mirroring: Mirroring,
    battery: bool,
    has_trainer: bool,
}

fn parse_header(data: &[u8]) -> Result<INesHeader, LoadError> {
    if data.len() < INES_HEADER_SIZE || data[0..4] != [0x4E, 0x45, 0x53, 0x1A] {
        return Err(LoadError::InvalidHeader);
    }

    let prg_rom_size = data[4] as usize * PRG_ROM_BANK_SIZE;
    let chr_rom_size = data[5] as usize * CHR_BANK_SIZE;

    let flags1 = data[6];
    let flags2 = data[7];

    let mapper = (flags2 & 0xF0) | (flags1 >> 4);
    let mirroring = if (flags1 & 0x08) != 0 {
        Mirroring::FourScreen
    } else if (flags1 & 0x01) != 0 {
        Mirroring::Vertical
    } else {
        Mirroring::Horizontal
    };
    let battery = (flags1 & 0x02) != 0;
    let has_trainer = (flags1 & 0x04) != 0;

    Ok(INesHeader {
        prg_rom_size,
        chr_rom_size,
        mapper,
        mirroring,
        battery,
        has_trainer,
    })
}

/// A loaded NES game: PRG/CHR banks plus the mapper that windows them into
/// the CPU and PPU address spaces. Immutable after construction except for
/// SRAM, which the mapper owns.
pub struct Cartridge {
    mapper: Mapper1,
    mirroring_header: Mirroring,
    battery: bool,
    mapper_number: u8,
    prg_rom_size: usize,
    chr_rom_size: usize,
}

impl Cartridge {
    /// Parse a complete iNES file image and construct the mapper.
    pub fn from_bytes(data: &[u8]) -> Result<Self, LoadError> {
        let header = parse_header(data)?;

        if header.mapper != 1 {
            return Err(LoadError::UnsupportedMapper(header.mapper));
        }

        let trainer_size = if header.has_trainer { TRAINER_SIZE } else { 0 };
        let expected_size = INES_HEADER_SIZE + trainer_size + header.prg_rom_size + header.chr_rom_size;
        if data.len() < expected_size {
            return Err(LoadError::InvalidRomSize);
        }

        let prg_start = INES_HEADER_SIZE + trainer_size;
        let prg_end = prg_start + header.prg_rom_size;
        let prg_rom = data[prg_start..prg_end].to_vec();

        let (chr_rom, chr_is_ram) = if header.chr_rom_size == 0 {
            (vec![0u8; CHR_BANK_SIZE], true)
        } else {
            (data[prg_end..prg_end + header.chr_rom_size].to_vec(), false)
        };

        let sram = vec![0u8; SRAM_SIZE];
        let mapper = Mapper1::new(prg_rom, chr_rom, chr_is_ram, sram, header.mirroring);

        info!(
            "loaded cartridge: mapper=1 (MMC1) prg={}KiB chr={}KiB ({}) mirroring={:?} battery={}",
            header.prg_rom_size / 1024,
            if chr_is_ram { CHR_BANK_SIZE } else { header.chr_rom_size } / 1024,
            if chr_is_ram { "RAM" } else { "ROM" },
            header.mirroring,
            header.battery,
        );

        Ok(Cartridge {
            mapper,
            mirroring_header: header.mirroring,
            battery: header.battery,
            mapper_number: header.mapper,
            prg_rom_size: header.prg_rom_size,
            chr_rom_size: header.chr_rom_size,
        })
    }

    pub fn read_prg(&self, addr: u16) -> u8 {
        self.mapper.read_prg(addr)
    }

    pub fn write_prg(&mut self, addr: u16, value: u8) {
        self.mapper.write_prg(addr, value);
    }

    pub fn read_chr(&self, addr: u16) -> u8 {
        self.mapper.read_chr(addr)
    }

    pub fn write_chr(&mut self, addr: u16, value: u8) {
        self.mapper.write_chr(addr, value);
    }

    /// Current mirroring mode, as overridden live by the mapper's control
    /// register (MMC1 can select single-screen modes the header can't name).
    pub fn mirroring(&self) -> Mirroring {
        self.mapper.mirroring()
    }

    pub fn mapper_number(&self) -> u8 {
        self.mapper_number
    }

    pub fn reset(&mut self) {
        self.mapper.reset();
    }

    /// Advances mapper-internal state (IRQ counters, on mappers that have
    /// them) by one PPU dot. A no-op for MMC1.
    pub fn step_mapper(&mut self) {
        self.mapper.step();
    }
}

impl fmt::Debug for Cartridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Cartridge")
            .field("mapper", &self.mapper_number)
            .field("mirroring_header", &self.mirroring_header)
            .field("prg_rom_size", &self.prg_rom_size)
            .field("chr_rom_size", &self.chr_rom_size)
            .field("battery", &self.battery)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rom(prg_banks: u8, chr_banks: u8, mapper: u8, mirror_vertical: bool) -> Vec<u8> {
        let flags1 = ((mapper & 0x0F) << 4) | if mirror_vertical { 0x01 } else { 0x00 };
        let flags2 = mapper & 0xF0;
        let mut data = vec![
            0x4E, 0x45, 0x53, 0x1A, prg_banks, chr_banks, flags1, flags2, 0, 0, 0, 0, 0, 0, 0, 0,
        ];
        data.resize(data.len() + prg_banks as usize * PRG_ROM_BANK_SIZE, 0);
        data.resize(data.len() + chr_banks as usize * CHR_BANK_SIZE, 0);
        data
    }

    #[test]
    fn header_parse_scenario() {
        // 2x PRG banks (32 KiB), 1x CHR bank (8 KiB), mapper encoded as 2 in
        // the raw header, vertical mirroring. This exercises header field
        // decoding only; mapper 2 itself is rejected by Cartridge::from_bytes.
        let data = rom(2, 1, 2, true);
        let header = parse_header(&data).unwrap();
        assert_eq!(header.prg_rom_size, 32 * 1024);
        assert_eq!(header.chr_rom_size, 8 * 1024);
        assert_eq!(header.mapper, 2);
        assert_eq!(header.mirroring, Mirroring::Vertical);
        assert!(!header.battery);
    }

    #[test]
    fn rejects_unsupported_mapper() {
        let data = rom(2, 1, 4, false);
        let err = Cartridge::from_bytes(&data).unwrap_err();
        assert!(matches!(err, LoadError::UnsupportedMapper(4)));
    }

    #[test]
    fn chr_ram_allocated_when_header_reports_zero_banks() {
        let data = rom(1, 0, 1, false);
        let cart = Cartridge::from_bytes(&data).unwrap();
        assert_eq!(cart.chr_rom_size, 0);
        // A CHR-RAM backed cartridge is still readable/writable as a normal
        // 8 KiB window even though the header declared zero CHR banks.
        let mut cart = cart;
        cart.write_chr(0x0000, 0x42);
        assert_eq!(cart.read_chr(0x0000), 0x42);
    }
}
