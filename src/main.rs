//! CLI entry point: loads a ROM, then either runs headless or opens an SDL2
//! window and drives the emulator from its event loop.

mod bus;
mod cartridge;
mod controller;
mod cpu;
mod mappers;
mod nes;
mod ppu;

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use log::LevelFilter;
use sdl2::event::Event;
use sdl2::keyboard::Keycode;
use sdl2::pixels::PixelFormatEnum;

use nes::Nes;
use ppu::{SCREEN_HEIGHT, SCREEN_WIDTH};

/// A Nintendo Entertainment System emulator core.
#[derive(Parser, Debug)]
#[command(name = "nescore", version, about)]
struct Args {
    /// Path to an iNES (.nes) ROM image.
    rom_path: PathBuf,

    /// Window scale factor.
    #[arg(long, default_value_t = 3)]
    scale: u32,

    /// Overrides RUST_LOG's level for this run.
    #[arg(long)]
    log_level: Option<LevelFilter>,

    /// Runs without opening a window, for scripted or benchmark use.
    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut builder = env_logger::Builder::from_default_env();
    if let Some(level) = args.log_level {
        builder.filter_level(level);
    }
    builder.init();

    let rom_data = fs::read(&args.rom_path)
        .with_context(|| format!("failed to read ROM file: {}", args.rom_path.display()))?;
    let mut nes = Nes::new(&rom_data)
        .with_context(|| format!("failed to load ROM: {}", args.rom_path.display()))?;

    if args.headless {
        run_headless(&mut nes)
    } else {
        run_windowed(&mut nes, args.scale)
    }
}

fn run_headless(nes: &mut Nes) -> Result<()> {
    nes.run(1.0);
    Ok(())
}

fn run_windowed(nes: &mut Nes, scale: u32) -> Result<()> {
    let sdl_context = sdl2::init().map_err(|e| anyhow::anyhow!("failed to initialize SDL2: {e}"))?;
    let video_subsystem = sdl_context
        .video()
        .map_err(|e| anyhow::anyhow!("failed to initialize SDL2 video subsystem: {e}"))?;

    let window = video_subsystem
        .window(
            "nescore",
            SCREEN_WIDTH as u32 * scale,
            SCREEN_HEIGHT as u32 * scale,
        )
        .position_centered()
        .build()
        .context("failed to create window")?;

    let mut canvas = window
        .into_canvas()
        .accelerated()
        .present_vsync()
        .build()
        .context("failed to create canvas")?;
    canvas
        .set_scale(scale as f32, scale as f32)
        .map_err(|e| anyhow::anyhow!("failed to set canvas scale: {e}"))?;

    let texture_creator = canvas.texture_creator();
    let mut texture = texture_creator
        .create_texture_streaming(PixelFormatEnum::RGBA32, SCREEN_WIDTH as u32, SCREEN_HEIGHT as u32)
        .context("failed to create texture")?;

    let mut event_pump = sdl_context
        .event_pump()
        .map_err(|e| anyhow::anyhow!("failed to get event pump: {e}"))?;
    let mut buttons = [1u8; 8];

    'running: loop {
        for event in event_pump.poll_iter() {
            match event {
                Event::Quit { .. } | Event::KeyDown { keycode: Some(Keycode::Escape), .. } => {
                    break 'running;
                }
                Event::KeyDown { keycode: Some(key), .. } => set_button(&mut buttons, key, false),
                Event::KeyUp { keycode: Some(key), .. } => set_button(&mut buttons, key, true),
                _ => {}
            }
        }
        nes.set_buttons(0, buttons);

        nes.run(1.0 / 60.0);

        texture
            .update(None, nes.pixel_buffer(), SCREEN_WIDTH * 4)
            .context("failed to update texture")?;
        canvas
            .copy(&texture, None, None)
            .map_err(|e| anyhow::anyhow!("failed to copy texture to canvas: {e}"))?;
        canvas.present();
    }

    Ok(())
}

/// `released` is true for key-up (NES convention: 1 = released, 0 = pressed).
fn set_button(buttons: &mut [u8; 8], key: Keycode, released: bool) {
    let value = if released { 1 } else { 0 };
    let index = match key {
        Keycode::Z => controller::BUTTON_A,
        Keycode::X => controller::BUTTON_B,
        Keycode::RShift => controller::BUTTON_SELECT,
        Keycode::Return => controller::BUTTON_START,
        Keycode::Up => controller::BUTTON_UP,
        Keycode::Down => controller::BUTTON_DOWN,
        Keycode::Left => controller::BUTTON_LEFT,
        Keycode::Right => controller::BUTTON_RIGHT,
        _ => return,
    };
    buttons[index] = value;
}
