//! Kernal boot test - verify the machine boots BASIC to its power-on
//! banner with real ROMs.
//!
//! Place the ROM images at `roms/kernal.pal.rom`, `roms/basic.rom` and
//! `roms/chargen.rom` relative to the workspace root.

use emu_vic20::{MemoryModel, Region, Vic20, Vic20Config};
use std::fs;

/// Screen codes for "READY."
const READY_SCREEN_CODES: [u8; 6] = [18, 5, 1, 4, 25, 46];

/// Unexpanded screen matrix location.
const SCREEN_BASE: u16 = 0x1E00;
const SCREEN_SIZE: u16 = 22 * 23;

#[test]
#[ignore] // Requires real VIC-20 ROMs at roms/.
fn boot_to_ready_prompt() {
    let kernal =
        fs::read("../../roms/kernal.pal.rom").expect("kernal.pal.rom not found under roms/");
    let basic = fs::read("../../roms/basic.rom").expect("basic.rom not found under roms/");
    let chargen = fs::read("../../roms/chargen.rom").expect("chargen.rom not found under roms/");

    let mut vic20 = Vic20::new(&Vic20Config {
        region: Region::Pal,
        memory: MemoryModel::Unexpanded,
        character_rom: chargen,
        basic_rom: basic,
        kernal_rom: kernal,
    });
    vic20.reset();
    vic20.start();

    println!("reset: PC={:#06X}", vic20.cpu().regs.pc);

    let max_frames = 300;
    let mut found_ready = false;

    for frame in 0..max_frames {
        let cycles = vic20.run_frame().expect("boot must not fault");

        if frame % 50 == 0 {
            println!(
                "frame {frame}: PC={:#06X} cycles={cycles}",
                vic20.cpu().regs.pc
            );
        }

        if find_ready_on_screen(&vic20) {
            println!("READY. found at frame {frame}");
            found_ready = true;
            break;
        }
    }

    assert!(
        found_ready,
        "machine did not reach the READY. prompt within {max_frames} frames"
    );

    // The framebuffer should show something other than a solid border by
    // now (the banner text).
    let fb = vic20.framebuffer();
    let first = fb[0];
    assert!(
        fb.iter().any(|&px| px != first),
        "framebuffer should not be a solid colour after boot"
    );
}

/// Scan the screen matrix for the READY. banner.
fn find_ready_on_screen(vic20: &Vic20) -> bool {
    let end = SCREEN_BASE + SCREEN_SIZE - READY_SCREEN_CODES.len() as u16;
    (SCREEN_BASE..end).any(|addr| {
        READY_SCREEN_CODES
            .iter()
            .enumerate()
            .all(|(i, &code)| vic20.bus().peek(addr + i as u16) == code)
    })
}
