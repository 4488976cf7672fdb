use dotmatrix_core::{
    hardware::{BYTES_PER_PIXEL, CYCLES_PER_FRAME, INT_STAT, INT_VBLANK, SCREEN_WIDTH},
    ppu::{Mode, Ppu},
};

const LINE_CYCLES: u32 = 456;
/// Clock cycles from the start of a line until it has been drawn.
const LINE_DRAWN: u32 = 80 + 172;

const WHITE: [u8; 4] = [255, 255, 255, 255];
const LIGHT: [u8; 4] = [180, 180, 180, 255];
const BLACK: [u8; 4] = [0, 0, 0, 255];

fn boot_ppu() -> Ppu {
    let mut ppu = Ppu::new();
    ppu.apply_boot_state();
    ppu
}

fn pixel(ppu: &Ppu, x: usize, y: usize) -> [u8; 4] {
    let idx = (y * SCREEN_WIDTH + x) * BYTES_PER_PIXEL;
    let fb = ppu.framebuffer();
    [fb[idx], fb[idx + 1], fb[idx + 2], fb[idx + 3]]
}

/// Run a freshly booted PPU until `line` has been drawn.
fn draw_through_line(ppu: &mut Ppu, line: u32) -> u8 {
    let mut if_reg = 0;
    ppu.step(LINE_CYCLES * line + LINE_DRAWN, &mut if_reg);
    if_reg
}

fn fill_tile_row(ppu: &mut Ppu, tile: usize, row: usize, lo: u8, hi: u8) {
    ppu.vram[tile * 16 + row * 2] = lo;
    ppu.vram[tile * 16 + row * 2 + 1] = hi;
}

fn set_sprite(ppu: &mut Ppu, index: usize, y: u8, x: u8, tile: u8, flags: u8) {
    ppu.oam[index * 4..index * 4 + 4].copy_from_slice(&[y, x, tile, flags]);
}

#[test]
fn completed_frame_only_changes_at_vblank() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    ppu.write_reg(0xFF47, 0xFF);
    draw_through_line(&mut ppu, 10);
    assert_eq!(pixel(&ppu, 0, 10), BLACK);
    assert_eq!(&ppu.completed_frame()[..4], &WHITE);

    ppu.step(144 * LINE_CYCLES - (10 * LINE_CYCLES + LINE_DRAWN), &mut if_reg);
    assert_eq!(ppu.mode(), Mode::VBlank);
    assert_eq!(ppu.completed_frame(), ppu.framebuffer());
    assert_eq!(&ppu.completed_frame()[..4], &BLACK);
}

#[test]
fn scanline_mode_sequence() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    assert_eq!(ppu.mode(), Mode::OamScan);

    ppu.step(79, &mut if_reg);
    assert_eq!(ppu.mode(), Mode::OamScan);
    ppu.step(1, &mut if_reg);
    assert_eq!(ppu.mode(), Mode::Transfer);
    ppu.step(171, &mut if_reg);
    assert_eq!(ppu.mode(), Mode::Transfer);
    ppu.step(1, &mut if_reg);
    assert_eq!(ppu.mode(), Mode::HBlank);
    ppu.step(203, &mut if_reg);
    assert_eq!(ppu.mode(), Mode::HBlank);
    assert_eq!(ppu.ly(), 0);
    ppu.step(1, &mut if_reg);
    assert_eq!(ppu.mode(), Mode::OamScan);
    assert_eq!(ppu.ly(), 1);
}

#[test]
fn vblank_entry_and_frame_wrap() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;

    assert!(!ppu.step(144 * LINE_CYCLES - 4, &mut if_reg));
    assert_eq!(ppu.ly(), 143);
    assert_eq!(if_reg & INT_VBLANK, 0);

    assert!(ppu.step(4, &mut if_reg));
    assert_eq!(ppu.ly(), 144);
    assert_eq!(ppu.mode(), Mode::VBlank);
    assert_ne!(if_reg & INT_VBLANK, 0);
    assert_eq!(ppu.frames(), 1);
    assert!(ppu.frame_ready());
    ppu.clear_frame_flag();
    assert!(!ppu.frame_ready());

    assert!(!ppu.step(9 * LINE_CYCLES + 452, &mut if_reg));
    assert_eq!(ppu.ly(), 153);
    assert_eq!(ppu.mode(), Mode::VBlank);

    ppu.step(4, &mut if_reg);
    assert_eq!(ppu.ly(), 0);
    assert_eq!(ppu.mode(), Mode::OamScan);
}

#[test]
fn frame_spans_70224_cycles() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    let mut elapsed = 0u32;
    let mut entries = Vec::new();
    while entries.len() < 3 {
        if ppu.step(4, &mut if_reg) {
            entries.push(elapsed);
        }
        elapsed += 4;
    }
    assert_eq!(entries[1] - entries[0], CYCLES_PER_FRAME);
    assert_eq!(entries[2] - entries[1], CYCLES_PER_FRAME);
    assert_eq!(ppu.frames(), 3);
}

#[test]
fn stat_interrupt_on_hblank_entry() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    ppu.write_reg(0xFF41, 0x08);
    ppu.step(LINE_DRAWN - 1, &mut if_reg);
    assert_eq!(if_reg & INT_STAT, 0);
    ppu.step(1, &mut if_reg);
    assert_ne!(if_reg & INT_STAT, 0);
}

#[test]
fn stat_interrupt_on_oam_entry() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    ppu.write_reg(0xFF41, 0x20);
    ppu.step(LINE_CYCLES - 1, &mut if_reg);
    assert_eq!(if_reg & INT_STAT, 0);
    ppu.step(1, &mut if_reg);
    assert_ne!(if_reg & INT_STAT, 0);
}

#[test]
fn stat_interrupt_on_vblank_entry() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    ppu.write_reg(0xFF41, 0x10);
    ppu.step(144 * LINE_CYCLES - 1, &mut if_reg);
    assert_eq!(if_reg, 0);
    ppu.step(1, &mut if_reg);
    assert_eq!(if_reg, INT_VBLANK | INT_STAT);
}

#[test]
fn lyc_coincidence() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    ppu.write_reg(0xFF45, 2);
    ppu.write_reg(0xFF41, 0x40);
    assert_eq!(ppu.read_reg(0xFF41) & 0x04, 0);

    ppu.step(2 * LINE_CYCLES - 1, &mut if_reg);
    assert_eq!(if_reg & INT_STAT, 0);
    ppu.step(1, &mut if_reg);
    assert_ne!(if_reg & INT_STAT, 0);
    assert_eq!(ppu.read_reg(0xFF41), 0x80 | 0x40 | 0x04 | Mode::OamScan as u8);

    ppu.step(LINE_CYCLES, &mut if_reg);
    assert_eq!(ppu.read_reg(0xFF41) & 0x04, 0);
}

#[test]
fn ly_is_read_only() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    ppu.step(3 * LINE_CYCLES, &mut if_reg);
    ppu.write_reg(0xFF44, 0x50);
    assert_eq!(ppu.read_reg(0xFF44), 3);
}

#[test]
fn lcd_off_holds_line_zero() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    ppu.step(10 * LINE_CYCLES + 100, &mut if_reg);

    ppu.write_reg(0xFF40, 0x11);
    assert!(!ppu.lcd_enabled());
    assert!(!ppu.step(CYCLES_PER_FRAME, &mut if_reg));
    assert_eq!(ppu.ly(), 0);
    assert_eq!(ppu.mode(), Mode::HBlank);
    assert_eq!(ppu.read_reg(0xFF41) & 0x03, 0);

    ppu.write_reg(0xFF40, 0x91);
    assert_eq!(ppu.mode(), Mode::OamScan);
    assert_eq!(ppu.ly(), 0);
}

#[test]
fn background_tile_fills_line() {
    let mut ppu = boot_ppu();
    ppu.vram[..16].fill(0xFF);
    ppu.write_reg(0xFF47, 0xFF);
    ppu.write_reg(0xFF40, 0x91);
    draw_through_line(&mut ppu, 0);
    for x in 0..SCREEN_WIDTH {
        assert_eq!(pixel(&ppu, x, 0), BLACK, "x={x}");
    }
}

#[test]
fn blank_vram_is_white_with_boot_palette() {
    let mut ppu = boot_ppu();
    draw_through_line(&mut ppu, 5);
    assert_eq!(pixel(&ppu, 0, 5), WHITE);
    assert_eq!(pixel(&ppu, 159, 5), WHITE);
}

#[test]
fn signed_tile_addressing() {
    let mut ppu = boot_ppu();
    ppu.write_reg(0xFF47, 0xE4);
    ppu.write_reg(0xFF40, 0x81);
    // index 0 resolves to 0x9000, index 0x80 to 0x8800
    ppu.vram[0x1000..0x1010].fill(0xFF);
    ppu.vram[0x1800 + 1] = 0x80;
    fill_tile_row(&mut ppu, 0x80, 0, 0xFF, 0x00);
    draw_through_line(&mut ppu, 0);

    assert_eq!(pixel(&ppu, 0, 0), BLACK);
    assert_eq!(pixel(&ppu, 8, 0), LIGHT);
    assert_eq!(pixel(&ppu, 16, 0), BLACK);
}

#[test]
fn horizontal_scroll_moves_tiles() {
    let mut ppu = boot_ppu();
    ppu.write_reg(0xFF47, 0xE4);
    ppu.vram[0x1800 + 1] = 1;
    ppu.vram[0x10..0x20].fill(0xFF);

    let mut unscrolled = boot_ppu();
    unscrolled.vram.copy_from_slice(&ppu.vram);
    unscrolled.write_reg(0xFF47, 0xE4);
    draw_through_line(&mut unscrolled, 0);
    assert_eq!(pixel(&unscrolled, 0, 0), WHITE);
    assert_eq!(pixel(&unscrolled, 8, 0), BLACK);

    ppu.write_reg(0xFF43, 8);
    draw_through_line(&mut ppu, 0);
    assert_eq!(pixel(&ppu, 0, 0), BLACK);
    assert_eq!(pixel(&ppu, 7, 0), BLACK);
    assert_eq!(pixel(&ppu, 8, 0), WHITE);
}

#[test]
fn vertical_scroll_wraps_map() {
    let mut ppu = boot_ppu();
    ppu.write_reg(0xFF47, 0xE4);
    // tile row 31 of the map
    ppu.vram[0x1800 + 31 * 32] = 1;
    ppu.vram[0x10..0x20].fill(0xFF);
    ppu.write_reg(0xFF42, 248);
    draw_through_line(&mut ppu, 0);
    assert_eq!(pixel(&ppu, 0, 0), BLACK);
    assert_eq!(pixel(&ppu, 8, 0), WHITE);
}

#[test]
fn window_covers_background() {
    let mut ppu = boot_ppu();
    ppu.write_reg(0xFF47, 0xE4);
    ppu.vram[0x1C00..0x2000].fill(1);
    ppu.vram[0x10..0x20].fill(0xFF);
    ppu.write_reg(0xFF4A, 0);
    ppu.write_reg(0xFF4B, 87);
    ppu.write_reg(0xFF40, 0xF1);
    draw_through_line(&mut ppu, 0);

    assert_eq!(pixel(&ppu, 79, 0), WHITE);
    assert_eq!(pixel(&ppu, 80, 0), BLACK);
    assert_eq!(pixel(&ppu, 159, 0), BLACK);
}

#[test]
fn window_off_screen_is_not_drawn() {
    let mut ppu = boot_ppu();
    ppu.write_reg(0xFF47, 0xE4);
    ppu.vram[0x1C00..0x2000].fill(1);
    ppu.vram[0x10..0x20].fill(0xFF);
    ppu.write_reg(0xFF4A, 0);
    ppu.write_reg(0xFF4B, 167);
    ppu.write_reg(0xFF40, 0xF1);
    draw_through_line(&mut ppu, 0);
    assert_eq!(pixel(&ppu, 159, 0), WHITE);
    assert_eq!(ppu.window_line_counter(), 0);
}

#[test]
fn window_line_counter_only_advances_when_drawn() {
    let mut ppu = boot_ppu();
    let mut if_reg = 0;
    ppu.write_reg(0xFF47, 0xE4);
    ppu.vram[0x1C00..0x2000].fill(1);
    // only row 1 of the window tile is dark
    fill_tile_row(&mut ppu, 1, 1, 0xFF, 0xFF);
    ppu.write_reg(0xFF4A, 0);
    ppu.write_reg(0xFF4B, 7);
    ppu.write_reg(0xFF40, 0xF1);

    ppu.step(LINE_DRAWN, &mut if_reg);
    assert_eq!(ppu.window_line_counter(), 1);
    assert_eq!(pixel(&ppu, 0, 0), WHITE);

    ppu.write_reg(0xFF40, 0xD1);
    ppu.step(LINE_CYCLES, &mut if_reg);
    assert_eq!(ppu.window_line_counter(), 1);
    assert_eq!(pixel(&ppu, 0, 1), WHITE);

    ppu.write_reg(0xFF40, 0xF1);
    ppu.step(LINE_CYCLES, &mut if_reg);
    assert_eq!(ppu.window_line_counter(), 2);
    assert_eq!(pixel(&ppu, 0, 2), BLACK);

    ppu.step(CYCLES_PER_FRAME - 2 * LINE_CYCLES - LINE_DRAWN, &mut if_reg);
    assert_eq!(ppu.ly(), 0);
    assert_eq!(ppu.window_line_counter(), 0);
}

#[test]
fn window_waits_for_wy() {
    let mut ppu = boot_ppu();
    ppu.write_reg(0xFF4A, 100);
    ppu.write_reg(0xFF4B, 7);
    ppu.write_reg(0xFF40, 0xF1);
    draw_through_line(&mut ppu, 99);
    assert_eq!(ppu.window_line_counter(), 0);
    let mut if_reg = 0;
    ppu.step(LINE_CYCLES, &mut if_reg);
    assert_eq!(ppu.window_line_counter(), 1);
}

fn sprite_ppu() -> Ppu {
    let mut ppu = boot_ppu();
    ppu.write_reg(0xFF47, 0xE4);
    ppu.write_reg(0xFF48, 0xE4);
    ppu.write_reg(0xFF40, 0x93);
    ppu
}

#[test]
fn sprite_color_zero_is_transparent() {
    let mut ppu = sprite_ppu();
    fill_tile_row(&mut ppu, 2, 0, 0x80, 0x00);
    set_sprite(&mut ppu, 0, 16, 8, 2, 0);
    draw_through_line(&mut ppu, 0);
    assert_eq!(pixel(&ppu, 0, 0), LIGHT);
    assert_eq!(pixel(&ppu, 1, 0), WHITE);
}

#[test]
fn sprites_hidden_when_disabled() {
    let mut ppu = sprite_ppu();
    ppu.write_reg(0xFF40, 0x91);
    fill_tile_row(&mut ppu, 2, 0, 0xFF, 0x00);
    set_sprite(&mut ppu, 0, 16, 8, 2, 0);
    draw_through_line(&mut ppu, 0);
    assert_eq!(pixel(&ppu, 0, 0), WHITE);
}

#[test]
fn sprite_flips() {
    let mut ppu = sprite_ppu();
    fill_tile_row(&mut ppu, 2, 0, 0x80, 0x00);
    fill_tile_row(&mut ppu, 3, 7, 0x80, 0x00);
    set_sprite(&mut ppu, 0, 16, 8, 2, 0x20);
    set_sprite(&mut ppu, 1, 16, 24, 3, 0x40);
    draw_through_line(&mut ppu, 0);

    assert_eq!(pixel(&ppu, 0, 0), WHITE);
    assert_eq!(pixel(&ppu, 7, 0), LIGHT);
    assert_eq!(pixel(&ppu, 16, 0), LIGHT);
}

#[test]
fn sprite_uses_selected_palette() {
    let mut ppu = sprite_ppu();
    ppu.write_reg(0xFF49, 0x0C);
    fill_tile_row(&mut ppu, 2, 0, 0x80, 0x00);
    set_sprite(&mut ppu, 0, 16, 8, 2, 0x10);
    draw_through_line(&mut ppu, 0);
    assert_eq!(pixel(&ppu, 0, 0), BLACK);
}

#[test]
fn sprite_behind_background() {
    let mut ppu = sprite_ppu();
    // background pixels 0-3 are color 3, 4-7 color 0
    fill_tile_row(&mut ppu, 0, 0, 0xF0, 0xF0);
    fill_tile_row(&mut ppu, 2, 0, 0xFF, 0x00);
    set_sprite(&mut ppu, 0, 16, 8, 2, 0x80);
    draw_through_line(&mut ppu, 0);

    assert_eq!(pixel(&ppu, 0, 0), BLACK);
    assert_eq!(pixel(&ppu, 3, 0), BLACK);
    assert_eq!(pixel(&ppu, 4, 0), LIGHT);
    assert_eq!(pixel(&ppu, 7, 0), LIGHT);
}

#[test]
fn lower_x_sprite_wins_overlap() {
    let mut ppu = sprite_ppu();
    fill_tile_row(&mut ppu, 2, 0, 0xFF, 0x00);
    fill_tile_row(&mut ppu, 3, 0, 0xFF, 0xFF);
    set_sprite(&mut ppu, 0, 16, 10, 2, 0);
    set_sprite(&mut ppu, 1, 16, 8, 3, 0);
    draw_through_line(&mut ppu, 0);

    assert_eq!(pixel(&ppu, 2, 0), BLACK);
    assert_eq!(pixel(&ppu, 7, 0), BLACK);
    assert_eq!(pixel(&ppu, 8, 0), LIGHT);
    assert_eq!(pixel(&ppu, 9, 0), LIGHT);
}

#[test]
fn equal_x_sprites_favor_lower_oam_index() {
    let mut ppu = sprite_ppu();
    fill_tile_row(&mut ppu, 2, 0, 0xFF, 0x00);
    fill_tile_row(&mut ppu, 3, 0, 0xFF, 0xFF);
    set_sprite(&mut ppu, 0, 16, 8, 2, 0);
    set_sprite(&mut ppu, 1, 16, 8, 3, 0);
    draw_through_line(&mut ppu, 0);
    assert_eq!(pixel(&ppu, 0, 0), LIGHT);
}

#[test]
fn ten_sprites_per_line() {
    let mut ppu = sprite_ppu();
    fill_tile_row(&mut ppu, 2, 0, 0xFF, 0x00);
    for i in 0..11 {
        set_sprite(&mut ppu, i, 16, 8 + 8 * i as u8, 2, 0);
    }
    draw_through_line(&mut ppu, 0);
    for i in 0..10 {
        assert_eq!(pixel(&ppu, 8 * i, 0), LIGHT, "sprite {i}");
    }
    assert_eq!(pixel(&ppu, 80, 0), WHITE);
}

#[test]
fn tall_sprites_ignore_low_tile_bit() {
    let mut ppu = sprite_ppu();
    ppu.write_reg(0xFF40, 0x97);
    fill_tile_row(&mut ppu, 3, 0, 0xFF, 0x00);
    set_sprite(&mut ppu, 0, 16, 8, 3, 0);
    draw_through_line(&mut ppu, 8);

    assert_eq!(pixel(&ppu, 0, 0), WHITE);
    assert_eq!(pixel(&ppu, 0, 8), LIGHT);
}

#[test]
fn sprite_clipped_at_left_edge() {
    let mut ppu = sprite_ppu();
    fill_tile_row(&mut ppu, 2, 0, 0x0F, 0x00);
    set_sprite(&mut ppu, 0, 16, 4, 2, 0);
    draw_through_line(&mut ppu, 0);
    assert_eq!(pixel(&ppu, 0, 0), LIGHT);
    assert_eq!(pixel(&ppu, 3, 0), LIGHT);
    assert_eq!(pixel(&ppu, 4, 0), WHITE);
}
