use crate::hardware::{BYTES_PER_PIXEL, FRAME_BYTES, INT_STAT, INT_VBLANK, SCREEN_HEIGHT, SCREEN_WIDTH};

// Timing constants per LCD mode in clock cycles
const MODE0_CYCLES: u32 = 204; // HBlank
const MODE1_CYCLES: u32 = 456; // One line during VBlank
const MODE2_CYCLES: u32 = 80; // OAM scan
const MODE3_CYCLES: u32 = 172; // Pixel transfer

// Number of lines spent in VBlank
const VBLANK_LINES: u8 = 10;
const LAST_LINE: u8 = SCREEN_HEIGHT as u8 + VBLANK_LINES - 1;

// Sprite limits
const MAX_SPRITES_PER_LINE: usize = 10;
const TOTAL_SPRITES: usize = 40;

// Internal memory sizes
pub const VRAM_SIZE: usize = 0x2000;
pub const OAM_SIZE: usize = 0xA0;

// Window X position is clipped if greater than this value
const WINDOW_X_MAX: u8 = 166;

// VRAM layout constants
const BG_MAP_0_BASE: usize = 0x1800;
const BG_MAP_1_BASE: usize = 0x1C00;
const TILE_DATA_0_BASE: usize = 0x0000;
const TILE_DATA_1_BASE: usize = 0x0800;

// LCDC bits
const LCDC_BG_ENABLE: u8 = 0x01;
const LCDC_OBJ_ENABLE: u8 = 0x02;
const LCDC_OBJ_TALL: u8 = 0x04;
const LCDC_BG_MAP: u8 = 0x08;
const LCDC_TILE_DATA: u8 = 0x10;
const LCDC_WINDOW_ENABLE: u8 = 0x20;
const LCDC_WINDOW_MAP: u8 = 0x40;
const LCDC_LCD_ENABLE: u8 = 0x80;

// STAT interrupt sources
const STAT_HBLANK: u8 = 0x08;
const STAT_VBLANK: u8 = 0x10;
const STAT_OAM: u8 = 0x20;
const STAT_LYC: u8 = 0x40;

// Sprite attribute bits
const ATTR_PALETTE: u8 = 0x10;
const ATTR_X_FLIP: u8 = 0x20;
const ATTR_Y_FLIP: u8 = 0x40;
const ATTR_BEHIND_BG: u8 = 0x80;

/// Gray level for each of the four DMG shades, lightest first.
const GRAY_RAMP: [u8; 4] = [255, 180, 90, 0];

/// LCD mode as reported in STAT bits 0-1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    Transfer = 3,
}

#[derive(Copy, Clone, Default)]
struct Sprite {
    x: i16,
    y: i16,
    tile: u8,
    flags: u8,
    oam_index: usize,
}

pub struct Ppu {
    pub vram: [u8; VRAM_SIZE],
    pub oam: [u8; OAM_SIZE],

    lcdc: u8,
    stat: u8,
    scy: u8,
    scx: u8,
    ly: u8,
    lyc: u8,
    lyc_eq_ly: bool,
    /// Last value written to the DMA register (0xFF46)
    pub dma: u8,
    bgp: u8,
    obp0: u8,
    obp1: u8,
    wy: u8,
    wx: u8,

    /// Internal window line counter
    win_line_counter: u8,

    mode_clock: u32,
    mode: Mode,

    framebuffer: Box<[u8]>,
    /// Copy of `framebuffer` taken at the last VBlank entry
    completed: Box<[u8]>,
    line_color_zero: [bool; SCREEN_WIDTH],
    /// Latched sprites for the current scanline
    line_sprites: [Sprite; MAX_SPRITES_PER_LINE],
    sprite_count: usize,
    /// Indicates a new frame has been copied to `completed`
    frame_ready: bool,
    frame_counter: u64,
}

impl Ppu {
    /// PPU with every register cleared and the LCD switched off.
    pub fn new() -> Self {
        let mut framebuffer = vec![0u8; FRAME_BYTES].into_boxed_slice();
        for px in framebuffer.chunks_exact_mut(BYTES_PER_PIXEL) {
            px.copy_from_slice(&[GRAY_RAMP[0], GRAY_RAMP[0], GRAY_RAMP[0], 0xFF]);
        }
        Self {
            vram: [0; VRAM_SIZE],
            oam: [0; OAM_SIZE],
            lcdc: 0,
            stat: 0,
            scy: 0,
            scx: 0,
            ly: 0,
            lyc: 0,
            lyc_eq_ly: true,
            dma: 0,
            bgp: 0,
            obp0: 0,
            obp1: 0,
            wy: 0,
            wx: 0,
            win_line_counter: 0,
            mode_clock: 0,
            mode: Mode::HBlank,
            completed: framebuffer.clone(),
            framebuffer,
            line_color_zero: [false; SCREEN_WIDTH],
            line_sprites: [Sprite::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            frame_ready: false,
            frame_counter: 0,
        }
    }

    /// Initialize registers to the state left behind by the boot ROM.
    pub fn apply_boot_state(&mut self) {
        self.lcdc = 0x91;
        self.stat = 0x00;
        self.dma = 0xFF;
        self.bgp = 0xFC;
        self.obp0 = 0xFF;
        self.obp1 = 0xFF;
        self.ly = 0;
        self.mode = Mode::OamScan;
        self.mode_clock = 0;
        self.win_line_counter = 0;
        self.lyc_eq_ly = self.ly == self.lyc;
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn ly(&self) -> u8 {
        self.ly
    }

    pub fn lcd_enabled(&self) -> bool {
        self.lcdc & LCDC_LCD_ENABLE != 0
    }

    pub fn window_line_counter(&self) -> u8 {
        self.win_line_counter
    }

    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    /// RGBA8 pixels, row-major, 160x144. Lines are written as they are
    /// drawn, so mid-frame this mixes the current and previous frame.
    pub fn framebuffer(&self) -> &[u8] {
        &self.framebuffer
    }

    /// The last frame finished by VBlank entry, in the same layout as
    /// [`Ppu::framebuffer`].
    pub fn completed_frame(&self) -> &[u8] {
        &self.completed
    }

    /// Number of frames completed since power on.
    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    /// Copy a 160-byte block into OAM in one go.
    pub fn dma_transfer(&mut self, block: &[u8; OAM_SIZE]) {
        self.oam.copy_from_slice(block);
    }

    pub fn read_reg(&self, addr: u16) -> u8 {
        match addr {
            0xFF40 => self.lcdc,
            0xFF41 => {
                (self.stat & 0x78)
                    | 0x80
                    | (self.mode as u8)
                    | if self.lyc_eq_ly { 0x04 } else { 0 }
            }
            0xFF42 => self.scy,
            0xFF43 => self.scx,
            0xFF44 => self.ly,
            0xFF45 => self.lyc,
            0xFF46 => self.dma,
            0xFF47 => self.bgp,
            0xFF48 => self.obp0,
            0xFF49 => self.obp1,
            0xFF4A => self.wy,
            0xFF4B => self.wx,
            _ => 0xFF,
        }
    }

    pub fn write_reg(&mut self, addr: u16, val: u8) {
        match addr {
            0xFF40 => {
                let was_on = self.lcd_enabled();
                self.lcdc = val;
                if was_on && !self.lcd_enabled() {
                    self.mode = Mode::HBlank;
                    self.mode_clock = 0;
                    self.win_line_counter = 0;
                    self.ly = 0;
                } else if !was_on && self.lcd_enabled() {
                    self.mode = Mode::OamScan;
                    self.mode_clock = 0;
                    self.ly = 0;
                    self.lyc_eq_ly = self.ly == self.lyc;
                }
            }
            0xFF41 => self.stat = val & 0x78,
            0xFF42 => self.scy = val,
            0xFF43 => self.scx = val,
            0xFF44 => {}
            0xFF45 => {
                self.lyc = val;
                self.lyc_eq_ly = self.ly == self.lyc;
            }
            0xFF46 => self.dma = val,
            0xFF47 => self.bgp = val,
            0xFF48 => self.obp0 = val,
            0xFF49 => self.obp1 = val,
            0xFF4A => self.wy = val,
            0xFF4B => self.wx = val,
            _ => {}
        }
    }

    fn oam_scan(&mut self) {
        let sprite_height: i16 = if self.lcdc & LCDC_OBJ_TALL != 0 { 16 } else { 8 };
        self.sprite_count = 0;
        for i in 0..TOTAL_SPRITES {
            if self.sprite_count >= MAX_SPRITES_PER_LINE {
                break;
            }
            let base = i * 4;
            let y = self.oam[base] as i16 - 16;
            let line = self.ly as i16;
            if line >= y && line < y + sprite_height {
                self.line_sprites[self.sprite_count] = Sprite {
                    x: self.oam[base + 1] as i16 - 8,
                    y,
                    tile: self.oam[base + 2],
                    flags: self.oam[base + 3],
                    oam_index: i,
                };
                self.sprite_count += 1;
            }
        }
        // lower X draws on top, ties go to the earlier OAM entry
        self.line_sprites[..self.sprite_count].sort_by_key(|s| (s.x, s.oam_index));
    }

    #[inline(always)]
    fn dmg_shade(palette: u8, color_id: u8) -> u8 {
        (palette >> (color_id * 2)) & 0x03
    }

    #[inline(always)]
    fn put_pixel(&mut self, x: usize, shade: u8) {
        let gray = GRAY_RAMP[shade as usize];
        let idx = (self.ly as usize * SCREEN_WIDTH + x) * BYTES_PER_PIXEL;
        self.framebuffer[idx..idx + BYTES_PER_PIXEL].copy_from_slice(&[gray, gray, gray, 0xFF]);
    }

    /// Color index (0-3) of one pixel of a background or window tile.
    fn tile_color(&self, map_base: usize, tile_col: usize, tile_row: usize, x: usize, y: usize) -> u8 {
        let tile_index = self.vram[map_base + tile_row * 32 + tile_col];
        let addr = if self.lcdc & LCDC_TILE_DATA != 0 {
            TILE_DATA_0_BASE + tile_index as usize * 16
        } else {
            TILE_DATA_1_BASE + ((tile_index as i8 as i16 + 128) as usize) * 16
        };
        let bit = 7 - x;
        let lo = self.vram[addr + y * 2];
        let hi = self.vram[addr + y * 2 + 1];
        ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1)
    }

    fn render_scanline(&mut self) {
        if !self.lcd_enabled() || self.ly as usize >= SCREEN_HEIGHT {
            return;
        }

        // With the background off every pixel is color 0 and sprites see
        // the line as transparent.
        let blank = Self::dmg_shade(self.bgp, 0);
        for x in 0..SCREEN_WIDTH {
            self.put_pixel(x, blank);
        }
        self.line_color_zero.fill(true);

        if self.lcdc & LCDC_BG_ENABLE != 0 {
            self.render_background();
            self.render_window();
        }

        if self.lcdc & LCDC_OBJ_ENABLE != 0 {
            self.render_sprites();
        }
    }

    fn render_background(&mut self) {
        let map_base = if self.lcdc & LCDC_BG_MAP != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let py = (self.ly as usize + self.scy as usize) & 0xFF;
        for x in 0..SCREEN_WIDTH {
            let px = (x + self.scx as usize) & 0xFF;
            let color_id = self.tile_color(map_base, px / 8, py / 8, px % 8, py % 8);
            self.put_pixel(x, Self::dmg_shade(self.bgp, color_id));
            self.line_color_zero[x] = color_id == 0;
        }
    }

    fn render_window(&mut self) {
        if self.lcdc & LCDC_WINDOW_ENABLE == 0 || self.ly < self.wy || self.wx > WINDOW_X_MAX {
            return;
        }
        let map_base = if self.lcdc & LCDC_WINDOW_MAP != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let wx = self.wx as i16 - 7;
        let window_y = self.win_line_counter as usize;
        for x in wx.max(0) as usize..SCREEN_WIDTH {
            let window_x = (x as i16 - wx) as usize;
            let color_id =
                self.tile_color(map_base, window_x / 8, window_y / 8, window_x % 8, window_y % 8);
            self.put_pixel(x, Self::dmg_shade(self.bgp, color_id));
            self.line_color_zero[x] = color_id == 0;
        }
        self.win_line_counter = self.win_line_counter.wrapping_add(1);
    }

    fn render_sprites(&mut self) {
        let sprite_height: i16 = if self.lcdc & LCDC_OBJ_TALL != 0 { 16 } else { 8 };
        let mut drawn = [false; SCREEN_WIDTH];
        for i in 0..self.sprite_count {
            let s = self.line_sprites[i];
            let mut tile = s.tile;
            if sprite_height == 16 {
                tile &= 0xFE;
            }
            let mut line_idx = self.ly as i16 - s.y;
            if s.flags & ATTR_Y_FLIP != 0 {
                line_idx = sprite_height - 1 - line_idx;
            }
            let addr = tile as usize * 16 + line_idx as usize * 2;
            let lo = self.vram[addr];
            let hi = self.vram[addr + 1];
            let palette = if s.flags & ATTR_PALETTE != 0 {
                self.obp1
            } else {
                self.obp0
            };
            for px in 0..8u8 {
                let sx = s.x + px as i16;
                if !(0..SCREEN_WIDTH as i16).contains(&sx) || drawn[sx as usize] {
                    continue;
                }
                let bit = if s.flags & ATTR_X_FLIP != 0 { px } else { 7 - px };
                let color_id = ((hi >> bit) & 1) << 1 | ((lo >> bit) & 1);
                if color_id == 0 {
                    continue;
                }
                let sx = sx as usize;
                // the pixel is claimed even when hidden behind the background
                drawn[sx] = true;
                if s.flags & ATTR_BEHIND_BG != 0 && !self.line_color_zero[sx] {
                    continue;
                }
                self.put_pixel(sx, Self::dmg_shade(palette, color_id));
            }
        }
    }

    fn compare_lyc(&mut self, if_reg: &mut u8) {
        self.lyc_eq_ly = self.ly == self.lyc;
        if self.lyc_eq_ly && self.stat & STAT_LYC != 0 {
            *if_reg |= INT_STAT;
        }
    }

    fn enter_mode(&mut self, mode: Mode, if_reg: &mut u8) {
        self.mode = mode;
        let source = match mode {
            Mode::HBlank => STAT_HBLANK,
            Mode::VBlank => STAT_VBLANK,
            Mode::OamScan => STAT_OAM,
            Mode::Transfer => 0,
        };
        if self.stat & source != 0 {
            *if_reg |= INT_STAT;
        }
        #[cfg(feature = "ppu-trace")]
        log::trace!("PPU mode {:?} LY={}", mode, self.ly);
    }

    /// Advance by `cycles` clock cycles. Returns `true` when the step entered
    /// VBlank, i.e. a complete frame has been copied to [`Ppu::completed_frame`].
    pub fn step(&mut self, cycles: u32, if_reg: &mut u8) -> bool {
        if !self.lcd_enabled() {
            self.mode = Mode::HBlank;
            self.ly = 0;
            self.mode_clock = 0;
            self.win_line_counter = 0;
            return false;
        }

        let mut frame_done = false;
        self.mode_clock += cycles;
        loop {
            let duration = match self.mode {
                Mode::OamScan => MODE2_CYCLES,
                Mode::Transfer => MODE3_CYCLES,
                Mode::HBlank => MODE0_CYCLES,
                Mode::VBlank => MODE1_CYCLES,
            };
            if self.mode_clock < duration {
                break;
            }
            self.mode_clock -= duration;

            match self.mode {
                Mode::OamScan => {
                    self.oam_scan();
                    self.enter_mode(Mode::Transfer, if_reg);
                }
                Mode::Transfer => {
                    self.render_scanline();
                    self.enter_mode(Mode::HBlank, if_reg);
                }
                Mode::HBlank => {
                    self.ly += 1;
                    self.compare_lyc(if_reg);
                    if self.ly == SCREEN_HEIGHT as u8 {
                        self.completed.copy_from_slice(&self.framebuffer);
                        self.frame_ready = true;
                        frame_done = true;
                        self.frame_counter = self.frame_counter.wrapping_add(1);
                        *if_reg |= INT_VBLANK;
                        self.enter_mode(Mode::VBlank, if_reg);
                    } else {
                        self.enter_mode(Mode::OamScan, if_reg);
                    }
                }
                Mode::VBlank => {
                    if self.ly == LAST_LINE {
                        self.ly = 0;
                        self.win_line_counter = 0;
                        self.compare_lyc(if_reg);
                        self.enter_mode(Mode::OamScan, if_reg);
                    } else {
                        self.ly += 1;
                        self.compare_lyc(if_reg);
                    }
                }
            }
        }
        frame_done
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
