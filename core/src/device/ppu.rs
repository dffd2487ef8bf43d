//! The picture processing unit: background/sprite rasterisation, one
//! scanline at a time, plus the full `0x2100-0x213F` register file.
//!
//! Peripherals are data-only here (no back-reference to the console): the
//! few console-owned values the register file needs (H/V dot position,
//! open bus) are passed in by the caller instead.

#[derive(Copy, Clone, Default)]
struct BgLayer {
    h_scroll: u16,
    v_scroll: u16,
    tilemap_wider: bool,
    tilemap_higher: bool,
    tilemap_addr: u16,
    tile_addr: u16,
    big_tiles: bool,
    mosaic_enabled: bool,
}

#[derive(Copy, Clone, Default)]
struct ScreenLayer {
    main_screen_enabled: bool,
    sub_screen_enabled: bool,
    main_screen_windowed: bool,
    sub_screen_windowed: bool,
}

#[derive(Copy, Clone, Default)]
struct WindowLayer {
    window1_enabled: bool,
    window2_enabled: bool,
    window1_inversed: bool,
    window2_inversed: bool,
    mask_logic: u8,
}

/// `layersPerMode`/`prioritysPerMode` rows: mode 0-7, 8 = mode1+bg3prio,
/// 9 = mode7+extbg.
const LAYERS_PER_MODE: [[usize; 12]; 10] = [
    [4, 0, 1, 4, 0, 1, 4, 2, 3, 4, 2, 3],
    [4, 0, 1, 4, 0, 1, 4, 2, 4, 2, 5, 5],
    [4, 0, 4, 1, 4, 0, 4, 1, 5, 5, 5, 5],
    [4, 0, 4, 1, 4, 0, 4, 1, 5, 5, 5, 5],
    [4, 0, 4, 1, 4, 0, 4, 1, 5, 5, 5, 5],
    [4, 0, 4, 1, 4, 0, 4, 1, 5, 5, 5, 5],
    [4, 0, 4, 4, 0, 4, 5, 5, 5, 5, 5, 5],
    [4, 4, 4, 0, 4, 5, 5, 5, 5, 5, 5, 5],
    [2, 4, 0, 1, 4, 0, 1, 4, 4, 2, 5, 5],
    [4, 4, 1, 4, 0, 4, 1, 5, 5, 5, 5, 5],
];

const PRIORITYS_PER_MODE: [[i32; 12]; 10] = [
    [3, 1, 1, 2, 0, 0, 1, 1, 1, 0, 0, 0],
    [3, 1, 1, 2, 0, 0, 1, 1, 0, 0, 5, 5],
    [3, 1, 2, 1, 1, 0, 0, 0, 5, 5, 5, 5],
    [3, 1, 2, 1, 1, 0, 0, 0, 5, 5, 5, 5],
    [3, 1, 2, 1, 1, 0, 0, 0, 5, 5, 5, 5],
    [3, 1, 2, 1, 1, 0, 0, 0, 5, 5, 5, 5],
    [3, 1, 2, 1, 0, 0, 5, 5, 5, 5, 5, 5],
    [3, 2, 1, 0, 0, 5, 5, 5, 5, 5, 5, 5],
    [1, 3, 1, 1, 2, 0, 0, 1, 0, 0, 5, 5],
    [3, 2, 1, 1, 0, 0, 0, 5, 5, 5, 5, 5],
];

const LAYER_COUNT_PER_MODE: [usize; 10] = [12, 10, 8, 8, 8, 8, 6, 5, 10, 7];

const BIT_DEPTHS_PER_MODE: [[i32; 4]; 10] = [
    [2, 2, 2, 2],
    [4, 4, 2, 5],
    [4, 4, 5, 5],
    [8, 4, 5, 5],
    [8, 2, 5, 5],
    [4, 2, 5, 5],
    [4, 5, 5, 5],
    [8, 5, 5, 5],
    [4, 4, 2, 5],
    [8, 7, 5, 5],
];

const SPRITE_SIZES: [[i32; 2]; 8] = [
    [8, 16],
    [8, 32],
    [8, 64],
    [16, 32],
    [16, 64],
    [32, 64],
    [16, 32],
    [16, 32],
];

pub struct Ppu {
    vram: Vec<u16>,
    vram_pointer: u16,
    vram_increment_on_high: bool,
    vram_increment: u16,
    vram_remap_mode: u8,
    vram_read_buffer: u16,

    cgram: [u16; 0x100],
    cgram_pointer: u8,
    cgram_second_write: bool,
    cgram_buffer: u8,

    oam: [u16; 0x100],
    high_oam: [u8; 0x20],
    oam_addr: u8,
    oam_addr_written: u8,
    oam_in_high: bool,
    oam_in_high_written: bool,
    oam_second_write: bool,
    oam_buffer: u8,

    obj_priority: bool,
    obj_tile_addr1: u16,
    obj_tile_addr2: u16,
    obj_size: u8,
    obj_pixel_buffer: [u8; 256],
    obj_priority_buffer: [u8; 256],
    time_over: bool,
    range_over: bool,
    obj_interlace: bool,

    bg_layer: [BgLayer; 4],
    scroll_prev: u8,
    scroll_prev2: u8,
    mosaic_size: u8,
    mosaic_start_line: u8,

    layer: [ScreenLayer; 5],

    mode7_matrix: [i16; 8],
    mode7_prev: u8,
    mode7_large_field: bool,
    mode7_char_fill: bool,
    mode7_x_flip: bool,
    mode7_y_flip: bool,
    mode7_ext_bg: bool,
    mode7_start_x: i32,
    mode7_start_y: i32,

    window_layer: [WindowLayer; 6],
    window1_left: u8,
    window1_right: u8,
    window2_left: u8,
    window2_right: u8,

    clip_mode: u8,
    prevent_math_mode: u8,
    add_subscreen: bool,
    subtract_color: bool,
    half_color: bool,
    math_enabled: [bool; 6],
    fixed_color_r: u8,
    fixed_color_g: u8,
    fixed_color_b: u8,

    forced_blank: bool,
    brightness: u8,
    mode: u8,
    bg3_priority: bool,
    even_frame: bool,
    pseudo_hires: bool,
    overscan: bool,
    frame_overscan: bool,
    interlace: bool,
    frame_interlace: bool,
    direct_color: bool,

    h_count: u16,
    v_count: u16,
    h_count_second: bool,
    v_count_second: bool,
    counters_latched: bool,
    ppu1_open_bus: u8,
    ppu2_open_bus: u8,

    pixel_buffer: Vec<u8>,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            vram: vec![0u16; 0x8000],
            vram_pointer: 0,
            vram_increment_on_high: false,
            vram_increment: 1,
            vram_remap_mode: 0,
            vram_read_buffer: 0,
            cgram: [0; 0x100],
            cgram_pointer: 0,
            cgram_second_write: false,
            cgram_buffer: 0,
            oam: [0; 0x100],
            high_oam: [0; 0x20],
            oam_addr: 0,
            oam_addr_written: 0,
            oam_in_high: false,
            oam_in_high_written: false,
            oam_second_write: false,
            oam_buffer: 0,
            obj_priority: false,
            obj_tile_addr1: 0,
            obj_tile_addr2: 0,
            obj_size: 0,
            obj_pixel_buffer: [0; 256],
            obj_priority_buffer: [0; 256],
            time_over: false,
            range_over: false,
            obj_interlace: false,
            bg_layer: [BgLayer::default(); 4],
            scroll_prev: 0,
            scroll_prev2: 0,
            mosaic_size: 1,
            mosaic_start_line: 1,
            layer: [ScreenLayer::default(); 5],
            mode7_matrix: [0; 8],
            mode7_prev: 0,
            mode7_large_field: false,
            mode7_char_fill: false,
            mode7_x_flip: false,
            mode7_y_flip: false,
            mode7_ext_bg: false,
            mode7_start_x: 0,
            mode7_start_y: 0,
            window_layer: [WindowLayer::default(); 6],
            window1_left: 0,
            window1_right: 0,
            window2_left: 0,
            window2_right: 0,
            clip_mode: 0,
            prevent_math_mode: 0,
            add_subscreen: false,
            subtract_color: false,
            half_color: false,
            math_enabled: [false; 6],
            fixed_color_r: 0,
            fixed_color_g: 0,
            fixed_color_b: 0,
            forced_blank: true,
            brightness: 0,
            mode: 0,
            bg3_priority: false,
            even_frame: false,
            pseudo_hires: false,
            overscan: false,
            frame_overscan: false,
            interlace: false,
            frame_interlace: false,
            direct_color: false,
            h_count: 0,
            v_count: 0,
            h_count_second: false,
            v_count_second: false,
            counters_latched: false,
            ppu1_open_bus: 0,
            ppu2_open_bus: 0,
            pixel_buffer: vec![0u8; 512 * 4 * 239 * 2],
        }
    }

    pub fn reset(&mut self) {
        *self = Self::new();
    }

    pub fn check_overscan(&mut self) -> bool {
        self.frame_overscan = self.overscan;
        self.frame_overscan
    }

    pub fn interlace(&self) -> bool {
        self.interlace
    }

    pub fn even_frame(&self) -> bool {
        self.even_frame
    }

    pub fn handle_vblank(&mut self) {
        if !self.forced_blank {
            self.oam_addr = self.oam_addr_written;
            self.oam_in_high = self.oam_in_high_written;
            self.oam_second_write = false;
        }
        self.frame_interlace = self.interlace;
    }

    pub fn run_line(&mut self, line: i32) {
        if line == 0 {
            self.mosaic_start_line = 1;
            self.range_over = false;
            self.time_over = false;
            self.even_frame = !self.even_frame;
            if !self.forced_blank {
                self.evaluate_sprites(0);
            }
        } else {
            self.obj_pixel_buffer = [0; 256];
            if !self.forced_blank {
                self.evaluate_sprites(line - 1);
            }
            if self.mode == 7 {
                self.calculate_mode7_starts(line);
            }
            for x in 0..256 {
                self.handle_pixel(x, line);
            }
        }
    }

    fn handle_pixel(&mut self, x: i32, y: i32) {
        let (mut r, mut g, mut b) = (0i32, 0i32, 0i32);
        let (mut r2, mut g2, mut b2) = (0i32, 0i32, 0i32);
        if !self.forced_blank {
            let (main_layer, pr, pg, pb) = self.get_pixel(x, y, false);
            r = pr;
            g = pg;
            b = pb;
            let color_window_state = self.get_window_state(5, x);
            if self.clip_mode == 3
                || (self.clip_mode == 2 && color_window_state)
                || (self.clip_mode == 1 && !color_window_state)
            {
                r = 0;
                g = 0;
                b = 0;
            }
            let mut second_layer = 5;
            let math_enabled = main_layer < 6
                && self.math_enabled[main_layer]
                && !(self.prevent_math_mode == 3
                    || (self.prevent_math_mode == 2 && color_window_state)
                    || (self.prevent_math_mode == 1 && !color_window_state));

            if (math_enabled && self.add_subscreen) || self.pseudo_hires || self.mode == 5 || self.mode == 6 {
                let (sl, pr2, pg2, pb2) = self.get_pixel(x, y, true);
                second_layer = sl;
                r2 = pr2;
                g2 = pg2;
                b2 = pb2;
            }
            if math_enabled {
                if self.subtract_color {
                    if self.add_subscreen && second_layer != 5 {
                        r -= r2;
                        g -= g2;
                        b -= b2;
                    } else {
                        r -= self.fixed_color_r as i32;
                        g -= self.fixed_color_g as i32;
                        b -= self.fixed_color_b as i32;
                    }
                } else if self.add_subscreen && second_layer != 5 {
                    r += r2;
                    g += g2;
                    b += b2;
                } else {
                    r += self.fixed_color_r as i32;
                    g += self.fixed_color_g as i32;
                    b += self.fixed_color_b as i32;
                }
                if self.half_color && (second_layer != 5 || !self.add_subscreen) {
                    r >>= 1;
                    g >>= 1;
                    b >>= 1;
                }
                r = r.clamp(0, 31);
                g = g.clamp(0, 31);
                b = b.clamp(0, 31);
            }
            if !(self.pseudo_hires || self.mode == 5 || self.mode == 6) {
                r2 = r;
                g2 = g;
                b2 = b;
            }
        }

        let row = if self.even_frame { y - 1 } else { (y - 1) + 239 };
        let base = row as usize * 2048 + x as usize * 8;
        let brightness = self.brightness as i32;
        self.pixel_buffer[base] = (((r2 << 3) | (r2 >> 2)) * brightness / 15) as u8;
        self.pixel_buffer[base + 1] = (((g2 << 3) | (g2 >> 2)) * brightness / 15) as u8;
        self.pixel_buffer[base + 2] = (((b2 << 3) | (b2 >> 2)) * brightness / 15) as u8;
        self.pixel_buffer[base + 3] = 0xff;
        self.pixel_buffer[base + 4] = (((r << 3) | (r >> 2)) * brightness / 15) as u8;
        self.pixel_buffer[base + 5] = (((g << 3) | (g >> 2)) * brightness / 15) as u8;
        self.pixel_buffer[base + 6] = (((b << 3) | (b >> 2)) * brightness / 15) as u8;
        self.pixel_buffer[base + 7] = 0xff;
    }

    /// Returns (layer, r, g, b): layer 0-3 bg, 4/6 sprite, 5 backdrop.
    fn get_pixel(&mut self, x: i32, y: i32, sub: bool) -> (usize, i32, i32, i32) {
        let act_mode = if self.mode == 1 && self.bg3_priority {
            8
        } else if self.mode == 7 && self.mode7_ext_bg {
            9
        } else {
            self.mode as usize
        };

        let mut layer = 5usize;
        let mut pixel = 0i32;
        for i in 0..LAYER_COUNT_PER_MODE[act_mode] {
            let cur_layer = LAYERS_PER_MODE[act_mode][i];
            let cur_priority = PRIORITYS_PER_MODE[act_mode][i];
            let layer_active = if !sub {
                self.layer[cur_layer].main_screen_enabled
                    && (!self.layer[cur_layer].main_screen_windowed || !self.get_window_state(cur_layer, x))
            } else {
                self.layer[cur_layer].sub_screen_enabled
                    && (!self.layer[cur_layer].sub_screen_windowed || !self.get_window_state(cur_layer, x))
            };
            if layer_active {
                if cur_layer < 4 {
                    let mut lx = x;
                    let mut ly = y;
                    if self.bg_layer[cur_layer].mosaic_enabled && self.mosaic_size > 1 {
                        lx -= lx % self.mosaic_size as i32;
                        ly -= (ly - self.mosaic_start_line as i32) % self.mosaic_size as i32;
                    }
                    if self.mode == 7 {
                        pixel = self.get_pixel_for_mode7(lx, cur_layer, cur_priority > 0);
                    } else {
                        lx += self.bg_layer[cur_layer].h_scroll as i32;
                        if self.mode == 5 || self.mode == 6 {
                            lx *= 2;
                            if !(sub || self.bg_layer[cur_layer].mosaic_enabled) {
                                lx += 1;
                            }
                            if self.interlace {
                                ly *= 2;
                                if !(self.even_frame || self.bg_layer[cur_layer].mosaic_enabled) {
                                    ly += 1;
                                }
                            }
                        }
                        ly += self.bg_layer[cur_layer].v_scroll as i32;
                        if self.mode == 2 || self.mode == 4 || self.mode == 6 {
                            let (nlx, nly) = self.handle_opt(cur_layer, lx, ly);
                            lx = nlx;
                            ly = nly;
                        }
                        pixel = self.get_pixel_for_bg_layer(lx & 0x3ff, ly & 0x3ff, cur_layer, cur_priority > 0);
                    }
                } else {
                    pixel = 0;
                    if self.obj_priority_buffer[x as usize] as i32 == cur_priority {
                        pixel = self.obj_pixel_buffer[x as usize] as i32;
                    }
                }
            }
            if pixel > 0 {
                layer = cur_layer;
                break;
            }
        }

        let (r, g, b);
        if self.direct_color && layer < 4 && BIT_DEPTHS_PER_MODE[act_mode][layer] == 8 {
            r = ((pixel & 0x7) << 2) | ((pixel & 0x100) >> 7);
            g = ((pixel & 0x38) >> 1) | ((pixel & 0x200) >> 8);
            b = ((pixel & 0xc0) >> 3) | ((pixel & 0x400) >> 8);
        } else {
            let color = self.cgram[(pixel & 0xff) as usize];
            r = (color & 0x1f) as i32;
            g = ((color >> 5) & 0x1f) as i32;
            b = ((color >> 10) & 0x1f) as i32;
        }
        if layer == 4 && pixel < 0xc0 {
            layer = 6;
        }
        (layer, r, g, b)
    }

    fn handle_opt(&mut self, layer: usize, mut x: i32, mut y: i32) -> (i32, i32) {
        let h_scroll = self.bg_layer[layer].h_scroll as i32;
        let column = if self.mode == 6 {
            ((x - (x & 0xf)) - ((h_scroll * 2) & 0xfff0)) >> 4
        } else {
            ((x - (x & 0x7)) - (h_scroll & 0xfff8)) >> 3
        };

        if column > 0 {
            let valid = if layer == 0 { 0x2000 } else { 0x4000 };
            let mut h_offset = self.get_offset_value(column - 1, 0);
            let mut v_offset = 0u16;
            if self.mode == 4 {
                if h_offset & 0x8000 != 0 {
                    v_offset = h_offset;
                    h_offset = 0;
                }
            } else {
                v_offset = self.get_offset_value(column - 1, 1);
            }
            if self.mode == 6 {
                if (h_offset as i32 & valid) > 0 {
                    x = (((h_offset as i32 & 0x3f8) + (column * 8)) * 2) | (x & 0xf);
                }
            } else if (h_offset as i32 & valid) > 0 {
                x = ((h_offset as i32 & 0x3f8) + (column * 8)) | (x & 0x7);
            }

            if (v_offset as i32 & valid) > 0 {
                y = (v_offset as i32 & 0x3ff) + (y - self.bg_layer[layer].v_scroll as i32);
            }
        }
        (x, y)
    }

    fn get_offset_value(&self, col: i32, row: i32) -> u16 {
        let x = col * 8 + self.bg_layer[2].h_scroll as i32;
        let y = row * 8 + self.bg_layer[2].v_scroll as i32;
        let (tile_bits, tile_high_bit) = if self.bg_layer[2].big_tiles { (4, 0x200) } else { (3, 0x100) };
        let mut tilemap_addr =
            self.bg_layer[2].tilemap_addr.wrapping_add((((y >> tile_bits) & 0x1f) << 5 | ((x >> tile_bits) & 0x1f)) as u16);
        if (x & tile_high_bit) > 0 && self.bg_layer[2].tilemap_wider {
            tilemap_addr = tilemap_addr.wrapping_add(0x400);
        }
        if (y & tile_high_bit) > 0 && self.bg_layer[2].tilemap_higher {
            tilemap_addr = tilemap_addr.wrapping_add(if self.bg_layer[2].tilemap_wider { 0x800 } else { 0x400 });
        }
        self.vram[(tilemap_addr & 0x7fff) as usize]
    }

    fn get_pixel_for_bg_layer(&self, x: i32, y: i32, layer: usize, priority: bool) -> i32 {
        let wide_tiles = self.bg_layer[layer].big_tiles || self.mode == 5 || self.mode == 6;
        let (tile_bits_x, tile_high_bit_x) = if wide_tiles { (4, 0x200) } else { (3, 0x100) };
        let (tile_bits_y, tile_high_bit_y) = if self.bg_layer[layer].big_tiles { (4, 0x200) } else { (3, 0x100) };

        let mut tilemap_addr = (self.bg_layer[layer].tilemap_addr as i32
            + (((y >> tile_bits_y) & 0x1f) << 5 | ((x >> tile_bits_x) & 0x1f))) as u16;

        if (x & tile_high_bit_x) > 0 && self.bg_layer[layer].tilemap_wider {
            tilemap_addr = tilemap_addr.wrapping_add(0x400);
        }
        if (y & tile_high_bit_y) > 0 && self.bg_layer[layer].tilemap_higher {
            tilemap_addr = tilemap_addr.wrapping_add(if self.bg_layer[layer].tilemap_wider { 0x800 } else { 0x400 });
        }

        let tile = self.vram[(tilemap_addr & 0x7fff) as usize];
        if ((tile & 0x2000) > 0) != priority {
            return 0;
        }
        let palette_num = ((tile & 0x1c00) >> 10) as i32;
        let row = if tile & 0x8000 != 0 { 7 - (y & 0x7) } else { y & 0x7 };
        let col = if tile & 0x4000 != 0 { x & 0x7 } else { 7 - (x & 0x7) };
        let mut tile_num = (tile & 0x3ff) as i32;
        if wide_tiles && ((x & 8 > 0) != (tile & 0x4000 > 0)) {
            tile_num += 1;
        }
        if self.bg_layer[layer].big_tiles && ((y & 8 > 0) != (tile & 0x8000 > 0)) {
            tile_num += 0x10;
        }

        let bit_depth = BIT_DEPTHS_PER_MODE[self.mode as usize][layer];
        let mut palette_num = palette_num;
        if self.mode == 0 {
            palette_num += 8 * layer as i32;
        }

        let mut palette_size = 4;
        let base = self.bg_layer[layer].tile_addr as i32 + (tile_num & 0x3ff) * 4 * bit_depth + row;
        let plane1 = self.vram[(base & 0x7fff) as usize] as i32;
        let mut pixel = (plane1 >> col) & 1;
        pixel |= ((plane1 >> (8 + col)) & 1) << 1;

        if bit_depth > 2 {
            palette_size = 16;
            let plane2 = self.vram[((base + 8) & 0x7fff) as usize] as i32;
            pixel |= ((plane2 >> col) & 1) << 2;
            pixel |= ((plane2 >> (8 + col)) & 1) << 3;
        }
        if bit_depth > 4 {
            palette_size = 256;
            let plane3 = self.vram[((base + 16) & 0x7fff) as usize] as i32;
            pixel |= ((plane3 >> col) & 1) << 4;
            pixel |= ((plane3 >> (8 + col)) & 1) << 5;
            let plane4 = self.vram[((base + 24) & 0x7fff) as usize] as i32;
            pixel |= ((plane4 >> col) & 1) << 6;
            pixel |= ((plane4 >> (8 + col)) & 1) << 7;
        }

        if pixel == 0 {
            0
        } else {
            palette_size * palette_num + pixel
        }
    }

    fn calculate_mode7_starts(&mut self, mut y: i32) {
        let h_scroll = ((self.mode7_matrix[6] << 3) >> 3) as i32;
        let v_scroll = ((self.mode7_matrix[7] << 3) >> 3) as i32;
        let x_center = ((self.mode7_matrix[4] << 3) >> 3) as i32;
        let y_center = ((self.mode7_matrix[5] << 3) >> 3) as i32;
        let mut clipped_h = h_scroll - x_center;
        let mut clipped_v = v_scroll - y_center;
        clipped_h = if clipped_h & 0x2000 != 0 { clipped_h | !1023 } else { clipped_h & 1023 };
        clipped_v = if clipped_v & 0x2000 != 0 { clipped_v | !1023 } else { clipped_v & 1023 };
        if self.bg_layer[0].mosaic_enabled && self.mosaic_size > 1 {
            y -= (y - self.mosaic_start_line as i32) % self.mosaic_size as i32;
        }
        let ry = if self.mode7_y_flip { (255 - y) as u8 } else { y as u8 };
        self.mode7_start_x = ((self.mode7_matrix[0] as i32 * clipped_h) & !63)
            + ((self.mode7_matrix[1] as i32 * ry as i32) & !63)
            + ((self.mode7_matrix[1] as i32 * clipped_v) & !63)
            + (x_center << 8);
        self.mode7_start_y = ((self.mode7_matrix[2] as i32 * clipped_h) & !63)
            + ((self.mode7_matrix[3] as i32 * ry as i32) & !63)
            + ((self.mode7_matrix[3] as i32 * clipped_v) & !63)
            + (y_center << 8);
    }

    fn get_pixel_for_mode7(&self, x: i32, layer: usize, priority: bool) -> i32 {
        let rx = if self.mode7_x_flip { 255 - x } else { x };
        let x_pos = (self.mode7_start_x + self.mode7_matrix[0] as i32 * rx) >> 8;
        let y_pos = (self.mode7_start_y + self.mode7_matrix[2] as i32 * rx) >> 8;

        let mut outside_map = !(0..1024).contains(&x_pos) || !(0..1024).contains(&y_pos);
        let x_pos = x_pos & 0x3ff;
        let y_pos = y_pos & 0x3ff;
        if !self.mode7_large_field {
            outside_map = false;
        }
        let tile = if outside_map {
            0
        } else {
            (self.vram[((y_pos >> 3) * 128 + (x_pos >> 3)) as usize] & 0xff) as i32
        };
        let pixel = if outside_map && !self.mode7_char_fill {
            0
        } else {
            (self.vram[(tile * 64 + (y_pos & 7) * 8 + (x_pos & 7)) as usize] >> 8) as i32
        };
        if layer == 1 {
            if ((pixel & 0x80) > 0) != priority {
                return 0;
            }
            return pixel & 0x7f;
        }
        pixel
    }

    fn get_window_state(&self, layer: usize, x: i32) -> bool {
        let w = &self.window_layer[layer];
        if !w.window1_enabled && !w.window2_enabled {
            return false;
        }
        if w.window1_enabled && !w.window2_enabled {
            let test = x >= self.window1_left as i32 && x <= self.window1_right as i32;
            return if w.window1_inversed { !test } else { test };
        }
        if !w.window1_enabled && w.window2_enabled {
            let test = x >= self.window2_left as i32 && x <= self.window2_right as i32;
            return if w.window2_inversed { !test } else { test };
        }
        let mut test1 = x >= self.window1_left as i32 && x <= self.window1_right as i32;
        let mut test2 = x >= self.window2_left as i32 && x <= self.window2_right as i32;
        if w.window1_inversed {
            test1 = !test1;
        }
        if w.window2_inversed {
            test2 = !test2;
        }
        match w.mask_logic {
            0 => test1 || test2,
            1 => test1 && test2,
            2 => test1 != test2,
            3 => test1 == test2,
            _ => false,
        }
    }

    fn evaluate_sprites(&mut self, line: i32) {
        let mut index: u8 = if self.obj_priority { self.oam_addr & 0xfe } else { 0 };

        let mut sprites_found = 0;
        let mut tiles_found = 0;
        for _ in 0..128 {
            let y = (self.oam[index as usize] >> 8) as u8;
            let mut row = (line as u8).wrapping_sub(y);
            let sprite_size = SPRITE_SIZES[self.obj_size as usize]
                [((self.high_oam[(index >> 3) as usize] >> ((index & 7) + 1)) & 1) as usize];
            let sprite_height = if self.obj_interlace { sprite_size / 2 } else { sprite_size };
            if (row as i32) < sprite_height {
                let mut x = (self.oam[index as usize] & 0xff) as i32;
                x |= (((self.high_oam[(index >> 3) as usize] as i32) >> (index as i32 & 7)) & 1) << 8;
                if x > 255 {
                    x -= 512;
                }
                if x > -sprite_size {
                    sprites_found += 1;
                    if sprites_found > 32 {
                        self.range_over = true;
                    }
                    if self.obj_interlace {
                        row = if self.even_frame { row * 2 + 1 } else { row * 2 };
                    }
                    let tile = (self.oam[index as usize + 1] & 0xff) as i32;
                    let palette = ((self.oam[index as usize + 1] & 0xe00) >> 9) as i32;
                    let h_flipped = self.oam[index as usize + 1] & 0x4000 != 0;
                    if self.oam[index as usize + 1] & 0x8000 != 0 {
                        row = (sprite_size - 1 - row as i32) as u8;
                    }
                    let mut col = 0;
                    while col < sprite_size {
                        if col + x > -8 && col + x < 256 {
                            tiles_found += 1;
                            if tiles_found > 34 {
                                self.time_over = true;
                            }
                            let used_col = if h_flipped { sprite_size - 1 - col } else { col };
                            let used_tile = ((((tile >> 4) + (row as i32 / 8)) << 4)
                                | (((tile & 0xf) + (used_col / 8)) & 0xf))
                                as u8;
                            let obj_adr = if self.oam[index as usize + 1] & 0x100 != 0 {
                                self.obj_tile_addr2
                            } else {
                                self.obj_tile_addr1
                            };
                            let plane1 = self.vram
                                [((obj_adr as i32 + used_tile as i32 * 16 + (row as i32 & 0x7)) & 0x7fff) as usize]
                                as i32;
                            let plane2 = self.vram
                                [((obj_adr as i32 + used_tile as i32 * 16 + 8 + (row as i32 & 0x7)) & 0x7fff) as usize]
                                as i32;
                            for px in 0..8 {
                                let shift = if h_flipped { px } else { 7 - px };
                                let mut pixel = (plane1 >> shift) & 1;
                                pixel |= ((plane1 >> (8 + shift)) & 1) << 1;
                                pixel |= ((plane2 >> shift) & 1) << 2;
                                pixel |= ((plane2 >> (8 + shift)) & 1) << 3;
                                let screen_col = col + x + px;
                                if pixel > 0
                                    && (0..256).contains(&screen_col)
                                    && self.obj_pixel_buffer[screen_col as usize] == 0
                                {
                                    self.obj_pixel_buffer[screen_col as usize] = (0x80 + 16 * palette + pixel) as u8;
                                    self.obj_priority_buffer[screen_col as usize] =
                                        ((self.oam[index as usize + 1] & 0x3000) >> 12) as u8;
                                }
                            }
                        }
                        col += 8;
                    }
                }
            }
            index = index.wrapping_add(2);
        }
    }

    fn get_vram_remap(&self) -> u16 {
        let adr = self.vram_pointer;
        match self.vram_remap_mode {
            0 => adr,
            1 => (adr & 0xff00) | ((adr & 0xe0) >> 5) | ((adr & 0x1f) << 3),
            2 => (adr & 0xfe00) | ((adr & 0x1c0) >> 6) | ((adr & 0x3f) << 3),
            3 => (adr & 0xfc00) | ((adr & 0x380) >> 7) | ((adr & 0x7f) << 3),
            _ => adr,
        }
    }

    /// `h_pos`/`v_pos` are the scheduler's current dot position (for the
    /// H/V-counter latch at `0x37`); `open_bus` is the scheduler's last-driven
    /// byte for unmapped registers.
    pub fn read(&mut self, addr: u8, h_pos: u16, v_pos: u16, open_bus: u8) -> u8 {
        match addr {
            0x04 | 0x14 | 0x24 | 0x05 | 0x15 | 0x25 | 0x06 | 0x16 | 0x26 | 0x08 | 0x18 | 0x28 | 0x09 | 0x19 | 0x29
            | 0x0a | 0x1a | 0x2a => self.ppu1_open_bus,
            0x34 | 0x35 | 0x36 => {
                let result = self.mode7_matrix[0] as i32 * (self.mode7_matrix[1] as i32 >> 8);
                self.ppu1_open_bus = ((result >> (8 * (addr as i32 - 0x34))) & 0xff) as u8;
                self.ppu1_open_bus
            }
            0x37 => {
                self.h_count = h_pos / 4;
                self.v_count = v_pos;
                self.counters_latched = true;
                open_bus
            }
            0x38 => {
                let mut ret = 0u8;
                if self.oam_in_high {
                    ret = if self.oam_second_write {
                        self.high_oam[(((self.oam_addr & 0xf) << 1) | 1) as usize]
                    } else {
                        self.high_oam[((self.oam_addr & 0xf) << 1) as usize]
                    };
                    if self.oam_second_write {
                        self.oam_addr = self.oam_addr.wrapping_add(1);
                        if self.oam_addr == 0 {
                            self.oam_in_high = false;
                        }
                    }
                } else {
                    if !self.oam_second_write {
                        ret = (self.oam[self.oam_addr as usize] & 0xff) as u8;
                    } else {
                        ret = (self.oam[self.oam_addr as usize] >> 8) as u8;
                        self.oam_addr = self.oam_addr.wrapping_add(1);
                        if self.oam_addr == 0 {
                            self.oam_in_high = true;
                        }
                    }
                }
                self.oam_second_write = !self.oam_second_write;
                self.ppu1_open_bus = ret;
                ret
            }
            0x39 => {
                let val = self.vram_read_buffer;
                if !self.vram_increment_on_high {
                    self.vram_read_buffer = self.vram[(self.get_vram_remap() & 0x7fff) as usize];
                    self.vram_pointer = self.vram_pointer.wrapping_add(self.vram_increment);
                }
                self.ppu1_open_bus = (val & 0xff) as u8;
                self.ppu1_open_bus
            }
            0x3a => {
                let val = self.vram_read_buffer;
                if self.vram_increment_on_high {
                    self.vram_read_buffer = self.vram[(self.get_vram_remap() & 0x7fff) as usize];
                    self.vram_pointer = self.vram_pointer.wrapping_add(self.vram_increment);
                }
                self.ppu1_open_bus = (val >> 8) as u8;
                self.ppu1_open_bus
            }
            0x3b => {
                let ret = if !self.cgram_second_write {
                    (self.cgram[self.cgram_pointer as usize] & 0xff) as u8
                } else {
                    let r = (((self.cgram[self.cgram_pointer as usize] >> 8) & 0x7f) | (self.ppu2_open_bus as u16 & 0x80))
                        as u8;
                    self.cgram_pointer = self.cgram_pointer.wrapping_add(1);
                    r
                };
                self.cgram_second_write = !self.cgram_second_write;
                self.ppu2_open_bus = ret;
                ret
            }
            0x3c => {
                let val = if self.h_count_second {
                    (((self.h_count >> 8) & 1) | (self.ppu2_open_bus as u16 & 0xfe)) as u8
                } else {
                    (self.h_count & 0xff) as u8
                };
                self.h_count_second = !self.h_count_second;
                self.ppu2_open_bus = val;
                val
            }
            0x3d => {
                let val = if self.v_count_second {
                    (((self.v_count >> 8) & 1) | (self.ppu2_open_bus as u16 & 0xfe)) as u8
                } else {
                    (self.v_count & 0xff) as u8
                };
                self.v_count_second = !self.v_count_second;
                self.ppu2_open_bus = val;
                val
            }
            0x3e => {
                let mut val = 0x1u8;
                val |= self.ppu1_open_bus & 0x10;
                if self.range_over {
                    val |= 1 << 6;
                }
                if self.time_over {
                    val |= 1 << 7;
                }
                self.ppu1_open_bus = val;
                val
            }
            0x3f => {
                let mut val = 0x3u8;
                val |= self.ppu2_open_bus & 0x20;
                if self.counters_latched {
                    val |= 1 << 6;
                }
                if self.even_frame {
                    val |= 1 << 7;
                }
                self.counters_latched = false;
                self.h_count_second = false;
                self.v_count_second = false;
                self.ppu2_open_bus = val;
                val
            }
            _ => open_bus,
        }
    }

    pub fn write(&mut self, addr: u8, value: u8, v_pos: u16) {
        match addr {
            0x00 => {
                self.brightness = value & 0xf;
                self.forced_blank = value & 0x80 != 0;
            }
            0x01 => {
                self.obj_size = value >> 5;
                self.obj_tile_addr1 = ((value as u16) & 7) << 13;
                self.obj_tile_addr2 = self.obj_tile_addr1 + ((((value as u16) & 0x18) + 8) << 9);
            }
            0x02 => {
                self.oam_addr = value;
                self.oam_addr_written = self.oam_addr;
                self.oam_in_high = self.oam_in_high_written;
                self.oam_second_write = false;
            }
            0x03 => {
                self.obj_priority = value & 0x80 != 0;
                self.oam_in_high = value & 1 != 0;
                self.oam_in_high_written = self.oam_in_high;
                self.oam_addr = self.oam_addr_written;
                self.oam_second_write = false;
            }
            0x04 => {
                if self.oam_in_high {
                    if self.oam_second_write {
                        self.high_oam[(((self.oam_addr & 0xf) << 1) | 1) as usize] = value;
                    } else {
                        self.high_oam[((self.oam_addr & 0xf) << 1) as usize] = value;
                    }
                    if self.oam_second_write {
                        self.oam_addr = self.oam_addr.wrapping_add(1);
                        if self.oam_addr == 0 {
                            self.oam_in_high = false;
                        }
                    }
                } else {
                    if !self.oam_second_write {
                        self.oam_buffer = value;
                    } else {
                        self.oam[self.oam_addr as usize] = ((value as u16) << 8) | self.oam_buffer as u16;
                        self.oam_addr = self.oam_addr.wrapping_add(1);
                        if self.oam_addr == 0 {
                            self.oam_in_high = true;
                        }
                    }
                }
                self.oam_second_write = !self.oam_second_write;
            }
            0x05 => {
                self.mode = value & 0x7;
                self.bg3_priority = value & 0x8 != 0;
                self.bg_layer[0].big_tiles = value & 0x10 != 0;
                self.bg_layer[1].big_tiles = value & 0x20 != 0;
                self.bg_layer[2].big_tiles = value & 0x40 != 0;
                self.bg_layer[3].big_tiles = value & 0x80 != 0;
            }
            0x06 => {
                self.bg_layer[0].mosaic_enabled = value & 0x1 != 0;
                self.bg_layer[1].mosaic_enabled = value & 0x2 != 0;
                self.bg_layer[2].mosaic_enabled = value & 0x4 != 0;
                self.bg_layer[3].mosaic_enabled = value & 0x8 != 0;
                self.mosaic_size = (value >> 4) + 1;
                self.mosaic_start_line = v_pos as u8;
            }
            0x07..=0x0a => {
                let l = (addr - 7) as usize;
                self.bg_layer[l].tilemap_wider = value & 0x1 != 0;
                self.bg_layer[l].tilemap_higher = value & 0x2 != 0;
                self.bg_layer[l].tilemap_addr = ((value as u16) & 0xfc) << 8;
            }
            0x0b => {
                self.bg_layer[0].tile_addr = ((value as u16) & 0xf) << 12;
                self.bg_layer[1].tile_addr = ((value as u16) & 0xf0) << 8;
            }
            0x0c => {
                self.bg_layer[2].tile_addr = ((value as u16) & 0xf) << 12;
                self.bg_layer[3].tile_addr = ((value as u16) & 0xf0) << 8;
            }
            0x0d => {
                self.mode7_matrix[6] = (((value as i16) << 8) | self.mode7_prev as i16) & 0x1fff;
                self.mode7_prev = value;
                let l = ((addr - 0xd) / 2) as usize;
                self.bg_layer[l].h_scroll =
                    (((value as u16) << 8) | (self.scroll_prev as u16 & 0xf8) | (self.scroll_prev2 as u16 & 0x7)) & 0x3ff;
                self.scroll_prev = value;
                self.scroll_prev2 = value;
            }
            0x0f | 0x11 | 0x13 => {
                let l = ((addr - 0xd) / 2) as usize;
                self.bg_layer[l].h_scroll =
                    (((value as u16) << 8) | (self.scroll_prev as u16 & 0xf8) | (self.scroll_prev2 as u16 & 0x7)) & 0x3ff;
                self.scroll_prev = value;
                self.scroll_prev2 = value;
            }
            0x0e => {
                self.mode7_matrix[7] = (((value as i16) << 8) | self.mode7_prev as i16) & 0x1fff;
                self.mode7_prev = value;
                let l = ((addr - 0xe) / 2) as usize;
                self.bg_layer[l].v_scroll = (((value as u16) << 8) | self.scroll_prev as u16) & 0x3ff;
                self.scroll_prev = value;
            }
            0x10 | 0x12 | 0x14 => {
                let l = ((addr - 0xe) / 2) as usize;
                self.bg_layer[l].v_scroll = (((value as u16) << 8) | self.scroll_prev as u16) & 0x3ff;
                self.scroll_prev = value;
            }
            0x15 => {
                self.vram_increment = match value & 3 {
                    0 => 1,
                    1 => 32,
                    _ => 128,
                };
                self.vram_remap_mode = (value & 0xc) >> 2;
                self.vram_increment_on_high = value & 0x80 != 0;
            }
            0x16 => {
                self.vram_pointer = (self.vram_pointer & 0xff00) | value as u16;
                self.vram_read_buffer = self.vram[(self.get_vram_remap() & 0x7fff) as usize];
            }
            0x17 => {
                self.vram_pointer = (self.vram_pointer & 0x00ff) | ((value as u16) << 8);
                self.vram_read_buffer = self.vram[(self.get_vram_remap() & 0x7fff) as usize];
            }
            0x18 => {
                let vram_adr = self.get_vram_remap();
                let slot = &mut self.vram[(vram_adr & 0x7fff) as usize];
                *slot = (*slot & 0xff00) | value as u16;
                if !self.vram_increment_on_high {
                    self.vram_pointer = self.vram_pointer.wrapping_add(self.vram_increment);
                }
            }
            0x19 => {
                let vram_adr = self.get_vram_remap();
                let slot = &mut self.vram[(vram_adr & 0x7fff) as usize];
                *slot = (*slot & 0x00ff) | ((value as u16) << 8);
                if self.vram_increment_on_high {
                    self.vram_pointer = self.vram_pointer.wrapping_add(self.vram_increment);
                }
            }
            0x1a => {
                self.mode7_large_field = value & 0x80 != 0;
                self.mode7_char_fill = value & 0x40 != 0;
                self.mode7_y_flip = value & 0x2 != 0;
                self.mode7_x_flip = value & 0x1 != 0;
            }
            0x1b..=0x1e => {
                self.mode7_matrix[(addr - 0x1b) as usize] = ((value as i16) << 8) | self.mode7_prev as i16;
                self.mode7_prev = value;
            }
            0x1f | 0x20 => {
                self.mode7_matrix[(addr - 0x1b) as usize] = (((value as i16) << 8) | self.mode7_prev as i16) & 0x1fff;
                self.mode7_prev = value;
            }
            0x21 => {
                self.cgram_pointer = value;
                self.cgram_second_write = false;
            }
            0x22 => {
                if !self.cgram_second_write {
                    self.cgram_buffer = value;
                } else {
                    self.cgram[self.cgram_pointer as usize] = ((value as u16) << 8) | self.cgram_buffer as u16;
                    self.cgram_pointer = self.cgram_pointer.wrapping_add(1);
                }
                self.cgram_second_write = !self.cgram_second_write;
            }
            0x23..=0x25 => {
                let base = ((addr - 0x23) * 2) as usize;
                self.window_layer[base].window1_inversed = value & 0x1 != 0;
                self.window_layer[base].window1_enabled = value & 0x2 != 0;
                self.window_layer[base].window2_inversed = value & 0x4 != 0;
                self.window_layer[base].window2_enabled = value & 0x8 != 0;
                self.window_layer[base + 1].window1_inversed = value & 0x10 != 0;
                self.window_layer[base + 1].window1_enabled = value & 0x20 != 0;
                self.window_layer[base + 1].window2_inversed = value & 0x40 != 0;
                self.window_layer[base + 1].window2_enabled = value & 0x80 != 0;
            }
            0x26 => self.window1_left = value,
            0x27 => self.window1_right = value,
            0x28 => self.window2_left = value,
            0x29 => self.window2_right = value,
            0x2a => {
                self.window_layer[0].mask_logic = value & 0x3;
                self.window_layer[1].mask_logic = (value >> 2) & 0x3;
                self.window_layer[2].mask_logic = (value >> 4) & 0x3;
                self.window_layer[3].mask_logic = (value >> 6) & 0x3;
            }
            0x2b => {
                self.window_layer[4].mask_logic = value & 0x3;
                self.window_layer[5].mask_logic = (value >> 2) & 0x3;
            }
            0x2c => {
                for i in 0..5 {
                    self.layer[i].main_screen_enabled = value & (1 << i) != 0;
                }
            }
            0x2d => {
                for i in 0..5 {
                    self.layer[i].sub_screen_enabled = value & (1 << i) != 0;
                }
            }
            0x2e => {
                for i in 0..5 {
                    self.layer[i].main_screen_windowed = value & (1 << i) != 0;
                }
            }
            0x2f => {
                for i in 0..5 {
                    self.layer[i].sub_screen_windowed = value & (1 << i) != 0;
                }
            }
            0x30 => {
                self.direct_color = value & 0x1 != 0;
                self.add_subscreen = value & 0x2 != 0;
                self.prevent_math_mode = (value & 0x30) >> 4;
                self.clip_mode = (value & 0xc0) >> 6;
            }
            0x31 => {
                self.subtract_color = value & 0x80 != 0;
                self.half_color = value & 0x40 != 0;
                for i in 0..6 {
                    self.math_enabled[i] = value & (1 << i) != 0;
                }
            }
            0x32 => {
                if value & 0x80 != 0 {
                    self.fixed_color_b = value & 0x1f;
                }
                if value & 0x40 != 0 {
                    self.fixed_color_g = value & 0x1f;
                }
                if value & 0x20 != 0 {
                    self.fixed_color_r = value & 0x1f;
                }
            }
            0x33 => {
                self.interlace = value & 0x1 != 0;
                self.obj_interlace = value & 0x2 != 0;
                self.overscan = value & 0x4 != 0;
                self.pseudo_hires = value & 0x8 != 0;
                self.mode7_ext_bg = value & 0x40 != 0;
            }
            _ => {}
        }
    }

    /// Assembles the double-buffered internal pixel store into a final
    /// `RGBX8888` frame (512x478, even/odd halves interleaved per line).
    pub fn put_pixels(&self, pixels: &mut [u8]) {
        let max_y = if self.frame_overscan { 239 } else { 224 };

        for y in 0..max_y {
            let dest = if self.frame_overscan { y * 2 + 2 } else { y * 2 + 16 };
            let (mut y1, mut y2) = (y, y + 239);
            if !self.frame_interlace {
                y1 = if self.even_frame { y } else { y + 239 };
                y2 = y1;
            }

            let size = 2048;
            let pixels_base = dest * 2048;
            let pixel_buffer_base = y1 * 2048;
            pixels[pixels_base..pixels_base + size]
                .copy_from_slice(&self.pixel_buffer[pixel_buffer_base..pixel_buffer_base + size]);
            let pixels_base = (dest + 1) * 2048;
            let pixel_buffer_base = y2 * 2048;
            pixels[pixels_base..pixels_base + size]
                .copy_from_slice(&self.pixel_buffer[pixel_buffer_base..pixel_buffer_base + size]);
        }

        for b in pixels.iter_mut().take(2048 * 2) {
            *b = 0;
        }
        if !self.overscan {
            for b in pixels.iter_mut().take(2048 * 14).skip(2 * 2048) {
                *b = 0;
            }
            for b in pixels.iter_mut().take(2048 * 16).skip(464 * 2048) {
                *b = 0;
            }
        }
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
