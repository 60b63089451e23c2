// World walker and rasterizers.  A render pass reads the chip state
// immutably and writes pen indices into the caller's surface; it never
// touches the framebuffer planes (the host CPU owns those) and never
// writes control state.

use super::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
enum WorldMode {
    Normal,
    HBias,
    Affine,
    Object,
}

/// One decoded 16-word world descriptor.
///
/// Word 0 layout:
///   x--- ---- ---- ----  LON
///   -x-- ---- ---- ----  RON
///   --xx ---- ---- ----  mode
///   ---- xx-- ---- ----  SCX
///   ---- --xx ---- ----  SCY
///   ---- ---- x--- ----  OVR
///   ---- ---- -x-- ----  END
///   ---- ---- ---- xxxx  BGMAP_BASE
#[derive(Clone, Copy)]
struct WorldAttr {
    lon: bool,
    ron: bool,
    mode: WorldMode,
    scx_tiles: u16,
    scy_tiles: u16,
    ovr: bool,
    end: bool,
    bgmap_base: usize,
    gx: i16,
    gp: i16,
    gy: i16,
    mx: i16,
    mp: i16,
    my: i16,
    w: u16,
    h: u16,
    param_base: u16,
    ovr_char: u16,
}

impl WorldAttr {
    fn decode(vip: &Vip, index: usize) -> Self {
        let base = index << 4;
        let def = vip.read_world(base);
        Self {
            lon: def & 0x8000 != 0,
            ron: def & 0x4000 != 0,
            mode: match (def >> 12) & 3 {
                0 => WorldMode::Normal,
                1 => WorldMode::HBias,
                2 => WorldMode::Affine,
                _ => WorldMode::Object,
            },
            scx_tiles: 64 << ((def >> 10) & 3),
            scy_tiles: 64 << ((def >> 8) & 3),
            ovr: def & 0x0080 != 0,
            end: def & 0x0040 != 0,
            bgmap_base: (def & 0x000F) as usize,
            gx: vip.read_world(base + 1) as i16,
            gp: vip.read_world(base + 2) as i16,
            gy: vip.read_world(base + 3) as i16,
            mx: vip.read_world(base + 4) as i16,
            mp: vip.read_world(base + 5) as i16,
            my: vip.read_world(base + 6) as i16,
            w: vip.read_world(base + 7),
            h: vip.read_world(base + 8),
            param_base: vip.read_world(base + 9) & 0xFFF0,
            ovr_char: vip.read_bgmap(vip.read_world(base + 10) as usize),
        }
    }

    fn eye_enabled(&self, right: bool) -> bool {
        if right {
            self.ron
        } else {
            self.lon
        }
    }
}

/// Render even while DISP is off (debug aid for probing display lists).
#[inline]
fn env_force_display_on() -> bool {
    use std::sync::OnceLock;
    static V: OnceLock<bool> = OnceLock::new();
    *V.get_or_init(|| std::env::var("VB_FORCE_DISPLAY_ON").is_ok())
}

impl Vip {
    /// One full display pass for one eye: backdrop fill, then the 32
    /// worlds walked from 31 down to 0, so later (lower-numbered) worlds
    /// paint on top.
    pub fn render_eye(&self, eye: Eye, surface: &mut FrameSurface) {
        surface.fill((self.bkcol & 3) as u8);

        if self.dpctrl & DPCTRL_DISP == 0 && !env_force_display_on() {
            return;
        }

        let right = eye == Eye::Right;
        let mut cur_spt: i32 = 3;
        let mut ovr_tile = [None; 64];
        for index in (0..32).rev() {
            if self.display_world(index, surface, right, &mut cur_spt, &mut ovr_tile) {
                break;
            }
        }
    }

    /// Returns `true` when the world's END bit terminates the walk.
    fn display_world(
        &self,
        index: usize,
        surface: &mut FrameSurface,
        right: bool,
        cur_spt: &mut i32,
        ovr_tile: &mut [Option<u8>; 64],
    ) -> bool {
        let attr = WorldAttr::decode(self, index);
        if attr.end {
            return true;
        }

        match attr.mode {
            WorldMode::Normal | WorldMode::HBias | WorldMode::Affine => {
                if attr.ovr {
                    let pal = self.gplt[((attr.ovr_char >> 14) & 3) as usize] as u8;
                    self.fill_overflow_tile(attr.ovr_char & 0x3FFF, pal, ovr_tile);
                }
                if attr.eye_enabled(right) {
                    if attr.mode == WorldMode::Affine {
                        self.draw_affine(&attr, right, ovr_tile, surface);
                    } else {
                        self.draw_bgmap(&attr, right, ovr_tile, surface);
                    }
                }
            }
            WorldMode::Object => {
                if *cur_spt == -1 {
                    log::warn!("object world {index} walked with all four SPT groups consumed");
                    return false;
                }
                self.draw_object_group(*cur_spt as usize, right, surface);
                if attr.eye_enabled(right) {
                    *cur_spt -= 1;
                }
            }
        }

        false
    }

    /// Sample one background-map pixel.  `x`/`y` are pre-masked source
    /// coordinates; segment stepping reaches the extra map segments of
    /// worlds wider/taller than 64 tiles.  Colour 0 is transparent.
    pub(crate) fn sample_bgmap_pixel(&self, segment: usize, x: usize, y: usize) -> Option<u8> {
        let cx = x >> 3;
        let cy = y >> 3;
        let stepx = (cx >> 6) & 7;
        let stepy = ((cy >> 6) & 7) * (stepx + 1);
        let entry = self.read_bgmap((cx & 0x3F) + 64 * (cy & 0x3F) + (segment + stepx + stepy) * 0x1000);
        let pal = self.gplt[((entry >> 14) & 3) as usize] as u8;
        // The low 14 bits carry the tile number plus its flip bits; the
        // flips land on the font's high address bits (see write_char).
        let code = (entry & 0x3FFF) as usize;

        let row = self.read_font(code * 8 + (y & 7));
        let dat = ((row >> ((x & 7) << 1)) & 3) as u8;
        if dat == 0 {
            None
        } else {
            Some((pal >> (dat * 2)) & 3)
        }
    }

    /// Pre-rasterize the world's single overflow tile into a 64-entry
    /// scratch grid (`None` = transparent).
    fn fill_overflow_tile(&self, code: u16, pal: u8, out: &mut [Option<u8>; 64]) {
        for yi in 0..8usize {
            let row = self.read_font(code as usize * 8 + yi);
            for xi in 0..8usize {
                let dat = ((row >> (xi << 1)) & 3) as u8;
                out[yi * 8 + xi] = if dat == 0 {
                    None
                } else {
                    Some((pal >> (dat * 2)) & 3)
                };
            }
        }
    }

    #[inline]
    fn sample_world_pixel(
        &self,
        attr: &WorldAttr,
        src_x: i32,
        src_y: i32,
        x_mask: i32,
        y_mask: i32,
        ovr_tile: &[Option<u8>; 64],
    ) -> Option<u8> {
        if attr.ovr && (src_x > x_mask || src_y > y_mask || src_x < 0 || src_y < 0) {
            ovr_tile[((src_y & 7) * 8 + (src_x & 7)) as usize]
        } else {
            self.sample_bgmap_pixel(
                attr.bgmap_base,
                (src_x & x_mask) as usize,
                (src_y & y_mask) as usize,
            )
        }
    }

    /// Normal and HBias worlds.  HBias adds a per-row horizontal shift
    /// from the parameter table (one entry per row per eye).
    fn draw_bgmap(
        &self,
        attr: &WorldAttr,
        right: bool,
        ovr_tile: &[Option<u8>; 64],
        surface: &mut FrameSurface,
    ) {
        let x_mask = attr.scx_tiles as i32 * 8 - 1;
        let y_mask = attr.scy_tiles as i32 * 8 - 1;
        let hbias = attr.mode == WorldMode::HBias;
        let clip = surface.clip();

        for y in 0..=attr.h as i32 {
            let y1 = y + attr.gy as i32;
            if y1 < clip.min_y || y1 > clip.max_y {
                continue;
            }

            let src_y = y + attr.my as i32;

            for x in 0..=attr.w as i32 {
                let mut x1 = x + attr.gx as i32;
                x1 += if right { -(attr.gp as i32) } else { attr.gp as i32 };
                if x1 < clip.min_x || x1 > clip.max_x {
                    continue;
                }

                let mut src_x = x + attr.mx as i32;
                if hbias {
                    let shift_index =
                        attr.param_base as usize + y as usize * 2 + if right { 0 } else { 1 };
                    src_x += self.read_bgmap(shift_index) as i16 as i32;
                }
                src_x += if right { -(attr.mp as i32) } else { attr.mp as i32 };

                if let Some(pen) = self.sample_world_pixel(attr, src_x, src_y, x_mask, y_mask, ovr_tile)
                {
                    surface.set_pixel(x1, y1, pen);
                }
            }
        }
    }

    /// Affine worlds: per-row skew/parallax in 13.3 fixed point and
    /// per-row x/y scale in 7.9 fixed point.
    fn draw_affine(
        &self,
        attr: &WorldAttr,
        right: bool,
        ovr_tile: &[Option<u8>; 64],
        surface: &mut FrameSurface,
    ) {
        let x_mask = attr.scx_tiles as i32 * 8 - 1;
        let y_mask = attr.scy_tiles as i32 * 8 - 1;

        for y in 0..=attr.h as i32 {
            let params = attr.param_base as usize + y as usize * 8;
            let mut h_skw = self.read_bgmap(params) as i16 as f32 / 8.0;
            let prlx = self.read_bgmap(params + 1) as i16 as f32 / 8.0;
            let v_skw = self.read_bgmap(params + 2) as i16 as f32 / 8.0;
            let h_scl = self.read_bgmap(params + 3) as i16 as f32 / 512.0;
            let v_scl = self.read_bgmap(params + 4) as i16 as f32 / 512.0;

            h_skw += if right { -prlx } else { prlx };

            let y1 = y + attr.gy as i32;
            for x in 0..=attr.w as i32 {
                let mut x1 = x + attr.gx as i32;
                x1 += if right { -(attr.gp as i32) } else { attr.gp as i32 };

                let src_x = (h_skw + h_scl * x as f32).floor() as i32;
                let src_y = (v_skw + v_scl * x as f32).floor() as i32;

                if let Some(pen) = self.sample_world_pixel(attr, src_x, src_y, x_mask, y_mask, ovr_tile)
                {
                    surface.set_pixel(x1, y1, pen);
                }
            }
        }
    }

    /// Walk one object group from SPT[group] down to the previous cursor
    /// (exclusive), indices wrapping modulo 1024.  Per-object LON/RON
    /// bits gate each eye independently of the world's own enables.
    fn draw_object_group(&self, group: usize, right: bool, surface: &mut FrameSurface) {
        let start = (self.spt[group] & 0x3FF) as usize;
        let end = if group == 0 {
            0x3FF
        } else {
            (self.spt[group - 1] & 0x3FF) as usize
        };

        let mut i = start;
        loop {
            let base = i * 4;
            let jx = self.read_objects(base) as i16 as i32;
            let word1 = self.read_objects(base + 1);
            let jp = (word1 & 0x3FFF) as i32;
            let jy = (self.read_objects(base + 2) & 0x1FF) as i32;
            let val = self.read_objects(base + 3);
            let pal = self.jplt[((val >> 14) & 3) as usize] as u8;
            let code = val & 0x3FFF;

            if !right && word1 & 0x8000 != 0 {
                self.put_object(surface, (jx - jp) & 0x1FF, jy, code, pal);
            }
            if right && word1 & 0x4000 != 0 {
                self.put_object(surface, (jx + jp) & 0x1FF, jy, code, pal);
            }

            i = i.wrapping_sub(1) & 0x3FF;
            if i == end {
                break;
            }
        }
    }

    /// Draw one 8x8 object.  Coordinates arrive already wrapped to the
    /// 512-pixel object space; the clip rectangle culls the rest.
    fn put_object(&self, surface: &mut FrameSurface, x: i32, y: i32, code: u16, pal: u8) {
        for yi in 0..8i32 {
            let row = self.read_font(code as usize * 8 + yi as usize);
            for xi in 0..8i32 {
                let dat = ((row >> ((xi as u16) << 1)) & 3) as u8;
                if dat != 0 {
                    surface.set_pixel(x + xi, y + yi, (pal >> (dat * 2)) & 3);
                }
            }
        }
    }
}
