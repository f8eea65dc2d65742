use math::{
    ANG90, ANGLETOFINESHIFT, Angle, FINEANGLES, FRACBITS, FRACUNIT, Fixed, finecosine,
    finetangent, fixed_div, fixed_mul,
};

use crate::defs::{FIELDOFVIEW, LIGHTSCALESHIFT, ScreenSize};

/// Every table that depends on the screen size. Rebuilt only when the size
/// changes.
#[derive(Debug, Clone)]
pub struct ViewTables {
    pub size: ScreenSize,
    pub width: i32,
    pub height: i32,
    pub center_x: i32,
    pub center_y: i32,
    pub stretch: Fixed,
    pub stretch_width: Fixed,
    /// Fine angle (half resolution, offset by 90 degrees) to screen column
    pub viewangletox: Vec<i32>,
    /// Screen column to view relative angle, one past the right edge
    pub xtoviewangle: Vec<Angle>,
    /// Row to plane distance factor, 6.10
    pub yslope: Vec<u32>,
    /// Column to distance correction, 1.15
    pub distscale: Vec<u32>,
    /// Leftmost view angle
    pub clipangle: Angle,
    pub doubleclipangle: Angle,
    pub lightmins: Vec<i32>,
    pub lightsubs: Vec<i32>,
    pub lightcoefs: Vec<i32>,
    pub planelightcoef: Vec<i32>,
}

impl ViewTables {
    pub fn new(size: ScreenSize) -> Self {
        let width = size.width();
        let height = size.height();
        let center_x = width / 2;
        let center_y = height / 2;
        let stretch = size.stretch();
        let stretch_width = stretch * (width / 2);

        // Build the viewangletox table
        let focal = fixed_div(
            center_x << FRACBITS,
            finetangent(FINEANGLES / 4 + FIELDOFVIEW / 2),
        );
        let mut viewangletox: Vec<i32> = (0..FINEANGLES / 2)
            .step_by(2)
            .map(|i| {
                let tan = finetangent(i);
                if tan > FRACUNIT * 2 {
                    -1
                } else if tan < -FRACUNIT * 2 {
                    width + 1
                } else {
                    let t = fixed_mul(tan, focal);
                    let t = ((center_x << FRACBITS) - t + FRACUNIT - 1) >> FRACBITS;
                    t.clamp(-1, width + 1)
                }
            })
            .collect();

        // Using the viewangletox, create xtoviewangle table
        let xtoviewangle: Vec<Angle> = (0..=width)
            .map(|i| {
                let mut x = 0;
                while x < viewangletox.len() - 1 && viewangletox[x] > i {
                    x += 1;
                }
                Angle::new((x as u32) << (ANGLETOFINESHIFT + 1)) - ANG90
            })
            .collect();

        for t in viewangletox.iter_mut() {
            if *t == -1 {
                *t = 0;
            } else if *t == width + 1 {
                *t = width;
            }
        }

        let yslope = (0..height)
            .map(|i| {
                let j = ((i - height / 2) * FRACUNIT) + FRACUNIT / 2;
                let j = fixed_div(stretch_width, j.abs()) >> 6;
                j.min(0xFFFF) as u32
            })
            .collect();

        let distscale = (0..width as usize)
            .map(|i| {
                let cos = finecosine(xtoviewangle[i].fine()).abs().max(1);
                (fixed_div(FRACUNIT, cos) >> 1) as u32
            })
            .collect();

        let clipangle = xtoviewangle[0];

        let mut tables = Self {
            size,
            width,
            height,
            center_x,
            center_y,
            stretch,
            stretch_width,
            viewangletox,
            xtoviewangle,
            yslope,
            distscale,
            clipangle,
            doubleclipangle: clipangle.wrapping_mul(2),
            lightmins: Vec::with_capacity(256),
            lightsubs: Vec::with_capacity(256),
            lightcoefs: Vec::with_capacity(256),
            planelightcoef: Vec::with_capacity(256),
        };
        tables.init_light_tables();
        tables
    }

    /// Light falls off with distance faster on the larger screens
    fn init_light_tables(&mut self) {
        let w = self.width;
        for i in 0..256 {
            let min = i / 3;
            let range = i - min;
            self.lightmins.push(min);
            self.lightsubs.push((w * range) / (800 - w));
            self.lightcoefs.push((range << 16) / (800 - w));
            self.planelightcoef.push(range * (0x140000 / (800 - w)));
        }
    }

    /// Screen column for a view relative angle already clipped to the view
    #[inline]
    pub fn angle_to_x(&self, angle: Angle) -> i32 {
        let index = ((angle + ANG90).bam() >> (ANGLETOFINESHIFT + 1)) as usize;
        self.viewangletox[index.min(self.viewangletox.len() - 1)]
    }

    /// Diminished light for a wall column at `scale`, light levels under
    /// a third never get darker
    #[inline]
    pub fn wall_light(&self, light: u32, scale: i32) -> u32 {
        let l = light.min(255) as usize;
        let texturelight = ((scale * self.lightcoefs[l]) >> 16) - self.lightsubs[l];
        texturelight.clamp(self.lightmins[l], l as i32) as u32
    }

    /// Diminished light for a floor span `distance` away
    #[inline]
    pub fn plane_light(&self, light: u32, distance: u32) -> u32 {
        let l = light.min(255) as usize;
        let distance = distance.max(1) as i32;
        let texturelight = self.planelightcoef[l] / distance - self.lightsubs[l];
        texturelight.clamp(self.lightmins[l], l as i32) as u32
    }
}

/// Scale of a wall at one column.
///
/// Doom function name `ScaleFromGlobalAngle`. Both angles come in without
/// the 90 degree offset, so the sine lookups are cosines.
pub fn scale_from_global_angle(
    stretch_width: Fixed,
    rw_distance: Fixed,
    anglea: Angle,
    angleb: Angle,
) -> Fixed {
    let num = fixed_mul(stretch_width, finecosine(angleb.fine()));
    let den = fixed_mul(rw_distance, finecosine(anglea.fine()));
    if den > num >> 16 {
        let scale = fixed_div(num, den);
        if scale < 64 * FRACUNIT {
            return scale.max(256);
        }
    }
    64 * FRACUNIT
}

/// Multiplier applied to RGB for a 5.3 light value, where `max` is the
/// light value that means "full brightness" for the surface kind
#[inline]
pub fn light_multiplier(light: u32, max: u32) -> Fixed {
    let light = (light as i32) << (FRACBITS as u32 - LIGHTSCALESHIFT);
    fixed_div(light, (max as i32) << FRACBITS).min(FRACUNIT)
}

/// Darken a palette colour into an RGBA pixel
#[inline]
pub fn shade(colour: [u8; 3], multiplier: Fixed) -> [u8; 4] {
    let c = |v: u8| ((v as i32 * multiplier) >> FRACBITS) as u8;
    [c(colour[0]), c(colour[1]), c(colour[2]), 255]
}

/// Half brightness, the shadow sprite draw
#[inline]
pub fn shadow(pixel: [u8; 4]) -> [u8; 4] {
    [pixel[0] >> 1, pixel[1] >> 1, pixel[2] >> 1, pixel[3]]
}
