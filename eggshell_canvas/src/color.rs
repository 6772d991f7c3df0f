// The canvas color type.
//
// `Color` is an RGB triple that serializes as a `#RRGGBB` hex string — the
// same encoding the wire protocol and any web-ish frontend speak natively.
// An unpainted cell is represented as `Option<Color>::None` everywhere, not
// as a sentinel color.
//
// Two derived views matter to the rest of the system:
// - `hsv()` feeds the audio mapping (hue → frequency, value → gain).
// - `lerp()` blends in Oklab so the pattern generator's gradients don't
//   pass through muddy midpoints the way naive RGB mixing does. The sRGB ↔
//   Oklab conversion is closed-form (Ottosson's published matrices), so no
//   color-management crate is needed.

use std::fmt;
use std::str::FromStr;

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// An opaque paint color. Stored as 8-bit RGB, spoken as `#RRGGBB`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Color {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Color {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self { r, g, b }
    }

    /// Hue in `[0, 360)`, saturation and value in `[0, 1]`.
    ///
    /// Hue of a pure gray is reported as 0 (the usual convention).
    pub fn hsv(self) -> (f32, f32, f32) {
        let r = f32::from(self.r) / 255.0;
        let g = f32::from(self.g) / 255.0;
        let b = f32::from(self.b) / 255.0;
        let max = r.max(g).max(b);
        let min = r.min(g).min(b);
        let delta = max - min;

        let hue = if delta == 0.0 {
            0.0
        } else if max == r {
            60.0 * (((g - b) / delta).rem_euclid(6.0))
        } else if max == g {
            60.0 * ((b - r) / delta + 2.0)
        } else {
            60.0 * ((r - g) / delta + 4.0)
        };

        let saturation = if max == 0.0 { 0.0 } else { delta / max };
        (hue, saturation, max)
    }

    /// Linear interpolation between two colors in Oklab.
    ///
    /// `t = 0` yields `self`, `t = 1` yields `other`. `t` is clamped.
    pub fn lerp(self, other: Color, t: f32) -> Color {
        if t <= 0.0 {
            return self;
        }
        if t >= 1.0 {
            return other;
        }
        let a = self.to_oklab();
        let b = other.to_oklab();
        let mixed = [
            a[0] + (b[0] - a[0]) * t,
            a[1] + (b[1] - a[1]) * t,
            a[2] + (b[2] - a[2]) * t,
        ];
        Color::from_oklab(mixed)
    }

    fn to_oklab(self) -> [f32; 3] {
        let r = srgb_to_linear(f32::from(self.r) / 255.0);
        let g = srgb_to_linear(f32::from(self.g) / 255.0);
        let b = srgb_to_linear(f32::from(self.b) / 255.0);

        let l = (0.412_221_47 * r + 0.536_332_54 * g + 0.051_445_995 * b).cbrt();
        let m = (0.211_903_5 * r + 0.680_699_55 * g + 0.107_396_96 * b).cbrt();
        let s = (0.088_302_46 * r + 0.281_718_85 * g + 0.629_978_7 * b).cbrt();

        [
            0.210_454_26 * l + 0.793_617_8 * m - 0.004_072_047 * s,
            1.977_998_5 * l - 2.428_592_2 * m + 0.450_593_7 * s,
            0.025_904_037 * l + 0.782_771_77 * m - 0.808_675_77 * s,
        ]
    }

    fn from_oklab(lab: [f32; 3]) -> Color {
        let l = lab[0] + 0.396_337_78 * lab[1] + 0.215_803_76 * lab[2];
        let m = lab[0] - 0.105_561_346 * lab[1] - 0.063_854_17 * lab[2];
        let s = lab[0] - 0.089_484_18 * lab[1] - 1.291_485_5 * lab[2];

        let l = l * l * l;
        let m = m * m * m;
        let s = s * s * s;

        let r = 4.076_741_7 * l - 3.307_711_6 * m + 0.230_969_94 * s;
        let g = -1.268_438 * l + 2.609_757_4 * m - 0.341_319_38 * s;
        let b = -0.004_196_086 * l - 0.703_418_6 * m + 1.707_614_7 * s;

        Color {
            r: channel_to_u8(linear_to_srgb(r)),
            g: channel_to_u8(linear_to_srgb(g)),
            b: channel_to_u8(linear_to_srgb(b)),
        }
    }
}

fn srgb_to_linear(c: f32) -> f32 {
    if c <= 0.04045 {
        c / 12.92
    } else {
        ((c + 0.055) / 1.055).powf(2.4)
    }
}

fn linear_to_srgb(c: f32) -> f32 {
    if c <= 0.003_130_8 {
        12.92 * c
    } else {
        1.055 * c.powf(1.0 / 2.4) - 0.055
    }
}

#[expect(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn channel_to_u8(c: f32) -> u8 {
    (c.clamp(0.0, 1.0) * 255.0).round() as u8
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02X}{:02X}{:02X}", self.r, self.g, self.b)
    }
}

impl FromStr for Color {
    type Err = String;

    /// Parse a `#RRGGBB` hex string (case-insensitive, `#` required).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let hex = s
            .strip_prefix('#')
            .ok_or_else(|| format!("color must start with '#': {s:?}"))?;
        if hex.len() != 6 {
            return Err(format!("color must be 6 hex digits: {s:?}"));
        }
        let parse_pair = |range: std::ops::Range<usize>| {
            u8::from_str_radix(&hex[range], 16).map_err(|e| format!("bad hex in {s:?}: {e}"))
        };
        Ok(Color {
            r: parse_pair(0..2)?,
            g: parse_pair(2..4)?,
            b: parse_pair(4..6)?,
        })
    }
}

impl Serialize for Color {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Color {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        s.parse().map_err(D::Error::custom)
    }
}
