// Deterministic random source for base-color choice.
//
// The pattern generator is fully deterministic once its two base colors are
// fixed; the base colors themselves are the only random decision in the
// whole canvas. This is a trimmed xoshiro256++ (Blackman & Vigna, 2019) with
// SplitMix64 seeding — hand-rolled so the same seed yields the same pattern
// on every platform, with no external RNG crate.

/// Xoshiro256++ generator. Seeded explicitly; never reads OS entropy itself.
#[derive(Clone, Debug)]
pub struct CanvasRng {
    s: [u64; 4],
}

impl CanvasRng {
    /// Seed via SplitMix64 expansion of a single `u64`.
    pub fn new(seed: u64) -> Self {
        let mut sm = seed;
        let mut next = || {
            sm = sm.wrapping_add(0x9E37_79B9_7F4A_7C15);
            let mut z = sm;
            z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
            z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
            z ^ (z >> 31)
        };
        Self {
            s: [next(), next(), next(), next()],
        }
    }

    pub fn next_u64(&mut self) -> u64 {
        let result = (self.s[0].wrapping_add(self.s[3]))
            .rotate_left(23)
            .wrapping_add(self.s[0]);

        let t = self.s[1] << 17;
        self.s[2] ^= self.s[0];
        self.s[3] ^= self.s[1];
        self.s[1] ^= self.s[2];
        self.s[0] ^= self.s[3];
        self.s[2] ^= t;
        self.s[3] = self.s[3].rotate_left(45);

        result
    }

    /// One uniformly random color channel.
    #[expect(clippy::cast_possible_truncation)]
    pub fn next_channel(&mut self) -> u8 {
        (self.next_u64() >> 56) as u8
    }
}
