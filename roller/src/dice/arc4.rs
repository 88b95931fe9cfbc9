use rand::RngCore;

const WIDTH: usize = 256;
const MASK: usize = WIDTH - 1;
/// Bytes drawn for the initial 48-bit numerator.
const CHUNKS: u32 = 6;
/// 2^48
const START_DENOM: f64 = 281_474_976_710_656.0;
const SIGNIFICANCE: u64 = 1 << 52;
const OVERFLOW: u64 = 1 << 53;

/// ARC4 keystream generator keyed from a seed string.
///
/// Key mixing, the 256-byte keystream drop and the float construction in
/// [`Arc4::next_unit`] follow the `seedrandom` JavaScript library, so a
/// seed string yields the same sequence of draws here as in a browser
/// client using `seedrandom(seed)`.
#[derive(Clone)]
pub struct Arc4 {
    s: [u8; WIDTH],
    i: u8,
    j: u8,
}

impl Arc4 {
    pub fn from_seed_str(seed: &str) -> Self {
        Self::from_key(&mix_key(seed))
    }

    pub fn from_key(key: &[u8]) -> Self {
        let key: &[u8] = if key.is_empty() { &[0] } else { key };

        let mut s = [0u8; WIDTH];
        for (i, slot) in s.iter_mut().enumerate() {
            *slot = i as u8;
        }
        let mut j: u8 = 0;
        for i in 0..WIDTH {
            let t = s[i];
            j = j.wrapping_add(key[i % key.len()]).wrapping_add(t);
            s[i] = s[j as usize];
            s[j as usize] = t;
        }

        let mut rng = Self { s, i: 0, j: 0 };
        for _ in 0..WIDTH {
            rng.next_byte();
        }
        rng
    }

    fn next_byte(&mut self) -> u8 {
        self.i = self.i.wrapping_add(1);
        let t = self.s[self.i as usize];
        self.j = self.j.wrapping_add(t);
        self.s[self.i as usize] = self.s[self.j as usize];
        self.s[self.j as usize] = t;
        self.s[self.s[self.i as usize].wrapping_add(t) as usize]
    }

    /// Next `count` bytes as a big-endian integer. `count` must be at most 8.
    fn take(&mut self, count: u32) -> u64 {
        (0..count).fold(0u64, |acc, _| (acc << 8) | self.next_byte() as u64)
    }

    /// Uniform `f64` in `[0, 1)` with all 52 mantissa bits filled.
    pub fn next_unit(&mut self) -> f64 {
        let mut n = self.take(CHUNKS);
        let mut d = START_DENOM;
        let mut x: u64 = 0;
        while n < SIGNIFICANCE {
            n = (n + x) * WIDTH as u64;
            d *= WIDTH as f64;
            x = self.next_byte() as u64;
        }
        while n >= OVERFLOW {
            n /= 2;
            d /= 2.0;
            x >>= 1;
        }
        // n + x < 2^53 and d is a power of two, so the division is exact.
        (n + x) as f64 / d
    }
}

impl RngCore for Arc4 {
    fn next_u32(&mut self) -> u32 {
        self.take(4) as u32
    }

    fn next_u64(&mut self) -> u64 {
        self.take(8)
    }

    fn fill_bytes(&mut self, dst: &mut [u8]) {
        for byte in dst {
            *byte = self.next_byte();
        }
    }
}

/// Fold a seed string into an ARC4 key, one slot per UTF-16 code unit,
/// wrapping after 256 units.
fn mix_key(seed: &str) -> Vec<u8> {
    let mut key: Vec<u8> = Vec::new();
    let mut smear: u32 = 0;
    for (j, unit) in seed.encode_utf16().enumerate() {
        let slot = j & MASK;
        smear ^= key.get(slot).map_or(0, |&k| k as u32 * 19);
        let value = (smear.wrapping_add(unit as u32) & MASK as u32) as u8;
        if slot < key.len() {
            key[slot] = value;
        } else {
            key.push(value);
        }
    }
    key
}
