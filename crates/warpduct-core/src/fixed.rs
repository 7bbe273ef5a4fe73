use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of simulation time.
pub type Ticks = u64;

/// Cargo progress at the center of a segment (the routing decision point).
pub const CENTER: Fixed64 = Fixed64::from_bits(1 << 31);

/// Cargo progress at the far end of a segment (transfer attempt).
pub const END: Fixed64 = Fixed64::ONE;

/// Convert an f64 to Fixed64. Use only for initialization, never in the sim loop.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Convert Fixed64 to f64. Use only for display, never in the sim loop.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn center_is_half() {
        assert_eq!(fixed64_to_f64(CENTER), 0.5);
    }

    #[test]
    fn end_is_one() {
        assert_eq!(fixed64_to_f64(END), 1.0);
    }

    #[test]
    fn fixed64_determinism() {
        let a = f64_to_fixed64(1.0 / 3.0);
        let b = f64_to_fixed64(1.0 / 3.0);
        assert_eq!(a, b);
        assert_eq!(a * f64_to_fixed64(3.0), b * f64_to_fixed64(3.0));
    }

    #[test]
    fn fixed64_ordering() {
        assert!(CENTER < END);
        assert!(Fixed64::ZERO < CENTER);
    }
}
