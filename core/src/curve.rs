//! Elliptic curve arithmetic over secp256k1.
//!
//! A single generic implementation is reused for key derivation, signing,
//! and verification. No attempt is made at constant-time execution. Timing
//! side channels against secret scalars are an accepted, documented
//! limitation of this educational implementation.

use crate::field::{self, U256};

/// secp256k1 field prime: `p`.
pub const P: U256 = U256([
    0xFFFFFFFEFFFFFC2F,
    0xFFFFFFFFFFFFFFFF,
    0xFFFFFFFFFFFFFFFF,
    0xFFFFFFFFFFFFFFFF,
]);

/// Curve coefficient `a` (always zero for secp256k1's `y² = x³ + 7`).
pub const A: U256 = U256::ZERO;

/// Curve coefficient `b`.
pub const B: U256 = U256::from_u64(7);

/// Base point x-coordinate.
pub const GX: U256 = U256([
    0x59F2815B16F81798,
    0x029BFCDB2DCE28D9,
    0x55A06295CE870B07,
    0x79BE667EF9DCBBAC,
]);

/// Base point y-coordinate.
pub const GY: U256 = U256([
    0x9C47D08FFB10D4B8,
    0xFD17B448A6855419,
    0x5DA4FBFC0E1108A8,
    0x483ADA7726A3C465,
]);

/// Subgroup order `n`: the smallest positive integer such that `n·G = ∞`.
pub const N: U256 = U256([
    0xBFD25E8CD0364141,
    0xBAAEDCE6AF48A03B,
    0xFFFFFFFFFFFFFFFE,
    0xFFFFFFFFFFFFFFFF,
]);

/// A point on the secp256k1 curve: either the point at infinity, or an
/// affine `(x, y)` pair. Value-typed; equality is structural.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Point {
    Infinity,
    Affine { x: U256, y: U256 },
}

impl Point {
    /// The canonical base point `G`.
    pub fn generator() -> Point {
        Point::Affine { x: GX, y: GY }
    }

    /// `true` if this point satisfies `y² ≡ x³ + a·x + b (mod p)`.
    pub fn is_on_curve(&self) -> bool {
        match self {
            Point::Infinity => true,
            Point::Affine { x, y } => {
                let y2 = field::mul_mod(y, y, &P);
                let x3 = field::mul_mod(&field::mul_mod(x, x, &P), x, &P);
                let ax = field::mul_mod(&A, x, &P);
                let rhs = field::add_mod(&field::add_mod(&x3, &ax, &P), &B, &P);
                y2 == rhs
            }
        }
    }

    /// Point addition per the standard affine formulas, handling the three
    /// documented edge cases: either operand at infinity, `P + (-P) = ∞`,
    /// and doubling (tangent slope) vs. the general secant slope.
    pub fn add(&self, other: &Point) -> Point {
        match (self, other) {
            (Point::Infinity, _) => *other,
            (_, Point::Infinity) => *self,
            (Point::Affine { x: x1, y: y1 }, Point::Affine { x: x2, y: y2 }) => {
                if x1 == x2 && *y1 != *y2 {
                    return Point::Infinity;
                }
                let m = if x1 == x2 {
                    // Doubling: tangent slope m = (3x² + a) / (2y)
                    let three_x2 = field::mul_mod(&U256::from_u64(3), &field::mul_mod(x1, x1, &P), &P);
                    let numerator = field::add_mod(&three_x2, &A, &P);
                    let denominator = field::add_mod(y1, y1, &P);
                    field::mul_mod(&numerator, &field::inv_mod(&denominator, &P), &P)
                } else {
                    // General case: secant slope m = (y1 - y2) / (x1 - x2)
                    let numerator = field::sub_mod(y1, y2, &P);
                    let denominator = field::sub_mod(x1, x2, &P);
                    field::mul_mod(&numerator, &field::inv_mod(&denominator, &P), &P)
                };
                let rx = field::sub_mod(&field::sub_mod(&field::mul_mod(&m, &m, &P), x1, &P), x2, &P);
                let ry = field::sub_mod(&field::mul_mod(&m, &field::sub_mod(x1, &rx, &P), &P), y1, &P);
                Point::Affine { x: rx, y: ry }
            }
        }
    }

    /// Scalar multiplication by double-and-add over the binary expansion of
    /// `k`. `k` is an unsigned `U256`; there is no representable negative
    /// scalar, satisfying the "scalars must be non-negative" contract by
    /// construction.
    pub fn scalar_mul(&self, k: &U256) -> Point {
        let mut result = Point::Infinity;
        let mut addend = *self;
        let bits = k.bit_len();
        for i in 0..bits {
            if k.bit(i) {
                result = result.add(&addend);
            }
            addend = addend.add(&addend);
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_is_on_curve() {
        assert!(Point::generator().is_on_curve());
    }

    #[test]
    fn n_times_g_is_infinity() {
        let g = Point::generator();
        assert_eq!(g.scalar_mul(&N), Point::Infinity);
    }

    #[test]
    fn doubling_matches_adding_to_self() {
        let g = Point::generator();
        let doubled = g.add(&g);
        let scaled = g.scalar_mul(&U256::from_u64(2));
        assert_eq!(doubled, scaled);
        assert!(doubled.is_on_curve());
    }

    #[test]
    fn addition_is_commutative_and_stays_on_curve() {
        let g = Point::generator();
        let p2 = g.scalar_mul(&U256::from_u64(2));
        let p3 = g.scalar_mul(&U256::from_u64(3));
        let sum_a = p2.add(&p3);
        let sum_b = p3.add(&p2);
        assert_eq!(sum_a, sum_b);
        assert!(sum_a.is_on_curve());
        assert_eq!(sum_a, g.scalar_mul(&U256::from_u64(5)));
    }

    #[test]
    fn known_public_key_derivation() {
        // Mastering Bitcoin Chapter 4 example.
        let mut sk_bytes = [0u8; 32];
        let decoded =
            hex::decode("1E99423A4ED27608A15A2616A2B0E9E52CED330AC530EDCC32C8FFC6A526AEDD")
                .unwrap();
        sk_bytes.copy_from_slice(&decoded[decoded.len() - 32..]);
        let k = U256::from_be_bytes(&sk_bytes);
        let p = Point::generator().scalar_mul(&k);
        match p {
            Point::Affine { x, y } => {
                assert_eq!(
                    format!("{x:064x}").to_uppercase(),
                    "F028892BAD7ED57D2FB57BF33081D5CFCF6F9ED3D3D7F159C2E2FFF579DC341A"
                );
                assert_eq!(
                    format!("{y:064x}").to_uppercase(),
                    "07CF33DA18BD734C600B96A72BBC4749D5141C90EC8AC328AE52DDFE2E505BDB"
                );
            }
            Point::Infinity => panic!("expected affine point"),
        }
    }
}
