//! # secp256k1 Point Arithmetic
//!
//! Affine elliptic-curve arithmetic over the secp256k1 field: point
//! addition, doubling, double-and-add scalar multiplication, and the BIP340
//! `lift_x` x-only decompression. Everything operates on an explicit
//! [`Secp256k1`] domain-parameters value constructed once at startup and
//! passed by shared reference; there is no global curve singleton and no
//! lazy static initialization to race on.

use crate::crypto::field::{self, U256};

/// The secp256k1 domain parameters: the field prime, the group order, the
/// generator, and the curve constant of `y² = x³ + 7`.
///
/// Construct one with [`Secp256k1::new`] at process start and share it by
/// reference with every component that needs curve math.
#[derive(Debug, Clone)]
pub struct Secp256k1 {
    /// Field prime `p`.
    pub p: U256,
    /// Group (generator) order `n`.
    pub n: U256,
    /// The generator point `G`.
    pub g: Point,
    /// Curve equation constant `b = 7`.
    pub b: U256,
}

/// A point on the curve in affine coordinates, or the point at infinity.
///
/// Affine coordinates cost a modular inversion per addition, which is fine:
/// verification does two scalar multiplications per signature and this core
/// is not a batch validator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Point {
    /// The group identity.
    Infinity,
    /// A finite point `(x, y)` with both coordinates reduced mod `p`.
    Affine { x: U256, y: U256 },
}

impl Point {
    /// True for the point at infinity.
    pub fn is_infinity(&self) -> bool {
        matches!(self, Point::Infinity)
    }

    /// True for a finite point whose y coordinate is even. Infinity has no
    /// y coordinate and reports `false`.
    pub fn has_even_y(&self) -> bool {
        match self {
            Point::Infinity => false,
            Point::Affine { y, .. } => !y.bit(0),
        }
    }

    /// The x coordinate of a finite point.
    pub fn x(&self) -> Option<&U256> {
        match self {
            Point::Infinity => None,
            Point::Affine { x, .. } => Some(x),
        }
    }
}

impl Secp256k1 {
    /// Build the standard secp256k1 domain parameters.
    pub fn new() -> Self {
        let parse = |s: &str| U256::from_str_radix(s, 16).expect("static curve constant");
        Secp256k1 {
            p: parse("fffffffffffffffffffffffffffffffffffffffffffffffffffffffefffffc2f"),
            n: parse("fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141"),
            g: Point::Affine {
                x: parse("79be667ef9dcbbac55a06295ce870b07029bfcdb2dce28d959f2815b16f81798"),
                y: parse("483ada7726a3c4655da4fbfc0e1108a8fd17b448a68554199c47d08ffb10d4b8"),
            },
            b: U256::from(7u64),
        }
    }

    /// Add two points.
    pub fn add(&self, a: &Point, b: &Point) -> Point {
        let (x1, y1) = match a {
            Point::Infinity => return *b,
            Point::Affine { x, y } => (x, y),
        };
        let (x2, y2) = match b {
            Point::Infinity => return *a,
            Point::Affine { x, y } => (x, y),
        };

        if x1 == x2 {
            if y1 == y2 {
                return self.double(a);
            }
            // Same x, different y: the points are inverses.
            return Point::Infinity;
        }

        // Chord slope: (y2 - y1) / (x2 - x1).
        let dx = field::sub_mod(x2, x1, &self.p);
        let dy = field::sub_mod(y2, y1, &self.p);
        let s = field::mul_mod(&dy, &field::inv_mod(&dx, &self.p), &self.p);

        let s2 = field::mul_mod(&s, &s, &self.p);
        let x3 = field::sub_mod(&field::sub_mod(&s2, x1, &self.p), x2, &self.p);
        let y3 = field::sub_mod(
            &field::mul_mod(&s, &field::sub_mod(x1, &x3, &self.p), &self.p),
            y1,
            &self.p,
        );
        Point::Affine { x: x3, y: y3 }
    }

    /// Double a point.
    pub fn double(&self, a: &Point) -> Point {
        let (x1, y1) = match a {
            Point::Infinity => return Point::Infinity,
            Point::Affine { x, y } => (x, y),
        };
        if y1.is_zero() {
            // Vertical tangent.
            return Point::Infinity;
        }

        // Tangent slope: 3x² / 2y.
        let x_sq = field::mul_mod(x1, x1, &self.p);
        let num = field::mul_mod(&U256::from(3u64), &x_sq, &self.p);
        let den = field::mul_mod(&U256::from(2u64), y1, &self.p);
        let s = field::mul_mod(&num, &field::inv_mod(&den, &self.p), &self.p);

        let s2 = field::mul_mod(&s, &s, &self.p);
        let two_x = field::mul_mod(&U256::from(2u64), x1, &self.p);
        let x3 = field::sub_mod(&s2, &two_x, &self.p);
        let y3 = field::sub_mod(
            &field::mul_mod(&s, &field::sub_mod(x1, &x3, &self.p), &self.p),
            y1,
            &self.p,
        );
        Point::Affine { x: x3, y: y3 }
    }

    /// Negate a point: `(x, y)` becomes `(x, p - y)`.
    pub fn negate(&self, a: &Point) -> Point {
        match a {
            Point::Infinity => Point::Infinity,
            Point::Affine { x, y } => {
                if y.is_zero() {
                    Point::Affine { x: *x, y: *y }
                } else {
                    Point::Affine {
                        x: *x,
                        y: self.p - *y,
                    }
                }
            }
        }
    }

    /// Scalar multiplication by double-and-add.
    pub fn mul(&self, point: &Point, scalar: &U256) -> Point {
        let mut result = Point::Infinity;
        let mut addend = *point;
        let bits = 256 - scalar.leading_zeros() as usize;
        for i in 0..bits {
            if scalar.bit(i) {
                result = self.add(&result, &addend);
            }
            addend = self.double(&addend);
        }
        result
    }

    /// Multiply the generator by a scalar.
    pub fn mul_g(&self, scalar: &U256) -> Point {
        self.mul(&self.g, scalar)
    }

    /// True if a finite point satisfies `y² = x³ + 7`.
    pub fn is_on_curve(&self, point: &Point) -> bool {
        match point {
            Point::Infinity => false,
            Point::Affine { x, y } => {
                let lhs = field::mul_mod(y, y, &self.p);
                let x_cubed = field::mul_mod(&field::mul_mod(x, x, &self.p), x, &self.p);
                let rhs = field::add_mod(&x_cubed, &self.b, &self.p);
                lhs == rhs
            }
        }
    }

    /// BIP340 `lift_x`: decompress an x coordinate to the curve point with
    /// even y, or `None` if `x` is out of range or not on the curve.
    ///
    /// The candidate root is `c^((p+1)/4)` (valid because `p ≡ 3 mod 4`);
    /// squaring it back recovers `c` only when `c` is a quadratic residue,
    /// which is exactly the on-curve condition.
    pub fn lift_x(&self, x: &U256) -> Option<Point> {
        if *x >= self.p {
            return None;
        }

        let c = field::add_mod(
            &field::mul_mod(&field::mul_mod(x, x, &self.p), x, &self.p),
            &self.b,
            &self.p,
        );
        let exp = (self.p + U256::one()) >> 2;
        let y = field::pow_mod(&c, &exp, &self.p);

        if field::mul_mod(&y, &y, &self.p) != c {
            return None;
        }

        let even_y = if y.bit(0) { self.p - y } else { y };
        Some(Point::Affine { x: *x, y: even_y })
    }
}

impl Default for Secp256k1 {
    fn default() -> Self {
        Self::new()
    }
}
