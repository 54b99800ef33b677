//! Physical quantities used at the edges of the toolbox.
//!
//! Geometry descriptions arrive with explicit units (`"300 mm"`), are parsed
//! into `uom` quantities, and are then lowered to plain `f32`s in a fixed
//! base unit (millimetres, radians) before any numerical work happens.

pub use uom;
pub use uom::si::Quantity;
pub use uom::si::f32::{Angle, Length};

pub mod todo;

mod unit {
  pub use uom::si::{length::{millimeter, centimeter},
                    angle ::{radian, degree, revolution},
  };
}

// Making values from float literals is very long-winded, so provide some
// pithily-named convenience constructors.

/// Generate a function called NAME which returns QUANTITY by interpreting its
/// argument as UNIT
///
/// wrap!(NAME QUANTITY UNIT);
macro_rules! wrap {
  ($name:ident $quantity:ident $unit:ident ) => {
    pub fn $name(x: f32) -> $quantity { $quantity::new::<unit::$unit>(x) }
  };
}

wrap!(mm     Length  millimeter);
wrap!(cm     Length  centimeter);
wrap!(radian Angle       radian);
wrap!(degree Angle       degree);
wrap!(turn   Angle   revolution);

// Reverse direction of the above: strip the units, leaving an `f32` in the
// toolbox's base unit.
pub fn mm_    (x: Length) -> f32 { x.get::<unit::millimeter>() }
pub fn radian_(x: Angle ) -> f32 { x.get::<unit::radian>() }
pub fn degree_(x: Angle ) -> f32 { x.get::<unit::degree>() }

/// The full circle constant (τ), in radians.
pub const TWOPI: f32 = std::f32::consts::TAU;

#[macro_export]
macro_rules! assert_uom_eq {
  ($unit:ident, $lhs:expr, $rhs:expr, $algo:ident <= $tol:expr) => {
    float_eq::assert_float_eq!($lhs.get::<$unit>(), $rhs.get::<$unit>(), $algo <= $tol)
  };
}

#[cfg(test)]
mod tests {
  use super::*;
  use uom::si::length::nanometer;

  #[test]
  fn sum_of_mixed_units() {
    let v = vec![mm(1.0), cm(1.0)];
    let total: Length = v.into_iter().sum();
    assert_uom_eq!(nanometer, total, mm(11.0), ulps <= 1);
  }

  #[test]
  fn strip_units() {
    assert_eq!(mm_(cm(2.5)), 25.0);
    float_eq::assert_float_eq!(radian_(turn(0.5)), std::f32::consts::PI, ulps <= 1);
    float_eq::assert_float_eq!(degree_(radian(std::f32::consts::FRAC_PI_2)), 90.0, ulps <= 2);
  }

  #[test]
  fn parse_length_with_units() -> Result<(), Box<dyn std::error::Error>> {
    let l: Length = "300 mm".parse()?;
    assert_eq!(mm_(l), 300.0);
    let l: Length = "2 cm".parse()?;
    assert_eq!(mm_(l), 20.0);
    Ok(())
  }
}
