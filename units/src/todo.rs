/// Units which are simply type aliases for `f32` rather than having an
/// implementation as a `uom` `Quantity`.
///
/// These are the representations handed across the backend boundary, where
/// everything is a flat `f32` in a fixed base unit, but we still want some
/// clues in the source as to what they represent.

pub type Lengthf32    = f32; // mm, or pixels/voxels once normalized
pub type Anglef32     = f32; // radians
pub type Ratiof32     = f32;
pub type Intensityf32 = f32; // TODO uom attenuation coefficient
