//! Signed axis permutations between image, anatomical and display space.
//!
//! All three spaces are right-angled and axis aligned with each other, so
//! every mapping between them is a reordering of the three axes with an
//! optional flip per axis. [`AxisPermutation`] captures that linear part;
//! [`CoordinateTransform`] adds the translation that keeps corner-origin
//! voxel coordinates non-negative when an axis is flipped.

use std::fmt;
use std::ops::Neg;

use crate::consts::NUM_SLICE_WINDOWS;
use crate::error::{OrthoviewError, Result};

/// `output[i] = signs[i] * input[axes[i]]`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct AxisPermutation {
    axes: [usize; 3],
    signs: [i8; 3],
}

impl AxisPermutation {
    pub const IDENTITY: Self = Self {
        axes: [0, 1, 2],
        signs: [1, 1, 1],
    };

    /// Build from 1-based signed axes, e.g. `[1, -3, 2]` means
    /// `out = (in.x, -in.z, in.y)`.
    pub fn try_new(signed_axes: [i8; 3]) -> Result<Self> {
        let mut axes = [0usize; 3];
        let mut signs = [1i8; 3];
        let mut seen = [false; 3];
        for (i, &a) in signed_axes.iter().enumerate() {
            let index = a.unsigned_abs() as usize;
            if !(1..=3).contains(&index) || seen[index - 1] {
                return Err(OrthoviewError::InvalidPermutation(signed_axes));
            }
            seen[index - 1] = true;
            axes[i] = index - 1;
            signs[i] = a.signum();
        }
        Ok(Self { axes, signs })
    }

    /// Like [`AxisPermutation::try_new`], for axes known to be valid.
    ///
    /// # Panics
    /// If an axis is repeated or outside ±1..=±3.
    pub fn new(signed_axes: [i8; 3]) -> Self {
        match Self::try_new(signed_axes) {
            Ok(p) => p,
            Err(e) => panic!("{e}"),
        }
    }

    /// Parse an anatomical orientation code such as `"RAI"` or `"LPS"`.
    ///
    /// Letter `i` names the anatomical direction in which image axis `i`
    /// increases. R, A and I are the positive directions of the anatomical
    /// x, y and z axes; L, P and S their opposites. The result maps image
    /// coordinates to anatomical coordinates.
    pub fn from_orientation_code(code: &str) -> Result<Self> {
        let invalid = || OrthoviewError::InvalidOrientation(code.to_string());
        let letters: Vec<char> = code.trim().chars().collect();
        if letters.len() != 3 {
            return Err(invalid());
        }

        let mut signed = [0i8; 3];
        for (image_axis, letter) in letters.iter().enumerate() {
            let (anatomy_axis, sign) = match letter.to_ascii_uppercase() {
                'R' => (0, 1),
                'L' => (0, -1),
                'A' => (1, 1),
                'P' => (1, -1),
                'I' => (2, 1),
                'S' => (2, -1),
                _ => return Err(invalid()),
            };
            if signed[anatomy_axis] != 0 {
                return Err(invalid());
            }
            signed[anatomy_axis] = sign * (image_axis as i8 + 1);
        }
        Self::try_new(signed)
    }

    /// Inverse of [`AxisPermutation::from_orientation_code`].
    pub fn to_orientation_code(&self) -> String {
        const LETTERS: [[char; 2]; 3] = [['R', 'L'], ['A', 'P'], ['I', 'S']];
        let inverse = self.inverse();
        (0..3)
            .map(|image_axis| {
                let anatomy_axis = inverse.axes[image_axis];
                let flipped = inverse.signs[image_axis] < 0;
                LETTERS[anatomy_axis][usize::from(flipped)]
            })
            .collect()
    }

    /// 1-based signed representation, as accepted by [`AxisPermutation::new`].
    pub fn signed_axes(&self) -> [i8; 3] {
        [0, 1, 2].map(|i| self.signs[i] * (self.axes[i] as i8 + 1))
    }

    /// 0-based input axis feeding output axis `i`.
    pub fn axis(&self, i: usize) -> usize {
        self.axes[i]
    }

    /// +1 or -1 for output axis `i`.
    pub fn sign(&self, i: usize) -> i8 {
        self.signs[i]
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Apply `inner` first, then `self`.
    pub fn compose(&self, inner: &Self) -> Self {
        let mut axes = [0usize; 3];
        let mut signs = [1i8; 3];
        for i in 0..3 {
            axes[i] = inner.axes[self.axes[i]];
            signs[i] = self.signs[i] * inner.signs[self.axes[i]];
        }
        Self { axes, signs }
    }

    pub fn inverse(&self) -> Self {
        let mut axes = [0usize; 3];
        let mut signs = [1i8; 3];
        for i in 0..3 {
            axes[self.axes[i]] = i;
            signs[self.axes[i]] = self.signs[i];
        }
        Self { axes, signs }
    }

    pub fn apply<T: Copy + Neg<Output = T>>(&self, v: [T; 3]) -> [T; 3] {
        [0, 1, 2].map(|i| {
            let x = v[self.axes[i]];
            if self.signs[i] < 0 {
                -x
            } else {
                x
            }
        })
    }

    pub fn apply_inverse<T: Copy + Neg<Output = T>>(&self, v: [T; 3]) -> [T; 3] {
        self.inverse().apply(v)
    }

    /// Reorder without flipping; used for sizes and spacings.
    pub fn apply_unsigned<T: Copy>(&self, v: [T; 3]) -> [T; 3] {
        [0, 1, 2].map(|i| v[self.axes[i]])
    }
}

impl Default for AxisPermutation {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for AxisPermutation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let [a, b, c] = self.signed_axes();
        write!(f, "({a:+}, {b:+}, {c:+})")
    }
}

/// An [`AxisPermutation`] followed by a translation: `q = P·p + offset`.
///
/// Points are continuous voxel coordinates with the origin at the corner of
/// the first voxel, so voxel `i` covers `[i, i + 1)` along each axis.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinateTransform {
    permutation: AxisPermutation,
    offset: [f64; 3],
}

impl CoordinateTransform {
    pub fn identity() -> Self {
        Self {
            permutation: AxisPermutation::IDENTITY,
            offset: [0.0; 3],
        }
    }

    pub fn new(permutation: AxisPermutation, offset: [f64; 3]) -> Self {
        Self {
            permutation,
            offset,
        }
    }

    /// Transform over a volume with `source_extent` voxels per axis. Each
    /// flipped output axis is shifted by the extent of its source axis, so
    /// `[0, n]` maps onto `[0, n]` rather than `[-n, 0]`.
    pub fn for_extent(permutation: AxisPermutation, source_extent: [u32; 3]) -> Self {
        let offset = [0, 1, 2].map(|i| {
            if permutation.sign(i) < 0 {
                f64::from(source_extent[permutation.axis(i)])
            } else {
                0.0
            }
        });
        Self {
            permutation,
            offset,
        }
    }

    pub fn permutation(&self) -> AxisPermutation {
        self.permutation
    }

    pub fn offset(&self) -> [f64; 3] {
        self.offset
    }

    /// Apply `inner` first, then `self`.
    pub fn compose(&self, inner: &Self) -> Self {
        let moved = self.permutation.apply(inner.offset);
        Self {
            permutation: self.permutation.compose(&inner.permutation),
            offset: [0, 1, 2].map(|i| moved[i] + self.offset[i]),
        }
    }

    pub fn inverse(&self) -> Self {
        let permutation = self.permutation.inverse();
        let back = permutation.apply(self.offset);
        Self {
            permutation,
            offset: back.map(|x| -x),
        }
    }

    pub fn apply_point(&self, p: [f64; 3]) -> [f64; 3] {
        let q = self.permutation.apply(p);
        [0, 1, 2].map(|i| q[i] + self.offset[i])
    }

    pub fn apply_vector(&self, v: [f64; 3]) -> [f64; 3] {
        self.permutation.apply(v)
    }

    pub fn apply_inverse_point(&self, q: [f64; 3]) -> [f64; 3] {
        let shifted = [0, 1, 2].map(|i| q[i] - self.offset[i]);
        self.permutation.apply_inverse(shifted)
    }

    /// Map an integer voxel index through its voxel centre.
    pub fn apply_index(&self, index: [u32; 3]) -> [u32; 3] {
        let centre = index.map(|i| f64::from(i) + 0.5);
        self.apply_point(centre).map(|x| x.floor().max(0.0) as u32)
    }

    pub fn apply_size(&self, size: [u32; 3]) -> [u32; 3] {
        self.permutation.apply_unsigned(size)
    }
}

impl Default for CoordinateTransform {
    fn default() -> Self {
        Self::identity()
    }
}

/// The three orthogonal slice planes, in window order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Plane {
    Axial,
    Coronal,
    Sagittal,
}

impl Plane {
    pub const ALL: [Plane; NUM_SLICE_WINDOWS] = [Plane::Axial, Plane::Coronal, Plane::Sagittal];

    pub fn from_index(index: usize) -> Result<Self> {
        Self::ALL
            .get(index)
            .copied()
            .ok_or(OrthoviewError::WindowIndexOutOfRange {
                index,
                total: NUM_SLICE_WINDOWS,
            })
    }

    pub fn index(&self) -> usize {
        match self {
            Plane::Axial => 0,
            Plane::Coronal => 1,
            Plane::Sagittal => 2,
        }
    }

    /// Anatomical → display permutation. The third display axis is the
    /// slice normal; the second points up on screen.
    pub fn anatomy_to_display(&self) -> AxisPermutation {
        match self {
            // Anterior up, looking along the inferior-superior axis.
            Plane::Axial => AxisPermutation::new([1, -2, 3]),
            Plane::Coronal => AxisPermutation::new([1, 3, 2]),
            Plane::Sagittal => AxisPermutation::new([2, 3, 1]),
        }
    }
}

impl fmt::Display for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Plane::Axial => write!(f, "Axial"),
            Plane::Coronal => write!(f, "Coronal"),
            Plane::Sagittal => write!(f, "Sagittal"),
        }
    }
}
