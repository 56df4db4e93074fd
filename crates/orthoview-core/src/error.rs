use thiserror::Error;

#[derive(Error, Debug)]
pub enum OrthoviewError {
    #[error("Invalid axis permutation {0:?}: each of the axes 1, 2, 3 must appear exactly once")]
    InvalidPermutation([i8; 3]),

    #[error("Invalid orientation code '{0}'")]
    InvalidOrientation(String),

    #[error("Invalid image dimensions: {0:?}")]
    InvalidDimensions([u32; 3]),

    #[error("Invalid voxel spacing: {0:?}")]
    InvalidSpacing([f64; 3]),

    #[error("Unknown layer: {0}")]
    UnknownLayer(u64),

    #[error("No main image loaded")]
    NoMainImage,

    #[error("Window index {index} out of range (total: {total})")]
    WindowIndexOutOfRange { index: usize, total: usize },

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type Result<T> = std::result::Result<T, OrthoviewError>;
