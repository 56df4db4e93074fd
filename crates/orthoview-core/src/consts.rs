/// Number of orthogonal slice windows (axial, coronal, sagittal).
pub const NUM_SLICE_WINDOWS: usize = 3;

/// Default margin around the slice when fitting it into the viewport,
/// in physical image units.
pub const DEFAULT_FIT_MARGIN: f64 = 10.0;

/// The thumbnail is shown once the view zoom exceeds the optimal zoom
/// by this factor.
pub const DEFAULT_THUMBNAIL_ZOOM_THRESHOLD: f64 = 1.5;

/// Largest side of the thumbnail box, in screen pixels.
pub const DEFAULT_THUMBNAIL_MAX_SIZE_PX: u32 = 160;

/// Distance of the thumbnail from the window corner, in screen pixels.
pub const DEFAULT_THUMBNAIL_MARGIN_PX: u32 = 5;

/// Smallest zoom reachable by gestures, as a fraction of the optimal zoom.
pub const DEFAULT_MIN_ZOOM_FACTOR: f64 = 0.25;

/// Largest zoom reachable by gestures, as a multiple of the optimal zoom.
pub const DEFAULT_MAX_ZOOM_FACTOR: f64 = 64.0;

/// Orientation code under which image axes coincide with anatomical axes.
pub const DEFAULT_ORIENTATION_CODE: &str = "RAI";

/// Zoom used before any fit has been computed.
pub const INITIAL_VIEW_ZOOM: f64 = 1.0;

/// Tolerance for comparing zoom levels and positions.
pub const EPSILON: f64 = 1e-9;
