use std::collections::BTreeSet;
use std::fmt;

/// A class of change that a subject can announce to its listeners.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventKind {
    /// The shared 3D cursor moved.
    CursorUpdate,
    /// A layer was attached to or detached from the image data.
    LayerChange,
    /// Dimensions or spacing of the image data changed.
    ImageDimensionsChange,
    /// The image-to-display orientation changed.
    DisplayOrientationChange,
    /// Zoom, pan or viewport size of a slice window changed.
    SliceGeometryChange,
    /// Size or spacing of the slice shown in a window changed.
    SliceDimensionsChange,
    /// The value held by a property changed.
    ValueChanged,
    /// The domain of a property changed.
    RangeChanged,
    /// Generic "something changed" notification.
    ModelUpdate,
    /// Linked zoom was toggled or propagated across windows.
    LinkedZoomUpdate,
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CursorUpdate => write!(f, "Cursor Update"),
            Self::LayerChange => write!(f, "Layer Change"),
            Self::ImageDimensionsChange => write!(f, "Image Dimensions Change"),
            Self::DisplayOrientationChange => write!(f, "Display Orientation Change"),
            Self::SliceGeometryChange => write!(f, "Slice Geometry Change"),
            Self::SliceDimensionsChange => write!(f, "Slice Dimensions Change"),
            Self::ValueChanged => write!(f, "Value Changed"),
            Self::RangeChanged => write!(f, "Range Changed"),
            Self::ModelUpdate => write!(f, "Model Update"),
            Self::LinkedZoomUpdate => write!(f, "Linked Zoom Update"),
        }
    }
}

/// The set of event kinds seen since the last flush.
///
/// Recording is idempotent and carries no ordering; the only way to empty
/// the bucket is [`EventBucket::clear`] (or taking it with `std::mem::take`).
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EventBucket {
    kinds: BTreeSet<EventKind>,
}

impl EventBucket {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: EventKind) {
        self.kinds.insert(kind);
    }

    pub fn has(&self, kind: EventKind) -> bool {
        self.kinds.contains(&kind)
    }

    /// True if at least one of `kinds` has been recorded.
    pub fn has_any(&self, kinds: &[EventKind]) -> bool {
        kinds.iter().any(|k| self.kinds.contains(k))
    }

    pub fn clear(&mut self) {
        self.kinds.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.kinds.is_empty()
    }

    pub fn len(&self) -> usize {
        self.kinds.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = EventKind> + '_ {
        self.kinds.iter().copied()
    }
}

impl fmt::Display for EventBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<String> = self.kinds.iter().map(|k| k.to_string()).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
