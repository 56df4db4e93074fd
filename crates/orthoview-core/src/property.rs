//! Observable values with a domain, for binding to widgets.
//!
//! A property reports its value together with the domain of legal values,
//! or nothing at all when it currently has no meaning (a cursor position
//! while no image is loaded, say). Widgets listen for
//! [`EventKind::ValueChanged`] and [`EventKind::RangeChanged`].

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use num_traits::Num;
use serde::{Deserialize, Serialize};

use crate::event::EventKind;
use crate::model::{Model, ModelCore};
use crate::observe::{Observable, Subject};
use crate::source::{CursorStore, ImageData};

/// Closed interval with a step, for numeric widgets.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct NumericRange<T> {
    pub minimum: T,
    pub maximum: T,
    pub step: T,
}

impl<T: Copy + PartialOrd> NumericRange<T> {
    pub fn new(minimum: T, maximum: T, step: T) -> Self {
        Self {
            minimum,
            maximum,
            step,
        }
    }

    pub fn contains(&self, value: T) -> bool {
        value >= self.minimum && value <= self.maximum
    }

    pub fn clamp(&self, value: T) -> T {
        if value < self.minimum {
            self.minimum
        } else if value > self.maximum {
            self.maximum
        } else {
            value
        }
    }
}

impl<T: Num + Copy + PartialOrd> NumericRange<T> {
    pub fn with_unit_step(minimum: T, maximum: T) -> Self {
        Self::new(minimum, maximum, T::one())
    }

    /// Number of steps between the bounds.
    pub fn steps(&self) -> T {
        if self.step.is_zero() || self.maximum < self.minimum {
            T::zero()
        } else {
            (self.maximum - self.minimum) / self.step
        }
    }
}

/// A value and its domain, shared between a model and the widgets bound
/// to it.
pub trait PropertyModel: Observable {
    type Value;
    type Domain;

    /// `None` while the property is invalid.
    fn value_and_domain(&self) -> Option<(Self::Value, Self::Domain)>;

    fn set_value(&self, value: Self::Value);

    fn value(&self) -> Option<Self::Value> {
        self.value_and_domain().map(|(value, _)| value)
    }

    fn is_valid(&self) -> bool {
        self.value_and_domain().is_some()
    }
}

/// A property that stores its own value, domain and validity.
pub struct ConcreteProperty<T, D> {
    subject: Subject,
    value: RefCell<T>,
    domain: RefCell<D>,
    valid: Cell<bool>,
}

impl<T: Clone + PartialEq, D: Clone + PartialEq> ConcreteProperty<T, D> {
    pub fn new(value: T, domain: D) -> Rc<Self> {
        Rc::new(Self {
            subject: Subject::new(),
            value: RefCell::new(value),
            domain: RefCell::new(domain),
            valid: Cell::new(true),
        })
    }

    pub fn domain(&self) -> D {
        self.domain.borrow().clone()
    }

    /// Fires [`EventKind::RangeChanged`] if the domain actually changed.
    pub fn set_domain(&self, domain: D) {
        if *self.domain.borrow() == domain {
            return;
        }
        *self.domain.borrow_mut() = domain;
        self.subject.fire(EventKind::RangeChanged);
    }

    pub fn set_valid(&self, valid: bool) {
        if self.valid.replace(valid) != valid {
            self.subject.fire(EventKind::ValueChanged);
        }
    }
}

impl<T: Copy + PartialOrd> ConcreteProperty<T, NumericRange<T>> {
    pub fn set_value_clamped(&self, value: T) {
        let clamped = self.domain.borrow().clamp(value);
        if *self.value.borrow() != clamped {
            *self.value.borrow_mut() = clamped;
            self.subject.fire(EventKind::ValueChanged);
        }
    }
}

impl<T: Clone + PartialEq, D: Clone + PartialEq> PropertyModel for ConcreteProperty<T, D> {
    type Value = T;
    type Domain = D;

    fn value_and_domain(&self) -> Option<(T, D)> {
        self.valid
            .get()
            .then(|| (self.value.borrow().clone(), self.domain.borrow().clone()))
    }

    /// Fires [`EventKind::ValueChanged`] if the value actually changed.
    fn set_value(&self, value: T) {
        if *self.value.borrow() == value {
            return;
        }
        *self.value.borrow_mut() = value;
        self.subject.fire(EventKind::ValueChanged);
    }
}

impl<T, D> Observable for ConcreteProperty<T, D> {
    fn subject(&self) -> &Subject {
        &self.subject
    }
}

impl<T: fmt::Debug, D: fmt::Debug> fmt::Debug for ConcreteProperty<T, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConcreteProperty")
            .field("value", &*self.value.borrow())
            .field("domain", &*self.domain.borrow())
            .field("valid", &self.valid.get())
            .finish()
    }
}

/// The shared cursor as a bindable voxel position. The domain of each axis
/// is `[0, dimension - 1]` with unit step.
pub struct CursorPositionProperty {
    core: ModelCore,
    image_data: Rc<ImageData>,
    cursor: Rc<CursorStore>,
}

impl CursorPositionProperty {
    pub fn new(image_data: Rc<ImageData>, cursor: Rc<CursorStore>) -> Self {
        let core = ModelCore::new();
        core.rebroadcast(&*cursor, EventKind::CursorUpdate, EventKind::ValueChanged);
        core.rebroadcast(
            &*image_data,
            EventKind::ImageDimensionsChange,
            EventKind::RangeChanged,
        );
        Self {
            core,
            image_data,
            cursor,
        }
    }
}

impl PropertyModel for CursorPositionProperty {
    type Value = [u32; 3];
    type Domain = [NumericRange<u32>; 3];

    fn value_and_domain(&self) -> Option<([u32; 3], [NumericRange<u32>; 3])> {
        let dims = self.image_data.dimensions()?;
        let domain = dims.map(|d| NumericRange::with_unit_step(0, d.saturating_sub(1)));
        Some((self.cursor.get(), domain))
    }

    /// Out-of-range components are clamped. Ignored while no image is
    /// loaded.
    fn set_value(&self, value: [u32; 3]) {
        if let Some((_, domain)) = self.value_and_domain() {
            let clamped = [0, 1, 2].map(|i| domain[i].clamp(value[i]));
            self.cursor.set(clamped);
        }
    }
}

impl Model for CursorPositionProperty {
    fn core(&self) -> &ModelCore {
        &self.core
    }
}

impl Observable for CursorPositionProperty {
    fn subject(&self) -> &Subject {
        self.core.subject()
    }
}

impl fmt::Debug for CursorPositionProperty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CursorPositionProperty")
            .field("value", &self.value())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_range_clamp_and_contains() {
        let range = NumericRange::new(-1.0, 2.5, 0.5);
        assert!(range.contains(2.5));
        assert!(!range.contains(2.6));
        assert_eq!(range.clamp(-3.0), -1.0);
        assert_eq!(range.clamp(1.0), 1.0);
        assert_eq!(range.steps(), 7.0);
    }

    #[test]
    fn test_unit_step_range() {
        let range = NumericRange::with_unit_step(0u32, 9);
        assert_eq!(range.step, 1);
        assert_eq!(range.steps(), 9);
    }
}
