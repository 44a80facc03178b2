//! Rectangle types.
//!
//! These are used throughout the library for detection boxes, regions of
//! interest, and drawing.

use std::fmt;

use nalgebra::{Point2, Vector2};

/// An axis-aligned rectangle.
///
/// Rectangles are allowed to have zero height and/or width. Negative
/// dimensions are not allowed. Rectangles may extend outside of the image
/// they refer to.
#[derive(Clone, Copy, PartialEq)]
pub struct Rect {
    center: Point2<f32>,
    size: Vector2<f32>,
}

impl Rect {
    /// Creates a rectangle extending outwards from a center point.
    #[inline]
    pub fn from_center(x_center: f32, y_center: f32, width: f32, height: f32) -> Self {
        Self {
            center: Point2::new(x_center, y_center),
            size: Vector2::new(width, height),
        }
    }

    /// Creates a rectangle extending downwards and right from a point.
    #[inline]
    pub fn from_top_left(top_left_x: f32, top_left_y: f32, width: f32, height: f32) -> Self {
        Self::from_center(
            top_left_x + width * 0.5,
            top_left_y + height * 0.5,
            width,
            height,
        )
    }

    /// Computes the (axis-aligned) bounding rectangle that encompasses
    /// `points`.
    ///
    /// Returns [`None`] if `points` is an empty iterator.
    pub fn bounding<I: IntoIterator<Item = Point2<f32>>>(points: I) -> Option<Self> {
        let mut iter = points.into_iter();

        let first = iter.next()?;
        let (mut min, mut max) = (first, first);

        for pt in iter {
            min.x = min.x.min(pt.x);
            min.y = min.y.min(pt.y);
            max.x = max.x.max(pt.x);
            max.y = max.y.max(pt.y);
        }

        Some(Self::span_inner(min.x, min.y, max.x, max.y))
    }

    fn span_inner(x_min: f32, y_min: f32, x_max: f32, y_max: f32) -> Self {
        assert!(x_min <= x_max, "x_min={}, x_max={}", x_min, x_max);
        assert!(y_min <= y_max, "y_min={}, y_max={}", y_min, y_max);
        Self::from_top_left(x_min, y_min, x_max - x_min, y_max - y_min)
    }

    #[inline]
    pub fn top_left(&self) -> Point2<f32> {
        self.center - self.size * 0.5
    }

    /// Returns the X coordinate of the left side of the rectangle.
    #[inline]
    pub fn x(&self) -> f32 {
        self.top_left().x
    }

    /// Returns the Y coordinate of the top side of the rectangle.
    #[inline]
    pub fn y(&self) -> f32 {
        self.top_left().y
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.size.x
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.size.y
    }

    #[inline]
    pub fn area(&self) -> f32 {
        self.size.x * self.size.y
    }

    #[inline]
    pub fn center(&self) -> Point2<f32> {
        self.center
    }

    #[must_use]
    pub fn move_by(&self, x: f32, y: f32) -> Rect {
        Rect {
            center: self.center + Vector2::new(x, y),
            ..*self
        }
    }

    /// Computes the intersection of `self` and `other`.
    ///
    /// Returns [`None`] when the intersection is empty (ie. the rectangles do
    /// not overlap).
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let min_x = self.x().max(other.x());
        let min_y = self.y().max(other.y());
        let max_x = (self.x() + self.width()).min(other.x() + other.width());
        let max_y = (self.y() + self.height()).min(other.y() + other.height());
        if min_x > max_x || min_y > max_y {
            return None;
        }

        Some(Rect::span_inner(min_x, min_y, max_x, max_y))
    }

    fn intersection_area(&self, other: &Self) -> f32 {
        self.intersection(other).map_or(0.0, |rect| rect.area())
    }

    fn union_area(&self, other: &Self) -> f32 {
        self.area() + other.area() - self.intersection_area(other)
    }

    /// Computes the Intersection over Union (IOU) of `self` and `other`.
    pub fn iou(&self, other: &Self) -> f32 {
        self.intersection_area(other) / self.union_area(other)
    }
}

impl fmt::Debug for Rect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Rect @ ({},{})/{}x{}",
            self.x(),
            self.y(),
            self.width(),
            self.height()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bounding() {
        let points = [
            Point2::new(1.0, 5.0),
            Point2::new(3.0, 2.0),
            Point2::new(2.0, 4.0),
        ];
        let rect = Rect::bounding(points).unwrap();
        assert_eq!(rect.x(), 1.0);
        assert_eq!(rect.y(), 2.0);
        assert_eq!(rect.width(), 2.0);
        assert_eq!(rect.height(), 3.0);

        assert!(Rect::bounding([]).is_none());
    }

    #[test]
    fn iou() {
        let a = Rect::from_top_left(0.0, 0.0, 10.0, 10.0);
        let b = Rect::from_top_left(5.0, 0.0, 10.0, 10.0);
        let expected = 50.0 / 150.0;
        assert!((a.iou(&b) - expected).abs() < 1e-6);

        let c = Rect::from_top_left(100.0, 100.0, 1.0, 1.0);
        assert_eq!(a.iou(&c), 0.0);
    }
}
