//! Container-relative normalized positions

use serde::{Deserialize, Serialize};

use crate::host::{ContainerInfo, TextElement};

use super::types::{NormalizedPoint, NormalizedSize, Point};

/// Lower bound applied to container extents before dividing
pub const MIN_EXTENT: f64 = 1e-6;

/// Which point of an element stands for its position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Anchor {
    #[default]
    Center,
    #[serde(alias = "topLeft")]
    TopLeft,
}

impl Anchor {
    /// Anchor point in the element's local coordinates
    fn local_point(self, width: f64, height: f64) -> Point {
        match self {
            Anchor::Center => Point::new(width / 2.0, height / 2.0),
            Anchor::TopLeft => Point::new(0.0, 0.0),
        }
    }
}

/// Express an element's anchor point as a fraction of its container's size.
///
/// The anchor is mapped to document space through the element's absolute
/// transform and back into container space through the inverse of the
/// container's absolute transform. When the container transform cannot be
/// inverted, the element's parent-relative `(x, y)` is used instead, which is
/// only exact when the element is a direct child of the container.
pub fn to_normalized_position(
    container: &ContainerInfo,
    element: &TextElement,
    anchor: Anchor,
) -> NormalizedPoint {
    let local_anchor = anchor.local_point(element.width, element.height);

    let local = match container.absolute_transform.inverse() {
        Some(inverse) => inverse.apply(element.absolute_transform.apply(local_anchor)),
        None => Point::new(element.x + local_anchor.x, element.y + local_anchor.y),
    };

    NormalizedPoint {
        nx: local.x / container.width.max(MIN_EXTENT),
        ny: local.y / container.height.max(MIN_EXTENT),
    }
}

/// Express an element's size as a fraction of its container's size
pub fn normalized_size(container: &ContainerInfo, element: &TextElement) -> NormalizedSize {
    NormalizedSize {
        nw: element.width / container.width.max(MIN_EXTENT),
        nh: element.height / container.height.max(MIN_EXTENT),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::Transform;
    use crate::host::{NodeId, NodeKind, TextKind};

    fn container(transform: Transform, width: f64, height: f64) -> ContainerInfo {
        ContainerInfo {
            id: NodeId::from("frame"),
            name: "Frame".to_string(),
            kind: NodeKind::Frame,
            width,
            height,
            absolute_transform: transform,
        }
    }

    fn text(x: f64, y: f64, width: f64, height: f64, absolute: Transform) -> TextElement {
        TextElement {
            id: NodeId::from("text"),
            name: "label".to_string(),
            characters: "Hello".to_string(),
            x,
            y,
            width,
            height,
            absolute_transform: absolute,
            absolute_bounds: None,
            visible: true,
            locked: false,
            kind: TextKind::Literal,
            font: None,
        }
    }

    fn assert_close(actual: NormalizedPoint, nx: f64, ny: f64) {
        assert!(
            (actual.nx - nx).abs() < 1e-9 && (actual.ny - ny).abs() < 1e-9,
            "expected ({}, {}), got {:?}",
            nx,
            ny,
            actual
        );
    }

    #[test]
    fn test_center_anchor_relative_to_container() {
        let frame = container(Transform::translate(1000.0, 500.0), 200.0, 100.0);
        let element = text(80.0, 40.0, 40.0, 20.0, Transform::translate(1080.0, 540.0));
        assert_close(to_normalized_position(&frame, &element, Anchor::Center), 0.5, 0.5);
    }

    #[test]
    fn test_top_left_anchor() {
        let frame = container(Transform::translate(1000.0, 500.0), 200.0, 100.0);
        let element = text(80.0, 40.0, 40.0, 20.0, Transform::translate(1080.0, 540.0));
        assert_close(to_normalized_position(&frame, &element, Anchor::TopLeft), 0.4, 0.4);
    }

    #[test]
    fn test_rotated_container_is_undone() {
        let frame_transform =
            Transform::translate(300.0, 300.0).then_apply_to(&Transform::rotate(90.0));
        let frame = container(frame_transform, 200.0, 100.0);
        // Element sits at local (50, 25) inside the rotated frame
        let element = text(
            50.0,
            25.0,
            0.0,
            0.0,
            frame_transform.then_apply_to(&Transform::translate(50.0, 25.0)),
        );
        assert_close(to_normalized_position(&frame, &element, Anchor::Center), 0.25, 0.25);
    }

    #[test]
    fn test_singular_container_falls_back_to_local_position() {
        let frame = container(Transform::scale(0.0, 0.0), 200.0, 100.0);
        let element = text(20.0, 10.0, 40.0, 20.0, Transform::scale(0.0, 0.0));
        assert_close(to_normalized_position(&frame, &element, Anchor::Center), 0.2, 0.2);
    }

    #[test]
    fn test_outside_elements_are_not_clamped() {
        let frame = container(Transform::identity(), 100.0, 100.0);
        let element = text(150.0, -50.0, 0.0, 0.0, Transform::translate(150.0, -50.0));
        assert_close(to_normalized_position(&frame, &element, Anchor::TopLeft), 1.5, -0.5);
    }

    #[test]
    fn test_zero_size_container_stays_finite() {
        let frame = container(Transform::identity(), 0.0, 0.0);
        let element = text(0.0, 0.0, 0.0, 0.0, Transform::identity());
        let pos = to_normalized_position(&frame, &element, Anchor::Center);
        assert!(pos.is_finite());
        let size = normalized_size(&frame, &element);
        assert!(size.nw.is_finite() && size.nh.is_finite());
    }
}
