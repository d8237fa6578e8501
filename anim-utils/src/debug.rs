//! Debug formatting for large collections.
//!
//! Keyframe tracks and per-bone pose arrays easily hold hundreds of
//! entries. Use [`trimmed_collection_fmt`] with `custom_debug` to print only
//! a short preview:
//!
//! ```rust,ignore
//! #[derive(custom_debug::Debug)]
//! struct Pose {
//!     #[debug(with = anim_utils::debug::trimmed_collection_fmt)]
//!     local: Vec<glam::Mat4>,
//! }
//! ```

use std::{cmp, fmt, sync};

/// Number of leading elements shown by [`trimmed_collection_fmt`].
pub const PREVIEW_ELEMENTS: usize = 3;

/// A collection that can hand out a slice preview of itself.
pub trait Preview {
    type Item: fmt::Debug;

    fn element_count(&self) -> usize;
    fn leading(&self, elements: usize) -> &[Self::Item];
}

impl<T: fmt::Debug> Preview for [T] {
    type Item = T;

    fn element_count(&self) -> usize {
        self.len()
    }

    fn leading(&self, elements: usize) -> &[T] {
        &self[..cmp::min(elements, self.len())]
    }
}

impl<T: fmt::Debug> Preview for Vec<T> {
    type Item = T;

    fn element_count(&self) -> usize {
        self.len()
    }

    fn leading(&self, elements: usize) -> &[T] {
        self.as_slice().leading(elements)
    }
}

impl<T: ?Sized + Preview> Preview for sync::Arc<T> {
    type Item = T::Item;

    fn element_count(&self) -> usize {
        self.as_ref().element_count()
    }

    fn leading(&self, elements: usize) -> &[Self::Item] {
        self.as_ref().leading(elements)
    }
}

/// Formats at most [`PREVIEW_ELEMENTS`] items followed by the number of
/// hidden ones.
#[cfg(not(feature = "debug-print-all"))]
pub fn trimmed_collection_fmt<T: ?Sized + Preview>(
    items: &T,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    let shown = items.leading(PREVIEW_ELEMENTS);
    let hidden = items.element_count().saturating_sub(shown.len());

    if hidden == 0 {
        write!(f, "{:?}", shown)
    } else {
        write!(f, "{:?} + {} elements", shown, hidden)
    }
}

#[cfg(feature = "debug-print-all")]
pub fn trimmed_collection_fmt<T: ?Sized + Preview>(
    items: &T,
    f: &mut fmt::Formatter,
) -> fmt::Result {
    write!(f, "{:?}", items.leading(items.element_count()))
}

#[cfg(all(test, not(feature = "debug-print-all")))]
mod tests {
    use super::*;

    #[derive(custom_debug::Debug)]
    struct Keys {
        #[debug(with = trimmed_collection_fmt)]
        times: Vec<u32>,
    }

    #[test]
    fn test_short_collection_is_printed_whole() {
        let keys = Keys {
            times: vec![1, 2, 3],
        };
        assert_eq!(format!("{:?}", keys), "Keys { times: [1, 2, 3] }");
    }

    #[test]
    fn test_long_collection_is_trimmed() {
        let keys = Keys {
            times: (0..10).collect(),
        };
        assert_eq!(
            format!("{:?}", keys),
            "Keys { times: [0, 1, 2] + 7 elements }"
        );
    }

    #[test]
    fn test_arc_slice_preview() {
        let shared: sync::Arc<Vec<f32>> = sync::Arc::new(vec![0.5; 5]);
        assert_eq!(shared.element_count(), 5);
        assert_eq!(shared.leading(2), &[0.5, 0.5]);
    }
}
