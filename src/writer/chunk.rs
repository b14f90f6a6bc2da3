//! Chunking utility

/// Split `items` into consecutive batches of at most `size` items.
///
/// The last batch may be smaller. A size of zero is treated as one.
pub fn chunk<T>(items: &[T], size: usize) -> Vec<&[T]> {
    items.chunks(size.max(1)).collect()
}
