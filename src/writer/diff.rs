//! Frame comparison and region extraction
use crate::types::Rect;

/// Smallest rectangle holding every pixel that differs between two frames of
/// the given width, `None` if they are identical.
pub fn changed_region(prev: &[u8], next: &[u8], width: usize) -> Option<Rect> {
    let mut rows: Option<(usize, usize)> = None;
    let mut left = usize::MAX;
    let mut right = 0;
    for (y, (a, b)) in prev.chunks(width).zip(next.chunks(width)).enumerate() {
        let first = match a.iter().zip(b).position(|(p, n)| p != n) {
            Some(x) => x,
            None => continue,
        };
        // a row with a difference has a last one too
        let last = a.iter().zip(b).rposition(|(p, n)| p != n).unwrap_or(first);
        left = left.min(first);
        right = right.max(last);
        rows = Some(match rows {
            Some((top, _)) => (top, y),
            None => (y, y),
        });
    }
    rows.map(|(top, bottom)| Rect::new(left, top, right - left + 1, bottom - top + 1))
}

/// Copies `rect` out of a native resolution frame, replicating every pixel
/// into a `scale` by `scale` block.
pub fn extract_scaled(frame: &[u8], width: usize, rect: Rect, scale: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(rect.area() * scale * scale);
    let mut row = Vec::with_capacity(rect.width * scale);
    for y in rect.top..rect.top + rect.height {
        let start = y * width + rect.left;
        row.clear();
        for &index in &frame[start..start + rect.width] {
            row.extend(std::iter::repeat(index).take(scale));
        }
        for _ in 0..scale {
            out.extend_from_slice(&row);
        }
    }
    out
}
