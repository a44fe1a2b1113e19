/// Left-rotation offset for a pool of `len` entries at `epoch`.
/// Zero for pools of 0 or 1 entries.
#[inline]
pub fn rotation_offset(len: usize, epoch: u64) -> usize {
    if len <= 1 {
        0
    } else {
        (epoch % len as u64) as usize
    }
}

/// Returns `seq` left-rotated by `epoch mod len`.
///
/// Over any `len` consecutive epochs each element sits at each position
/// exactly once. Same inputs always give the same output.
pub fn rotate<T: Clone>(seq: &[T], epoch: u64) -> Vec<T> {
    let offset = rotation_offset(seq.len(), epoch);
    let mut out = Vec::with_capacity(seq.len());
    out.extend_from_slice(&seq[offset..]);
    out.extend_from_slice(&seq[..offset]);
    out
}
