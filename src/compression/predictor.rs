
//! Undo the byte reordering and delta encoding that
//! `RLE` and `ZIP` apply before compressing.

/// Undo both transformations in place.
pub fn restore(bytes: &mut [u8]) {
    integrate(bytes);
    interleave(bytes);
}

/// Each byte stores its difference to the previous byte, offset by 128.
fn integrate(bytes: &mut [u8]) {
    let mut previous = match bytes.first() {
        Some(&first) => first,
        None => return,
    };

    for byte in &mut bytes[1..] {
        previous = previous.wrapping_add(*byte).wrapping_sub(128);
        *byte = previous;
    }
}

/// The first half holds the even bytes and the second half holds the odd bytes.
fn interleave(bytes: &mut [u8]) {
    let (even, odd) = bytes.split_at((bytes.len() + 1) / 2);

    let mut merged = Vec::with_capacity(bytes.len());
    for (index, &byte) in even.iter().enumerate() {
        merged.push(byte);
        merged.extend(odd.get(index));
    }

    bytes.copy_from_slice(&merged);
}
