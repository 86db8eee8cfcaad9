pub fn is_power_of_two(x: usize) -> Option<u8> {
    use std::u8;

    let mut power_of_two = 1;
    let mut i : u8 = 0;
    while power_of_two < x && i < u8::MAX {
        power_of_two *= 2;
        i += 1;
    }

    if power_of_two == x {
        Some(i)
    } else {
        None
    }
}

/// aligns up a value to the given alignment (the alignment needs to be a power of two)
pub fn align_up(x: usize, align: usize) -> usize {
    debug_assert!(is_power_of_two(align).is_some());
    (x + align - 1) & !(align - 1)
}
