//! Arbitrary-width bit-field access over a flat array of 32-bit words

/// Rounds `v` up to a multiple of `align` (power of two).
pub fn aligned_size(v: u32, align: u32) -> u32 {
    debug_assert!(align.is_power_of_two());

    (v + align - 1) & !(align - 1)
}

/// Index of the most significant set bit. `value` must be non-zero.
///
/// Callers that may pass zero are expected to apply a `| 1` guard first,
/// which yields a bit length of 1 for equal or zero deltas.
pub fn find_msb(value: u32) -> u32 {
    debug_assert!(value != 0);

    31 - value.leading_zeros()
}

fn bit_mask(width: u32) -> u32 {
    if width >= 32 {
        !0
    } else {
        (1 << width) - 1
    }
}

/// Packs the low `width` bits of `value` at `offset` within a single word.
pub fn pack(value: u32, width: u32, offset: u32) -> u32 {
    debug_assert!(offset + width <= 32);

    (value & bit_mask(width)) << offset
}

/// Extracts a `width`-bit field at `offset` from a single word.
pub fn unpack(value: u32, width: u32, offset: u32) -> u32 {
    debug_assert!(offset + width <= 32);

    (value >> offset) & bit_mask(width)
}

/// ORs the low `width` bits of `value` into `bits` starting at bit `offset`.
///
/// The field may straddle two adjacent words. The destination must be
/// pre-zeroed for the write to be exact. The word holding the low part must
/// be inside the slice; high bits that would land one word past the end are
/// silently dropped, matching the zero-extension tolerance of the decoder.
pub fn set_bit_field(bits: &mut [u32], width: u32, offset: u32, value: u32) {
    debug_assert!(width >= 1 && width <= 32);

    let idx = (offset / 32) as usize;
    let shift_lo = offset % 32;

    assert!(idx < bits.len());

    let value = value & bit_mask(width);

    let only_lo = shift_lo + width <= 32;
    let size_lo = if only_lo { width } else { 32 - shift_lo };
    let size_hi = if only_lo { 0 } else { shift_lo + width - 32 };

    bits[idx] |= value << shift_lo;

    if size_hi > 0 && idx + 1 < bits.len() {
        bits[idx + 1] |= value >> size_lo;
    }
}

/// Reads a `width`-bit field starting at bit `offset`, the inverse of
/// [set_bit_field].
///
/// Any word outside the slice reads as zero rather than faulting; packed
/// streams may legitimately end mid-word and hardware-side decoders rely on
/// the zero extension.
pub fn get_bit_field(bits: &[u32], width: u32, offset: u32) -> u32 {
    debug_assert!(width >= 1 && width <= 32);

    let idx = (offset / 32) as usize;
    let shift_lo = offset % 32;

    let raw_lo = bits.get(idx).copied().unwrap_or(0);
    let raw_hi = bits.get(idx + 1).copied().unwrap_or(0);

    let only_lo = shift_lo + width <= 32;
    let size_lo = if only_lo { width } else { 32 - shift_lo };
    let size_hi = if only_lo { 0 } else { shift_lo + width - 32 };

    let ret_lo = (raw_lo >> shift_lo) & bit_mask(size_lo);

    if size_hi > 0 {
        ret_lo | ((raw_hi & bit_mask(size_hi)) << size_lo)
    } else {
        ret_lo
    }
}
