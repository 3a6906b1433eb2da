//! Launch geometry helpers.
//!
//! The ABI expresses a launch as a global work size (`grid`, in
//! work-items) and a work-group size (`block`). The HSA dispatch packet
//! takes both directly; the CUDA driver wants a block count, computed
//! here with ceiling division so the blocks always cover the full
//! problem domain even when the problem size is not a multiple of the
//! block size.

/// Work-groups needed to cover `items` work-items with groups of `group`.
pub fn div_up(items: u32, group: u32) -> u32 {
    debug_assert!(group > 0);
    (items + group - 1) / group
}

/// Per-dimension block counts for a (grid, block) pair. Zero extents are
/// treated as one so a degenerate dimension still dispatches.
pub fn blocks(grid: [u32; 3], block: [u32; 3]) -> [u32; 3] {
    let mut counts = [0u32; 3];
    for dim in 0..3 {
        counts[dim] = div_up(grid[dim].max(1), block[dim].max(1));
    }
    counts
}

/// Number of significant dispatch dimensions for a global work size.
pub fn dimensions(grid: [u32; 3]) -> u16 {
    if grid[2] > 1 {
        3
    } else if grid[1] > 1 {
        2
    } else {
        1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocks_cover_the_domain() {
        for &(items, group) in &[
            (1u32, 1u32),
            (1000, 32),
            (1024, 32),
            (1, 256),
            (255, 256),
            (257, 256),
            (1 << 20, 128),
        ] {
            let count = div_up(items, group);
            assert!(count * group >= items, "{} x {}", items, group);
            // Not over-covering by a whole group:
            assert!((count - 1) * group < items);
        }
    }

    #[test]
    fn non_multiple_problem_rounds_up() {
        assert_eq!(blocks([1000, 1, 1], [32, 1, 1]), [32, 1, 1]);
        assert_eq!(blocks([1024, 1, 1], [32, 1, 1]), [32, 1, 1]);
    }

    #[test]
    fn degenerate_extents_dispatch_once() {
        assert_eq!(blocks([0, 0, 0], [0, 0, 0]), [1, 1, 1]);
    }

    #[test]
    fn dimension_count() {
        assert_eq!(dimensions([1024, 1, 1]), 1);
        assert_eq!(dimensions([64, 64, 1]), 2);
        assert_eq!(dimensions([8, 8, 8]), 3);
    }
}
