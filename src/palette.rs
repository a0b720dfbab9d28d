//! Master color palette and the per-group color allocator.
//!
//! The master list is partitioned into disjoint 6-color slices, one per
//! group index, so pins from different groups are always distinguishable
//! on the same drawing. Within one group index a color may be held by at
//! most one pin across *all* plans of the order: the allocator treats the
//! pool as reserved, not per-plan.
//!
//! The set of colors in use is always derived from the store at call
//! time and never cached; the caller passes it in, keeping allocation
//! pure and staleness impossible.

use std::collections::HashSet;

use crate::constants::MAX_PINS_PER_GROUP;

/// A named entry of the master palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaletteColor {
    /// Human-readable name shown in the color picker.
    pub name: &'static str,
    /// Lowercase hex value, the canonical wire representation.
    pub hex: &'static str,
}

/// The fixed ordered master palette. Six slices of six colors; slice `g`
/// belongs to group index `g`.
pub const MASTER_PALETTE: [PaletteColor; 36] = [
    // Group 0
    PaletteColor { name: "Red", hex: "#e6194b" },
    PaletteColor { name: "Blue", hex: "#4363d8" },
    PaletteColor { name: "Green", hex: "#3cb44b" },
    PaletteColor { name: "Orange", hex: "#f58231" },
    PaletteColor { name: "Purple", hex: "#911eb4" },
    PaletteColor { name: "Cyan", hex: "#42d4f4" },
    // Group 1
    PaletteColor { name: "Magenta", hex: "#f032e6" },
    PaletteColor { name: "Lime", hex: "#bfef45" },
    PaletteColor { name: "Pink", hex: "#fabed4" },
    PaletteColor { name: "Teal", hex: "#469990" },
    PaletteColor { name: "Lavender", hex: "#dcbeff" },
    PaletteColor { name: "Brown", hex: "#9a6324" },
    // Group 2
    PaletteColor { name: "Beige", hex: "#fffac8" },
    PaletteColor { name: "Maroon", hex: "#800000" },
    PaletteColor { name: "Mint", hex: "#aaffc3" },
    PaletteColor { name: "Olive", hex: "#808000" },
    PaletteColor { name: "Apricot", hex: "#ffd8b1" },
    PaletteColor { name: "Navy", hex: "#000075" },
    // Group 3
    PaletteColor { name: "Yellow", hex: "#ffe119" },
    PaletteColor { name: "Grey", hex: "#a9a9a9" },
    PaletteColor { name: "Coral", hex: "#ff7f50" },
    PaletteColor { name: "Indigo", hex: "#4b0082" },
    PaletteColor { name: "Turquoise", hex: "#40e0d0" },
    PaletteColor { name: "Crimson", hex: "#dc143c" },
    // Group 4
    PaletteColor { name: "Gold", hex: "#ffd700" },
    PaletteColor { name: "Steel Blue", hex: "#4682b4" },
    PaletteColor { name: "Orchid", hex: "#da70d6" },
    PaletteColor { name: "Sea Green", hex: "#2e8b57" },
    PaletteColor { name: "Chocolate", hex: "#d2691e" },
    PaletteColor { name: "Slate Blue", hex: "#6a5acd" },
    // Group 5
    PaletteColor { name: "Tomato", hex: "#ff6347" },
    PaletteColor { name: "Dodger Blue", hex: "#1e90ff" },
    PaletteColor { name: "Spring Green", hex: "#00ff7f" },
    PaletteColor { name: "Dark Orange", hex: "#ff8c00" },
    PaletteColor { name: "Deep Pink", hex: "#ff1493" },
    PaletteColor { name: "Cadet Blue", hex: "#5f9ea0" },
];

/// The 6-color slice owned by a group index.
///
/// Group indices beyond the number of slices wrap around, so the palette
/// stays total for any index.
pub fn group_palette(group: usize) -> &'static [PaletteColor] {
    let slices = MASTER_PALETTE.len().div_ceil(MAX_PINS_PER_GROUP);
    let start = (group % slices) * MAX_PINS_PER_GROUP;
    &MASTER_PALETTE[start..start + MAX_PINS_PER_GROUP]
}

/// First color of the group's slice not present in `used`.
///
/// Falls back to the slice's first color instead of blocking: the pin
/// count cap is the true limit, and a 6-color slice exactly matches the
/// 6-pin cap, so exhaustion only happens in degenerate restored states.
pub fn next_available(group: usize, used: &HashSet<String>) -> &'static str {
    let palette = group_palette(group);
    palette
        .iter()
        .find(|c| !used.contains(c.hex))
        .unwrap_or(&palette[0])
        .hex
}

/// Whether `hex` is free in the group given the colors currently in use.
pub fn is_available(group: usize, hex: &str, used: &HashSet<String>) -> bool {
    group_palette(group).iter().any(|c| c.hex == hex) && !used.contains(hex)
}

/// Display name for a palette hex value.
pub fn color_name(hex: &str) -> Option<&'static str> {
    MASTER_PALETTE.iter().find(|c| c.hex == hex).map(|c| c.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_slices_are_disjoint() {
        let mut seen = HashSet::new();
        for color in &MASTER_PALETTE {
            assert!(seen.insert(color.hex), "duplicate color {}", color.hex);
        }
        // Neighboring group slices share no colors
        for g in 0..5 {
            let a: HashSet<_> = group_palette(g).iter().map(|c| c.hex).collect();
            let b: HashSet<_> = group_palette(g + 1).iter().map(|c| c.hex).collect();
            assert!(a.is_disjoint(&b));
        }
    }

    #[test]
    fn test_group_palette_wraps() {
        assert_eq!(group_palette(0), group_palette(6));
        assert_eq!(group_palette(2), group_palette(8));
    }

    #[test]
    fn test_next_available_skips_used() {
        let mut used = HashSet::new();
        assert_eq!(next_available(0, &used), "#e6194b");

        used.insert("#e6194b".to_string());
        assert_eq!(next_available(0, &used), "#4363d8");
    }

    #[test]
    fn test_next_available_never_blocks() {
        let used: HashSet<String> = group_palette(1).iter().map(|c| c.hex.to_string()).collect();
        // All six taken: falls back to the slice's first color
        assert_eq!(next_available(1, &used), "#f032e6");
    }

    #[test]
    fn test_is_available_rejects_foreign_colors() {
        let used = HashSet::new();
        // A group 1 color is never available in group 0
        assert!(!is_available(0, "#f032e6", &used));
        assert!(is_available(0, "#3cb44b", &used));
    }

    #[test]
    fn test_color_name_lookup() {
        assert_eq!(color_name("#e6194b"), Some("Red"));
        assert_eq!(color_name("#123456"), None);
    }
}
