//! Display helpers.

use humansize::{format_size, FormatSizeOptions, BINARY};

/// Human-readable byte count, e.g. `1.00 KiB`.
pub fn human_bytes(bytes: u64) -> String {
    format_size(bytes, BINARY)
}

/// Compact byte count for tight columns, e.g. `1.50KiB`.
pub fn human_bytes_compact(bytes: u64) -> String {
    let opts = FormatSizeOptions::from(BINARY).space_after_value(false);
    format_size(bytes, opts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_binary_units() {
        assert_eq!(human_bytes(0), "0 B");
        assert_eq!(human_bytes(1024), "1 KiB");
        assert_eq!(human_bytes(3 * 1024 * 1024), "3 MiB");
    }

    #[test]
    fn compact_variant_drops_the_space() {
        assert_eq!(human_bytes_compact(1024), "1KiB");
    }
}
