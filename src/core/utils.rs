//! Small formatting helpers shared by prompts and summaries

/// Formats an amount as rupiah with comma thousands separators: `Rp.1,250,000`
pub fn format_rupiah(amount: i64) -> String {
    let digits = amount.unsigned_abs().to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    if amount < 0 {
        format!("-Rp.{}", grouped)
    } else {
        format!("Rp.{}", grouped)
    }
}

/// Masks all but the last four characters (`********5678`)
pub fn mask_tail(value: &str) -> String {
    let count = value.chars().count();
    if count <= 4 {
        return value.to_string();
    }
    let visible: String = value.chars().skip(count - 4).collect();
    format!("{}{}", "*".repeat(count - 4), visible)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_rupiah() {
        assert_eq!(format_rupiah(0), "Rp.0");
        assert_eq!(format_rupiah(999), "Rp.999");
        assert_eq!(format_rupiah(1_000), "Rp.1,000");
        assert_eq!(format_rupiah(10_000_000), "Rp.10,000,000");
        assert_eq!(format_rupiah(-25_000), "-Rp.25,000");
    }

    #[test]
    fn test_mask_tail() {
        assert_eq!(mask_tail("secret99"), "****et99");
        assert_eq!(mask_tail("abc"), "abc");
    }
}
