//! Amount normalization. Bank templates use two separator conventions:
//! en-US (`15,000.00`) for most senders and decimal comma (`4 500,00`)
//! for Credix.

/// Parse an en-US formatted amount, stripping thousands commas.
pub fn parse_en(s: &str) -> Option<f64> {
    s.trim().replace(',', "").parse().ok()
}

/// Parse a decimal-comma amount: whitespace (including thousands
/// spaces) removed, first comma becomes the decimal point.
pub fn parse_decimal_comma(s: &str) -> Option<f64> {
    let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
    compact.replacen(',', ".", 1).parse().ok()
}
