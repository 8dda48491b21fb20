//! Tier table for the single product. This is the one authoritative price
//! source: both the charged amount and every displayed total come from here.

pub const UNIT_PRICE: i64 = 9_900;

// Totals in colones for 1..=5 units. Tiers are discounted, not linear.
const TIERS: [i64; 5] = [UNIT_PRICE, 16_900, 25_900, 33_900, 42_900];

pub fn clamp_quantity(quantity: i64) -> u32 {
    quantity.clamp(1, i64::from(u32::MAX)) as u32
}

/// Exact lookup against the tier table. Quantities past the table fall back
/// to the single-unit price rather than extrapolating: callers must not
/// assume the total scales with quantity.
pub fn price(quantity: i64) -> i64 {
    match clamp_quantity(quantity) {
        q @ 1..=5 => TIERS[(q - 1) as usize],
        _ => TIERS[0],
    }
}

/// "₡16.900"-style display amount.
pub fn format_crc(amount: i64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + 4);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(c);
    }
    format!("\u{20a1}{out}")
}
