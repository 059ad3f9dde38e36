//! Currency display helpers.

/// Format `amount` as `"{symbol} 1,234.50"`, rounded to `decimals` places.
pub fn format_money(amount: f64, symbol: &str, decimals: usize) -> String {
    let rounded = format!("{:.*}", decimals, amount);
    let (sign, unsigned) = match rounded.strip_prefix('-') {
        // "-0" / "-0.00" after rounding is just zero.
        Some(rest) if rest.chars().any(|c| c.is_ascii_digit() && c != '0') => ("-", rest),
        Some(rest) => ("", rest),
        None => ("", rounded.as_str()),
    };
    let (int_part, frac_part) = match unsigned.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (unsigned, None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    match frac_part {
        Some(frac) => format!("{symbol} {sign}{grouped}.{frac}"),
        None => format!("{symbol} {sign}{grouped}"),
    }
}

/// Pesos with no decimals, the register's display default.
pub fn pesos(amount: f64) -> String {
    format_money(amount, "$", 0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_thousands() {
        assert_eq!(format_money(45924.457, "$", 0), "$ 45,924");
        assert_eq!(format_money(1_234_567.0, "$", 0), "$ 1,234,567");
        assert_eq!(format_money(999.0, "$", 0), "$ 999");
    }

    #[test]
    fn keeps_decimals_and_sign() {
        assert_eq!(format_money(45924.457, "RD$", 2), "RD$ 45,924.46");
        assert_eq!(format_money(-1234.5, "$", 2), "$ -1,234.50");
        assert_eq!(pesos(-500.0), "$ -500");
    }

    #[test]
    fn negative_zero_is_plain_zero() {
        assert_eq!(format_money(-0.2, "$", 0), "$ 0");
    }
}
