/// Parses a Kubernetes quantity ("500m", "0.5", "128Mi", "1e3") into nano units.
///
/// `None` when the string is not a quantity or cannot be represented exactly.
pub fn parse_nanos(quantity: &str) -> Option<i128> {
    let quantity = quantity.trim();
    let split = quantity
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '+' || c == '-'))
        .unwrap_or(quantity.len());
    let (number, suffix) = quantity.split_at(split);

    let (negative, number) = match number.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, number.strip_prefix('+').unwrap_or(number)),
    };
    let (whole, fraction) = number.split_once('.').unwrap_or((number, ""));
    if whole.is_empty() && fraction.is_empty() {
        return None;
    }
    if !whole.chars().chain(fraction.chars()).all(|c| c.is_ascii_digit()) {
        return None;
    }
    let digits: i128 = format!("{whole}{fraction}").parse().ok()?;

    let (exp10, binary) = match suffix {
        "" => (0, 1),
        "n" => (-9, 1),
        "u" => (-6, 1),
        "m" => (-3, 1),
        "k" => (3, 1),
        "M" => (6, 1),
        "G" => (9, 1),
        "T" => (12, 1),
        "P" => (15, 1),
        "E" => (18, 1),
        "Ki" => (0, 1i128 << 10),
        "Mi" => (0, 1i128 << 20),
        "Gi" => (0, 1i128 << 30),
        "Ti" => (0, 1i128 << 40),
        "Pi" => (0, 1i128 << 50),
        "Ei" => (0, 1i128 << 60),
        exponent => {
            let exponent = exponent.strip_prefix(['e', 'E'])?;
            (exponent.parse::<i32>().ok()?, 1)
        }
    };

    let scale = 9 + exp10 - i32::try_from(fraction.len()).ok()?;
    let mut value = digits.checked_mul(binary)?;
    if scale >= 0 {
        value = value.checked_mul(10i128.checked_pow(u32::try_from(scale).ok()?)?)?;
    } else {
        let divisor = 10i128.checked_pow(scale.unsigned_abs())?;
        if value % divisor != 0 {
            return None;
        }
        value /= divisor;
    }
    Some(if negative { -value } else { value })
}

/// True when both strings denote the same quantity, whatever their notation.
pub fn same_quantity(left: &str, right: &str) -> bool {
    if left == right {
        return true;
    }
    match (parse_nanos(left), parse_nanos(right)) {
        (Some(left), Some(right)) => left == right,
        _ => false,
    }
}
