// Kubernetes resource quantity syntax: a decimal number followed by an
// optional SI suffix or exponent.
const SUFFIXES: &[&str] = &[
    "", "Ki", "Mi", "Gi", "Ti", "Pi", "Ei", "n", "u", "m", "k", "M", "G", "T", "P", "E",
];

pub(crate) fn check_quantity(name: &str, value: &str) -> anyhow::Result<()> {
    if !is_quantity(value) {
        anyhow::bail!("{name} value is invalid: '{value}' is not a resource quantity");
    }
    Ok(())
}

fn is_quantity(value: &str) -> bool {
    let unsigned = value.strip_prefix(['+', '-']).unwrap_or(value);
    let number_len = unsigned
        .find(|c: char| !(c.is_ascii_digit() || c == '.'))
        .unwrap_or(unsigned.len());
    let (number, suffix) = unsigned.split_at(number_len);
    is_decimal(number) && (SUFFIXES.contains(&suffix) || is_exponent(suffix))
}

fn is_decimal(number: &str) -> bool {
    let all_digits = |s: &str| s.chars().all(|c| c.is_ascii_digit());
    match number.split_once('.') {
        None => !number.is_empty() && all_digits(number),
        Some((whole, fraction)) => {
            !(whole.is_empty() && fraction.is_empty()) && all_digits(whole) && all_digits(fraction)
        }
    }
}

fn is_exponent(suffix: &str) -> bool {
    let Some(rest) = suffix.strip_prefix(['e', 'E']) else {
        return false;
    };
    let digits = rest.strip_prefix(['+', '-']).unwrap_or(rest);
    !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit())
}
