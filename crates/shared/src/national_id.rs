pub const NATIONAL_ID_DIGITS: usize = 13;

/// Digit offsets that are preceded by a dash: `X-XXXX-XXXXX-XX-X`.
const SEPARATOR_BEFORE: [usize; 4] = [1, 5, 10, 12];

/// Formats raw input as a national ID. Non-digits are discarded and input beyond
/// 13 digits is truncated, so formatting an already formatted value is a no-op.
pub fn format_national_id(raw: &str) -> String {
    let mut formatted = String::with_capacity(NATIONAL_ID_DIGITS + SEPARATOR_BEFORE.len());
    for (index, digit) in raw
        .chars()
        .filter(char::is_ascii_digit)
        .take(NATIONAL_ID_DIGITS)
        .enumerate()
    {
        if SEPARATOR_BEFORE.contains(&index) {
            formatted.push('-');
        }
        formatted.push(digit);
    }
    formatted
}

pub fn digits(value: &str) -> String {
    value.chars().filter(char::is_ascii_digit).collect()
}

pub fn is_complete(value: &str) -> bool {
    value.chars().filter(char::is_ascii_digit).count() == NATIONAL_ID_DIGITS
}

#[cfg(test)]
#[path = "tests/national_id_tests.rs"]
mod tests;
