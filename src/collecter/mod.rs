//! RINEX production.

pub mod fd;
pub mod navigation;
pub mod observation;
pub mod settings;

/// Program name, as it appears in all headers
pub(crate) fn program() -> String {
    format!("GAR2RINEX {}", env!("CARGO_PKG_VERSION"))
}

/// One 80 column header line: content on 60 columns, then the label
pub(crate) fn header_line(content: &str, label: &str) -> String {
    format!("{:<60.60}{:<20.20}\n", content, label)
}

/// Legacy RINEX 2 floating point notation: the mantissa is written
/// 0.ddd..d with `digits` significant digits and the exponent
/// is introduced by 'D'. For example 1.5E-4 becomes " 0.150000000000D-03".
pub(crate) fn format_d(value: f64, digits: usize) -> String {
    let formatted = format!("{:.*e}", digits.saturating_sub(1), value);

    let (mantissa, exponent) = formatted.split_once('e').unwrap_or((&formatted, "0"));
    let exponent = exponent.parse::<i32>().unwrap_or(0) + 1;

    let (sign, mantissa) = match mantissa.strip_prefix('-') {
        Some(mantissa) => ('-', mantissa),
        None => (' ', mantissa),
    };

    let digits = mantissa.chars().filter(|c| *c != '.').collect::<String>();

    format!(
        "{}0.{}D{}{:02}",
        sign,
        digits,
        if exponent < 0 { '-' } else { '+' },
        exponent.abs()
    )
}
