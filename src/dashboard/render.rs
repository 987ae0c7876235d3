use std::fmt::Write;

use crate::orchestrator::DashboardState;

use super::Selection;

const DATE_WIDTH: usize = 12;
const MIN_PRICE_WIDTH: usize = 14;

/// Formats a price with en-US digit grouping. Prices that stay below a
/// dollar after rounding keep six decimals so small-cap coins don't
/// collapse to zero.
pub fn format_price(value: f64) -> String {
    if !value.is_finite() {
        return value.to_string();
    }
    let fine = format!("{:.6}", value.abs());
    let formatted = if fine.starts_with("0.") {
        fine
    } else {
        format!("{:.2}", value.abs())
    };
    let (int_part, frac_part) = formatted.split_once('.').unwrap_or((formatted.as_str(), ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 { "-" } else { "" };
    if frac_part.is_empty() {
        format!("{}{}", sign, grouped)
    } else {
        format!("{}{}.{}", sign, grouped, frac_part)
    }
}

pub fn format_usd(value: f64) -> String {
    format!("${}", format_price(value))
}

pub fn render(selection: &Selection, state: &DashboardState) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "== {} | {} days ({}) ==",
        selection.coins.join(", ").to_uppercase(),
        selection.range_days,
        selection.interval
    );

    if state.is_loading() {
        let _ = writeln!(out, "Loading...");
        return out;
    }
    if let Some(message) = state.error_message() {
        let _ = writeln!(out, "Error: {}", message);
        return out;
    }

    if let Some(price) = state.price {
        let coin = state
            .series
            .coins()
            .next()
            .map(str::to_uppercase)
            .unwrap_or_default();
        let _ = writeln!(out, "Current {} Price: {}", coin, format_usd(price));
    }

    if state.rows.is_empty() {
        return out;
    }

    let coins: Vec<&str> = state.series.coins().collect();
    let widths: Vec<usize> = coins
        .iter()
        .map(|c| c.len().max(MIN_PRICE_WIDTH))
        .collect();

    let _ = write!(out, "{:<width$}", "Date", width = DATE_WIDTH);
    for (coin, width) in coins.iter().zip(&widths) {
        let _ = write!(out, " {:>width$}", coin, width = *width);
    }
    out.push('\n');

    for row in &state.rows {
        let _ = write!(out, "{:<width$}", row.date, width = DATE_WIDTH);
        for (coin, width) in coins.iter().zip(&widths) {
            let cell = row.price(coin).map(format_price).unwrap_or_default();
            let _ = write!(out, " {:>width$}", cell, width = *width);
        }
        out.push('\n');
    }
    out
}
