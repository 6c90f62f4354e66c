//! Small CSS value helpers: blur radii inside filter lists and time lists.

const PX_PER_EM: f64 = 16.0;

/// Radius in px of the first `blur(...)` function in a filter list.
pub fn blur_radius_px(filter: &str) -> Option<f64> {
    let (start, end) = blur_span(filter)?;
    parse_length_px(&filter[start + "blur(".len()..end])
}

/// Replaces the first `blur(...)` with `blur(<radius>px)`, keeping every other
/// filter function. A zero radius drops the blur; an emptied list is `none`.
pub fn replace_blur(filter: &str, radius_px: f64) -> String {
    let Some((start, end)) = blur_span(filter) else {
        return filter.to_string();
    };
    let replacement = if radius_px <= 0.0 {
        String::new()
    } else {
        format!("blur({}px)", format_number(radius_px))
    };
    let rebuilt = format!("{}{}{}", &filter[..start], replacement, &filter[end + 1..]);
    let collapsed = rebuilt.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        "none".to_string()
    } else {
        collapsed
    }
}

fn blur_span(filter: &str) -> Option<(usize, usize)> {
    let start = filter.find("blur(")?;
    let end = start + filter[start..].find(')')?;
    Some((start, end))
}

fn parse_length_px(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Some(0.0);
    }
    let (number, scale) = if let Some(n) = raw.strip_suffix("rem") {
        (n, PX_PER_EM)
    } else if let Some(n) = raw.strip_suffix("em") {
        (n, PX_PER_EM)
    } else if let Some(n) = raw.strip_suffix("px") {
        (n, 1.0)
    } else {
        (raw, 1.0)
    };
    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(|v| v * scale)
}

/// Parses a comma-separated CSS time list (`"0.6s, 300ms"`) into seconds.
/// Returns `None` if any entry is malformed.
pub fn parse_time_list_s(raw: &str) -> Option<Vec<f64>> {
    raw.split(',').map(parse_time_s).collect()
}

fn parse_time_s(raw: &str) -> Option<f64> {
    let raw = raw.trim();
    let (number, scale) = if let Some(n) = raw.strip_suffix("ms") {
        (n, 0.001)
    } else if let Some(n) = raw.strip_suffix('s') {
        (n, 1.0)
    } else {
        return None;
    };
    number
        .trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
        .map(|v| v * scale)
}

pub fn format_time_list_s(values: &[f64]) -> String {
    values
        .iter()
        .map(|v| format!("{}s", format_number(*v)))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Up to three decimals, trailing zeros trimmed.
pub fn format_number(value: f64) -> String {
    let formatted = format!("{value:.3}");
    let trimmed = formatted.trim_end_matches('0').trim_end_matches('.');
    if trimmed.is_empty() || trimmed == "-0" {
        "0".to_string()
    } else {
        trimmed.to_string()
    }
}
