//! Named colors, custom color parsing and the colormaps used for grouped charts.

use color_eyre::eyre::eyre;
use color_eyre::Result;
use plotters::style::RGBColor;

use crate::chart_settings::Colormap;

/// Colors selectable by name, in menu order.
pub const NAMED_COLORS: &[(&str, RGBColor)] = &[
    ("blue", RGBColor(0, 0, 255)),
    ("red", RGBColor(255, 0, 0)),
    ("green", RGBColor(0, 128, 0)),
    ("orange", RGBColor(255, 165, 0)),
    ("purple", RGBColor(128, 0, 128)),
    ("cyan", RGBColor(0, 255, 255)),
    ("black", RGBColor(0, 0, 0)),
    ("gray", RGBColor(128, 128, 128)),
    ("pink", RGBColor(255, 192, 203)),
    ("brown", RGBColor(165, 42, 42)),
    ("lime", RGBColor(0, 255, 0)),
    ("olive", RGBColor(128, 128, 0)),
    ("navy", RGBColor(0, 0, 128)),
    ("teal", RGBColor(0, 128, 128)),
    ("maroon", RGBColor(128, 0, 0)),
];

const FALLBACK: RGBColor = RGBColor(0, 0, 255);

/// Slice colors for pie charts, cycled.
pub const DEFAULT_CYCLE: [RGBColor; 10] = [
    RGBColor(0x1f, 0x77, 0xb4),
    RGBColor(0xff, 0x7f, 0x0e),
    RGBColor(0x2c, 0xa0, 0x2c),
    RGBColor(0xd6, 0x27, 0x28),
    RGBColor(0x94, 0x67, 0xbd),
    RGBColor(0x8c, 0x56, 0x4b),
    RGBColor(0xe3, 0x77, 0xc2),
    RGBColor(0x7f, 0x7f, 0x7f),
    RGBColor(0xbc, 0xbd, 0x22),
    RGBColor(0x17, 0xbe, 0xcf),
];

/// Parse a named color (case-insensitive), `#rrggbb`, `#rgb` or `rgb(r, g, b)`.
pub fn parse_color(s: &str) -> Result<RGBColor> {
    let trimmed = s.trim();
    let lower = trimmed.to_lowercase();

    if let Some(hex) = lower.strip_prefix('#') {
        return parse_hex(hex).ok_or_else(|| {
            eyre!(
                "Invalid hex color: '{}'. Expected format: #rrggbb or #rgb",
                trimmed
            )
        });
    }

    if let Some(inner) = lower
        .strip_prefix("rgb(")
        .and_then(|rest| rest.strip_suffix(')'))
    {
        let parts: Vec<&str> = inner.split(',').map(str::trim).collect();
        if let [r, g, b] = parts.as_slice() {
            if let (Ok(r), Ok(g), Ok(b)) = (r.parse::<u8>(), g.parse::<u8>(), b.parse::<u8>()) {
                return Ok(RGBColor(r, g, b));
            }
        }
        return Err(eyre!(
            "Invalid rgb color: '{}'. Expected format: rgb(0-255, 0-255, 0-255)",
            trimmed
        ));
    }

    let alias = match lower.as_str() {
        "grey" => "gray",
        other => other,
    };
    NAMED_COLORS
        .iter()
        .find(|(name, _)| *name == alias)
        .map(|(_, c)| *c)
        .ok_or_else(|| eyre!("Unknown color: '{}'", trimmed))
}

fn parse_hex(hex: &str) -> Option<RGBColor> {
    if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    match hex.len() {
        6 => Some(RGBColor(
            u8::from_str_radix(&hex[0..2], 16).ok()?,
            u8::from_str_radix(&hex[2..4], 16).ok()?,
            u8::from_str_radix(&hex[4..6], 16).ok()?,
        )),
        3 => {
            let digit = |i: usize| u8::from_str_radix(&hex[i..i + 1], 16).ok().map(|d| d * 17);
            Some(RGBColor(digit(0)?, digit(1)?, digit(2)?))
        }
        _ => None,
    }
}

/// The color text that wins: the custom value when non-blank, else the named one.
pub fn resolve_color_name(named: &str, custom: &str) -> String {
    let custom = custom.trim();
    if custom.is_empty() {
        named.to_string()
    } else {
        custom.to_string()
    }
}

/// Resolve a named/custom color pair. An unparsable custom color falls back to the
/// named color and is returned as the second element so the caller can warn.
pub fn resolve_color(named: &str, custom: &str) -> (RGBColor, Option<String>) {
    let base = parse_color(named).unwrap_or(FALLBACK);
    let custom = custom.trim();
    if custom.is_empty() {
        return (base, None);
    }
    match parse_color(custom) {
        Ok(c) => (c, None),
        Err(e) => {
            log::warn!("{}", e);
            (base, Some(custom.to_string()))
        }
    }
}

/// Continuous maps are sampled at evenly spaced interior points.
const SAMPLED_COLORS: usize = 6;

const VIRIDIS: [RGBColor; 5] = [
    RGBColor(0x44, 0x01, 0x54),
    RGBColor(0x3b, 0x52, 0x8b),
    RGBColor(0x21, 0x91, 0x8c),
    RGBColor(0x5e, 0xc9, 0x62),
    RGBColor(0xfd, 0xe7, 0x25),
];
const PLASMA: [RGBColor; 5] = [
    RGBColor(0x0d, 0x08, 0x87),
    RGBColor(0x7e, 0x03, 0xa8),
    RGBColor(0xcc, 0x47, 0x78),
    RGBColor(0xf8, 0x95, 0x40),
    RGBColor(0xf0, 0xf9, 0x21),
];
const INFERNO: [RGBColor; 5] = [
    RGBColor(0x00, 0x00, 0x04),
    RGBColor(0x57, 0x10, 0x6e),
    RGBColor(0xbc, 0x37, 0x54),
    RGBColor(0xf9, 0x8e, 0x09),
    RGBColor(0xfc, 0xff, 0xa4),
];
const MAGMA: [RGBColor; 5] = [
    RGBColor(0x00, 0x00, 0x04),
    RGBColor(0x51, 0x12, 0x7c),
    RGBColor(0xb7, 0x37, 0x79),
    RGBColor(0xfc, 0x89, 0x61),
    RGBColor(0xfc, 0xfd, 0xbf),
];
const CIVIDIS: [RGBColor; 5] = [
    RGBColor(0x00, 0x22, 0x4e),
    RGBColor(0x43, 0x4e, 0x6c),
    RGBColor(0x7d, 0x7c, 0x78),
    RGBColor(0xbc, 0xaf, 0x6f),
    RGBColor(0xfe, 0xe8, 0x38),
];
const PASTEL1: [RGBColor; 9] = [
    RGBColor(0xfb, 0xb4, 0xae),
    RGBColor(0xb3, 0xcd, 0xe3),
    RGBColor(0xcc, 0xeb, 0xc5),
    RGBColor(0xde, 0xcb, 0xe4),
    RGBColor(0xfe, 0xd9, 0xa6),
    RGBColor(0xff, 0xff, 0xcc),
    RGBColor(0xe5, 0xd8, 0xbd),
    RGBColor(0xfd, 0xda, 0xec),
    RGBColor(0xf2, 0xf2, 0xf2),
];
const SET3: [RGBColor; 12] = [
    RGBColor(0x8d, 0xd3, 0xc7),
    RGBColor(0xff, 0xff, 0xb3),
    RGBColor(0xbe, 0xba, 0xda),
    RGBColor(0xfb, 0x80, 0x72),
    RGBColor(0x80, 0xb1, 0xd3),
    RGBColor(0xfd, 0xb4, 0x62),
    RGBColor(0xb3, 0xde, 0x69),
    RGBColor(0xfc, 0xcd, 0xe5),
    RGBColor(0xd9, 0xd9, 0xd9),
    RGBColor(0xbc, 0x80, 0xbd),
    RGBColor(0xcc, 0xeb, 0xc5),
    RGBColor(0xff, 0xed, 0x6f),
];

fn sample(anchors: &[RGBColor], t: f64) -> RGBColor {
    let t = t.clamp(0.0, 1.0) * (anchors.len() - 1) as f64;
    let i = (t.floor() as usize).min(anchors.len() - 2);
    let f = t - i as f64;
    let lerp = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * f).round() as u8;
    let (a, b) = (anchors[i], anchors[i + 1]);
    RGBColor(lerp(a.0, b.0), lerp(a.1, b.1), lerp(a.2, b.2))
}

/// The palette of a colormap: qualitative maps as-is, continuous maps sampled.
/// `None` for [`Colormap::None`].
pub fn palette(cmap: Colormap) -> Option<Vec<RGBColor>> {
    let anchors: &[RGBColor] = match cmap {
        Colormap::None => return None,
        Colormap::Pastel1 => return Some(PASTEL1.to_vec()),
        Colormap::Set3 => return Some(SET3.to_vec()),
        Colormap::Viridis => &VIRIDIS,
        Colormap::Plasma => &PLASMA,
        Colormap::Inferno => &INFERNO,
        Colormap::Magma => &MAGMA,
        Colormap::Cividis => &CIVIDIS,
    };
    Some(
        (1..=SAMPLED_COLORS)
            .map(|i| sample(anchors, i as f64 / (SAMPLED_COLORS + 1) as f64))
            .collect(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_named_and_hex() {
        assert_eq!(parse_color("Navy").unwrap(), RGBColor(0, 0, 128));
        assert_eq!(parse_color("grey").unwrap(), RGBColor(128, 128, 128));
        assert_eq!(parse_color("#FF8000").unwrap(), RGBColor(255, 128, 0));
        assert_eq!(parse_color("#f80").unwrap(), RGBColor(255, 136, 0));
        assert_eq!(parse_color("rgb(1, 2, 3)").unwrap(), RGBColor(1, 2, 3));
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(parse_color("#12345").is_err());
        assert!(parse_color("#gggggg").is_err());
        assert!(parse_color("rgb(1,2)").is_err());
        assert!(parse_color("rgb(1,2,300)").is_err());
        assert!(parse_color("chartreuse-ish").is_err());
    }

    #[test]
    fn test_custom_overrides_named() {
        assert_eq!(resolve_color_name("blue", "  "), "blue");
        assert_eq!(resolve_color_name("blue", "#123456"), "#123456");
        assert_eq!(resolve_color("red", ""), (RGBColor(255, 0, 0), None));
        assert_eq!(
            resolve_color("red", "#00ff00"),
            (RGBColor(0, 255, 0), None)
        );
        let (color, bad) = resolve_color("red", "nonsense");
        assert_eq!(color, RGBColor(255, 0, 0));
        assert_eq!(bad.as_deref(), Some("nonsense"));
    }

    #[test]
    fn test_palettes() {
        assert!(palette(Colormap::None).is_none());
        assert_eq!(palette(Colormap::Set3).map(|p| p.len()), Some(12));
        let viridis = palette(Colormap::Viridis).unwrap();
        assert_eq!(viridis.len(), SAMPLED_COLORS);
        assert_ne!(viridis[0], viridis[5]);
    }

    #[test]
    fn test_sample_hits_anchors() {
        assert_eq!(sample(&VIRIDIS, 0.0), VIRIDIS[0]);
        assert_eq!(sample(&VIRIDIS, 1.0), VIRIDIS[4]);
        assert_eq!(sample(&VIRIDIS, 0.5), VIRIDIS[2]);
    }
}
