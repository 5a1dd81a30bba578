use anyhow::{anyhow, Context, Result};
use serde::Serialize;
use serde_json::{json, Value};
use std::fmt;
use std::str::FromStr;

pub const PALETTE_LEN: usize = 6;

/// Warm to cool: lowest rank (most crime) is bright red.
pub const DEFAULT_PALETTE: [&str; PALETTE_LEN] = [
    "rgba(255, 0, 0, 1)",     // bright red
    "rgba(255, 100, 0, 1)",   // reddish orange
    "rgba(255, 165, 0, 1)",   // orange
    "rgba(255, 200, 100, 1)", // light orange
    "rgba(135, 206, 250, 1)", // light sky blue
    "rgba(173, 216, 230, 1)", // light blue
];

pub const RANK_PROPERTY: &str = "crimeRank";

// Features with no joined rank are colored as if ranked 0
pub const MISSING_RANK: f64 = 0.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rgba {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: f64, // 0.0 - 1.0
}

impl Rgba {
    pub fn to_pixel(self) -> [u8; 4] {
        [self.r, self.g, self.b, (self.a.clamp(0.0, 1.0) * 255.0).round() as u8]
    }

    pub fn with_alpha(self, a: f64) -> Self {
        Self { a, ..self }
    }

    fn lerp(self, other: Rgba, t: f64) -> Rgba {
        let channel = |a: u8, b: u8| (a as f64 + (b as f64 - a as f64) * t).round() as u8;
        Rgba {
            r: channel(self.r, other.r),
            g: channel(self.g, other.g),
            b: channel(self.b, other.b),
            a: self.a + (other.a - self.a) * t,
        }
    }
}

impl fmt::Display for Rgba {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "rgba({}, {}, {}, {})", self.r, self.g, self.b, self.a)
    }
}

impl FromStr for Rgba {
    type Err = anyhow::Error;

    // #rgb, #rrggbb, rgb(r, g, b) or rgba(r, g, b, a)
    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if let Some(hex) = s.strip_prefix('#') {
            return parse_hex(hex);
        }

        let (body, expect_alpha) = if let Some(rest) = s.strip_prefix("rgba(") {
            (rest, true)
        } else if let Some(rest) = s.strip_prefix("rgb(") {
            (rest, false)
        } else {
            return Err(anyhow!("Unrecognised color: {:?}", s));
        };
        let body = body
            .strip_suffix(')')
            .ok_or_else(|| anyhow!("Unterminated color: {:?}", s))?;

        let parts: Vec<&str> = body.split(',').map(str::trim).collect();
        let expected = if expect_alpha { 4 } else { 3 };
        if parts.len() != expected {
            return Err(anyhow!("Expected {} components in {:?}", expected, s));
        }

        let channel = |p: &str| {
            p.parse::<u8>()
                .with_context(|| format!("Bad color channel {:?} in {:?}", p, s))
        };
        let a = if expect_alpha {
            let a: f64 = parts[3]
                .parse()
                .with_context(|| format!("Bad alpha {:?} in {:?}", parts[3], s))?;
            if !(0.0..=1.0).contains(&a) {
                return Err(anyhow!("Alpha out of range in {:?}", s));
            }
            a
        } else {
            1.0
        };

        Ok(Rgba {
            r: channel(parts[0])?,
            g: channel(parts[1])?,
            b: channel(parts[2])?,
            a,
        })
    }
}

fn parse_hex(hex: &str) -> Result<Rgba> {
    if !hex.is_ascii() {
        return Err(anyhow!("Bad hex color #{}", hex));
    }
    let digits: Vec<u8> = match hex.len() {
        3 => hex
            .chars()
            .map(|c| -> Result<u8> {
                let d = c.to_digit(16).ok_or_else(|| anyhow!("Bad hex color #{}", hex))? as u8;
                Ok(d * 17)
            })
            .collect::<Result<_>>()?,
        6 => (0..6)
            .step_by(2)
            .map(|i| {
                u8::from_str_radix(&hex[i..i + 2], 16)
                    .with_context(|| format!("Bad hex color #{}", hex))
            })
            .collect::<Result<_>>()?,
        _ => return Err(anyhow!("Bad hex color #{}", hex)),
    };
    Ok(Rgba {
        r: digits[0],
        g: digits[1],
        b: digits[2],
        a: 1.0,
    })
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ColorStop {
    pub threshold: f64,
    pub color: String,
}

pub fn build_interpolation(min: f64, max: f64) -> Vec<ColorStop> {
    build_interpolation_with(min, max, &DEFAULT_PALETTE)
}

/// Six evenly spaced stops from `min` to `max`. When `min == max` all
/// thresholds coincide, which the widget treats as a step.
pub fn build_interpolation_with<S: AsRef<str>>(
    min: f64,
    max: f64,
    palette: &[S],
) -> Vec<ColorStop> {
    let step = (max - min) / 5.0;
    palette
        .iter()
        .take(PALETTE_LEN)
        .enumerate()
        .map(|(i, color)| ColorStop {
            threshold: min + step * i as f64,
            color: color.as_ref().to_string(),
        })
        .collect()
}

pub fn flatten_stops(stops: &[ColorStop]) -> Vec<Value> {
    stops
        .iter()
        .flat_map(|s| [json!(s.threshold), json!(s.color)])
        .collect()
}

/// `["interpolate", ["linear"], ["coalesce", ["get", "crimeRank"], 0], ...]`
pub fn fill_color_expression(stops: &[ColorStop]) -> Value {
    let mut expr = vec![
        json!("interpolate"),
        json!(["linear"]),
        json!(["coalesce", ["get", RANK_PROPERTY], MISSING_RANK]),
    ];
    expr.extend(flatten_stops(stops));
    Value::Array(expr)
}

#[derive(Debug, Clone)]
pub struct ColorScale {
    stops: Vec<(f64, Rgba)>,
}

impl ColorScale {
    pub fn new(stops: &[ColorStop]) -> Result<Self> {
        if stops.is_empty() {
            return Err(anyhow!("A color scale needs at least one stop"));
        }
        let stops = stops
            .iter()
            .map(|s| -> Result<(f64, Rgba)> { Ok((s.threshold, s.color.parse()?)) })
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { stops })
    }

    // Clamps outside the first/last stop; missing rank counts as 0.
    pub fn color_at(&self, rank: Option<f64>) -> Rgba {
        let value = rank.unwrap_or(MISSING_RANK);
        let (first_t, first_c) = self.stops[0];
        let (last_t, last_c) = self.stops[self.stops.len() - 1];
        if value <= first_t {
            return first_c;
        }
        if value >= last_t {
            return last_c;
        }

        // Last stop at or below the value; the next one is strictly above.
        let lower = self
            .stops
            .iter()
            .rposition(|(t, _)| *t <= value)
            .unwrap_or(0);
        let (t0, c0) = self.stops[lower];
        let (t1, c1) = self.stops[lower + 1];
        c0.lerp(c1, (value - t0) / (t1 - t0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds(stops: &[ColorStop]) -> Vec<f64> {
        stops.iter().map(|s| s.threshold).collect()
    }

    #[test]
    fn test_example_thresholds() {
        let stops = build_interpolation(10.0, 50.0);
        assert_eq!(thresholds(&stops), vec![10.0, 18.0, 26.0, 34.0, 42.0, 50.0]);
        let colors: Vec<&str> = stops.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors, DEFAULT_PALETTE.to_vec());
    }

    #[test]
    fn test_flat_form_has_twelve_elements() {
        let flat = flatten_stops(&build_interpolation(1.0, 6976.0));
        assert_eq!(flat.len(), 12);
        assert_eq!(flat[0], json!(1.0));
        assert_eq!(flat[1], json!("rgba(255, 0, 0, 1)"));
        assert_eq!(flat[10], json!(6976.0));
        assert_eq!(flat[11], json!("rgba(173, 216, 230, 1)"));
    }

    #[test]
    fn test_thresholds_non_decreasing_with_endpoints() {
        for (min, max) in [(0.0, 1.0), (1.0, 6976.0), (-20.0, 35.5), (3.0, 3.0001)] {
            let t = thresholds(&build_interpolation(min, max));
            assert_eq!(t.len(), 6);
            assert!(t.windows(2).all(|w| w[0] <= w[1]));
            assert_eq!(t[0], min);
            assert!((t[5] - max).abs() < 1e-9);
        }
    }

    #[test]
    fn test_collapsed_scale() {
        let stops = build_interpolation(5.0, 5.0);
        assert_eq!(thresholds(&stops), vec![5.0; 6]);
        let colors: Vec<&str> = stops.iter().map(|s| s.color.as_str()).collect();
        assert_eq!(colors, DEFAULT_PALETTE.to_vec());
    }

    #[test]
    fn test_expression_shape() {
        let expr = fill_color_expression(&build_interpolation(0.0, 5.0));
        let items = expr.as_array().unwrap();
        assert_eq!(items.len(), 15);
        assert_eq!(items[0], json!("interpolate"));
        assert_eq!(items[1], json!(["linear"]));
        assert_eq!(items[2], json!(["coalesce", ["get", "crimeRank"], 0.0]));
    }

    #[test]
    fn test_parse_colors() {
        assert_eq!(
            "rgba(255, 100, 0, 1)".parse::<Rgba>().unwrap(),
            Rgba { r: 255, g: 100, b: 0, a: 1.0 }
        );
        assert_eq!("#000".parse::<Rgba>().unwrap(), Rgba { r: 0, g: 0, b: 0, a: 1.0 });
        assert_eq!(
            "#87cefa".parse::<Rgba>().unwrap(),
            Rgba { r: 135, g: 206, b: 250, a: 1.0 }
        );
        assert_eq!("rgb(1,2,3)".parse::<Rgba>().unwrap(), Rgba { r: 1, g: 2, b: 3, a: 1.0 });
        assert!("rgba(256, 0, 0, 1)".parse::<Rgba>().is_err());
        assert!("rgba(0, 0, 0)".parse::<Rgba>().is_err());
        assert!("#12".parse::<Rgba>().is_err());
        assert!("red".parse::<Rgba>().is_err());
    }

    #[test]
    fn test_display_matches_palette_format() {
        for color in DEFAULT_PALETTE {
            assert_eq!(color.parse::<Rgba>().unwrap().to_string(), color);
        }
    }

    #[test]
    fn test_color_at_stops_and_between() {
        let scale = ColorScale::new(&build_interpolation(10.0, 50.0)).unwrap();
        assert_eq!(scale.color_at(Some(10.0)), Rgba { r: 255, g: 0, b: 0, a: 1.0 });
        assert_eq!(scale.color_at(Some(50.0)), Rgba { r: 173, g: 216, b: 230, a: 1.0 });
        // Halfway between the first two stops.
        assert_eq!(scale.color_at(Some(14.0)), Rgba { r: 255, g: 50, b: 0, a: 1.0 });
        // Clamped on both sides.
        assert_eq!(scale.color_at(Some(-3.0)), scale.color_at(Some(10.0)));
        assert_eq!(scale.color_at(Some(9000.0)), scale.color_at(Some(50.0)));
    }

    #[test]
    fn test_color_at_missing_rank_coalesces_to_zero() {
        let scale = ColorScale::new(&build_interpolation(0.0, 50.0)).unwrap();
        assert_eq!(scale.color_at(None), scale.color_at(Some(0.0)));
    }

    #[test]
    fn test_color_at_collapsed_scale_is_step() {
        let scale = ColorScale::new(&build_interpolation(5.0, 5.0)).unwrap();
        assert_eq!(scale.color_at(Some(4.0)), Rgba { r: 255, g: 0, b: 0, a: 1.0 });
        assert_eq!(scale.color_at(Some(5.0)), Rgba { r: 255, g: 0, b: 0, a: 1.0 });
        assert_eq!(scale.color_at(Some(6.0)), Rgba { r: 173, g: 216, b: 230, a: 1.0 });
    }

    #[test]
    fn test_custom_palette() {
        let palette = ["#000", "#111", "#222", "#333", "#444", "#555"];
        let stops = build_interpolation_with(0.0, 10.0, &palette);
        assert_eq!(stops[3].color, "#333");
        assert_eq!(stops[3].threshold, 6.0);
    }

    #[test]
    fn test_to_pixel() {
        assert_eq!(
            Rgba { r: 1, g: 2, b: 3, a: 0.5 }.to_pixel(),
            [1, 2, 3, 128]
        );
        assert_eq!(Rgba { r: 0, g: 0, b: 0, a: 0.0 }.to_pixel(), [0, 0, 0, 0]);
    }
}
