//! Ecliptic longitude helpers.

pub const DEGREES_PER_SIGN: f64 = 30.0;

pub const SIGN_NAMES: [&str; 12] = [
    "Aries",
    "Taurus",
    "Gemini",
    "Cancer",
    "Leo",
    "Virgo",
    "Libra",
    "Scorpio",
    "Sagittarius",
    "Capricorn",
    "Aquarius",
    "Pisces",
];

/// Fold any longitude into `[0, 360)`.
pub fn normalize(longitude: f64) -> f64 {
    let lon = longitude.rem_euclid(360.0);
    // rem_euclid can round up to exactly 360.0 for tiny negative inputs
    if lon >= 360.0 { 0.0 } else { lon }
}

/// Sign name and degree within the sign.
pub fn sign_of(longitude: f64) -> (&'static str, f64) {
    let lon = normalize(longitude);
    let index = ((lon / DEGREES_PER_SIGN) as usize).min(SIGN_NAMES.len() - 1);
    (SIGN_NAMES[index], lon - index as f64 * DEGREES_PER_SIGN)
}

/// `"Capricorn 3.45°"`.
pub fn format_longitude(longitude: f64) -> String {
    let (sign, degree) = sign_of(longitude);
    format!("{sign} {degree:.2}°")
}

/// Angular separation folded into `[0, 180]`.
pub fn separation(a: f64, b: f64) -> f64 {
    let diff = (normalize(a) - normalize(b)).abs();
    if diff > 180.0 { 360.0 - diff } else { diff }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_wraps_both_directions() {
        assert_eq!(normalize(370.0), 10.0);
        assert_eq!(normalize(-30.0), 330.0);
        assert_eq!(normalize(360.0), 0.0);
    }

    #[test]
    fn sign_boundaries() {
        assert_eq!(sign_of(0.0).0, "Aries");
        assert_eq!(sign_of(29.99).0, "Aries");
        assert_eq!(sign_of(30.0).0, "Taurus");
        assert_eq!(sign_of(359.9).0, "Pisces");
    }

    #[test]
    fn format_uses_degree_within_sign() {
        assert_eq!(format_longitude(273.456), "Capricorn 3.46°");
        assert_eq!(format_longitude(-0.5), "Pisces 29.50°");
    }

    #[test]
    fn separation_takes_the_short_way_round() {
        assert_eq!(separation(10.0, 350.0), 20.0);
        assert_eq!(separation(0.0, 180.0), 180.0);
        assert_eq!(separation(90.0, 30.0), 60.0);
    }
}
