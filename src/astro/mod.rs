//! Chart summary for the report prompt.
//!
//! Positions are computed elsewhere (an ephemeris is not part of this job)
//! and handed in as JSON. This module only interprets them: signs, houses,
//! retrogrades, major aspects and the moon phase, rendered as text sections
//! the generative model can read.

pub mod aspects;
pub mod moon;
pub mod zodiac;

use std::path::Path;

use serde::Deserialize;

use crate::error::{ChartError, ConfigError};

pub const SUN: &str = "Sun";
pub const MOON: &str = "Moon";
pub const NORTH_NODE: &str = "North Node";
pub const SOUTH_NODE: &str = "South Node";

/// A named point with its ecliptic longitude (degrees) and daily motion.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Point {
    pub name: String,
    pub longitude: f64,
    /// Degrees per day; negative means retrograde.
    #[serde(default)]
    pub speed: f64,
}

impl Point {
    pub fn is_retrograde(&self) -> bool {
        self.speed < 0.0
    }
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NatalChart {
    #[serde(default)]
    pub points: Vec<Point>,
    /// Cusps of houses 1 through 12.
    #[serde(default)]
    pub houses: Option<Vec<f64>>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TransitChart {
    #[serde(default)]
    pub geocentric: Vec<Point>,
    #[serde(default)]
    pub heliocentric: Vec<Point>,
}

/// Natal and transit positions for one report.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Chart {
    #[serde(default)]
    pub natal: NatalChart,
    #[serde(default)]
    pub transit: TransitChart,
}

impl Chart {
    /// Read and validate chart JSON from disk.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        let chart = Self::from_json(&raw)?;
        tracing::debug!(
            path = %path.display(),
            natal_points = chart.natal.points.len(),
            transit_points = chart.transit.geocentric.len(),
            "Loaded chart data"
        );
        Ok(chart)
    }

    /// Parse, validate, normalize longitudes and derive the south node.
    pub fn from_json(raw: &str) -> Result<Self, ChartError> {
        let mut chart: Chart = serde_json::from_str(raw)?;

        if let Some(houses) = &mut chart.natal.houses {
            if houses.len() != 12 {
                return Err(ChartError::HouseCount(houses.len()));
            }
            for (i, cusp) in houses.iter_mut().enumerate() {
                if !cusp.is_finite() {
                    return Err(ChartError::NonFinite {
                        name: format!("house {}", i + 1),
                    });
                }
                *cusp = zodiac::normalize(*cusp);
            }
        }

        for points in [
            &mut chart.natal.points,
            &mut chart.transit.geocentric,
            &mut chart.transit.heliocentric,
        ] {
            normalize_points(points.as_mut_slice())?;
            derive_south_node(points);
        }

        Ok(chart)
    }

    /// Text block substituted for `{astro_data}` in the prompt.
    pub fn summary(&self) -> String {
        let natal = &self.natal.points;
        let geo = &self.transit.geocentric;
        let helio = &self.transit.heliocentric;

        let mut sections = Vec::new();

        if !geo.is_empty() {
            sections.push(moon::moon_section(
                longitude_of(geo, SUN),
                longitude_of(geo, MOON),
                longitude_of(geo, NORTH_NODE),
            ));
        }
        if !natal.is_empty() {
            sections.push(positions_section("Your natal positions", natal));
        }
        if let Some(houses) = &self.natal.houses {
            sections.push(houses_section("Your natal houses", houses));
        }
        if !geo.is_empty() {
            sections.push(positions_section("Today's positions (geocentric)", geo));
        }
        if !helio.is_empty() {
            sections.push(positions_section("Today's positions (heliocentric)", helio));
        }
        if !natal.is_empty() {
            sections.push(aspects::aspects_within("Your natal aspects", natal, "N."));
        }
        if !geo.is_empty() {
            sections.push(aspects::aspects_within(
                "Today's sky (transit aspects)",
                geo,
                "T.",
            ));
        }
        if !geo.is_empty() && !natal.is_empty() {
            sections.push(aspects::aspects_between(
                "Influences on you (transit to natal)",
                geo,
                "today's ",
                natal,
                "your ",
            ));
        }

        sections.join("\n\n")
    }
}

fn normalize_points(points: &mut [Point]) -> Result<(), ChartError> {
    for point in points.iter_mut() {
        if !point.longitude.is_finite() || !point.speed.is_finite() {
            return Err(ChartError::NonFinite {
                name: point.name.clone(),
            });
        }
        point.longitude = zodiac::normalize(point.longitude);
    }
    Ok(())
}

/// The south node sits exactly opposite the north node.
fn derive_south_node(points: &mut Vec<Point>) {
    if points.iter().any(|p| p.name == SOUTH_NODE) {
        return;
    }
    if let Some(index) = points.iter().position(|p| p.name == NORTH_NODE) {
        let north = &points[index];
        let south = Point {
            name: SOUTH_NODE.to_string(),
            longitude: zodiac::normalize(north.longitude + 180.0),
            speed: north.speed,
        };
        points.insert(index + 1, south);
    }
}

fn longitude_of(points: &[Point], name: &str) -> Option<f64> {
    points.iter().find(|p| p.name == name).map(|p| p.longitude)
}

fn positions_section(title: &str, points: &[Point]) -> String {
    let mut lines = vec![format!("### {title}")];
    for point in points {
        let marker = if point.is_retrograde() { "(R)" } else { "" };
        lines.push(format!(
            "- {}{marker}: {}",
            point.name,
            zodiac::format_longitude(point.longitude)
        ));
    }
    lines.join("\n")
}

fn houses_section(title: &str, cusps: &[f64]) -> String {
    let mut lines = vec![format!("### {title}")];
    for (i, cusp) in cusps.iter().enumerate() {
        lines.push(format!(
            "- House {}: {}",
            i + 1,
            zodiac::format_longitude(*cusp)
        ));
    }
    lines.join("\n")
}
