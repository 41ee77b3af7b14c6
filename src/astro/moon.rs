//! Moon age and lunation events.

use super::zodiac::{normalize, separation};

pub const SYNODIC_MONTH_DAYS: f64 = 29.53;

/// Lunation within this many degrees of exact counts as new/full.
const LUNATION_ORB: f64 = 5.0;
const SOLAR_ECLIPSE_NODE_ORB: f64 = 15.0;
const LUNAR_ECLIPSE_NODE_ORB: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LunarEvent {
    NewMoon,
    FullMoon,
    SolarEclipse,
    LunarEclipse,
}

impl LunarEvent {
    pub fn label(self) -> &'static str {
        match self {
            LunarEvent::NewMoon => "a new moon",
            LunarEvent::FullMoon => "a full moon",
            LunarEvent::SolarEclipse => "a solar eclipse (new moon)",
            LunarEvent::LunarEclipse => "a lunar eclipse (full moon)",
        }
    }
}

/// Sun-to-moon elongation in `[0, 360)`.
pub fn elongation(sun: f64, moon: f64) -> f64 {
    normalize(moon - sun)
}

/// Days since the last new moon, estimated from the elongation.
pub fn moon_age(sun: f64, moon: f64) -> f64 {
    elongation(sun, moon) / 360.0 * SYNODIC_MONTH_DAYS
}

/// New/full moon, upgraded to an eclipse when the sun is close to the node.
pub fn lunar_event(sun: f64, moon: f64, north_node: Option<f64>) -> Option<LunarEvent> {
    let angle = elongation(sun, moon);
    let near_node = |orb: f64| north_node.is_some_and(|node| separation(sun, node) < orb);

    if !(LUNATION_ORB..=360.0 - LUNATION_ORB).contains(&angle) {
        if near_node(SOLAR_ECLIPSE_NODE_ORB) {
            Some(LunarEvent::SolarEclipse)
        } else {
            Some(LunarEvent::NewMoon)
        }
    } else if (angle - 180.0).abs() < LUNATION_ORB {
        if near_node(LUNAR_ECLIPSE_NODE_ORB) {
            Some(LunarEvent::LunarEclipse)
        } else {
            Some(LunarEvent::FullMoon)
        }
    } else {
        None
    }
}

/// The moon section of the chart summary.
pub fn moon_section(sun: Option<f64>, moon: Option<f64>, north_node: Option<f64>) -> String {
    let (Some(sun), Some(moon)) = (sun, moon) else {
        return "### Moon phase\n- Moon age unavailable (sun or moon missing).".to_string();
    };

    let mut text = format!(
        "### Moon phase\n- The moon is about {:.1} days old.",
        moon_age(sun, moon)
    );
    if let Some(event) = lunar_event(sun, moon, north_node) {
        text.push_str(&format!(
            "\n- Today is {}, a day of heightened energy.",
            event.label()
        ));
    }
    text
}
