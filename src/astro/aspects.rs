//! Major aspects between chart points.

use super::Point;
use super::zodiac::separation;

/// A major aspect with its exact angle and allowed orb.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Aspect {
    Conjunction,
    Opposition,
    Trine,
    Square,
    Sextile,
}

impl Aspect {
    /// Checked in this order; the first aspect within orb wins.
    pub const ALL: [Aspect; 5] = [
        Aspect::Conjunction,
        Aspect::Opposition,
        Aspect::Trine,
        Aspect::Square,
        Aspect::Sextile,
    ];

    pub fn angle(self) -> f64 {
        match self {
            Aspect::Conjunction => 0.0,
            Aspect::Opposition => 180.0,
            Aspect::Trine => 120.0,
            Aspect::Square => 90.0,
            Aspect::Sextile => 60.0,
        }
    }

    pub fn orb(self) -> f64 {
        match self {
            Aspect::Conjunction | Aspect::Opposition | Aspect::Trine => 8.0,
            Aspect::Square => 6.0,
            Aspect::Sextile => 4.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Aspect::Conjunction => "conjunction (0°)",
            Aspect::Opposition => "opposition (180°)",
            Aspect::Trine => "trine (120°)",
            Aspect::Square => "square (90°)",
            Aspect::Sextile => "sextile (60°)",
        }
    }

    /// The aspect formed by two longitudes, if any. Orbs are exclusive.
    pub fn between(a: f64, b: f64) -> Option<Aspect> {
        let sep = separation(a, b);
        Self::ALL
            .into_iter()
            .find(|aspect| (sep - aspect.angle()).abs() < aspect.orb())
    }
}

/// Aspects among points of one chart, each unordered pair once.
pub fn aspects_within(title: &str, points: &[Point], prefix: &str) -> String {
    let mut lines = Vec::new();
    for (i, a) in points.iter().enumerate() {
        for b in &points[i + 1..] {
            if let Some(aspect) = Aspect::between(a.longitude, b.longitude) {
                lines.push(aspect_line(prefix, a, prefix, b, aspect));
            }
        }
    }
    section(title, lines)
}

/// Aspects from every point of `from` to every point of `to`.
pub fn aspects_between(
    title: &str,
    from: &[Point],
    from_prefix: &str,
    to: &[Point],
    to_prefix: &str,
) -> String {
    let lines = from
        .iter()
        .flat_map(|a| to.iter().map(move |b| (a, b)))
        .filter_map(|(a, b)| {
            Aspect::between(a.longitude, b.longitude)
                .map(|aspect| aspect_line(from_prefix, a, to_prefix, b, aspect))
        })
        .collect();
    section(title, lines)
}

fn aspect_line(prefix_a: &str, a: &Point, prefix_b: &str, b: &Point, aspect: Aspect) -> String {
    format!(
        "- {prefix_a}{} {} {prefix_b}{}",
        a.name,
        aspect.label(),
        b.name
    )
}

fn section(title: &str, lines: Vec<String>) -> String {
    if lines.is_empty() {
        return format!("### {title}\n- No tight aspects.");
    }
    format!("### {title}\n{}", lines.join("\n"))
}
