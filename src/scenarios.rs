//! Ready-made frames.
//!
//! Three frames of increasing redundancy, registered in a closed
//! [`Scenario`] set so that a name typed on the command line is either one of
//! them or an error.

use std::fmt;
use std::str::FromStr;

use crate::config::SimulationConfig;
use crate::errors::{ConfigError, FrameError};
use crate::frame::{Frame, Material};
use crate::geometry::{point, Dof};

/// Freedoms restrained everywhere to keep a frame in the global XY plane.
const PLANAR: [Dof; 3] = [Dof::Uz, Dof::Rx, Dof::Ry];

/// Two 5 m spans, pinned at both ends, with a 50 kN point load at midspan.
///
/// # Errors
///
/// Never fails in practice; the builder calls are fallible.
pub fn simple_span() -> Result<Frame, FrameError> {
    let mut frame = Frame::new("2D Simple Truss");
    let steel = frame.add_material(Material::s275())?;

    frame.add_node(0, point(0.0, 0.0, 0.0))?;
    frame.add_node(1, point(5.0, 0.0, 0.0))?;
    frame.add_node(2, point(10.0, 0.0, 0.0))?;
    frame.set_support(0, &[Dof::Ux, Dof::Uy])?;
    frame.set_support(2, &[Dof::Ux, Dof::Uy])?;

    frame.add_member(0, 0, 1, steel)?;
    frame.add_member(1, 1, 2, steel)?;

    frame.add_load(1, Dof::Uy, -50_000.0)?;
    Ok(frame)
}

/// Four legs from a pinned 5 m square base to an apex 4 m above its centre,
/// with the base chords closing the square and 200 kN pushing the apex down.
///
/// # Errors
///
/// Never fails in practice; the builder calls are fallible.
pub fn redundant_space_frame() -> Result<Frame, FrameError> {
    let mut frame = Frame::new("3D Redundant Space Frame");
    let steel = frame.add_material(Material::s275().with_section("S275 Steel", 0.02, 2.0e-4))?;

    let base = [(0.0, 0.0), (5.0, 0.0), (5.0, 5.0), (0.0, 5.0)];
    for (id, (x, y)) in base.into_iter().enumerate() {
        frame.add_node(id, point(x, y, 0.0))?;
        frame.set_support(id, &Dof::TRANSLATIONS)?;
    }
    frame.add_node(4, point(2.5, 2.5, 4.0))?;

    for leg in 0..4 {
        frame.add_member(leg, leg, 4, steel)?;
    }
    for side in 0..4 {
        frame.add_member(4 + side, side, (side + 1) % 4, steel)?;
    }

    frame.add_load(4, Dof::Uz, -200_000.0)?;
    Ok(frame)
}

/// Six-panel Pratt truss, 30 m span and 4 m deep, under deck loading.
///
/// Bottom chord nodes are 0 to 6, top chord nodes 7 to 13. Node 0 is pinned,
/// node 6 is a roller, and every node is held in the XY plane. Members are
/// numbered bottom chords, top chords, verticals, then diagonals. Interior
/// bottom nodes carry 100 kN each and the end nodes 50 kN.
///
/// # Errors
///
/// Never fails in practice; the builder calls are fallible.
pub fn pratt_bridge() -> Result<Frame, FrameError> {
    const PANEL_WIDTH: f64 = 5.0;
    const HEIGHT: f64 = 4.0;
    const PANELS: usize = 6;
    const TOP: usize = PANELS + 1;

    let mut frame = Frame::new("Pratt Truss Bridge (6-panel, 30m span)");
    let s355 = Material::s355();
    let bottom_chord = frame.add_material(s355.with_section("S355 Bottom Chord", 0.0155, 3.65e-4))?;
    let top_chord = frame.add_material(s355.with_section("S355 Top Chord", 0.0123, 2.22e-4))?;
    let vertical = frame.add_material(Material::s275().with_section("S275 Vertical", 0.0066, 5.27e-5))?;
    let diagonal = frame.add_material(s355.with_section("S355 Diagonal", 0.0114, 1.42e-4))?;

    for i in 0..=PANELS {
        let x = i as f64 * PANEL_WIDTH;
        frame.add_node(i, point(x, 0.0, 0.0))?;
        frame.add_node(TOP + i, point(x, HEIGHT, 0.0))?;
        frame.set_support(i, &PLANAR)?;
        frame.set_support(TOP + i, &PLANAR)?;
    }
    frame.set_support(0, &[Dof::Ux, Dof::Uy])?;
    frame.set_support(PANELS, &[Dof::Uy])?;

    let mut id = 0;
    for i in 0..PANELS {
        frame.add_member(id, i, i + 1, bottom_chord)?;
        id += 1;
    }
    for i in 0..PANELS {
        frame.add_member(id, TOP + i, TOP + i + 1, top_chord)?;
        id += 1;
    }
    for i in 0..=PANELS {
        frame.add_member(id, i, TOP + i, vertical)?;
        id += 1;
    }
    // Each diagonal runs from the foot of a panel's right post to the top of its left post.
    for i in 0..PANELS {
        frame.add_member(id, i + 1, TOP + i, diagonal)?;
        id += 1;
    }

    for i in 0..=PANELS {
        let magnitude = if i == 0 || i == PANELS { -50_000.0 } else { -100_000.0 };
        frame.add_load(i, Dof::Uy, magnitude)?;
    }
    Ok(frame)
}

/// Registry of the ready-made frames.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Scenario {
    /// [`simple_span`].
    SimpleSpan,
    /// [`redundant_space_frame`].
    RedundantSpaceFrame,
    /// [`pratt_bridge`].
    PrattBridge,
}

impl Scenario {
    /// Every registered scenario.
    pub const ALL: [Scenario; 3] = [
        Scenario::SimpleSpan,
        Scenario::RedundantSpaceFrame,
        Scenario::PrattBridge,
    ];

    /// Short name used on the command line.
    #[must_use]
    pub const fn key(self) -> &'static str {
        match self {
            Scenario::SimpleSpan => "2d_simple",
            Scenario::RedundantSpaceFrame => "3d_redundant",
            Scenario::PrattBridge => "pratt_bridge",
        }
    }

    /// Descriptive alias, also accepted by [`FromStr`].
    #[must_use]
    pub const fn alias(self) -> &'static str {
        match self {
            Scenario::SimpleSpan => "simple_span",
            Scenario::RedundantSpaceFrame => "redundant_space_frame",
            Scenario::PrattBridge => "pratt_bridge",
        }
    }

    /// Step budget the scenario is usually run with.
    #[must_use]
    pub const fn default_max_steps(self) -> usize {
        match self {
            Scenario::SimpleSpan => 100,
            Scenario::RedundantSpaceFrame => 150,
            Scenario::PrattBridge => 200,
        }
    }

    /// Default options with the scenario's step budget.
    #[must_use]
    pub fn default_config(self) -> SimulationConfig {
        SimulationConfig::default().with_max_steps(self.default_max_steps())
    }

    /// Build a fresh copy of the frame.
    ///
    /// # Errors
    ///
    /// Propagates builder errors; none are expected.
    pub fn build(self) -> Result<Frame, FrameError> {
        match self {
            Scenario::SimpleSpan => simple_span(),
            Scenario::RedundantSpaceFrame => redundant_space_frame(),
            Scenario::PrattBridge => pratt_bridge(),
        }
    }
}

impl fmt::Display for Scenario {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Scenario {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|scenario| scenario.key() == s || scenario.alias() == s)
            .ok_or_else(|| ConfigError::UnknownScenario {
                name: s.to_string(),
                available: Self::ALL.map(Scenario::key).join(", "),
            })
    }
}
