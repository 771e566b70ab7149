//! Closed color and automaton-rule vocabularies.
//!
//! Both lookups are total: unknown names fall back to a documented default
//! instead of erroring, so a typo in a config renders something rather than
//! aborting the tree walk.

use crate::core::Rgba8;

pub const DEFAULT_COLOR: Rgba8 = Rgba8::opaque(255, 255, 255);

const NAMED_COLORS: &[(&str, Rgba8)] = &[
    ("black", Rgba8::opaque(0, 0, 0)),
    ("white", Rgba8::opaque(255, 255, 255)),
    ("red", Rgba8::opaque(255, 0, 0)),
    ("green", Rgba8::opaque(0, 128, 0)),
    ("blue", Rgba8::opaque(0, 0, 255)),
    ("yellow", Rgba8::opaque(255, 255, 0)),
    ("cyan", Rgba8::opaque(0, 255, 255)),
    ("magenta", Rgba8::opaque(255, 0, 255)),
    ("orange", Rgba8::opaque(255, 165, 0)),
    ("gray", Rgba8::opaque(128, 128, 128)),
];

pub fn is_known_color(name: &str) -> bool {
    NAMED_COLORS.iter().any(|(n, _)| *n == name)
}

/// Unknown names fall back to opaque white.
pub fn color_by_name(name: &str) -> Rgba8 {
    match NAMED_COLORS.iter().find(|(n, _)| *n == name) {
        Some((_, c)) => *c,
        None => {
            tracing::warn!(name, "unknown color name, falling back to white");
            DEFAULT_COLOR
        }
    }
}

/// Birth/survival rule for a two-state automaton, as bitmasks over the live
/// Moore-neighbor count 0..=8.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct AutomatonRule {
    pub birth: u16,
    pub survive: u16,
}

impl AutomatonRule {
    const fn masks(birth: &[u8], survive: &[u8]) -> Self {
        // const fn: index loops instead of iterators.
        let mut b = 0u16;
        let mut s = 0u16;
        let mut i = 0;
        while i < birth.len() {
            b |= 1 << birth[i];
            i += 1;
        }
        i = 0;
        while i < survive.len() {
            s |= 1 << survive[i];
            i += 1;
        }
        Self { birth: b, survive: s }
    }

    pub fn born(self, neighbors: u8) -> bool {
        self.birth & (1 << neighbors) != 0
    }

    pub fn survives(self, neighbors: u8) -> bool {
        self.survive & (1 << neighbors) != 0
    }
}

/// B3/S23.
pub const GAME_OF_LIFE: AutomatonRule = AutomatonRule::masks(&[3], &[2, 3]);

const NAMED_RULES: &[(&str, AutomatonRule)] = &[
    ("gameOfLife", GAME_OF_LIFE),
    ("highLife", AutomatonRule::masks(&[3, 6], &[2, 3])),
    ("seeds", AutomatonRule::masks(&[2], &[])),
    ("dayAndNight", AutomatonRule::masks(&[3, 6, 7, 8], &[3, 4, 6, 7, 8])),
];

/// Unknown names fall back to B3/S23.
pub fn rule_by_name(name: &str) -> AutomatonRule {
    match NAMED_RULES.iter().find(|(n, _)| *n == name) {
        Some((_, r)) => *r,
        None => {
            tracing::warn!(name, "unknown rule name, falling back to gameOfLife");
            GAME_OF_LIFE
        }
    }
}
