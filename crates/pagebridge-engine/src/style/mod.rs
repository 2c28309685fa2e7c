//! Heuristic background recovery from raw CSS and markup.
//!
//! Deliberately not a CSS or HTML parser: balanced-brace iteration plus a few
//! regular expressions, tuned for the layout patterns the theme emits.

pub mod rules;
pub mod structural;

pub use rules::{SECTION_MARKERS, StyleRule, extract_rules, resolve_background};
pub use structural::{BackgroundOrigin, StructuralBackground, extract_structural_backgrounds};
