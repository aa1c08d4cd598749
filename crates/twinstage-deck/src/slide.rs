//! Static slide catalog with narration timestamps.

/// Host actor for the narration audio indicator.
pub const SOUND_ACTOR: &str = "PRD Sound";

/// Host actor shown before the presentation starts.
pub const BASELINE_ACTOR: &str = "AS IS Product";

/// The closing media; showing it retires the baseline actor.
pub const CLOSING_MEDIA: &str = "PRD Content";

/// Every media actor the deck may show, for bulk hides.
pub const ALL_MEDIA: [&str; 6] = ["PRD 1", "PRD 2", "PRD 3", "PRD 4", "PRD 5", "PRD Content"];

/// One slide: narration text, an optional media actor, and the
/// narration time at which it becomes current.
#[derive(Debug, Clone, PartialEq)]
pub struct Slide {
    pub text: &'static str,
    pub media: Option<&'static str>,
    /// Seconds into the narration track.
    pub at: f64,
}

/// The production deck, ordered by timestamp.
pub fn deck() -> &'static [Slide] {
    &DECK
}

static DECK: [Slide; 6] = [
    Slide {
        text: "Virtual Twin of the Product\n\nAt OXOS, the virtual twin is not just a 3D model.\nIt is the single, complete, and living reference of the product.",
        media: None,
        at: 1.0,
    },
    Slide {
        text: "It concentrates all the product's intelligence in one place:\ndetailed bill of materials, exact configurations, manufacturing constraints, engineering and certification data, material history.",
        media: Some("PRD 1"),
        at: 7.0,
    },
    Slide {
        text: "Before a single machine is powered on, we already know the predicted cycle time, material costs, geometric risks, and even the environmental footprint.",
        media: Some("PRD 2"),
        at: 20.0,
    },
    Slide {
        text: "This virtual twin feeds OXOS's generative AI.\nConcretely, for the manufacturing of a housing, OXOS automatically generates the optimal machining sequence, the associated 5-axis CNC program, and the relevant quality inspections to fits with A&D regulations.",
        media: Some("PRD 3"),
        at: 29.0,
    },
    Slide {
        text: "In production, the virtual twin tracks progress, quality status, and process deviations in real time.\nIn engineering and compliance, it ensures full traceability — from as-specified to as-maintained — with certification reports generated automatically.",
        media: Some("PRD 4"),
        at: 44.0,
    },
    Slide {
        text: "With OXOS, industry moves from reactive execution\nto a predictive process, continuously auditable.",
        media: Some("PRD Content"),
        at: 59.0,
    },
];
