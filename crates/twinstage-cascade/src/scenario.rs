//! Static scenario catalog — the three crisis chains.

use serde::{Deserialize, Serialize};

/// One of the digital twins on stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TwinKind {
    Supply,
    Product,
    Production,
}

impl TwinKind {
    pub const ALL: [TwinKind; 3] = [TwinKind::Supply, TwinKind::Product, TwinKind::Production];

    pub fn label(&self) -> &'static str {
        match self {
            TwinKind::Supply => "Supply",
            TwinKind::Product => "Product",
            TwinKind::Production => "Production",
        }
    }

    /// Host actor shown while this twin has an open problem.
    pub fn issue_actor(&self) -> String {
        format!("Issue {}", self.label())
    }

    /// Host actor shown while this twin operates normally.
    pub fn working_actor(&self) -> String {
        format!("Working {}", self.label())
    }
}

/// Which crisis chain to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScenarioKind {
    // "tarif" is the wire value shared with already-provisioned session
    // rows; only the Rust identifier is spelled out.
    #[serde(rename = "tarif")]
    Tariff,
    Labor,
    Material,
}

impl ScenarioKind {
    pub const ALL: [ScenarioKind; 3] =
        [ScenarioKind::Tariff, ScenarioKind::Labor, ScenarioKind::Material];

    pub fn wire_name(&self) -> &'static str {
        match self {
            ScenarioKind::Tariff => "tarif",
            ScenarioKind::Labor => "labor",
            ScenarioKind::Material => "material",
        }
    }

    pub fn from_wire(name: &str) -> Option<Self> {
        match name {
            "tarif" => Some(ScenarioKind::Tariff),
            "labor" => Some(ScenarioKind::Labor),
            "material" => Some(ScenarioKind::Material),
            _ => None,
        }
    }
}

/// One problem→consequence→solution unit in a chain.
#[derive(Debug, Clone, PartialEq)]
pub struct CascadeStep {
    pub twin: TwinKind,
    pub problem: &'static str,
    pub consequence: &'static str,
    pub solution: &'static str,
    /// Closing note shown when this step ends the chain.
    pub closing: Option<&'static str>,
}

/// A full three-step crisis chain.
#[derive(Debug, Clone, PartialEq)]
pub struct Scenario {
    pub kind: ScenarioKind,
    pub title: &'static str,
    pub color: &'static str,
    pub chain: [CascadeStep; 3],
}

impl Scenario {
    pub fn step(&self, index: usize) -> Option<&CascadeStep> {
        self.chain.get(index)
    }

    /// Index of the terminal step.
    pub fn last_step(&self) -> usize {
        self.chain.len() - 1
    }
}

/// Look up the catalog entry for a scenario kind.
pub fn scenario(kind: ScenarioKind) -> &'static Scenario {
    match kind {
        ScenarioKind::Tariff => &CATALOG[0],
        ScenarioKind::Labor => &CATALOG[1],
        ScenarioKind::Material => &CATALOG[2],
    }
}

static CATALOG: [Scenario; 3] = [
    Scenario {
        kind: ScenarioKind::Tariff,
        title: "Increase of Tariffs +25%",
        color: "#ff4444",
        chain: [
            CascadeStep {
                twin: TwinKind::Supply,
                problem: "🔴 IMPACT: US component prices +25%",
                consequence: "Supply costs spike dramatically. Existing contracts at risk.",
                solution: "European supplier found with competitive pricing. Alternative sourcing strategy activated.",
                closing: None,
            },
            CascadeStep {
                twin: TwinKind::Product,
                problem: "⚠️ CASCADE IMPACT: European components have different specs",
                consequence: "Due to new European supplier: Design compatibility issues detected. Certification requirements changed.",
                solution: "Design adjusted virtually using digital twin simulation. CAD models updated. New component integration validated.",
                closing: None,
            },
            CascadeStep {
                twin: TwinKind::Production,
                problem: "⚠️ CASCADE IMPACT: New component design requires production changes",
                consequence: "Due to updated product design: Assembly procedures must change. Production line needs reconfiguration.",
                solution: "Production layout optimized with digital twin. Virtual worker training deployed. Assembly time reduced by 15%.",
                closing: Some("🎯 Crisis resolved with improved efficiency!"),
            },
        ],
    },
    Scenario {
        kind: ScenarioKind::Labor,
        title: "Labor Shortage Crisis",
        color: "#ff6b35",
        chain: [
            CascadeStep {
                twin: TwinKind::Production,
                problem: "🔴 IMPACT: Workforce shortage -30%",
                consequence: "Production capacity severely limited. Delivery schedules at risk.",
                solution: "Critical tasks automated with digital twin simulation. Shift schedules optimized. Predictive maintenance activated.",
                closing: None,
            },
            CascadeStep {
                twin: TwinKind::Product,
                problem: "⚠️ CASCADE IMPACT: Reduced workforce limits testing capacity",
                consequence: "Due to automation focus: Manual quality assurance bottleneck created. Product validation cycles delayed.",
                solution: "Virtual testing protocols deployed via digital twin. AI-powered quality prediction activated. Automated inspection systems integrated.",
                closing: None,
            },
            CascadeStep {
                twin: TwinKind::Supply,
                problem: "⚠️ CASCADE IMPACT: Automated systems increase component variety",
                consequence: "Due to new automated processes: Inventory management complexity rises. Limited staff cannot handle increased SKU count.",
                solution: "Smart inventory optimization via digital twin. Automated vendor management deployed. Just-in-time delivery system perfected.",
                closing: Some("🎯 Production maintained with 30% less workforce!"),
            },
        ],
    },
    Scenario {
        kind: ScenarioKind::Material,
        title: "Material Change Required",
        color: "#9d4edd",
        chain: [
            CascadeStep {
                twin: TwinKind::Product,
                problem: "🔴 IMPACT: Key material discontinued by supplier",
                consequence: "Product cannot be manufactured with current design. Urgent redesign needed.",
                solution: "3 alternative materials identified via digital twin simulation. Performance tested across all scenarios. Optimal material validated.",
                closing: None,
            },
            CascadeStep {
                twin: TwinKind::Supply,
                problem: "⚠️ CASCADE IMPACT: New material requires different suppliers",
                consequence: "Due to alternative material selection: Supply chain must be restructured. New vendor qualification needed. Lead times uncertain.",
                solution: "New supplier network mapped globally. Logistics routes optimized. Favorable long-term contracts negotiated.",
                closing: None,
            },
            CascadeStep {
                twin: TwinKind::Production,
                problem: "⚠️ CASCADE IMPACT: New suppliers deliver material in different form",
                consequence: "Due to new supply chain: Manufacturing process must adapt. Equipment adjustments required. Process parameters unknown.",
                solution: "Optimal process parameters simulated via digital twin. Equipment settings updated remotely. Virtual operator training deployed. First-pass yield: 97%.",
                closing: Some("🎯 Material transition complete with better performance!"),
            },
        ],
    },
];
