use serde::Serialize;

/// Environmental metrics and disposal advice for one waste class
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ImpactRecord {
    pub odp_units: f64,
    pub co2_kg: f64,
    /// 0 to 10
    pub toxicity: u8,
    pub action: &'static str,
    pub value: &'static str,
    pub ozone_protection_score: f64,
}

impl ImpactRecord {
    /// Returned for labels the catalog does not know
    pub const UNKNOWN: ImpactRecord = ImpactRecord {
        odp_units: 0.0,
        co2_kg: 0.0,
        toxicity: 0,
        action: "Unknown",
        value: "0",
        ozone_protection_score: 0.0,
    };
}

static BUILTIN: [(&str, ImpactRecord); 6] = [
    (
        "Battery",
        ImpactRecord {
            odp_units: 0.002,
            co2_kg: 0.8,
            toxicity: 8,
            action: "Drop at CECB Hazard Kiosk",
            value: "₹45 cobalt",
            ozone_protection_score: 99.8,
        },
    ),
    (
        "Plastic",
        ImpactRecord {
            odp_units: 0.0005,
            co2_kg: 3.5,
            toxicity: 5,
            action: "Recycle at Plastic Collection Point",
            value: "₹12 plastic pellets",
            ozone_protection_score: 99.95,
        },
    ),
    (
        "E-Waste",
        ImpactRecord {
            odp_units: 0.001,
            co2_kg: 1.2,
            toxicity: 7,
            action: "Hand over to E-Waste Recycler",
            value: "₹80 copper/gold",
            ozone_protection_score: 99.9,
        },
    ),
    (
        "Organic",
        ImpactRecord {
            odp_units: 0.0001,
            co2_kg: 0.3,
            toxicity: 2,
            action: "Compost or Biogas Unit",
            value: "Free compost",
            ozone_protection_score: 99.99,
        },
    ),
    (
        "Metal",
        ImpactRecord {
            odp_units: 0.0002,
            co2_kg: 0.9,
            toxicity: 4,
            action: "Metal Scrap Vendor",
            value: "₹30 scrap metal",
            ozone_protection_score: 99.98,
        },
    ),
    (
        "Glass",
        ImpactRecord {
            odp_units: 0.0001,
            co2_kg: 0.5,
            toxicity: 3,
            action: "Glass Recycling Center",
            value: "₹15 glass cullet",
            ozone_protection_score: 99.99,
        },
    ),
];

/// Static class name to impact record table
#[derive(Debug, Clone, Copy)]
pub struct ImpactCatalog {
    records: &'static [(&'static str, ImpactRecord)],
}

impl Default for ImpactCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

impl ImpactCatalog {
    pub fn builtin() -> Self {
        Self { records: &BUILTIN }
    }

    pub fn get(&self, label: &str) -> Option<&'static ImpactRecord> {
        self.records
            .iter()
            .find(|(name, _)| *name == label)
            .map(|(_, record)| record)
    }

    /// Record for `label`, or [`ImpactRecord::UNKNOWN`]
    pub fn lookup(&self, label: &str) -> &'static ImpactRecord {
        self.get(label).unwrap_or(&ImpactRecord::UNKNOWN)
    }

    pub fn class_names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.records.iter().map(|(name, _)| *name)
    }
}
