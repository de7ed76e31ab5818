use crate::impact::{ImpactCatalog, ImpactRecord};
use crate::labels::LabelBindings;
use serde::Serialize;

/// Flat response record for one prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub waste_type: String,
    pub confidence: f32,
    #[serde(flatten)]
    pub impact: ImpactRecord,
}

/// Index and value of the first maximum; ties resolve to the lowest index
pub fn argmax(probabilities: &[f32]) -> Option<(usize, f32)> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &p) in probabilities.iter().enumerate() {
        if p.is_nan() {
            continue;
        }
        match best {
            Some((_, b)) if p <= b => {}
            _ => best = Some((i, p)),
        }
    }
    best
}

/// Maps the top prediction to its label and impact record
pub fn compose(
    probabilities: &[f32],
    labels: &LabelBindings,
    catalog: &ImpactCatalog,
) -> Option<PredictionResult> {
    let (idx, confidence) = argmax(probabilities)?;
    let waste_type = labels.label_for(idx).into_owned();
    let impact = *catalog.lookup(&waste_type);

    tracing::info!(
        waste_type = %waste_type,
        confidence = %format!("{:.3}", confidence),
        "Prediction"
    );

    Some(PredictionResult {
        waste_type,
        confidence,
        impact,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::DEFAULT_CLASS_NAMES;
    use serde_json::json;

    fn labels() -> LabelBindings {
        LabelBindings::new(DEFAULT_CLASS_NAMES.iter().map(|s| s.to_string()).collect())
    }

    #[test]
    fn test_argmax_ties_pick_lowest_index() {
        assert_eq!(argmax(&[0.2, 0.4, 0.4]), Some((1, 0.4)));
        assert_eq!(argmax(&[0.5, 0.5]), Some((0, 0.5)));
        assert_eq!(argmax(&[]), None);
    }

    #[test]
    fn test_argmax_skips_nan() {
        assert_eq!(argmax(&[f32::NAN, 0.3, 0.1]), Some((1, 0.3)));
        assert_eq!(argmax(&[0.3, f32::NAN, 0.1]), Some((0, 0.3)));
        assert_eq!(argmax(&[f32::NAN]), None);
    }

    #[test]
    fn test_compose_battery() {
        let result = compose(
            &[0.93, 0.03, 0.01, 0.01, 0.01, 0.01],
            &labels(),
            &ImpactCatalog::builtin(),
        )
        .unwrap();

        assert_eq!(
            serde_json::to_value(&result).unwrap(),
            json!({
                "waste_type": "Battery",
                "confidence": 0.93f32,
                "odp_units": 0.002,
                "co2_kg": 0.8,
                "toxicity": 8,
                "action": "Drop at CECB Hazard Kiosk",
                "value": "₹45 cobalt",
                "ozone_protection_score": 99.8
            })
        );
        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"waste_type":"Battery","confidence":0.93,"odp_units":0.002,"co2_kg":0.8,"toxicity":8,"action":"Drop at CECB Hazard Kiosk","value":"₹45 cobalt","ozone_protection_score":99.8}"#
        );
    }

    #[test]
    fn test_compose_out_of_range_index() {
        let mut probs = vec![0.01; 8];
        probs[7] = 0.9;
        let result = compose(&probs, &labels(), &ImpactCatalog::builtin()).unwrap();
        assert_eq!(result.waste_type, "class_7");
        assert_eq!(result.impact, ImpactRecord::UNKNOWN);
        assert_eq!(result.impact.odp_units, 0.0);
        assert_eq!(result.impact.co2_kg, 0.0);
        assert_eq!(result.impact.toxicity, 0);
        assert_eq!(result.impact.ozone_protection_score, 0.0);
        assert_eq!(result.impact.action, "Unknown");
    }

    #[test]
    fn test_compose_label_without_record() {
        let custom = LabelBindings::new(vec!["Textile".to_string()]);
        let result = compose(&[1.0], &custom, &ImpactCatalog::builtin()).unwrap();
        assert_eq!(result.waste_type, "Textile");
        assert_eq!(result.confidence, 1.0);
        assert_eq!(result.impact, ImpactRecord::UNKNOWN);
    }

    #[test]
    fn test_compose_empty_probabilities() {
        assert!(compose(&[], &labels(), &ImpactCatalog::builtin()).is_none());
    }
}
