// Copyright 2026 Hypermesh Foundation. All rights reserved.
// Cementitious Durability Engine ("Degradation Kinetics & Severity")

pub mod types;
pub mod config;
pub mod adapter;
pub mod series;
pub mod validation;
pub mod kinetics;
pub mod aggregate;
pub mod severity;
pub mod sensitivity;
pub mod pipeline;
pub mod report;

pub use config::{ConfigError, EngineConfig};
pub use pipeline::{DegradationEngine, EngineError, ExecutionMode, RecordSource, ScenarioInput};
pub use report::CampaignReport;
pub use series::{DataError, RawScenarioRecord};
pub use types::*;

use std::collections::BTreeMap;
use wasm_bindgen::prelude::*;

// ─── WASM Interface ──────────────────────────────────────────────────────────

/// Browser entry point: `records` maps scenario labels (`"mixed_pressure"`)
/// to upstream records, `config` is a complete `EngineConfig`. Returns the
/// campaign report.
#[wasm_bindgen]
pub fn assess_campaign(records: JsValue, config: JsValue) -> Result<JsValue, JsValue> {
    #[cfg(target_arch = "wasm32")]
    std::panic::set_hook(Box::new(console_error_panic_hook::hook));

    let records: BTreeMap<String, RawScenarioRecord> = serde_wasm_bindgen::from_value(records)?;
    let config: EngineConfig = serde_wasm_bindgen::from_value(config)?;

    let inputs = inputs_from_labels(records).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let engine = DegradationEngine::new(config).map_err(|e| JsValue::from_str(&e.to_string()))?;
    let report = engine.assess_with(&inputs, ExecutionMode::Sequential);

    Ok(serde_wasm_bindgen::to_value(&report)?)
}

/// Label-keyed records to engine inputs. Labels parse case-insensitively.
pub fn inputs_from_labels(
    records: BTreeMap<String, RawScenarioRecord>,
) -> Result<Vec<ScenarioInput>, EngineError> {
    records
        .into_iter()
        .map(|(label, record)| {
            let id: ScenarioId = label.parse().map_err(|_| EngineError::UnknownScenario(label.clone()))?;
            Ok(ScenarioInput::new(id, record))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn labels_map_to_scenarios() {
        let mut records = BTreeMap::new();
        records.insert("mixed_pressure".to_string(), RawScenarioRecord::default());
        records.insert("pw_IMMERSION".to_string(), RawScenarioRecord::default());
        let inputs = inputs_from_labels(records).unwrap();
        let labels: Vec<String> = inputs.iter().map(|i| i.id.label()).collect();
        assert_eq!(labels, vec!["mixed_pressure", "PW_immersion"]);
    }

    #[test]
    fn unknown_label_is_rejected() {
        let mut records = BTreeMap::new();
        records.insert("seawater_immersion".to_string(), RawScenarioRecord::default());
        assert!(matches!(inputs_from_labels(records), Err(EngineError::UnknownScenario(_))));
    }
}
