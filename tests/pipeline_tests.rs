#[cfg(test)]
mod tests {
    use durability_engine::kinetics::{FitOutcome, ModelKind};
    use durability_engine::severity::Term;
    use durability_engine::{
        Condition, DegradationEngine, EngineConfig, Estimate, ExecutionMode, RawScenarioRecord, ScenarioId,
        ScenarioInput, Solution,
    };

    fn id(solution: Solution, condition: Condition) -> ScenarioId {
        ScenarioId::new(solution, condition)
    }

    /// Two-sample record: baseline at t = 0 and an end state at t = 60 d.
    fn two_point(ch: (f64, f64), csh: (f64, f64), ph: Option<(f64, f64)>, porosity: (f64, f64)) -> RawScenarioRecord {
        let ph_field = |v: Option<f64>| v.map(|p| format!(r#", "pH": {}"#, p)).unwrap_or_default();
        let json = format!(
            r#"{{ "time_series": [
                {{ "time_days": 0, "phases": {{ "portlandite": {}, "CSH_gel": {}, "ettringite": 0.85 }},
                   "porosity": {}{} }},
                {{ "time_days": 60, "phases": {{ "portlandite": {}, "CSH_gel": {}, "ettringite": 0.88 }},
                   "porosity": {}{} }}
            ] }}"#,
            ch.0,
            csh.0,
            porosity.0,
            ph_field(ph.map(|p| p.0)),
            ch.1,
            csh.1,
            porosity.1,
            ph_field(ph.map(|p| p.1)),
        );
        RawScenarioRecord::from_json_str(&json).unwrap()
    }

    fn mixed_pressure_record() -> RawScenarioRecord {
        two_point((4.2, 4.0488), (12.5, 4.3), Some((13.72, 13.17)), (0.28, 0.38))
    }

    fn pw_immersion_record() -> RawScenarioRecord {
        two_point((4.2, 4.1706), (12.5, 10.05), Some((13.72, 13.60)), (0.28, 0.30))
    }

    fn engine() -> DegradationEngine {
        DegradationEngine::new(EngineConfig::default()).unwrap()
    }

    // ========== Ranking ==========

    #[test]
    fn test_mixed_pressure_outranks_pure_water_immersion() {
        let mp = id(Solution::Mixed, Condition::Pressure);
        let pw = id(Solution::PureWater, Condition::Immersion);
        let inputs = vec![
            ScenarioInput::new(pw, pw_immersion_record()),
            ScenarioInput::new(mp, mixed_pressure_record()),
        ];

        let report = engine().assess(&inputs);
        assert_eq!(report.ranking(), vec![mp, pw]);

        let top = report.score(mp).unwrap();
        assert_eq!(top.rank, 1);
        assert!((top.composite_score - 1.0).abs() < 1e-9, "dominant scenario normalizes to 1");
        assert_eq!(top.severity_label, "Very Severe");
        assert!(!top.partial);

        let low = report.score(pw).unwrap();
        assert!(low.composite_score < 0.35);
        assert_eq!(low.severity_label, "Mild");

        assert!((top.raw(Term::ChLoss).unwrap() - 3.6).abs() < 1e-9);
        assert!((top.raw(Term::CshLoss).unwrap() - 65.6).abs() < 1e-9);
        assert!((top.raw(Term::PhDrop).unwrap() - 0.55).abs() < 1e-9);
        assert!((top.raw(Term::PorosityIncrease).unwrap() - 10.0).abs() < 1e-9);
    }

    #[test]
    fn test_parallel_and_sequential_reports_are_identical() {
        let inputs: Vec<ScenarioInput> = ScenarioId::all()
            .into_iter()
            .enumerate()
            .map(|(i, s)| {
                let ch_final = 4.2 - 0.05 * (i as f64 + 1.0);
                let csh_final = 12.5 - 0.7 * (i as f64 + 1.0);
                ScenarioInput::new(s, two_point((4.2, ch_final), (12.5, csh_final), Some((13.72, 13.5)), (0.28, 0.30)))
            })
            .collect();

        let e = engine();
        let parallel = e.assess_with(&inputs, ExecutionMode::Parallel);
        let sequential = e.assess_with(&inputs, ExecutionMode::Sequential);
        assert_eq!(parallel, sequential);
        assert_eq!(parallel.to_json_pretty().unwrap(), sequential.to_json_pretty().unwrap());
        assert!(parallel.excluded.is_empty());
    }

    // ========== Exclusion & Partial Data ==========

    #[test]
    fn test_bad_scenario_is_excluded_and_siblings_still_rank() {
        let bad = id(Solution::NaCl, Condition::Immersion);
        let late_baseline = RawScenarioRecord::from_json_str(
            r#"{ "time_series": [
                { "time_days": 3, "phases": { "portlandite": 4.1 } },
                { "time_days": 6, "phases": { "portlandite": 4.0 } }
            ] }"#,
        )
        .unwrap();

        let inputs = vec![
            ScenarioInput::new(bad, late_baseline),
            ScenarioInput::new(id(Solution::Mixed, Condition::Pressure), mixed_pressure_record()),
            ScenarioInput::new(id(Solution::PureWater, Condition::Immersion), pw_immersion_record()),
        ];
        let report = engine().assess(&inputs);

        assert_eq!(report.severity.len(), 2);
        let excluded = report.excluded.iter().find(|e| e.scenario == bad).unwrap();
        assert!(excluded.reason.contains("baseline"), "reason: {}", excluded.reason);
        assert!(report.gaps.iter().any(|g| g.location == "scenarios/NaCl_immersion"));

        // The NaCl acceleration factor needs the excluded scenario.
        let nacl_ch = report
            .acceleration_factors
            .iter()
            .find(|f| f.solution == Solution::NaCl && f.model_kind == ModelKind::FirstOrder)
            .unwrap();
        assert!(!nacl_ch.factor.is_computed());
    }

    #[test]
    fn test_missing_ph_scores_partially() {
        let pp = id(Solution::PureWater, Condition::Pressure);
        let inputs = vec![
            ScenarioInput::new(pp, two_point((4.2, 3.9), (12.5, 11.0), None, (0.28, 0.31))),
            ScenarioInput::new(id(Solution::Mixed, Condition::Pressure), mixed_pressure_record()),
        ];
        let report = engine().assess(&inputs);

        let score = report.score(pp).unwrap();
        assert!(score.partial);
        assert_eq!(score.degraded_terms, vec![Term::PhDrop]);
        assert_eq!(score.terms[Term::PhDrop.index()].contribution, 0.0);
        assert!(score.raw(Term::ChLoss).is_some());
        assert!(report.gaps.iter().any(|g| g.location == "severity/PW_pressure/ph_drop"));
    }

    #[test]
    fn test_out_of_range_values_are_warned_not_fatal() {
        let ni = id(Solution::NaCl, Condition::Immersion);
        let record = RawScenarioRecord::from_json_str(
            r#"{ "time_series": [
                { "time_days": 0, "phases": { "portlandite": 4.2, "CSH_gel": 12.5 }, "pH": 13.72, "porosity": 0.28 },
                { "time_days": 30, "phases": { "portlandite": 4.1, "CSH_gel": 12.0 }, "pH": 19.0, "porosity": 0.29 },
                { "time_days": 60, "phases": { "portlandite": 4.0, "CSH_gel": 11.5 }, "pH": 13.5, "porosity": 0.30 }
            ] }"#,
        )
        .unwrap();

        let report = engine().assess(&[ScenarioInput::new(ni, record)]);
        let scenario = report.scenario(ni).unwrap();
        assert!(scenario.is_partial());
        assert_eq!(scenario.warnings.len(), 1);
        assert_eq!(scenario.warnings[0].field.as_deref(), Some("pH"));
        assert!(report.score(ni).is_some());
    }

    // ========== Chloride Binding ==========

    #[test]
    fn test_friedel_salt_binding_capacity() {
        let np = id(Solution::NaCl, Condition::Pressure);
        let record = RawScenarioRecord::from_json_str(
            r#"{ "time_series": [
                { "time_days": 0, "phase_assemblage": { "portlandite": { "amount_mol": 4.2 }, "friedels_salt": { "amount_mol": 0.0 } } },
                { "time_days": 60, "phase_assemblage": { "portlandite": { "amount_mol": 3.6 }, "friedels_salt": { "amount_mol": 0.472 } } }
            ] }"#,
        )
        .unwrap();

        let report = engine().assess(&[ScenarioInput::new(np, record)]);
        let fit = report
            .scenario(np)
            .unwrap()
            .fits
            .iter()
            .find(|f| f.model_kind == ModelKind::BindingCapacity)
            .unwrap();

        match &fit.result {
            Estimate::Computed(FitOutcome::BindingCapacity(b)) => {
                assert!((b.bound_chloride_mol - 0.944).abs() < 1e-12);
                // 0.944 mol * 35.45 g/mol * 1000 / 5 g
                assert!((b.capacity_mg_per_g - 6692.96).abs() < 1e-6);
                assert!(b.utilization > 0.0 && b.utilization < 1.0);
            }
            other => panic!("expected a binding capacity, got {:?}", other),
        }
    }

    #[test]
    fn test_pure_water_has_no_binding_fit() {
        let pw = id(Solution::PureWater, Condition::Immersion);
        let report = engine().assess(&[ScenarioInput::new(pw, pw_immersion_record())]);
        let fits = &report.scenario(pw).unwrap().fits;
        assert!(fits.iter().all(|f| f.model_kind != ModelKind::BindingCapacity));
    }

    // ========== Configuration ==========

    #[test]
    fn test_config_from_json_changes_weights() {
        let mut value = serde_json::to_value(EngineConfig::default()).unwrap();
        value["severity"]["weights"] = serde_json::json!({
            "ch_loss": "1.0", "csh_loss": "0", "ph_drop": "0", "porosity_increase": "0"
        });
        let config = EngineConfig::from_json_str(&value.to_string()).unwrap();
        let engine = DegradationEngine::new(config).unwrap();
        assert_eq!(engine.scorer().weights(), [1.0, 0.0, 0.0, 0.0]);

        // CH loss alone: 3.6% against 0.7%.
        let mp = id(Solution::Mixed, Condition::Pressure);
        let pw = id(Solution::PureWater, Condition::Immersion);
        let report = engine.assess(&[
            ScenarioInput::new(mp, mixed_pressure_record()),
            ScenarioInput::new(pw, pw_immersion_record()),
        ]);
        let low = report.score(pw).unwrap();
        assert!((low.composite_score - 0.7 / 3.6).abs() < 1e-9);
    }

    #[test]
    fn test_weights_not_summing_to_one_are_rejected() {
        let mut value = serde_json::to_value(EngineConfig::default()).unwrap();
        value["severity"]["weights"]["ch_loss"] = serde_json::json!("0.41");
        assert!(EngineConfig::from_json_str(&value.to_string()).is_err());
    }

    #[test]
    fn test_report_serializes_not_computable_in_place() {
        let pp = id(Solution::PureWater, Condition::Pressure);
        let report = engine().assess(&[ScenarioInput::new(pp, two_point((4.2, 3.9), (12.5, 11.0), None, (0.28, 0.31)))]);
        let json: serde_json::Value = serde_json::from_str(&report.to_json_pretty().unwrap()).unwrap();

        let ph_term = &json["severity"][0]["terms"][2];
        assert_eq!(ph_term["term"], "ph_drop");
        assert_eq!(ph_term["raw"]["status"], "not_computable");
        assert_eq!(json["excluded"].as_array().unwrap().len(), 5);
    }
}
