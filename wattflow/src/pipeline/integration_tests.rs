//! End-to-end tests for training, testing and persisting pipelines.

#[cfg(test)]
mod tests {
    use crate::callbacks::CollectingCallback;
    use crate::condition::{Condition, HourOfDay, Not, ValueAbove};
    use crate::core::{Dataset, TimeSeries};
    use crate::errors::WattflowError;
    use crate::events::{names, CollectingEventSink};
    use crate::graph::EdgeKind;
    use crate::module::SharedModule;
    use crate::modules::{ClockShift, LinearRegression, RollingRmse, StandardScaler};
    use crate::persistence::checksum;
    use crate::pipeline::{Pipeline, SubPipeline};
    use crate::registry::Registry;
    use crate::testing::{
        assert_series_identical, assert_values_close, hour, hourly_dataset, hourly_series, hours_window,
        ramp, CountingModule, FailOn, FailingModule,
    };
    use pretty_assertions::assert_eq;
    use std::fs;
    use std::sync::Arc;

    fn registry() -> Registry {
        let mut registry = Registry::with_builtins();
        registry.register_module(CountingModule::TYPE_TAG, CountingModule::load);
        registry
    }

    fn shared<M: crate::module::Module + 'static>(module: M) -> SharedModule {
        SharedModule::new(module)
    }

    /// load -> lag -> regression (target load) -> cumulative rmse.
    fn forecasting_pipeline() -> Pipeline {
        let mut pipeline = Pipeline::new("forecast");
        let load = pipeline.input("load");
        let lag = pipeline
            .step(&shared(ClockShift::new("lag", 1).unwrap()))
            .input("x", load)
            .add()
            .unwrap();
        let regression = pipeline
            .step(&shared(LinearRegression::new("regression")))
            .input("lag", lag)
            .target("y", load)
            .add()
            .unwrap();
        pipeline
            .step(&shared(RollingRmse::cumulative("rmse")))
            .input("y", load)
            .input("y_hat", regression)
            .add()
            .unwrap();
        pipeline
    }

    #[test]
    fn test_train_then_test_forecasts() {
        let data = hourly_dataset("load", &ramp(24));
        let mut pipeline = forecasting_pipeline();

        let report = pipeline.train(&data).unwrap();
        let regression = pipeline.step_id("regression").unwrap();
        assert!(report.fitted.contains(&regression));
        assert!(pipeline.store().is_empty());

        let outcome = pipeline.test(&data, true, false).unwrap();
        let rmse = outcome.get("rmse").unwrap();
        assert_eq!(rmse.len(), 24);
        assert!(rmse.values()[0].is_nan());
        assert!(rmse.values()[1..].iter().all(|v| v.abs() < 1e-9));
        assert_eq!(pipeline.cursor(), data.full_window().map(|w| w.end()));
    }

    #[test]
    fn test_online_matches_batch() {
        let data = hourly_dataset("load", &ramp(12));
        let mut pipeline = forecasting_pipeline();
        pipeline.train(&data).unwrap();

        let batch = pipeline.test(&data, true, false).unwrap();
        let batch = batch.get("rmse").unwrap().clone();

        pipeline.reset();
        let outcomes = pipeline.test_online(&data, 1).unwrap();
        assert_eq!(outcomes.len(), 12);
        let online = outcomes
            .iter()
            .filter_map(|outcome| outcome.get("rmse"))
            .fold(TimeSeries::default(), |acc, series| acc.append(series));
        assert_series_identical(&online, &batch);
    }

    #[test]
    fn test_online_resumes_after_cursor() {
        let data = hourly_dataset("load", &ramp(6));
        let mut pipeline = forecasting_pipeline();
        pipeline.train(&data).unwrap();

        let first = data.slice(&hours_window(0, 2));
        pipeline.test(&first, true, false).unwrap();
        let outcomes = pipeline.test_online(&data, 2).unwrap();
        assert_eq!(outcomes.len(), 2);
        assert_eq!(outcomes[0].report.window, hours_window(3, 4));
        assert_eq!(outcomes[1].report.window, hours_window(5, 5));
        assert!(pipeline.test_online(&data, 2).unwrap().is_empty());
    }

    #[test]
    fn test_lag_chain_continues_from_training_buffer() {
        let data = hourly_dataset("x", &ramp(11));
        let (consumer, counters) = CountingModule::new("b").shared();
        let mut pipeline = Pipeline::new("chain");
        let x = pipeline.input("x");
        let a = pipeline
            .step(&shared(ClockShift::new("a", 1).unwrap()))
            .input("x", x)
            .add()
            .unwrap();
        pipeline.step(&consumer).input("x", a).add().unwrap();

        pipeline.train_window(&data, hours_window(0, 9)).unwrap();
        assert_eq!(counters.fit_count(), 1);

        let outcome = pipeline
            .test_window(&data, hours_window(10, 10), false, false)
            .unwrap();
        assert!(outcome.report.fitted.is_empty());
        assert_eq!(counters.fit_count(), 1);
        assert_values_close(outcome.get("b").unwrap(), &[9.0], 0.0);
    }

    #[test]
    fn test_reset_test_is_idempotent() {
        let data = hourly_dataset("load", &ramp(16));
        let mut pipeline = forecasting_pipeline();
        pipeline.train(&data).unwrap();

        let first = pipeline.test(&data, true, false).unwrap();
        let second = pipeline.test(&data, true, false).unwrap();
        assert_series_identical(second.get("rmse").unwrap(), first.get("rmse").unwrap());
        assert_eq!(second.report.cached, Vec::new());
    }

    #[test]
    fn test_day_night_branches() {
        let data = hourly_dataset("load", &ramp(48));
        let mut pipeline = Pipeline::new("day_night");
        let load = pipeline.input("load");
        let lag = pipeline
            .step(&shared(ClockShift::new("lag", 1).unwrap()))
            .input("x", load)
            .add()
            .unwrap();
        let is_day: Arc<HourOfDay> = Arc::new(HourOfDay::between(8, 20));
        let day = pipeline
            .step(&shared(LinearRegression::new("day")))
            .input("lag", lag)
            .target("y", load)
            .condition(is_day.clone())
            .add()
            .unwrap();
        let night = pipeline
            .step(&shared(LinearRegression::new("night")))
            .input("lag", lag)
            .target("y", load)
            .condition(Arc::new(Not::new(is_day)))
            .add()
            .unwrap();
        pipeline
            .step(&shared(CountingModule::new("merge")))
            .input_any("x", &[day, night])
            .add()
            .unwrap();

        let report = pipeline.train_window(&data, hours_window(9, 15)).unwrap();
        assert!(report.fitted.contains(&day));
        assert!(report.was_skipped(night));
        let report = pipeline.train_window(&data, hours_window(21, 27)).unwrap();
        assert!(report.fitted.contains(&night));
        assert!(pipeline.is_fitted());

        let outcomes = pipeline.test_online(&data, 1).unwrap();
        assert_eq!(outcomes.len(), 48);
        assert!(outcomes[10].report.was_executed(day));
        assert!(outcomes[10].report.was_skipped(night));
        assert!(outcomes[22].report.was_executed(night));
        assert!(outcomes[22].report.was_skipped(day));
        assert_values_close(outcomes[0].get("merge").unwrap(), &[f64::NAN], 0.0);
        assert_values_close(outcomes[10].get("merge").unwrap(), &[10.0], 1e-9);
        assert_values_close(outcomes[22].get("merge").unwrap(), &[22.0], 1e-9);
    }

    #[test]
    fn test_skip_propagates_to_consumers() {
        let data = hourly_dataset("x", &[1.0, 2.0]);
        let mut pipeline = Pipeline::new("gated");
        let x = pipeline.input("x");
        let gated = pipeline
            .step(&shared(CountingModule::new("gated")))
            .input("x", x)
            .condition(Arc::new(HourOfDay::between(8, 20)))
            .add()
            .unwrap();
        let (downstream, counters) = CountingModule::new("downstream").shared();
        let consumer = pipeline.step(&downstream).input("x", gated).add().unwrap();

        let outcome = pipeline.test(&data, true, false).unwrap();
        assert!(outcome.report.was_skipped(gated));
        assert!(outcome.report.was_skipped(consumer));
        assert!(outcome.outputs.is_empty());
        assert_eq!(counters.transform_count(), 0);
    }

    #[test]
    fn test_conditional_input_gates_step() {
        let data = Dataset::new()
            .with_column("x", hourly_series(&[1.0, 2.0]))
            .with_column("flag", hourly_series(&[5.0, 0.0]));
        let mut pipeline = Pipeline::new("flagged");
        let x = pipeline.input("x");
        let flag = pipeline.input("flag");
        pipeline
            .step(&shared(CountingModule::new("above")))
            .input("x", x)
            .condition_input("flag", flag)
            .condition(Arc::new(ValueAbove::new("flag", 1.0)))
            .add()
            .unwrap();
        assert_eq!(pipeline.graph().edge_count_of(EdgeKind::Conditional), 1);

        let outcome = pipeline.test(&data, true, false).unwrap();
        assert_values_close(outcome.get("above").unwrap(), &[1.0, 2.0], 0.0);

        let late = data.slice(&hours_window(1, 1));
        let outcome = pipeline.test(&late, true, false).unwrap();
        assert!(outcome.get("above").is_none());
    }

    #[test]
    fn test_multi_producer_takes_first_with_value() {
        let data = hourly_dataset("x", &[1.0, 2.0]);
        let mut pipeline = Pipeline::new("fallback");
        let x = pipeline.input("x");
        let never = pipeline
            .step(&shared(CountingModule::new("never").with_offset(100.0)))
            .input("x", x)
            .condition(Arc::new(HourOfDay::between(8, 20)))
            .add()
            .unwrap();
        let always = pipeline
            .step(&shared(CountingModule::new("always").with_offset(10.0)))
            .input("x", x)
            .add()
            .unwrap();
        pipeline
            .step(&shared(CountingModule::new("pick")))
            .input_any("x", &[never, always])
            .add()
            .unwrap();

        let outcome = pipeline.test(&data, true, false).unwrap();
        assert_values_close(outcome.get("pick").unwrap(), &[11.0, 12.0], 0.0);
    }

    #[test]
    fn test_shared_module_fitted_once_and_persisted() {
        let data = hourly_dataset("x", &ramp(10));
        let scaler = shared(StandardScaler::new("scaler"));
        let (sum, counters) = CountingModule::new("sum").shared();

        let mut pipeline = Pipeline::new("shared");
        let x = pipeline.input("x");
        let a = pipeline.step(&scaler).input("x", x).add().unwrap();
        let b = pipeline.step(&scaler).input("x", a).add().unwrap();
        let c = pipeline.step(&sum).input("x", b).add().unwrap();

        assert_eq!(pipeline.graph().node_count(), 4);
        assert_eq!(pipeline.graph().edge_count(), 3);
        assert_eq!(pipeline.graph().edge_count_of(EdgeKind::Target), 0);
        assert_eq!(pipeline.target_graph().node_count(), 4);
        assert_eq!(pipeline.target_graph().edge_count(), 0);
        assert_eq!(pipeline.modules().len(), 2);
        assert_eq!(pipeline.graph().step(b).unwrap().name(), "scaler_1");

        let report = pipeline.train(&data).unwrap();
        assert_eq!(report.fitted, vec![a, c]);
        assert_eq!(counters.fit_count(), 1);
        let before = pipeline.test(&data, true, false).unwrap();
        let before = before.get("sum").unwrap().clone();

        let dir = tempfile::tempdir().unwrap();
        pipeline.to_folder(dir.path()).unwrap();
        assert_eq!(fs::read_dir(dir.path().join("modules")).unwrap().count(), 2);

        let mut loaded = Pipeline::from_folder(dir.path(), &registry()).unwrap();
        assert_eq!(loaded.name(), "shared");
        assert_eq!(loaded.graph().node_count(), 4);
        assert_eq!(loaded.graph().edge_count(), 3);
        assert_eq!(loaded.target_graph().edge_count(), 0);
        assert_eq!(loaded.modules().len(), 2);
        let first = loaded.graph().step(a).unwrap().module();
        let second = loaded.graph().step(b).unwrap().module();
        assert!(first.same_instance(second));

        let after = loaded.test(&data, true, false).unwrap();
        assert_values_close(after.get("sum").unwrap(), before.values(), 1e-9);
    }

    #[test]
    fn test_targets_reach_fitting_steps_only() {
        let data = Dataset::new()
            .with_column("x", hourly_series(&[1.0, 2.0]))
            .with_column("y", hourly_series(&[3.0, 4.0]));
        let (model, counters) = CountingModule::new("model").requiring_fit().shared();
        let mut pipeline = Pipeline::new("targets");
        let x = pipeline.input("x");
        let y = pipeline.input("y");
        pipeline.step(&model).input("x", x).target("y", y).add().unwrap();

        pipeline.train(&data).unwrap();
        assert_eq!(counters.fit_targets(), vec![vec!["y".to_string()]]);

        let features_only = Dataset::new().with_column("x", hourly_series(&[5.0]));
        let outcome = pipeline.test(&features_only, true, false).unwrap();
        assert_values_close(outcome.get("model").unwrap(), &[5.0], 0.0);
    }

    #[test]
    fn test_unfitted_module_fails_test() {
        let data = hourly_dataset("x", &[1.0]);
        let mut pipeline = Pipeline::new("unfitted");
        let x = pipeline.input("x");
        pipeline
            .step(&shared(CountingModule::new("model").requiring_fit()))
            .input("x", x)
            .add()
            .unwrap();

        let err = pipeline.test(&data, true, false).unwrap_err();
        assert!(matches!(err, WattflowError::NotFitted(_)));
    }

    #[test]
    fn test_missing_column_fails() {
        let mut pipeline = Pipeline::new("missing");
        let x = pipeline.input("x");
        pipeline
            .step(&shared(CountingModule::new("m")))
            .input("x", x)
            .add()
            .unwrap();

        let err = pipeline.test(&hourly_dataset("other", &[1.0]), true, false).unwrap_err();
        match err {
            WattflowError::MissingInput(err) => assert_eq!(err.input, "x"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_module_failure_is_wrapped() {
        let data = hourly_dataset("x", &[1.0]);
        let mut pipeline = Pipeline::new("failing");
        let x = pipeline.input("x");
        pipeline
            .step(&shared(FailingModule::new("broken", FailOn::Transform, "boom")))
            .input("x", x)
            .add()
            .unwrap();

        let sink = Arc::new(CollectingEventSink::new());
        let mut pipeline = pipeline.with_event_sink(sink.clone());
        let err = pipeline.test(&data, true, false).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert!(err.module_source().is_some());
        assert_eq!(sink.events_of_type(names::STEP_FAILED).len(), 1);
    }

    #[test]
    fn test_results_cached_per_window() {
        let data = hourly_dataset("x", &[1.0, 2.0]);
        let (shared_step, counters) = CountingModule::new("shared").shared();
        let mut pipeline = Pipeline::new("cache");
        let x = pipeline.input("x");
        let a = pipeline.step(&shared_step).input("x", x).add().unwrap();
        pipeline.step(&shared(CountingModule::new("left"))).input("x", a).add().unwrap();
        let right = pipeline
            .step(&shared(CountingModule::new("right")))
            .input("x", a)
            .add()
            .unwrap();

        pipeline.test(&data, true, false).unwrap();
        assert_eq!(counters.transform_count(), 1);

        let again = pipeline.test(&data, false, false).unwrap();
        assert_eq!(counters.transform_count(), 1);
        assert!(again.report.cached.contains(&right));
        assert_values_close(again.get("right").unwrap(), &[1.0, 2.0], 0.0);
    }

    #[test]
    fn test_cached_window_ignores_new_data_until_reset() {
        let first = hourly_dataset("x", &[1.0, 2.0]);
        let second = hourly_dataset("x", &[5.0, 6.0]);
        let mut pipeline = Pipeline::new("cache");
        let x = pipeline.input("x");
        pipeline.step(&shared(CountingModule::new("copy"))).input("x", x).add().unwrap();

        pipeline.test(&first, true, false).unwrap();
        let stale = pipeline.test(&second, false, false).unwrap();
        assert_values_close(stale.get("copy").unwrap(), &[1.0, 2.0], 0.0);

        let fresh = pipeline.test(&second, true, false).unwrap();
        assert_values_close(fresh.get("copy").unwrap(), &[5.0, 6.0], 0.0);
    }

    #[test]
    fn test_callbacks_and_summary() {
        let data = hourly_dataset("load", &ramp(6));
        let mut pipeline = forecasting_pipeline();
        let collector = Arc::new(CollectingCallback::new());
        pipeline.add_callback(collector.clone());
        pipeline.train(&data).unwrap();

        pipeline.test_online(&data, 3).unwrap();
        assert_eq!(collector.outputs("rmse").len(), 2);

        let summary = pipeline.create_summary();
        assert_eq!(summary.get("rmse").unwrap().points(), 6);
        assert_eq!(summary.get("regression").unwrap().points(), 6);
        assert!(summary.get("lag").is_some());

        let outcome = pipeline.test(&data, true, true).unwrap();
        assert_eq!(outcome.summary.unwrap().get("rmse").unwrap().points(), 6);
    }

    #[test]
    fn test_lifecycle_events() {
        let sink = Arc::new(CollectingEventSink::new());
        let data = hourly_dataset("load", &ramp(4));
        let mut pipeline = forecasting_pipeline().with_event_sink(sink.clone());
        pipeline.train(&data).unwrap();
        pipeline.test(&data, true, false).unwrap();

        let types = sink.event_types();
        assert_eq!(types.first().map(String::as_str), Some(names::TRAIN_STARTED));
        assert_eq!(types.last().map(String::as_str), Some(names::TEST_COMPLETED));
        assert_eq!(sink.events_of_type(names::STEP_FITTED).len(), 3);
    }

    #[test]
    fn test_sub_pipeline_round_trip() {
        let mut inner = Pipeline::new("inner");
        let x = inner.input("x");
        inner
            .step(&shared(CountingModule::new("plus_one").with_offset(1.0)))
            .input("x", x)
            .add()
            .unwrap();

        let mut outer = Pipeline::new("outer");
        let x = outer.input("x");
        outer
            .step(&shared(SubPipeline::new(inner)))
            .input("x", x)
            .add()
            .unwrap();

        let data = hourly_dataset("x", &[1.0, 2.0, 3.0]);
        outer.train(&data).unwrap();
        let outcome = outer.test(&data, true, false).unwrap();
        assert_values_close(outcome.get("inner").unwrap(), &[2.0, 3.0, 4.0], 0.0);

        let dir = tempfile::tempdir().unwrap();
        outer.to_folder(dir.path()).unwrap();
        let mut loaded = Pipeline::from_folder(dir.path(), &registry()).unwrap();
        let outcome = loaded.test(&data, true, false).unwrap();
        assert_values_close(outcome.get("inner").unwrap(), &[2.0, 3.0, 4.0], 0.0);
    }

    /// Day and night regressions gated on the hour of the load column.
    fn calendar_pipeline() -> Pipeline {
        let mut pipeline = Pipeline::new("calendar");
        let load = pipeline.input("load");
        let lag = pipeline
            .step(&shared(ClockShift::new("lag", 1).unwrap()))
            .input("x", load)
            .add()
            .unwrap();
        let is_day: Arc<HourOfDay> = Arc::new(HourOfDay::between(8, 20).on_input("clock"));
        let day = pipeline
            .step(&shared(LinearRegression::new("day")))
            .input("lag", lag)
            .target("y", load)
            .condition(is_day.clone())
            .condition_input("clock", load)
            .add()
            .unwrap();
        let night = pipeline
            .step(&shared(LinearRegression::new("night")))
            .input("lag", lag)
            .target("y", load)
            .condition(Arc::new(Not::new(is_day)))
            .condition_input("clock", load)
            .add()
            .unwrap();
        pipeline
            .step(&shared(CountingModule::new("merge")))
            .input_any("x", &[day, night])
            .add()
            .unwrap();
        pipeline
    }

    #[test]
    fn test_conditional_pipeline_round_trip() {
        let values = ramp(48);
        let data = hourly_dataset("load", &values);
        let first_day = hourly_dataset("load", &values[..24]);

        let mut pipeline = calendar_pipeline();
        pipeline.train_window(&data, hours_window(9, 15)).unwrap();
        pipeline.train_window(&data, hours_window(21, 27)).unwrap();
        pipeline.test_online(&first_day, 1).unwrap();
        assert_eq!(pipeline.cursor(), Some(hour(23)));

        let dir = tempfile::tempdir().unwrap();
        pipeline.to_folder(dir.path()).unwrap();
        let mut loaded = Pipeline::from_folder(dir.path(), &registry()).unwrap();

        let day = pipeline.step_id("day").unwrap();
        let night = pipeline.step_id("night").unwrap();
        let merge = pipeline.step_id("merge").unwrap();
        for kind in [EdgeKind::Computational, EdgeKind::Conditional, EdgeKind::Target] {
            assert_eq!(
                loaded.graph().edge_count_of(kind),
                pipeline.graph().edge_count_of(kind),
                "{kind} edges"
            );
        }
        assert_eq!(loaded.graph().node_count(), 5);
        assert_eq!(loaded.graph().edge_count_of(EdgeKind::Computational), 5);
        assert_eq!(loaded.graph().edge_count_of(EdgeKind::Conditional), 2);
        assert_eq!(loaded.target_graph().edge_count(), 2);
        assert!(loaded.target_graph().has_inbound(day));
        assert!(loaded.target_graph().has_inbound(night));
        assert!(!loaded.target_graph().has_inbound(merge));

        for id in [day, night] {
            let saved = pipeline.graph().step(id).unwrap().condition().unwrap().describe();
            let restored = loaded.graph().step(id).unwrap().condition().unwrap().describe();
            assert_eq!(restored, saved);
        }
        assert_eq!(loaded.cursor(), Some(hour(23)));
        assert!(loaded.is_fitted());

        let expected = pipeline.test_online(&data, 1).unwrap();
        let actual = loaded.test_online(&data, 1).unwrap();
        assert_eq!(actual.len(), 24);
        assert_eq!(actual.len(), expected.len());
        for (after, before) in actual.iter().zip(&expected) {
            assert_eq!(after.report.executed, before.report.executed);
            assert_values_close(
                after.get("merge").unwrap(),
                before.get("merge").unwrap().values(),
                1e-9,
            );
        }
        assert!(actual[10].report.was_executed(day));
        assert!(actual[22].report.was_executed(night));
    }

    fn saved_pipeline() -> tempfile::TempDir {
        let mut pipeline = Pipeline::new("saved");
        let x = pipeline.input("x");
        pipeline
            .step(&shared(StandardScaler::new("scaler")))
            .input("x", x)
            .add()
            .unwrap();
        pipeline.train(&hourly_dataset("x", &ramp(5))).unwrap();
        let dir = tempfile::tempdir().unwrap();
        pipeline.to_folder(dir.path()).unwrap();
        dir
    }

    fn assert_corrupt(result: Result<Pipeline, WattflowError>) {
        match result {
            Err(WattflowError::CorruptPipeline(_)) => {}
            Err(other) => panic!("expected a corrupt pipeline error, got: {other}"),
            Ok(_) => panic!("expected a corrupt pipeline error, got a pipeline"),
        }
    }

    #[test]
    fn test_load_rejects_missing_descriptor() {
        let dir = tempfile::tempdir().unwrap();
        assert_corrupt(Pipeline::from_folder(dir.path(), &registry()));
    }

    #[test]
    fn test_load_rejects_tampered_blob() {
        let dir = saved_pipeline();
        let blob = dir.path().join("modules/0/module.json");
        let text = fs::read_to_string(&blob).unwrap();
        fs::write(&blob, text.replace("scaler", "scalar")).unwrap();
        assert_corrupt(Pipeline::from_folder(dir.path(), &registry()));
    }

    #[test]
    fn test_load_rejects_missing_blob() {
        let dir = saved_pipeline();
        fs::remove_dir_all(dir.path().join("modules/0")).unwrap();
        assert_corrupt(Pipeline::from_folder(dir.path(), &registry()));
    }

    #[test]
    fn test_load_rejects_unknown_module_type() {
        let dir = saved_pipeline();
        assert_corrupt(Pipeline::from_folder(dir.path(), &Registry::new()));
    }

    #[test]
    fn test_load_rejects_forward_reference() {
        let dir = saved_pipeline();
        let path = dir.path().join("pipeline.json");
        let mut descriptor: serde_json::Value =
            serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        descriptor["nodes"][1]["bindings"][0]["producers"] = serde_json::json!([1]);
        fs::write(&path, serde_json::to_vec(&descriptor).unwrap()).unwrap();
        assert_corrupt(Pipeline::from_folder(dir.path(), &registry()));
    }

    fn rewrite_json(path: &std::path::Path, edit: impl FnOnce(&mut serde_json::Value)) -> Vec<u8> {
        let mut value: serde_json::Value = serde_json::from_slice(&fs::read(path).unwrap()).unwrap();
        edit(&mut value);
        let bytes = serde_json::to_vec_pretty(&value).unwrap();
        fs::write(path, &bytes).unwrap();
        bytes
    }

    #[test]
    fn test_load_rejects_malformed_module_state() {
        let data = hourly_dataset("x", &ramp(4));
        let mut pipeline = Pipeline::new("lagged");
        let x = pipeline.input("x");
        pipeline
            .step(&shared(ClockShift::new("lag", 1).unwrap()))
            .input("x", x)
            .add()
            .unwrap();
        pipeline.train(&data).unwrap();
        pipeline.test(&data, true, false).unwrap();
        let dir = tempfile::tempdir().unwrap();
        pipeline.to_folder(dir.path()).unwrap();

        let blob = rewrite_json(&dir.path().join("modules/0/module.json"), |module| {
            module["state"]["values"] = serde_json::json!([]);
        });
        rewrite_json(&dir.path().join("pipeline.json"), |descriptor| {
            descriptor["modules"][0]["checksum"] = serde_json::json!(checksum(&blob));
        });
        assert_corrupt(Pipeline::from_folder(dir.path(), &registry()));
    }

    #[test]
    fn test_load_rejects_params_disagreeing_with_record() {
        let dir = saved_pipeline();
        let path = dir.path().join("pipeline.json");
        let descriptor: serde_json::Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(descriptor["modules"][0]["type_tag"], StandardScaler::TYPE_TAG);
        assert!(descriptor["modules"][0]["params"].is_object());

        rewrite_json(&path, |descriptor| {
            descriptor["modules"][0]["params"]["renamed"] = serde_json::json!(true);
        });
        assert_corrupt(Pipeline::from_folder(dir.path(), &registry()));
    }
}
