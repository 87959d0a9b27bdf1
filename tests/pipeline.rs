use std::fs;

use academic_early_warning::export::{export_headers, format_score, EXPORT_FILENAME};
use academic_early_warning::ingest::{load_batch, load_batch_from_path};
use academic_early_warning::{
    run_pipeline, AlertTier, FilteredView, InputSchema, PipelineConfig, PipelineError,
    TierHistogram, TierSelection,
};
use tempfile::tempdir;

const COHORT: &str = "\
student_id,carrera,genero,ciudad_origen,failed_course_count,motivation_level
S01,Ingeniería Civil,F,Concepción,0,3
S02,Ingeniería Civil,M,Talcahuano,1,3
S03,\"Derecho, Vespertino\",F,Chillán,2,3
S04,Psicología,M,Concepción,3,3
S05,Psicología,F,Los Ángeles,4,3
S06,Ingeniería Comercial,M,Coronel,5,3
S07,Ingeniería Comercial,F,Lota,6,3
S08,Derecho,M,\"Tomé \"\"centro\"\"\",7,3
S09,Medicina,F,Concepción,8,3
S10,Medicina,M,Penco,9,3
";

#[test]
fn cohort_file_classifies_with_pinned_cutoffs() {
    let tmp = tempdir().expect("temporary directory");
    let path = tmp.path().join("cohorte.csv");
    fs::write(&path, COHORT).expect("write cohort");

    let batch = load_batch_from_path(&path, b',', &InputSchema::default()).expect("load batch");
    let output = run_pipeline(&batch, &PipelineConfig::default()).expect("run pipeline");

    assert!((output.cutoffs.medium - 7.95).abs() < 1e-9);
    assert!((output.cutoffs.high - 9.975).abs() < 1e-9);
    assert_eq!(
        output.histogram,
        TierHistogram {
            low: 7,
            medium: 1,
            high: 2
        }
    );
    assert!(output.classified.iter().all(|record| record.risk_score() >= 0.0));
}

#[test]
fn export_round_trips_the_filtered_view() {
    let batch = load_batch(COHORT.as_bytes(), b',', &InputSchema::default()).expect("load batch");
    let output = run_pipeline(&batch, &PipelineConfig::default()).expect("run pipeline");
    let selection: TierSelection = "medium,high".parse().expect("selection");
    let view = output.view(&selection);
    assert_eq!(view.len(), 3);

    let tmp = tempdir().expect("temporary directory");
    let path = tmp.path().join(EXPORT_FILENAME);
    fs::write(&path, output.export(&view, b',').expect("export")).expect("write export");

    let mut reader = csv::Reader::from_path(&path).expect("open export");
    let headers: Vec<String> = reader
        .headers()
        .expect("headers")
        .iter()
        .map(str::to_string)
        .collect();
    assert_eq!(headers, export_headers(&output.headers));

    let parsed: Vec<Vec<String>> = reader
        .records()
        .map(|record| record.expect("record").iter().map(str::to_string).collect())
        .collect();
    let expected: Vec<Vec<String>> = view
        .rows()
        .iter()
        .map(|record| {
            let mut row = record.fields().to_vec();
            row.push(format_score(record.risk_score()));
            row.push(record.alert_tier.to_string());
            row
        })
        .collect();
    assert_eq!(parsed, expected);
    assert_eq!(parsed[0][7], "MEDIUM");
    assert_eq!(parsed[0][3], "Tomé \"centro\"");
}

#[test]
fn reprocessing_an_export_reproduces_scores() {
    let batch = load_batch(COHORT.as_bytes(), b',', &InputSchema::default()).expect("load batch");
    let config = PipelineConfig::default();
    let first = run_pipeline(&batch, &config).expect("first run");
    let exported = first
        .export(&first.view(&TierSelection::all()), b',')
        .expect("export");

    let reloaded = load_batch(exported.as_slice(), b',', &InputSchema::default()).expect("reload");
    assert_eq!(reloaded, batch);

    let second = run_pipeline(&reloaded, &config).expect("second run");
    assert_eq!(first.cutoffs, second.cutoffs);
    assert_eq!(first.classified, second.classified);
}

#[test]
fn empty_selection_exports_header_only() {
    let batch = load_batch(COHORT.as_bytes(), b',', &InputSchema::default()).expect("load batch");
    let output = run_pipeline(&batch, &PipelineConfig::default()).expect("run pipeline");
    let view = output.view(&TierSelection::none());
    assert_eq!(view, FilteredView::NothingSelected);

    let text = String::from_utf8(output.export(&view, b',').expect("export")).expect("utf8");
    assert_eq!(text.lines().count(), 1);
    assert!(text.ends_with("risk_score,alert_tier\n"));
}

#[test]
fn missing_motivation_column_names_the_field() {
    let text = "student_id,failed_course_count\nS01,2\n";
    let batch = load_batch(text.as_bytes(), b',', &InputSchema::default()).expect("load batch");
    let err = run_pipeline(&batch, &PipelineConfig::default()).expect_err("schema error");
    match &err {
        PipelineError::Schema { missing } => assert_eq!(missing, &vec!["motivation_level".to_string()]),
        other => panic!("expected schema error, got {other:?}"),
    }
    assert!(err.to_string().contains("motivation_level"));
}

#[test]
fn high_tier_only_contains_top_scores() {
    let batch = load_batch(COHORT.as_bytes(), b',', &InputSchema::default()).expect("load batch");
    let output = run_pipeline(&batch, &PipelineConfig::default()).expect("run pipeline");
    let selection: TierSelection = [AlertTier::High].into_iter().collect();
    let view = output.view(&selection);
    let ids: Vec<&str> = view
        .rows()
        .iter()
        .map(|record| record.fields()[0].as_str())
        .collect();
    assert_eq!(ids, vec!["S09", "S10"]);
}
