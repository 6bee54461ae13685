// ==========================================
// CSV 导出集成测试
// ==========================================
// 测试目标: 分析报告导出为 4 个 CSV 文件
// ==========================================


use batidas_qc::api::AnalysisApi;
use batidas_qc::config::AnalysisConfig;
use batidas_qc::engine::{AnalysisRequest, FilterCriteria};
use batidas_qc::export::{BATCHES_FILE, HISTOGRAM_FILE, STATISTICS_FILE, WEIGHTS_FILE};
use batidas_qc::logging;
use tempfile::TempDir;
use test_helpers::{default_config, read_lines, sample_path, sample_weights};

fn run_and_export(config: AnalysisConfig) -> (TempDir, Vec<std::path::PathBuf>) {
    let api = AnalysisApi::new(config).unwrap();
    let dataset = api.load_dataset(sample_path()).unwrap();
    let outcome = api
        .run_analysis(&dataset, &AnalysisRequest::new(FilterCriteria::all(), sample_weights()))
        .unwrap();

    let dir = TempDir::new().unwrap();
    let files = api
        .export_report(outcome.report().unwrap(), dir.path().join("saida"))
        .unwrap();
    (dir, files)
}

#[test]
fn test_export_writes_all_files() {
    logging::init_test();

    let (_dir, files) = run_and_export(default_config());
    let names: Vec<String> = files
        .iter()
        .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
        .collect();

    assert_eq!(names, vec![STATISTICS_FILE, BATCHES_FILE, WEIGHTS_FILE, HISTOGRAM_FILE]);
    assert!(files.iter().all(|p| p.exists()));
}

#[test]
fn test_statistics_file_content() {
    let (_dir, files) = run_and_export(default_config());
    let lines = read_lines(&files[0]);

    assert_eq!(lines[0], "Estatística,Valor");
    assert_eq!(lines[1], "Número de Batidas,6");
    assert_eq!(lines[3], "Mediana Ponderada (%),3.8");
    assert_eq!(lines[6], "Diferença acima de 7%,2");
}

#[test]
fn test_batches_file_has_one_row_per_batch() {
    let (_dir, files) = run_and_export(default_config());
    let lines = read_lines(&files[1]);

    assert_eq!(lines[0], "COD. BATIDA,MÉDIA PONDERADA (%),CLASSIFICAÇÃO");
    assert_eq!(lines.len(), 7);
    assert!(lines[5].starts_with("5,72"));
    assert!(lines[5].ends_with(",Grave"));
}

#[test]
fn test_export_in_english() {
    let config = AnalysisConfig {
        locale: "en".to_string(),
        ..default_config()
    };
    let (_dir, files) = run_and_export(config);

    let weights = read_lines(&files[2]);
    assert_eq!(weights[0], "Food Type,Relative Weight");
    assert_eq!(weights[1], "CONCENTRADO,0.8");

    let histogram = read_lines(&files[3]);
    assert_eq!(
        histogram[0],
        "Lower Edge (%),Upper Edge (%),Batches,Tone,Intensity"
    );
}
