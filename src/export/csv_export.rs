// ==========================================
// 饲料搅拌批次偏差分析系统 - CSV 导出
// ==========================================
// 职责: 统计表、批次结果、相对权重、直方图分箱写出为 CSV
// 表头按导出语言翻译；写出目标为任意 io::Write
// ==========================================

use crate::domain::{AnalysisReport, BinSet, ClassifiedBatch, StatisticsRecord, ToneKind, WeightMap};
use crate::export::error::{ExportError, ExportResult};
use crate::i18n::{t_in, t_in_with_args};
use csv::Writer;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, instrument};

pub const STATISTICS_FILE: &str = "estatisticas.csv";
pub const BATCHES_FILE: &str = "dados_processados.csv";
pub const WEIGHTS_FILE: &str = "pesos_relativos.csv";
pub const HISTOGRAM_FILE: &str = "histograma.csv";

/// 可选数值：缺失时写空单元格
fn opt_cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

// ==========================================
// CsvReportWriter
// ==========================================
pub struct CsvReportWriter<W: Write> {
    writer: Writer<W>,
    locale: String,
}

impl<W: Write> CsvReportWriter<W> {
    pub fn new(inner: W, locale: &str) -> Self {
        Self {
            writer: Writer::from_writer(inner),
            locale: locale.to_string(),
        }
    }

    fn label(&self, key: &str) -> String {
        t_in(&self.locale, key)
    }

    /// 统计表: Estatística, Valor
    pub fn write_statistics(&mut self, stats: &StatisticsRecord) -> ExportResult<()> {
        self.writer.write_record([
            self.label("stats.header_statistic"),
            self.label("stats.header_value"),
        ])?;
        self.writer.write_record([
            self.label("stats.batch_count"),
            stats.batch_count.to_string(),
        ])?;
        self.writer
            .write_record([self.label("stats.mean"), opt_cell(stats.mean_pct)])?;
        self.writer
            .write_record([self.label("stats.median"), opt_cell(stats.median_pct)])?;

        for bucket in &stats.buckets {
            let lower = bucket.band.lower.to_string();
            let label = match bucket.band.upper {
                Some(upper) => t_in_with_args(
                    &self.locale,
                    "stats.interval_between",
                    &[("lower", &lower), ("upper", &upper.to_string())],
                ),
                None => t_in_with_args(&self.locale, "stats.interval_above", &[("lower", &lower)]),
            };
            self.writer.write_record([label, bucket.count.to_string()])?;
        }

        self.writer.write_record([
            self.label("stats.unclassified"),
            stats.unclassified.to_string(),
        ])?;
        Ok(())
    }

    /// 批次结果: COD. BATIDA, MÉDIA PONDERADA (%), CLASSIFICAÇÃO
    pub fn write_batches(&mut self, batches: &[ClassifiedBatch]) -> ExportResult<()> {
        self.writer.write_record([
            self.label("export.batch_code"),
            self.label("export.weighted_avg"),
            self.label("export.band"),
        ])?;
        for batch in batches {
            let band = batch
                .band
                .map(|b| self.label(b.label_key()))
                .unwrap_or_default();
            self.writer.write_record([
                batch.aggregate.batch_id.to_string(),
                batch.aggregate.weighted_avg_pct.to_string(),
                band,
            ])?;
        }
        Ok(())
    }

    pub fn write_weights(&mut self, weights: &WeightMap) -> ExportResult<()> {
        self.writer.write_record([
            self.label("export.food_type"),
            self.label("export.relative_weight"),
        ])?;
        for (food_type, weight) in weights.iter() {
            self.writer
                .write_record([food_type.to_string(), weight.to_string()])?;
        }
        Ok(())
    }

    pub fn write_histogram(&mut self, bins: &BinSet) -> ExportResult<()> {
        self.writer.write_record([
            self.label("export.bin_lower"),
            self.label("export.bin_upper"),
            self.label("export.bin_count"),
            self.label("export.bin_tone"),
            self.label("export.bin_intensity"),
        ])?;
        for bin in &bins.bins {
            let tone = match bin.tone.kind {
                ToneKind::LowDeviation => self.label("export.tone_low"),
                ToneKind::HighDeviation => self.label("export.tone_high"),
            };
            self.writer.write_record([
                bin.lower.to_string(),
                bin.upper.to_string(),
                bin.count.to_string(),
                tone,
                bin.tone.intensity.to_string(),
            ])?;
        }
        Ok(())
    }

    /// 刷新并取回底层写出目标
    pub fn finish(self) -> ExportResult<W> {
        self.writer
            .into_inner()
            .map_err(|e| ExportError::Io(std::io::Error::new(e.error().kind(), e.error().to_string())))
    }
}

// ==========================================
// ReportExporter - 报告整体导出到目录
// ==========================================
pub struct ReportExporter {
    locale: String,
}

impl ReportExporter {
    pub fn new(locale: &str) -> Self {
        Self {
            locale: locale.to_string(),
        }
    }

    /// 导出全部 CSV，返回写出的文件路径；无直方图时不写 histograma.csv
    #[instrument(skip(self, report, dir), fields(dir = %dir.as_ref().display()))]
    pub fn export_to_dir<P: AsRef<Path>>(
        &self,
        report: &AnalysisReport,
        dir: P,
    ) -> ExportResult<Vec<PathBuf>> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir).map_err(|e| ExportError::CreateDir {
            path: dir.display().to_string(),
            message: e.to_string(),
        })?;

        let mut written = Vec::new();

        let path = dir.join(STATISTICS_FILE);
        let mut w = self.file_writer(&path)?;
        w.write_statistics(&report.statistics)?;
        w.finish()?;
        written.push(path);

        let path = dir.join(BATCHES_FILE);
        let mut w = self.file_writer(&path)?;
        w.write_batches(&report.batches)?;
        w.finish()?;
        written.push(path);

        let path = dir.join(WEIGHTS_FILE);
        let mut w = self.file_writer(&path)?;
        w.write_weights(&report.weights)?;
        w.finish()?;
        written.push(path);

        if let Some(bins) = &report.histogram {
            let path = dir.join(HISTOGRAM_FILE);
            let mut w = self.file_writer(&path)?;
            w.write_histogram(bins)?;
            w.finish()?;
            written.push(path);
        }

        info!(files = written.len(), "导出完成");
        Ok(written)
    }

    fn file_writer(&self, path: &Path) -> ExportResult<CsvReportWriter<fs::File>> {
        let file = fs::File::create(path)?;
        Ok(CsvReportWriter::new(file, &self.locale))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::IntervalLimits;
    use crate::domain::{BatchAggregate, BatchId, DeviationBand};
    use crate::engine::StatisticsSummarizer;

    fn render<F>(locale: &str, f: F) -> String
    where
        F: FnOnce(&mut CsvReportWriter<Vec<u8>>) -> ExportResult<()>,
    {
        let mut writer = CsvReportWriter::new(Vec::new(), locale);
        f(&mut writer).unwrap();
        String::from_utf8(writer.finish().unwrap()).unwrap()
    }

    #[test]
    fn test_write_statistics_pt_br() {
        let stats = StatisticsSummarizer::new(1)
            .unwrap()
            .summarize(&[2.0, 4.0, 6.0, 9.0], &IntervalLimits::default().bands());
        let out = render("pt-BR", |w| w.write_statistics(&stats));
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "Estatística,Valor");
        assert_eq!(lines[1], "Número de Batidas,4");
        assert_eq!(lines[2], "Média Ponderada (%),5.3");
        assert_eq!(lines[3], "Mediana Ponderada (%),5");
        assert_eq!(lines[4], "Diferença entre 3% e 5%,1");
        assert_eq!(lines[6], "Diferença acima de 7%,1");
        assert_eq!(lines[7], "Fora dos intervalos,1");
    }

    #[test]
    fn test_write_batches_with_band() {
        let batches = vec![
            ClassifiedBatch {
                aggregate: BatchAggregate {
                    batch_id: BatchId::new("101"),
                    weighted_avg_pct: 8.5,
                },
                band: Some(DeviationBand::Severe),
            },
            ClassifiedBatch {
                aggregate: BatchAggregate {
                    batch_id: BatchId::new("102"),
                    weighted_avg_pct: 4.5,
                },
                band: None,
            },
        ];
        let out = render("en", |w| w.write_batches(&batches));
        let lines: Vec<&str> = out.lines().collect();

        assert_eq!(lines[0], "BATCH CODE,WEIGHTED AVERAGE (%),CLASSIFICATION");
        assert_eq!(lines[1], "101,8.5,Severe");
        assert_eq!(lines[2], "102,4.5,");
    }

    #[test]
    fn test_write_weights_sorted() {
        let weights: WeightMap = [("VOLUMOSO", 1.5), ("CONCENTRADO", 0.8)].into_iter().collect();
        let out = render("pt-BR", |w| w.write_weights(&weights));
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines[0], "Tipo de Alimento,Peso Relativo");
        assert_eq!(lines[1], "CONCENTRADO,0.8");
        assert_eq!(lines[2], "VOLUMOSO,1.5");
    }
}
