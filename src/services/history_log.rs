use serde::{Deserialize, Serialize};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};

use crate::error::HistoryLogError;
use crate::models::stock::Quote;

pub const HEADER: [&str; 10] = [
    "time", "latest_price", "open", "high", "low", "volume", "turnover", "flow_main", "ma5", "ma20",
];

/// 历史文件中的一行，列顺序与 HEADER 一致。均线未定义时为空单元格。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryRecord {
    pub time: String,
    pub latest_price: f64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub volume: f64,
    pub turnover: f64,
    pub flow_main: f64,
    pub ma5: Option<f64>,
    pub ma20: Option<f64>,
}

impl From<&Quote> for HistoryRecord {
    fn from(q: &Quote) -> Self {
        Self {
            time: q.time_str(),
            latest_price: q.latest_price,
            open: q.open,
            high: q.high,
            low: q.low,
            volume: q.volume,
            turnover: q.turnover,
            flow_main: q.flow_main,
            ma5: q.ma5,
            ma20: q.ma20,
        }
    }
}

/// 只追加的 CSV 历史文件。每次写入都重新打开，不长期持有文件句柄。
#[derive(Debug, Clone)]
pub struct HistoryLog {
    path: PathBuf,
}

impl HistoryLog {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 文件不存在（或为空）时写入表头；已有内容不做任何改动
    pub fn ensure_header(&self) -> Result<(), HistoryLogError> {
        let file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        if file.metadata()?.len() == 0 {
            let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
            writer.write_record(HEADER)?;
            writer.flush()?;
        }
        Ok(())
    }

    /// 追加一条已校验的真实行情，占位数据直接拒绝
    pub fn append(&self, quote: &Quote) -> Result<(), HistoryLogError> {
        if quote.synthetic {
            return Err(HistoryLogError::SyntheticQuote);
        }
        self.ensure_header()?;

        let file = OpenOptions::new().append(true).open(&self.path)?;
        let mut writer = csv::WriterBuilder::new().has_headers(false).from_writer(file);
        writer.serialize(HistoryRecord::from(quote))?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_all(&self) -> Result<Vec<HistoryRecord>, HistoryLogError> {
        let mut reader = csv::ReaderBuilder::new().has_headers(true).from_path(&self.path)?;
        let mut records = Vec::new();
        for row in reader.deserialize::<HistoryRecord>() {
            records.push(row?);
        }
        Ok(records)
    }

    /// 文件中的数据行数，跨多次运行累计
    pub fn record_count(&self) -> Result<usize, HistoryLogError> {
        Ok(self.read_all()?.len())
    }

    pub fn size_bytes(&self) -> Result<u64, HistoryLogError> {
        Ok(std::fs::metadata(&self.path)?.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::stock::now_timestamp;

    fn quote(price: f64) -> Quote {
        let mut q = Quote::placeholder("512000", "券商ETF", now_timestamp());
        q.synthetic = false;
        q.latest_price = price;
        q
    }

    #[test]
    fn test_header_written_once() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("h.csv"));
        log.ensure_header().unwrap();
        log.ensure_header().unwrap();
        let text = std::fs::read_to_string(log.path()).unwrap();
        assert_eq!(text, "time,latest_price,open,high,low,volume,turnover,flow_main,ma5,ma20\n");
    }

    #[test]
    fn test_existing_content_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");
        std::fs::write(&path, "legacy header\nold,row\n").unwrap();
        let log = HistoryLog::new(&path);
        log.append(&quote(1.1)).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("legacy header\nold,row\n"));
        assert_eq!(text.lines().count(), 3);
    }

    #[test]
    fn test_synthetic_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("h.csv"));
        let q = Quote::placeholder("512000", "券商ETF", now_timestamp());
        assert!(matches!(log.append(&q), Err(HistoryLogError::SyntheticQuote)));
        assert!(!log.path().exists());
    }

    #[test]
    fn test_undefined_ma_written_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("h.csv"));
        let mut q = quote(1.2);
        q.ma5 = Some(1.15);
        log.append(&q).unwrap();
        let text = std::fs::read_to_string(log.path()).unwrap();
        let line = text.lines().nth(1).unwrap();
        assert!(line.ends_with(",1.15,"), "unexpected line: {}", line);
    }

    #[test]
    fn test_unwritable_path_reports_error() {
        let dir = tempfile::tempdir().unwrap();
        let log = HistoryLog::new(dir.path().join("missing").join("h.csv"));
        assert!(matches!(log.append(&quote(1.0)), Err(HistoryLogError::Io(_))));
    }

    #[test]
    fn test_record_count_spans_runs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("h.csv");
        HistoryLog::new(&path).append(&quote(1.1)).unwrap();

        let second_run = HistoryLog::new(&path);
        second_run.ensure_header().unwrap();
        second_run.append(&quote(1.2)).unwrap();
        second_run.append(&quote(1.3)).unwrap();
        assert_eq!(second_run.record_count().unwrap(), 3);
        assert_eq!(second_run.read_all().unwrap()[2].latest_price, 1.3);
    }
}
