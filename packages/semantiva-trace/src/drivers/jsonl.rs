use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::driver::{to_value, TraceDriver};
use crate::error::Result;
use crate::lifecycle::{PipelineEnd, PipelineStart, RunSpaceEnd, RunSpaceStart};
use crate::record::SerRecord;

/// Writes every record as one JSON object per line (`--trace-driver jsonl`), grounded on
/// `semantiva/trace/drivers/jsonl.py`'s append-only, flush-per-record behaviour.
pub struct JsonlTraceDriver {
    writer: BufWriter<File>,
}

impl JsonlTraceDriver {
    pub fn create(path: impl AsRef<Path>) -> Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { writer: BufWriter::new(file) })
    }

    fn write_line<T: serde::Serialize>(&mut self, record: &T) -> Result<()> {
        let value = to_value(record)?;
        serde_json::to_writer(&mut self.writer, &value)?;
        self.writer.write_all(b"\n")?;
        Ok(())
    }
}

impl TraceDriver for JsonlTraceDriver {
    fn on_run_space_start(&mut self, record: &RunSpaceStart) -> Result<()> {
        self.write_line(record)
    }
    fn on_run_space_end(&mut self, record: &RunSpaceEnd) -> Result<()> {
        self.write_line(record)
    }
    fn on_pipeline_start(&mut self, record: &PipelineStart) -> Result<()> {
        self.write_line(record)
    }
    fn on_node_event(&mut self, record: &SerRecord) -> Result<()> {
        self.write_line(record)
    }
    fn on_pipeline_end(&mut self, record: &PipelineEnd) -> Result<()> {
        self.write_line(record)
    }
    fn flush(&mut self) -> Result<()> {
        self.writer.flush()?;
        Ok(())
    }
    fn close(&mut self) -> Result<()> {
        self.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;

    #[test]
    fn writes_one_json_line_per_record() {
        let dir = std::env::temp_dir().join(format!("semantiva-trace-test-{}", std::process::id()));
        let mut driver = JsonlTraceDriver::create(&dir).unwrap();
        driver
            .on_run_space_end(&RunSpaceEnd {
                record_type: crate::lifecycle::RunSpaceEndType::RunSpaceEnd,
                run_space_launch_id: "launch-1".to_string(),
                run_space_attempt: 1,
                summary: serde_json::json!({"completed_runs": 6}),
            })
            .unwrap();
        driver.flush().unwrap();
        let mut contents = String::new();
        File::open(&dir).unwrap().read_to_string(&mut contents).unwrap();
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"run_space_end\""));
        std::fs::remove_file(&dir).ok();
    }
}
