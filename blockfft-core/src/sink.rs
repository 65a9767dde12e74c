//! # Result Sink Module
//!
//! Consumers of the finished spectrum. The scheduler never formats
//! anything itself; it hands each value to a sink in index order.
//!
//! ## Sinks
//! - [`TextSink`]: one `a + bi` / `a - bi` line per sample
//! - [`JsonSink`]: a single JSON array of point objects

use std::io::{self, Write};

use serde::Serialize;

use crate::scheduler::RunSummary;
use crate::spectrum::SpectrumBuffer;

/// One output value together with its position.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralPoint {
    pub index: usize,
    pub re: f32,
    pub im: f32,
    /// False for raw samples past the remainder window.
    pub transformed: bool,
}

/// Receives spectral points in increasing index order.
pub trait ResultSink {
    fn consume(&mut self, point: SpectralPoint) -> io::Result<()>;

    /// Called once after the last point.
    fn finish(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Feeds every value of `spectrum` to `sink`, then finishes it.
pub fn emit<S: ResultSink + ?Sized>(
    spectrum: &SpectrumBuffer,
    summary: &RunSummary,
    sink: &mut S,
) -> io::Result<()> {
    for (index, value) in spectrum.iter().enumerate() {
        sink.consume(SpectralPoint {
            index,
            re: value.re,
            im: value.im,
            transformed: summary.is_transformed(index),
        })?;
    }
    sink.finish()
}

/// Formats like C's `%f`: six decimals, `nan`/`-nan` for NaN, `inf`/`-inf`.
fn fixed6(value: f32) -> String {
    if value.is_nan() {
        let sign = if value.is_sign_negative() { "-" } else { "" };
        format!("{sign}nan")
    } else {
        format!("{value:.6}")
    }
}

/// Writes `re ± |im| i` lines with six decimals.
///
/// The sign is `-` only when `im < 0`, so a NaN imaginary part prints as
/// `+ nan i`.
pub struct TextSink<W: Write> {
    writer: W,
}

impl<W: Write> TextSink<W> {
    pub fn new(writer: W) -> Self {
        Self { writer }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for TextSink<W> {
    fn consume(&mut self, point: SpectralPoint) -> io::Result<()> {
        let sign = if point.im < 0.0 { '-' } else { '+' };
        writeln!(
            self.writer,
            "{} {sign} {} i",
            fixed6(point.re),
            fixed6(point.im.abs())
        )
    }

    fn finish(&mut self) -> io::Result<()> {
        self.writer.flush()
    }
}

/// Collects points and writes them as one JSON array on `finish`.
///
/// JSON has no NaN or infinity, so non-finite `re`/`im` values are written
/// as `null`.
pub struct JsonSink<W: Write> {
    writer: W,
    points: Vec<SpectralPoint>,
}

impl<W: Write> JsonSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer,
            points: Vec::new(),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

impl<W: Write> ResultSink for JsonSink<W> {
    fn consume(&mut self, point: SpectralPoint) -> io::Result<()> {
        self.points.push(point);
        Ok(())
    }

    fn finish(&mut self) -> io::Result<()> {
        serde_json::to_writer(&mut self.writer, &self.points)?;
        self.points.clear();
        writeln!(self.writer)?;
        self.writer.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::BlockPlan;

    fn summary_for(total: usize, block_size: usize) -> RunSummary {
        RunSummary::from_plan(&BlockPlan::new(total, block_size).unwrap())
    }

    #[test]
    fn text_sink_uses_sign_notation() {
        let mut sink = TextSink::new(Vec::new());
        sink.consume(SpectralPoint {
            index: 0,
            re: 1.5,
            im: -2.0,
            transformed: true,
        })
        .unwrap();
        sink.consume(SpectralPoint {
            index: 1,
            re: -0.25,
            im: 0.125,
            transformed: true,
        })
        .unwrap();
        sink.consume(SpectralPoint {
            index: 2,
            re: 0.0,
            im: -0.0,
            transformed: false,
        })
        .unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(
            text,
            "1.500000 - 2.000000 i\n-0.250000 + 0.125000 i\n0.000000 + 0.000000 i\n"
        );
    }

    #[test]
    fn emit_visits_every_index_in_order() {
        let spectrum = SpectrumBuffer::from_samples(vec![0.5, 0.25, 0.125]);
        let summary = summary_for(3, 1024);
        let mut sink = TextSink::new(Vec::new());
        emit(&spectrum, &summary, &mut sink).unwrap();

        let text = String::from_utf8(sink.into_inner()).unwrap();
        let lines: Vec<_> = text.lines().collect();
        assert_eq!(
            lines,
            vec!["0.500000 + 0.000000 i", "0.250000 + 0.000000 i", "0.125000 + 0.000000 i"]
        );
    }

    #[test]
    fn json_sink_marks_raw_tail() {
        let spectrum = SpectrumBuffer::from_samples(vec![1.0, 2.0, 3.0]);
        let summary = summary_for(3, 1024);
        let mut sink = JsonSink::new(Vec::new());
        emit(&spectrum, &summary, &mut sink).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        let points = value.as_array().unwrap();
        assert_eq!(points.len(), 3);
        assert_eq!(points[0]["transformed"].as_bool(), Some(true));
        assert_eq!(points[1]["transformed"].as_bool(), Some(false));
        assert_eq!(points[2]["re"].as_f64(), Some(3.0));
        assert_eq!(points[2]["index"].as_u64(), Some(2));
    }

    #[test]
    fn text_sink_prints_non_finite_like_printf() {
        let mut sink = TextSink::new(Vec::new());
        let values = [
            (f32::NAN, f32::NAN),
            (-f32::NAN, -1.0),
            (f32::INFINITY, f32::NEG_INFINITY),
        ];
        for (index, (re, im)) in values.into_iter().enumerate() {
            sink.consume(SpectralPoint {
                index,
                re,
                im,
                transformed: true,
            })
            .unwrap();
        }

        let text = String::from_utf8(sink.into_inner()).unwrap();
        assert_eq!(text, "nan + nan i\n-nan - 1.000000 i\ninf - inf i\n");
    }

    #[test]
    fn json_sink_writes_non_finite_as_null() {
        let spectrum = SpectrumBuffer::from_samples(vec![f32::NAN, f32::INFINITY]);
        let summary = summary_for(2, 1024);
        let mut sink = JsonSink::new(Vec::new());
        emit(&spectrum, &summary, &mut sink).unwrap();

        let value: serde_json::Value = serde_json::from_slice(&sink.into_inner()).unwrap();
        let points = value.as_array().unwrap();
        assert!(points[0]["re"].is_null());
        assert!(points[1]["re"].is_null());
        assert_eq!(points[1]["im"].as_f64(), Some(0.0));
    }
}
