//! # Sample Source Module
//!
//! Turns an encoded audio file into a flat run of real-valued samples.
//! The scheduler treats whatever comes out of here as opaque input.
//!
//! ## Features
//! - WAV decoding through Symphonia
//! - Interleaved multi-channel audio is folded down to mono
//! - Every failure to open, probe or decode is reported as
//!   [`Error::SourceUnavailable`], including a single corrupt packet

use std::fs::File;
use std::path::Path;

use log::{debug, info};
use symphonia::core::{
    audio::{AudioBufferRef, SampleBuffer},
    codecs::{DecoderOptions, CODEC_TYPE_NULL},
    errors::Error as DecodeError,
    formats::FormatOptions,
    io::MediaSourceStream,
    meta::MetadataOptions,
    probe::Hint,
};

use crate::error::{Error, Result};

/// Decoded mono audio.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Samples {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Channel count of the encoded input, before the mono fold-down.
    pub channels: usize,
    /// Mono samples, nominally in `[-1.0, 1.0]`.
    pub data: Vec<f32>,
}

impl Samples {
    pub fn count(&self) -> usize {
        self.data.len()
    }
}

/// Anything that can resolve an identifier into samples.
pub trait SampleSource {
    fn provide(&self, id: &str) -> Result<Samples>;
}

/// Reads WAV files from the local filesystem; the identifier is a path.
#[derive(Debug, Clone, Copy, Default)]
pub struct WavSource;

impl SampleSource for WavSource {
    fn provide(&self, id: &str) -> Result<Samples> {
        let file = File::open(Path::new(id)).map_err(|e| Error::source_unavailable(id, e))?;
        let stream = MediaSourceStream::new(Box::new(file), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = Path::new(id).extension().and_then(|e| e.to_str()) {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                stream,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::source_unavailable(id, e))?;
        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::source_unavailable(id, "no decodable audio track"))?;
        let track_id = track.id;
        let sample_rate = track
            .codec_params
            .sample_rate
            .ok_or_else(|| Error::source_unavailable(id, "missing sample rate"))?;
        let channels = track
            .codec_params
            .channels
            .map(|c| c.count())
            .ok_or_else(|| Error::source_unavailable(id, "missing channel layout"))?;

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::source_unavailable(id, e))?;

        let mut interleaved = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(DecodeError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                    break;
                }
                Err(e) => return Err(Error::source_unavailable(id, e)),
            };
            if packet.track_id() != track_id {
                continue;
            }

            append_decoded(id, decoder.decode(&packet), &mut interleaved)?;
        }

        let data = to_mono(&interleaved, channels);
        info!(
            "Decoded {id}: {} samples, {channels} channel(s) at {sample_rate} Hz",
            data.len()
        );

        Ok(Samples {
            sample_rate,
            channels,
            data,
        })
    }
}

/// Appends one decoded packet to `out`.
///
/// A packet that fails to decode fails the whole read. Dropping it would
/// shift every later sample and break the block-to-time-window mapping.
fn append_decoded(
    id: &str,
    decoded: symphonia::core::errors::Result<AudioBufferRef<'_>>,
    out: &mut Vec<f32>,
) -> Result<()> {
    let decoded = decoded.map_err(|e| Error::source_unavailable(id, e))?;
    let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, *decoded.spec());
    buffer.copy_interleaved_ref(decoded);
    debug!("Decoded {} interleaved samples from {id}", buffer.samples().len());
    out.extend_from_slice(buffer.samples());
    Ok(())
}

/// Averages each interleaved frame into one sample.
fn to_mono(input: &[f32], channels: usize) -> Vec<f32> {
    if channels <= 1 {
        return input.to_vec();
    }
    input
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / channels as f32)
        .collect()
}
