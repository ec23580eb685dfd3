//! Waveform loading - decoding, mono downmix, resampling and normalization

use std::fs::File;
use std::io::Cursor;
use std::path::{Path, PathBuf};

use rubato::{FftFixedIn, Resampler};
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSource, MediaSourceStream};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

use crate::error::LoadError;

/// Input chunk size for the FFT resampler
const RESAMPLE_CHUNK: usize = 1024;

/// Anything the loader can decode
#[derive(Debug, Clone)]
pub enum WaveformSource {
    /// Audio file on disk
    Path(PathBuf),
    /// Encoded audio held in memory, with an optional extension hint
    Bytes { data: Vec<u8>, hint: Option<String> },
}

impl WaveformSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        WaveformSource::Path(path.into())
    }

    pub fn from_bytes(data: Vec<u8>, hint: Option<&str>) -> Self {
        WaveformSource::Bytes {
            data,
            hint: hint.map(str::to_ascii_lowercase),
        }
    }

    /// File name recorded alongside the extracted features
    pub fn display_name(&self) -> String {
        match self {
            WaveformSource::Path(path) => path
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string()),
            WaveformSource::Bytes { .. } => "<memory>".to_string(),
        }
    }

    fn extension_hint(&self) -> Option<String> {
        match self {
            WaveformSource::Path(path) => path
                .extension()
                .and_then(|ext| ext.to_str())
                .map(str::to_ascii_lowercase),
            WaveformSource::Bytes { hint, .. } => hint.clone(),
        }
    }
}

impl From<&Path> for WaveformSource {
    fn from(path: &Path) -> Self {
        WaveformSource::Path(path.to_path_buf())
    }
}

impl From<PathBuf> for WaveformSource {
    fn from(path: PathBuf) -> Self {
        WaveformSource::Path(path)
    }
}

/// Mono floating-point signal at a fixed sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct Waveform {
    samples: Vec<f32>,
    sample_rate: u32,
}

impl Waveform {
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            sample_rate,
        }
    }

    /// Zero-length signal, the input of the degenerate feature path
    pub fn empty(sample_rate: u32) -> Self {
        Self::new(Vec::new(), sample_rate)
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Duration in seconds
    pub fn duration(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// Raw decoder output: interleaved samples
#[derive(Debug, Clone)]
pub struct DecodedAudio {
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Turns an encoded source into interleaved samples
pub trait Decoder: Send + Sync {
    fn name(&self) -> &'static str;

    fn decode(&self, source: &WaveformSource) -> Result<DecodedAudio, LoadError>;
}

/// WAV decoder backed by hound
#[derive(Debug, Default, Clone, Copy)]
pub struct WavDecoder;

impl Decoder for WavDecoder {
    fn name(&self) -> &'static str {
        "wav"
    }

    fn decode(&self, source: &WaveformSource) -> Result<DecodedAudio, LoadError> {
        match source {
            WaveformSource::Path(path) => {
                let reader = hound::WavReader::open(path)
                    .map_err(|e| LoadError::Unsupported(e.to_string()))?;
                read_wav(reader)
            }
            WaveformSource::Bytes { data, .. } => {
                let reader = hound::WavReader::new(Cursor::new(data.as_slice()))
                    .map_err(|e| LoadError::Unsupported(e.to_string()))?;
                read_wav(reader)
            }
        }
    }
}

fn read_wav<R: std::io::Read>(mut reader: hound::WavReader<R>) -> Result<DecodedAudio, LoadError> {
    let spec = reader.spec();
    debug!(
        "WAV format: {} channels, {} Hz, {} bits",
        spec.channels, spec.sample_rate, spec.bits_per_sample
    );

    let samples: Vec<f32> = match spec.sample_format {
        hound::SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<Result<_, _>>()
            .map_err(|e| LoadError::Unsupported(e.to_string()))?,
        hound::SampleFormat::Int => {
            let max_val = (1i64 << (spec.bits_per_sample.saturating_sub(1))) as f32;
            reader
                .samples::<i32>()
                .map(|s| s.map(|s| s as f32 / max_val))
                .collect::<Result<_, _>>()
                .map_err(|e| LoadError::Unsupported(e.to_string()))?
        }
    };

    Ok(DecodedAudio {
        samples,
        sample_rate: spec.sample_rate,
        channels: spec.channels.max(1),
    })
}

/// General-purpose container decoder backed by symphonia
#[derive(Debug, Default, Clone, Copy)]
pub struct ContainerDecoder;

impl Decoder for ContainerDecoder {
    fn name(&self) -> &'static str {
        "container"
    }

    fn decode(&self, source: &WaveformSource) -> Result<DecodedAudio, LoadError> {
        let media: Box<dyn MediaSource> = match source {
            WaveformSource::Path(path) => Box::new(File::open(path)?),
            WaveformSource::Bytes { data, .. } => Box::new(Cursor::new(data.clone())),
        };
        let mss = MediaSourceStream::new(media, Default::default());
        let mut hint = Hint::new();
        if let Some(ext) = source.extension_hint() {
            hint.with_extension(&ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| LoadError::Unsupported(format!("probe failed: {e}")))?;
        let mut format = probed.format;
        let track = format
            .default_track()
            .ok_or_else(|| LoadError::Unsupported("no default track".to_string()))?;
        let track_id = track.id;
        let codec_params = track.codec_params.clone();
        let sample_rate = codec_params
            .sample_rate
            .ok_or_else(|| LoadError::Unsupported("missing sample rate".to_string()))?;
        let mut channels = codec_params
            .channels
            .map(|c| c.count() as u16)
            .unwrap_or(1);

        let mut decoder = symphonia::default::get_codecs()
            .make(&codec_params, &DecoderOptions::default())
            .map_err(|e| LoadError::Unsupported(format!("no decoder: {e}")))?;

        let mut samples = Vec::new();
        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(_)) => break,
                Err(SymphoniaError::ResetRequired) => break,
                Err(e) => return Err(LoadError::Unsupported(format!("packet read failed: {e}"))),
            };
            if packet.track_id() != track_id {
                continue;
            }
            let audio_buf = match decoder.decode(&packet) {
                Ok(buf) => buf,
                Err(SymphoniaError::DecodeError(e)) => {
                    debug!("Skipping undecodable packet: {}", e);
                    continue;
                }
                Err(e) => return Err(LoadError::Unsupported(format!("decode failed: {e}"))),
            };
            let spec = *audio_buf.spec();
            channels = spec.channels.count() as u16;
            let mut sample_buf = SampleBuffer::<f32>::new(audio_buf.capacity() as u64, spec);
            sample_buf.copy_interleaved_ref(audio_buf);
            samples.extend_from_slice(sample_buf.samples());
        }

        Ok(DecodedAudio {
            samples,
            sample_rate,
            channels: channels.max(1),
        })
    }
}

/// Loads a [`Waveform`] at the configured rate, falling back to a second
/// decoder when the first one rejects the source.
pub struct WaveformLoader {
    target_sample_rate: u32,
    primary: Box<dyn Decoder>,
    fallback: Box<dyn Decoder>,
}

impl WaveformLoader {
    /// WAV first, then any container symphonia can probe
    pub fn new(target_sample_rate: u32) -> Self {
        Self::with_decoders(
            target_sample_rate,
            Box::new(WavDecoder),
            Box::new(ContainerDecoder),
        )
    }

    pub fn with_decoders(
        target_sample_rate: u32,
        primary: Box<dyn Decoder>,
        fallback: Box<dyn Decoder>,
    ) -> Self {
        Self {
            target_sample_rate,
            primary,
            fallback,
        }
    }

    /// Decode, downmix and resample `source`
    pub fn load(&self, source: &WaveformSource) -> Result<Waveform, LoadError> {
        let primary_err = match self.primary.decode(source) {
            Ok(decoded) => {
                debug!("Decoded {} with {} decoder", source.display_name(), self.primary.name());
                return self.finish(decoded, false);
            }
            Err(e) => e,
        };

        warn!(
            "{} decoder failed for {}: {}, trying {} decoder",
            self.primary.name(),
            source.display_name(),
            primary_err,
            self.fallback.name()
        );

        match self.fallback.decode(source) {
            Ok(decoded) => self.finish(decoded, true),
            Err(fallback_err) => Err(LoadError::Decode {
                primary: primary_err.to_string(),
                fallback: fallback_err.to_string(),
            }),
        }
    }

    fn finish(&self, decoded: DecodedAudio, normalize: bool) -> Result<Waveform, LoadError> {
        let mono = downmix_to_mono(&decoded.samples, decoded.channels);
        let mut samples = resample(&mono, decoded.sample_rate, self.target_sample_rate)?;
        if normalize {
            normalize_peak(&mut samples);
        }

        debug!(
            "Loaded {} samples ({:.2}s at {} Hz)",
            samples.len(),
            samples.len() as f64 / self.target_sample_rate as f64,
            self.target_sample_rate
        );
        Ok(Waveform::new(samples, self.target_sample_rate))
    }
}

/// Average interleaved channels into one
pub fn downmix_to_mono(samples: &[f32], channels: u16) -> Vec<f32> {
    if channels <= 1 {
        return samples.to_vec();
    }
    samples
        .chunks(channels as usize)
        .map(|frame| frame.iter().sum::<f32>() / frame.len() as f32)
        .collect()
}

/// Divide by the peak absolute sample; silent signals are left untouched
pub fn normalize_peak(samples: &mut [f32]) {
    let peak = samples
        .iter()
        .map(|s| s.abs())
        .fold(0.0f32, |a, b| a.max(b));

    if peak <= 0.0 || !peak.is_finite() {
        return;
    }

    for sample in samples.iter_mut() {
        *sample /= peak;
    }
}

/// Resample a mono signal with the FFT resampler, trimming its delay
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, LoadError> {
    if from_rate == 0 {
        return Err(LoadError::Unsupported("source sample rate is 0".to_string()));
    }
    if from_rate == to_rate || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    debug!("Resampling: {} Hz -> {} Hz", from_rate, to_rate);

    let mut resampler = FftFixedIn::<f32>::new(
        from_rate as usize,
        to_rate as usize,
        RESAMPLE_CHUNK,
        1, // sub-chunks
        1, // channels
    )
    .map_err(|e| LoadError::Resampling(e.to_string()))?;

    let delay = resampler.output_delay();
    let expected = (samples.len() as f64 * to_rate as f64 / from_rate as f64).round() as usize;
    let mut output = Vec::with_capacity(expected + delay);
    let mut pos = 0;

    while samples.len() - pos >= resampler.input_frames_next() {
        let needed = resampler.input_frames_next();
        let chunk = &samples[pos..pos + needed];
        let result = resampler
            .process(&[chunk], None)
            .map_err(|e| LoadError::Resampling(e.to_string()))?;
        if let Some(resampled) = result.into_iter().next() {
            output.extend(resampled);
        }
        pos += needed;
    }

    if pos < samples.len() {
        let tail = [&samples[pos..]];
        let result = resampler
            .process_partial(Some(&tail[..]), None)
            .map_err(|e| LoadError::Resampling(e.to_string()))?;
        if let Some(resampled) = result.into_iter().next() {
            output.extend(resampled);
        }
    }

    // Flush the resampler delay line
    while output.len() < expected + delay {
        let result = resampler
            .process_partial(None::<&[&[f32]]>, None)
            .map_err(|e| LoadError::Resampling(e.to_string()))?;
        match result.into_iter().next() {
            Some(resampled) if !resampled.is_empty() => output.extend(resampled),
            _ => break,
        }
    }

    output.drain(..delay.min(output.len()));
    output.truncate(expected);
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FailingDecoder;

    impl Decoder for FailingDecoder {
        fn name(&self) -> &'static str {
            "failing"
        }

        fn decode(&self, _source: &WaveformSource) -> Result<DecodedAudio, LoadError> {
            Err(LoadError::Unsupported("corrupt header".to_string()))
        }
    }

    struct FixedDecoder(DecodedAudio);

    impl Decoder for FixedDecoder {
        fn name(&self) -> &'static str {
            "fixed"
        }

        fn decode(&self, _source: &WaveformSource) -> Result<DecodedAudio, LoadError> {
            Ok(self.0.clone())
        }
    }

    fn memory_source() -> WaveformSource {
        WaveformSource::from_bytes(vec![0, 1, 2, 3], Some("WAV"))
    }

    fn tone(len: usize, sample_rate: u32, amplitude: f32) -> Vec<f32> {
        let step = 2.0 * std::f32::consts::PI * 200.0 / sample_rate as f32;
        (0..len).map(|i| amplitude * (step * i as f32).sin()).collect()
    }

    fn write_wav(path: &Path, samples: &[f32], sample_rate: u32, channels: u16) {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            for _ in 0..channels {
                writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
            }
        }
        writer.finalize().unwrap();
    }

    #[test]
    fn test_downmix_averages_channels() {
        let stereo = vec![0.5, -0.5, 1.0, 0.0];
        assert_eq!(downmix_to_mono(&stereo, 2), vec![0.0, 0.5]);
        assert_eq!(downmix_to_mono(&stereo, 1), stereo);
    }

    #[test]
    fn test_normalize_peak() {
        let mut samples = vec![0.1, -0.4, 0.2];
        normalize_peak(&mut samples);
        assert!((samples[1] + 1.0).abs() < 1e-6);
        assert!((samples[0] - 0.25).abs() < 1e-6);

        let mut silent = vec![0.0; 8];
        normalize_peak(&mut silent);
        assert!(silent.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_resample_length() {
        let samples: Vec<f32> = (0..44100)
            .map(|i| (i as f32 * 2.0 * std::f32::consts::PI * 440.0 / 44100.0).sin())
            .collect();
        let out = resample(&samples, 44100, 22050).unwrap();
        assert_eq!(out.len(), 22050);
        assert!(out.iter().all(|s| s.abs() < 1.5));
    }

    #[test]
    fn test_resample_same_rate_is_identity() {
        let samples = vec![0.1, 0.2, 0.3];
        assert_eq!(resample(&samples, 22050, 22050).unwrap(), samples);
    }

    #[test]
    fn test_fallback_decoder_normalizes() {
        let loader = WaveformLoader::with_decoders(
            8000,
            Box::new(FailingDecoder),
            Box::new(FixedDecoder(DecodedAudio {
                samples: vec![0.2, 0.2, -0.4, -0.4],
                sample_rate: 8000,
                channels: 2,
            })),
        );
        let waveform = loader.load(&memory_source()).unwrap();
        assert_eq!(waveform.samples(), &[0.5, -1.0]);
        assert_eq!(waveform.sample_rate(), 8000);
    }

    #[test]
    fn test_primary_decoder_is_not_normalized() {
        let loader = WaveformLoader::with_decoders(
            8000,
            Box::new(FixedDecoder(DecodedAudio {
                samples: vec![0.1, -0.2],
                sample_rate: 8000,
                channels: 1,
            })),
            Box::new(FailingDecoder),
        );
        let waveform = loader.load(&memory_source()).unwrap();
        assert_eq!(waveform.samples(), &[0.1, -0.2]);
    }

    #[test]
    fn test_both_decoders_failing_reports_both_causes() {
        let loader =
            WaveformLoader::with_decoders(8000, Box::new(FailingDecoder), Box::new(FailingDecoder));
        match loader.load(&memory_source()) {
            Err(LoadError::Decode { primary, fallback }) => {
                assert!(primary.contains("corrupt header"));
                assert!(fallback.contains("corrupt header"));
            }
            other => panic!("expected decode error, got {:?}", other),
        }
    }

    #[test]
    fn test_container_decoder_reads_wav() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("tone.wav");
        let samples = tone(800, 8000, 0.5);
        write_wav(&path, &samples, 8000, 1);

        let decoded = ContainerDecoder
            .decode(&WaveformSource::from_path(&path))
            .unwrap();
        assert_eq!(decoded.sample_rate, 8000);
        assert_eq!(decoded.channels, 1);
        assert_eq!(decoded.samples.len(), 800);
        for (got, want) in decoded.samples.iter().zip(&samples) {
            assert!((got - want).abs() < 1e-3);
        }

        let bytes = std::fs::read(&path).unwrap();
        let from_bytes = ContainerDecoder
            .decode(&WaveformSource::from_bytes(bytes, Some("wav")))
            .unwrap();
        assert_eq!(from_bytes.samples, decoded.samples);
    }

    #[test]
    fn test_container_decoder_keeps_interleaved_channels() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("stereo.wav");
        write_wav(&path, &tone(400, 8000, 0.3), 8000, 2);

        let decoded = ContainerDecoder
            .decode(&WaveformSource::from_path(&path))
            .unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.samples.len(), 800);
    }

    #[test]
    fn test_container_fallback_normalizes_peak() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("quiet.wav");
        write_wav(&path, &tone(800, 8000, 0.25), 8000, 2);

        let loader = WaveformLoader::with_decoders(
            8000,
            Box::new(FailingDecoder),
            Box::new(ContainerDecoder),
        );
        let waveform = loader.load(&WaveformSource::from_path(&path)).unwrap();

        assert_eq!(waveform.len(), 800);
        let peak = waveform.samples().iter().fold(0.0f32, |a, s| a.max(s.abs()));
        assert!((peak - 1.0).abs() < 1e-6);
    }

    #[test]
    fn test_garbage_bytes_fail_to_load() {
        let loader = WaveformLoader::new(22050);
        let source = WaveformSource::from_bytes(b"definitely not audio".to_vec(), None);
        assert!(loader.load(&source).is_err());
    }

    #[test]
    fn test_display_name() {
        let source = WaveformSource::from_path("/tmp/recordings/answer.wav");
        assert_eq!(source.display_name(), "answer.wav");
        assert_eq!(memory_source().display_name(), "<memory>");
    }
}
