//! Audio duration probing.

use std::path::Path;
use std::process::Command;

/// Duration of an audio file in seconds, or `0.0` when it cannot be measured.
///
/// WAV headers are read with `hound`; anything else is handed to `ffprobe`.
pub fn probe_duration(path: &Path) -> f64 {
    if !path.is_file() {
        return 0.0;
    }

    match wav_duration(path) {
        Ok(Some(secs)) => return secs,
        Ok(None) => {}
        Err(e) => {
            tracing::trace!(path = %path.display(), error = %e, "Not a readable WAV header");
        }
    }

    probe_with_ffprobe(path).unwrap_or(0.0)
}

/// Duration from the WAV header, or `None` when the header cannot be trusted.
fn wav_duration(path: &Path) -> Result<Option<f64>, hound::Error> {
    let reader = hound::WavReader::open(path)?;
    let spec = reader.spec();
    if spec.sample_rate == 0 || spec.channels == 0 {
        return Ok(None);
    }

    // Streamed responses may carry a placeholder data length; never claim
    // more audio than the file can hold.
    let frame_bytes = u64::from(spec.channels) * u64::from(spec.bits_per_sample).div_ceil(8);
    let file_len = std::fs::metadata(path)?.len();
    let frames = u64::from(reader.duration());
    if frames * frame_bytes > file_len {
        return Ok(None);
    }

    Ok(Some(frames as f64 / f64::from(spec.sample_rate)))
}

fn probe_with_ffprobe(path: &Path) -> Option<f64> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "csv=p=0",
        ])
        .arg(path)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    let raw = String::from_utf8(output.stdout).ok()?;
    let secs = raw.lines().next()?.trim().parse::<f64>().ok()?;
    (secs.is_finite() && secs > 0.0).then_some(secs)
}
