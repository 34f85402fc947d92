//! Print the measured duration of an audio file.

use std::path::PathBuf;

use slidecast_narration::probe_duration;

pub fn run(audio: PathBuf) -> anyhow::Result<()> {
    let secs = probe_duration(&audio);
    if secs <= 0.0 {
        anyhow::bail!("Could not measure {}", audio.display());
    }
    println!("{}: {secs:.3}s", audio.display());
    Ok(())
}
