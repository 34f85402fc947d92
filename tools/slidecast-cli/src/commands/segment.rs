//! Preview narration segmentation for a text file.

use std::path::PathBuf;

use slidecast_processing_core::segment_text;

pub fn run(file: PathBuf, max_len: usize) -> anyhow::Result<()> {
    let text = std::fs::read_to_string(&file)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", file.display()))?;

    let segments = segment_text(&text, max_len);
    println!(
        "{} characters -> {} segment(s) of at most {max_len}",
        text.chars().count(),
        segments.len()
    );
    for (i, segment) in segments.iter().enumerate() {
        println!();
        println!("--- segment {} ({} chars) ---", i + 1, segment.chars().count());
        println!("{segment}");
    }

    Ok(())
}
