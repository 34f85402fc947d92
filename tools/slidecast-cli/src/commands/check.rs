//! Check external tools.

use slidecast_common::AppConfig;
use slidecast_pipeline::check_tools;

pub fn run() -> anyhow::Result<()> {
    println!("Slidecast System Check");
    println!("{}", "=".repeat(50));

    let tools = check_tools();
    for (tool, found) in &tools {
        if *found {
            println!("[OK] {tool}");
        } else {
            println!("[MISSING] {tool}");
        }
    }

    let config = AppConfig::load();
    if config.narration.resolved_api_key().is_some() {
        println!("[OK] speech API key configured");
    } else {
        println!("[MISSING] speech API key (set SLIDECAST_TTS_API_KEY)");
    }

    println!();
    if tools.iter().all(|(_, found)| *found) {
        println!("All required tools are available. Slidecast is ready.");
    } else {
        println!("Some required tools are missing. Install ffmpeg, LibreOffice and poppler-utils.");
    }

    Ok(())
}
