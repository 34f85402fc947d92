//! Convert a document into a narrated video.

use std::path::PathBuf;
use std::time::Duration;

use slidecast_common::AppConfig;
use slidecast_model::TaskStatus;
use slidecast_pipeline::SlidecastService;

pub async fn run(
    mut config: AppConfig,
    file: PathBuf,
    output: Option<PathBuf>,
    voice: Option<String>,
    workers: Option<usize>,
    poll_ms: u64,
) -> anyhow::Result<()> {
    if !file.is_file() {
        anyhow::bail!("No such file: {}", file.display());
    }
    if let Some(voice) = voice {
        config.narration.voice = voice;
    }
    if let Some(workers) = workers {
        config.pipeline.worker_concurrency = workers;
    }

    tracing::debug!(
        source = %file.display(),
        voice = %config.narration.voice,
        workers = config.pipeline.worker_concurrency,
        work_dir = %config.work_dir.display(),
        "Starting conversion"
    );
    let service = SlidecastService::from_config(&config)
        .map_err(|e| anyhow::anyhow!("Failed to start: {e}"))?;

    println!("Converting: {}", file.display());
    let task_id = service.submit(file);
    println!("  Task: {task_id}");

    let interval = Duration::from_millis(poll_ms.max(10));
    let mut printed = 0usize;
    let task = loop {
        let Some(task) = service.get_status(&task_id) else {
            anyhow::bail!("Task {task_id} disappeared");
        };
        for line in task.logs.iter().skip(printed) {
            println!("  [{:>3}%] {line}", task.percent);
        }
        printed = task.logs.len();
        if task.is_terminal() {
            tracing::debug!(task_id = %task_id, status = ?task.status, "Task finished");
            break task;
        }
        tokio::time::sleep(interval).await;
    };

    match task.status {
        TaskStatus::Completed => {
            let produced = task
                .result_path
                .ok_or_else(|| anyhow::anyhow!("Task completed without a result"))?;
            let destination = match output {
                Some(path) => {
                    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                        std::fs::create_dir_all(parent)?;
                    }
                    std::fs::copy(&produced, &path)?;
                    path
                }
                None => produced,
            };
            println!("Video ready: {}", destination.display());
            Ok(())
        }
        _ => Err(anyhow::anyhow!(
            "Conversion failed: {}",
            task.error.unwrap_or_else(|| "unknown error".to_string())
        )),
    }
}
