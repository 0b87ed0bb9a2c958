//! `rangefetch probe` – show what a download would fetch.

use anyhow::Result;
use rangefetch_core::config::FetchConfig;

use super::GetArgs;

pub async fn run_probe(cfg: FetchConfig, args: GetArgs) -> Result<()> {
    let mut task = args.task(cfg)?;
    let (task, metadata) = tokio::task::spawn_blocking(move || {
        let metadata = task.probe().cloned();
        (task, metadata)
    })
    .await?;
    let metadata = metadata?;

    let size = metadata
        .content_length
        .map(|n| n.to_string())
        .unwrap_or_else(|| "unknown".to_string());
    println!("url:     {}", task.resolved_url());
    println!("host:    {}", task.host_name());
    println!("name:    {}", metadata.file_name);
    println!("size:    {}", size);
    println!("ranges:  {}", if metadata.resumable { "yes" } else { "no" });
    println!("save to: {}", task.save_path().display());
    Ok(())
}
