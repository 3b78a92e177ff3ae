//! `codewright index` — Build or query the retrieval index.

use std::path::Path;

use crate::runtime::Runtime;

pub async fn build(repo: &Path, rebuild: bool) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::open(repo)?;
    let index = &runtime.index;

    println!("  Indexing {}", index.repository_root().display());
    let report = if rebuild {
        index.rebuild().await?
    } else {
        index.build().await?
    };

    println!("  Scanned:   {} files", report.scanned);
    println!("  Reused:    {}", report.reused);
    println!("  Described: {}", report.described);
    if report.skipped > 0 {
        println!("  Skipped:   {} (too large, binary, or unreadable)", report.skipped);
    }
    println!("  Cache:     {}", index.cache_path().display());
    Ok(())
}

pub async fn query(repo: &Path, question: &str, k: usize) -> Result<(), Box<dyn std::error::Error>> {
    let runtime = Runtime::open(repo)?;
    if runtime.index.is_empty().await {
        return Err("The retrieval index is empty. Run `codewright index build` first.".into());
    }

    let hits = runtime.index.query(question, k).await?;
    for (i, hit) in hits.iter().enumerate() {
        println!("{:>2}. {:.3}  {}", i + 1, hit.score, hit.entry.path);
        println!("    {}", hit.entry.description.replace('\n', " "));
    }
    Ok(())
}
