//! Segment merging
//!
//! Concatenates the segment temp files, strictly in ascending index
//! order, into the final output file. Index order is the only
//! correctness guarantee for byte-exact reconstruction; nothing here may
//! reorder segments.

use crate::error::EngineError;
use std::path::Path;
use tokio::fs::File;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};
use warpdl_types::Segment;

/// Merge all segment temp files into `output`, deleting each temp file
/// after it is copied.
///
/// I/O failures are fatal and leave the partial output plus any
/// un-merged temp files in place for manual recovery; there is no
/// rollback.
pub async fn merge_segments(segments: &[Segment], output: &Path) -> Result<(), EngineError> {
    info!(segments = segments.len(), output = %output.display(), "merging segments");

    let mut out = File::create(output).await?;

    for segment in segments {
        let temp_path = segment.temp_path(output);
        let mut temp = File::open(&temp_path).await?;
        tokio::io::copy(&mut temp, &mut out).await?;
        drop(temp);

        if let Err(err) = tokio::fs::remove_file(&temp_path).await {
            warn!(path = %temp_path.display(), error = %err, "failed to remove temp file");
        }
    }

    out.flush().await?;
    out.sync_all().await?;
    Ok(())
}
