//! Bundled `ClaimSource` adapter: streams claims from a JSONL file
//! (§6), one claim per line, skipping unparsable lines and logging them
//! rather than aborting the stream — the teacher's own `stream_claims`
//! behavior, now behind the `ClaimSource` port.

use async_trait::async_trait;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader, Lines};

use crate::ports::ClaimSource;
use crate::schema::PayerClaim;

pub struct JsonlClaimSource {
    lines: Lines<BufReader<File>>,
}

impl JsonlClaimSource {
    pub async fn open(path: &str) -> anyhow::Result<Self> {
        let file = File::open(path).await?;
        let reader = BufReader::new(file);
        Ok(Self {
            lines: reader.lines(),
        })
    }
}

#[async_trait]
impl ClaimSource for JsonlClaimSource {
    async fn next_claim(&mut self) -> anyhow::Result<Option<PayerClaim>> {
        loop {
            match self.lines.next_line().await? {
                None => return Ok(None),
                Some(line) => {
                    if line.trim().is_empty() {
                        continue;
                    }
                    match serde_json::from_str::<PayerClaim>(&line) {
                        Ok(claim) => return Ok(Some(claim)),
                        Err(err) => {
                            tracing::warn!(error = %err, "skipping invalid claim line");
                            continue;
                        }
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::mock_claim;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn streams_valid_claims_and_skips_invalid_lines() {
        let mut tmpfile = NamedTempFile::new().unwrap();
        let claim = mock_claim();
        let json = serde_json::to_string(&claim).unwrap();
        writeln!(tmpfile, "not json").unwrap();
        writeln!(tmpfile, "{}", json).unwrap();
        writeln!(tmpfile, "{{ broken }}").unwrap();

        let mut source = JsonlClaimSource::open(tmpfile.path().to_str().unwrap())
            .await
            .unwrap();
        let received = source.next_claim().await.unwrap().expect("one claim");
        assert_eq!(received.claim_id, claim.claim_id);
        assert!(source.next_claim().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn empty_file_yields_none_immediately() {
        let tmpfile = NamedTempFile::new().unwrap();
        let mut source = JsonlClaimSource::open(tmpfile.path().to_str().unwrap())
            .await
            .unwrap();
        assert!(source.next_claim().await.unwrap().is_none());
    }
}
