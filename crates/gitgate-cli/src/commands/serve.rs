//! `gitgate serve` - JSON-lines bridge over stdio.
//!
//! Each line on stdin is one request; each response is written as one line on
//! stdout, in completion order. Requests are handled concurrently, so a slow
//! rebase does not hold up a state query.

use std::sync::Arc;

use anyhow::{Context, Result};
use gitgate_rpc::{Response, RpcGateway, sanitize::sanitize};
use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use super::RepoArgs;

/// Run the serve command.
pub fn run(args: &RepoArgs) -> Result<()> {
    let gateway = Arc::new(super::gateway(args)?);
    info!(methods = gateway.methods().len(), "serving on stdio");

    super::runtime()?.block_on(serve(gateway))
}

async fn serve(gateway: Arc<RpcGateway>) -> Result<()> {
    let (tx, rx) = mpsc::unbounded_channel::<Response>();
    let writer = tokio::spawn(write_responses(rx));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut in_flight = JoinSet::new();

    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let raw: Value = match serde_json::from_str(&line) {
            Ok(raw) => raw,
            Err(e) => {
                warn!("unparseable request: {e}");
                deliver(&tx, Response::failure(None, sanitize(&format!("Invalid request: {e}"))));
                continue;
            }
        };

        let gateway = Arc::clone(&gateway);
        let tx = tx.clone();
        in_flight.spawn(async move {
            gateway
                .handle_request(raw, move |response| {
                    deliver(&tx, response);
                })
                .await;
        });

        // Reap finished handlers so the set does not grow without bound.
        while in_flight.try_join_next().is_some() {}
    }

    debug!(pending = in_flight.len(), "stdin closed, draining");
    while in_flight.join_next().await.is_some() {}
    drop(tx);

    writer.await.context("Response writer panicked")?
}

/// Queue a response for the writer; returns false if it has gone away.
fn deliver(tx: &mpsc::UnboundedSender<Response>, response: Response) -> bool {
    match tx.send(response) {
        Ok(()) => true,
        Err(mpsc::error::SendError(lost)) => {
            warn!(id = ?lost.id, "response writer stopped, dropping response");
            false
        }
    }
}

async fn write_responses(mut rx: mpsc::UnboundedReceiver<Response>) -> Result<()> {
    let mut stdout = tokio::io::stdout();
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        stdout.write_all(&line).await?;
        stdout.flush().await?;
    }
    Ok(())
}
