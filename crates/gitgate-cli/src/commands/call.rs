//! `gitgate call` - send one request through the gateway.

use anyhow::{Context, Result, bail};
use gitgate_rpc::Response;
use serde_json::{Value, json};

use super::RepoArgs;
use crate::output;

/// Run the call command.
pub fn run(method: &str, params: Option<&str>, args: &RepoArgs) -> Result<()> {
    let params: Value = match params {
        Some(text) => serde_json::from_str(text).context("params must be valid JSON")?,
        None => json!([]),
    };
    let gateway = super::gateway(args)?;

    let request = json!({"id": 1, "method": method, "params": params});
    let mut response = None;
    super::runtime()?.block_on(gateway.handle_request(request, |r| response = Some(r)));
    let Some(response) = response else {
        bail!("No response for {method}");
    };

    print_response(&response)?;
    if let Some(error) = response.error {
        bail!(error);
    }
    Ok(())
}

fn print_response(response: &Response) -> Result<()> {
    match &response.result {
        Some(result) => output::essential(&serde_json::to_string_pretty(result)?),
        None if !response.is_error() => output::success("Done"),
        None => {}
    }
    Ok(())
}
