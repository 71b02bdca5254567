//! Step Functions control-plane calls
//!
//! JSON protocol (X-Amz-Target header, POST body). The only operation this
//! tool needs is DescribeStateMachine, which returns the state machine's
//! definition document as a JSON-encoded string.

use anyhow::{anyhow, Result};
use serde::Deserialize;
use tracing::debug;

use super::client::AwsClients;

#[derive(Debug, Deserialize)]
struct DescribeStateMachineResponse {
    definition: String,
}

impl AwsClients {
    /// Fetch a state machine's definition document
    ///
    /// The returned string still needs one `serde_json` parse step before
    /// it can be walked.
    pub async fn describe_state_machine(&self, state_machine_arn: &str) -> Result<String> {
        debug!("DescribeStateMachine: {}", state_machine_arn);

        let body = serde_json::json!({ "stateMachineArn": state_machine_arn }).to_string();
        let response = self
            .http
            .json_request("stepfunctions", "DescribeStateMachine", &body)
            .await?;

        let parsed: DescribeStateMachineResponse = serde_json::from_str(&response)
            .map_err(|e| anyhow!("Malformed DescribeStateMachine response: {}", e))?;

        Ok(parsed.definition)
    }
}
