//! Lambda control-plane calls
//!
//! REST-JSON protocol against the 2015-03-31 API: GetFunction for resolving
//! a single function's package metadata, ListFunctions for paginating the
//! account inventory.

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use super::client::AwsClients;

const LAMBDA_API_VERSION: &str = "2015-03-31";

/// How a function's deployment artifact is packaged
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub enum PackageType {
    /// Archive package, retrievable via a presigned URL (the API default
    /// when the field is absent)
    #[default]
    Zip,
    /// Container image; there is no archive to download
    Image,
}

/// Where a resolved function's code lives
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FunctionCode {
    /// Presigned URL, valid only for a short window after resolution
    Archive { location: String },
    /// Container image reference; recognized terminal state, not an error
    Image,
}

/// Resolved metadata for one function
#[derive(Debug, Clone)]
pub struct FunctionDescriptor {
    pub function_name: String,
    pub code: FunctionCode,
}

/// One entry of the account inventory listing
#[derive(Debug, Clone, Deserialize)]
pub struct ListedFunction {
    #[serde(rename = "FunctionName")]
    pub function_name: String,
    #[serde(rename = "PackageType", default)]
    pub package_type: PackageType,
}

/// One page of the account inventory
#[derive(Debug, Clone)]
pub struct FunctionPage {
    pub functions: Vec<ListedFunction>,
    pub next_marker: Option<String>,
}

/// Control-plane operations the retrieval driver depends on
///
/// The production implementation lives on [`AwsClients`]; tests substitute
/// an in-memory mock.
#[async_trait]
pub trait FunctionApi: Send + Sync {
    /// Resolve one function by ARN or name
    async fn get_function(&self, identifier: &str) -> Result<FunctionDescriptor>;

    /// Fetch one page of the account inventory
    async fn list_functions(&self, marker: Option<&str>) -> Result<FunctionPage>;

    /// Fetch the archive bytes behind a presigned URL
    async fn download_archive(&self, url: &str) -> Result<Vec<u8>>;
}

#[derive(Debug, Deserialize)]
struct GetFunctionResponse {
    #[serde(rename = "Configuration")]
    configuration: FunctionConfiguration,
    #[serde(rename = "Code", default)]
    code: Option<CodeLocation>,
}

#[derive(Debug, Deserialize)]
struct FunctionConfiguration {
    #[serde(rename = "FunctionName")]
    function_name: String,
    #[serde(rename = "PackageType", default)]
    package_type: PackageType,
}

#[derive(Debug, Default, Deserialize)]
struct CodeLocation {
    #[serde(rename = "Location", default)]
    location: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ListFunctionsResponse {
    #[serde(rename = "Functions", default)]
    functions: Vec<ListedFunction>,
    #[serde(rename = "NextMarker", default)]
    next_marker: Option<String>,
}

/// Turn a raw GetFunction response into a descriptor
///
/// An archive-packaged function without a code location is a malformed
/// control-plane response and fails resolution.
fn parse_get_function(response: &str) -> Result<FunctionDescriptor> {
    let parsed: GetFunctionResponse = serde_json::from_str(response)
        .map_err(|e| anyhow!("Malformed GetFunction response: {}", e))?;

    let function_name = parsed.configuration.function_name;
    let code = match parsed.configuration.package_type {
        PackageType::Image => FunctionCode::Image,
        PackageType::Zip => {
            let location = parsed
                .code
                .and_then(|c| c.location)
                .ok_or_else(|| anyhow!("No Code.Location for function '{}'", function_name))?;
            FunctionCode::Archive { location }
        }
    };

    Ok(FunctionDescriptor {
        function_name,
        code,
    })
}

fn parse_function_page(response: &str) -> Result<FunctionPage> {
    let parsed: ListFunctionsResponse = serde_json::from_str(response)
        .map_err(|e| anyhow!("Malformed ListFunctions response: {}", e))?;

    Ok(FunctionPage {
        functions: parsed.functions,
        next_marker: parsed.next_marker,
    })
}

#[async_trait]
impl FunctionApi for AwsClients {
    async fn get_function(&self, identifier: &str) -> Result<FunctionDescriptor> {
        debug!("GetFunction: {}", identifier);

        let path = format!(
            "/{}/functions/{}",
            LAMBDA_API_VERSION,
            urlencoding::encode(identifier)
        );
        let response = self.http.rest_json_request("lambda", "GET", &path, None).await?;

        parse_get_function(&response)
    }

    async fn list_functions(&self, marker: Option<&str>) -> Result<FunctionPage> {
        debug!("ListFunctions: marker={:?}", marker);

        let mut path = format!("/{}/functions/", LAMBDA_API_VERSION);
        if let Some(marker) = marker {
            path = format!("{}?Marker={}", path, urlencoding::encode(marker));
        }
        let response = self.http.rest_json_request("lambda", "GET", &path, None).await?;

        parse_function_page(&response)
    }

    async fn download_archive(&self, url: &str) -> Result<Vec<u8>> {
        self.http.download(url).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zip_function_resolves_to_archive_code() {
        let response = r#"{
            "Configuration": {
                "FunctionName": "order-handler",
                "PackageType": "Zip",
                "Runtime": "nodejs18.x"
            },
            "Code": {
                "RepositoryType": "S3",
                "Location": "https://awslambda-us-east-1.s3.amazonaws.com/snapshots/abc?X-Amz-Expires=600"
            }
        }"#;

        let descriptor = parse_get_function(response).unwrap();
        assert_eq!(descriptor.function_name, "order-handler");
        assert_eq!(
            descriptor.code,
            FunctionCode::Archive {
                location:
                    "https://awslambda-us-east-1.s3.amazonaws.com/snapshots/abc?X-Amz-Expires=600"
                        .to_string()
            }
        );
    }

    #[test]
    fn absent_package_type_defaults_to_zip() {
        let response = r#"{
            "Configuration": { "FunctionName": "legacy-fn" },
            "Code": { "Location": "https://example.com/code.zip" }
        }"#;

        let descriptor = parse_get_function(response).unwrap();
        assert!(matches!(descriptor.code, FunctionCode::Archive { .. }));
    }

    #[test]
    fn image_function_has_no_archive() {
        let response = r#"{
            "Configuration": {
                "FunctionName": "container-fn",
                "PackageType": "Image"
            },
            "Code": {
                "RepositoryType": "ECR",
                "ImageUri": "123456789012.dkr.ecr.us-east-1.amazonaws.com/fn:latest"
            }
        }"#;

        let descriptor = parse_get_function(response).unwrap();
        assert_eq!(descriptor.code, FunctionCode::Image);
    }

    #[test]
    fn zip_function_without_location_fails_resolution() {
        let response = r#"{
            "Configuration": {
                "FunctionName": "broken-fn",
                "PackageType": "Zip"
            }
        }"#;

        let err = parse_get_function(response).unwrap_err();
        assert!(err.to_string().contains("No Code.Location"));
    }

    #[test]
    fn inventory_page_carries_marker() {
        let response = r#"{
            "Functions": [
                {"FunctionName": "fn-a", "PackageType": "Zip"},
                {"FunctionName": "fn-b", "PackageType": "Image"}
            ],
            "NextMarker": "page-2"
        }"#;

        let page = parse_function_page(response).unwrap();
        assert_eq!(page.functions.len(), 2);
        assert_eq!(page.functions[0].function_name, "fn-a");
        assert_eq!(page.functions[1].package_type, PackageType::Image);
        assert_eq!(page.next_marker, Some("page-2".to_string()));
    }

    #[test]
    fn final_inventory_page_has_no_marker() {
        let response = r#"{"Functions": []}"#;

        let page = parse_function_page(response).unwrap();
        assert!(page.functions.is_empty());
        assert!(page.next_marker.is_none());
    }
}
