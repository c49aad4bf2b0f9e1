use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use url::Url;

use crate::cloud::sigv4::{self, CanonicalRequest};
use crate::cloud::{CloudError, CloudProvider, CloudTarget, LaunchSpec, WaitOutcome};

const EC2_API_VERSION: &str = "2016-11-15";
const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded; charset=utf-8";
const SSM_CONTENT_TYPE: &str = "application/x-amz-json-1.1";
const SSM_GET_PARAMETER: &str = "AmazonSSM.GetParameter";
/// Public parameter pointing at the current Amazon Linux 2023 image
const LATEST_IMAGE_PARAMETER: &str =
    "/aws/service/ami-amazon-linux-latest/al2023-ami-kernel-default-x86_64";
const INSTANCE_NOT_FOUND: &str = "InvalidInstanceID.NotFound";

/// Instance states after which an instance will never reach `running`
const NON_STARTING_STATES: [&str; 4] = ["shutting-down", "terminated", "stopping", "stopped"];

/// EC2 adapter speaking the Query API, signed with SigV4
pub struct Ec2Provider {
    client: Client,
    /// Single endpoint used for every region and service (LocalStack, tests)
    endpoint_override: Option<Url>,
    poll_interval: Duration,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct InstanceDescription {
    state: String,
    public_ip: Option<String>,
}

#[derive(Serialize)]
struct GetParameterRequest<'a> {
    #[serde(rename = "Name")]
    name: &'a str,
}

#[derive(Deserialize)]
struct GetParameterResponse {
    #[serde(rename = "Parameter")]
    parameter: SsmParameter,
}

#[derive(Deserialize)]
struct SsmParameter {
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Deserialize)]
struct SsmErrorResponse {
    #[serde(rename = "__type")]
    error_type: Option<String>,
    #[serde(alias = "Message")]
    message: Option<String>,
}

impl Ec2Provider {
    pub fn new(
        endpoint_override: Option<&str>,
        poll_interval: Duration,
        request_timeout: Duration,
    ) -> Result<Self, CloudError> {
        let client = Client::builder()
            .timeout(request_timeout)
            .build()
            .map_err(|e| CloudError::Http(format!("Failed to create HTTP client: {}", e)))?;

        let endpoint_override = endpoint_override
            .map(|endpoint| {
                Url::parse(endpoint).map_err(|e| {
                    CloudError::Rejected(format!("Invalid endpoint '{}': {}", endpoint, e))
                })
            })
            .transpose()?;

        Ok(Self {
            client,
            endpoint_override,
            poll_interval,
        })
    }

    fn endpoint(&self, service: &str, target: &CloudTarget) -> Result<Url, CloudError> {
        if let Some(endpoint) = &self.endpoint_override {
            return Ok(endpoint.clone());
        }
        let endpoint = format!("https://{}.{}.amazonaws.com/", service, target.region);
        Url::parse(&endpoint).map_err(|e| CloudError::Rejected(e.to_string()))
    }

    /// Send a signed request and return the raw response body
    async fn send_signed(
        &self,
        service: &str,
        target: &CloudTarget,
        headers: &[(&str, &str)],
        body: String,
    ) -> Result<(reqwest::StatusCode, String), CloudError> {
        let url = self.endpoint(service, target)?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(CloudError::Rejected(format!("Endpoint has no host: {}", url))),
        };

        let mut signed_headers: Vec<(&str, &str)> = vec![("host", host.as_str())];
        signed_headers.extend_from_slice(headers);

        let auth_headers = sigv4::sign(
            &CanonicalRequest {
                method: "POST",
                path: url.path(),
                query: "",
                headers: &signed_headers,
                body: body.as_bytes(),
            },
            &target.credentials,
            target.region.as_str(),
            service,
            time::OffsetDateTime::now_utc(),
        )?;

        let mut request = self.client.post(url.clone()).body(body);
        for (name, value) in headers {
            request = request.header(*name, *value);
        }
        for (name, value) in auth_headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| CloudError::Http(e.to_string()))?;
        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| CloudError::Http(e.to_string()))?;

        Ok((status, text))
    }

    /// Call an EC2 Query API action
    async fn ec2_call(
        &self,
        target: &CloudTarget,
        action: &str,
        params: &[(&str, &str)],
    ) -> Result<String, CloudError> {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("Action", action)
            .append_pair("Version", EC2_API_VERSION)
            .extend_pairs(params.iter())
            .finish();

        let (status, text) = self
            .send_signed("ec2", target, &[("content-type", FORM_CONTENT_TYPE)], body)
            .await?;

        if let Some(err) = parse_xml_error(&text) {
            return Err(err);
        }
        if !status.is_success() {
            return Err(CloudError::Http(format!("{} returned HTTP {}", action, status)));
        }

        tracing::debug!(action = action, region = %target.region, "EC2 call succeeded");
        Ok(text)
    }

    async fn describe_instance(
        &self,
        target: &CloudTarget,
        instance_id: &str,
    ) -> Result<InstanceDescription, CloudError> {
        let body = self
            .ec2_call(target, "DescribeInstances", &[("InstanceId.1", instance_id)])
            .await?;
        parse_instance_description(&body)
    }
}

#[async_trait]
impl CloudProvider for Ec2Provider {
    async fn resolve_latest_image_id(&self, target: &CloudTarget) -> Result<String, CloudError> {
        let body = serde_json::to_string(&GetParameterRequest {
            name: LATEST_IMAGE_PARAMETER,
        })
        .map_err(|e| CloudError::Rejected(e.to_string()))?;

        let (status, text) = self
            .send_signed(
                "ssm",
                target,
                &[
                    ("content-type", SSM_CONTENT_TYPE),
                    ("x-amz-target", SSM_GET_PARAMETER),
                ],
                body,
            )
            .await?;

        if !status.is_success() {
            let err: SsmErrorResponse = serde_json::from_str(&text).map_err(|_| {
                CloudError::Http(format!("GetParameter returned HTTP {}", status))
            })?;
            return Err(CloudError::Api {
                code: err
                    .error_type
                    .map(|t| t.rsplit('#').next().unwrap_or_default().to_string())
                    .unwrap_or_else(|| status.to_string()),
                message: err.message.unwrap_or_default(),
            });
        }

        let response: GetParameterResponse = serde_json::from_str(&text).map_err(|e| {
            CloudError::UnexpectedResponse(format!("Invalid GetParameter response: {}", e))
        })?;
        Ok(response.parameter.value)
    }

    async fn launch_instance(
        &self,
        target: &CloudTarget,
        spec: &LaunchSpec,
    ) -> Result<String, CloudError> {
        let body = self
            .ec2_call(
                target,
                "RunInstances",
                &[
                    ("ImageId", spec.image_id.as_str()),
                    ("InstanceType", spec.instance_type.as_str()),
                    ("MinCount", "1"),
                    ("MaxCount", "1"),
                    ("TagSpecification.1.ResourceType", "instance"),
                    ("TagSpecification.1.Tag.1.Key", "Name"),
                    ("TagSpecification.1.Tag.1.Value", spec.name.as_str()),
                ],
            )
            .await?;

        xml_text(&body, "instanceId")
            .map(str::to_string)
            .ok_or_else(|| {
                CloudError::UnexpectedResponse("AWS did not return an instance id".to_string())
            })
    }

    async fn wait_until_running(
        &self,
        target: &CloudTarget,
        instance_id: &str,
        max_wait: Duration,
    ) -> Result<WaitOutcome, CloudError> {
        let deadline = Instant::now() + max_wait;

        loop {
            match self.describe_instance(target, instance_id).await {
                Ok(description) if description.state == "running" => {
                    return Ok(WaitOutcome::Running);
                }
                Ok(description) if NON_STARTING_STATES.contains(&description.state.as_str()) => {
                    return Ok(WaitOutcome::NotRunning(description.state));
                }
                Ok(description) => {
                    tracing::debug!(instance_id = instance_id, state = %description.state, "Instance not running yet");
                }
                // A freshly launched instance may not be visible to Describe yet
                Err(CloudError::Api { code, .. }) if code == INSTANCE_NOT_FOUND => {}
                Err(e) => return Err(e),
            }

            let now = Instant::now();
            if now >= deadline {
                return Ok(WaitOutcome::NotRunning("TIMEOUT".to_string()));
            }
            tokio::time::sleep(self.poll_interval.min(deadline - now)).await;
        }
    }

    async fn get_public_address(
        &self,
        target: &CloudTarget,
        instance_id: &str,
    ) -> Result<String, CloudError> {
        self.describe_instance(target, instance_id)
            .await?
            .public_ip
            .ok_or_else(|| {
                CloudError::UnexpectedResponse(
                    "Instance is running but public IP is not available".to_string(),
                )
            })
    }
}

fn parse_instance_description(body: &str) -> Result<InstanceDescription, CloudError> {
    let state = xml_text(body, "instanceState")
        .and_then(|section| xml_text(section, "name"))
        .ok_or_else(|| {
            CloudError::UnexpectedResponse("Instance state missing from DescribeInstances".to_string())
        })?;

    Ok(InstanceDescription {
        state: state.to_string(),
        public_ip: xml_text(body, "ipAddress").map(str::to_string),
    })
}

/// `<Response><Errors><Error><Code/><Message/></Error></Errors></Response>`
fn parse_xml_error(body: &str) -> Option<CloudError> {
    let error = xml_text(body, "Error")?;
    let code = xml_text(error, "Code")?;
    let message = xml_text(error, "Message").unwrap_or_default();

    Some(CloudError::Api {
        code: unescape_xml(code),
        message: unescape_xml(message),
    })
}

/// Text of the first `<tag>...</tag>` element.
///
/// EC2 replies are flat enough that the first match is the one wanted; callers
/// narrow to a parent element first where a tag name repeats.
fn xml_text<'a>(xml: &'a str, tag: &str) -> Option<&'a str> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);
    let start = xml.find(&open)? + open.len();
    let end = start + xml[start..].find(&close)?;
    Some(xml[start..end].trim())
}

fn unescape_xml(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
