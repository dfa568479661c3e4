//! REST client for the Easel server plus bitmap reconstitution.

use canvas::element::{Element, ElementKind};
use image::GenericImageView;
use serde_json::Value;
use uuid::Uuid;

use crate::CliError;

/// Thin wrapper over `reqwest` bound to one server base URL.
pub struct ApiClient {
    base_url: String,
    client: reqwest::Client,
}

impl ApiClient {
    /// # Errors
    ///
    /// Returns an error if the underlying HTTP client cannot be built.
    pub fn new(base_url: &str) -> Result<Self, CliError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self { base_url: base_url.trim_end_matches('/').to_owned(), client })
    }

    /// `GET /healthz`.
    ///
    /// # Errors
    ///
    /// Returns a server error for non-2xx responses.
    pub async fn ping(&self) -> Result<(), CliError> {
        let response = self.client.get(format!("{}/healthz", self.base_url)).send().await?;
        if !response.status().is_success() {
            return Err(CliError::ServerError {
                context: format!("HTTP {}", response.status().as_u16()),
                message: "health check failed".to_owned(),
            });
        }
        Ok(())
    }

    /// `POST /api/projects`.
    ///
    /// # Errors
    ///
    /// Returns a server error for non-2xx responses.
    pub async fn create_project(&self, name: &str) -> Result<Value, CliError> {
        self.request(reqwest::Method::POST, "/api/projects", Some(serde_json::json!({ "name": name })))
            .await
    }

    /// `GET /api/projects`.
    ///
    /// # Errors
    ///
    /// Returns a server error for non-2xx responses.
    pub async fn list_projects(&self) -> Result<Value, CliError> {
        self.request(reqwest::Method::GET, "/api/projects", None).await
    }

    /// `GET /api/projects/:id` — the full `{id, name, doc, updatedAt}` record.
    ///
    /// # Errors
    ///
    /// Returns a server error for non-2xx responses.
    pub async fn fetch_project(&self, project_id: Uuid) -> Result<Value, CliError> {
        self.request(reqwest::Method::GET, &format!("/api/projects/{project_id}"), None)
            .await
    }

    /// `PATCH /api/projects/:id` — replace the document wholesale.
    ///
    /// # Errors
    ///
    /// Returns a server error for non-2xx responses.
    pub async fn save_doc(&self, project_id: Uuid, doc: &Value) -> Result<(), CliError> {
        self.request(reqwest::Method::PATCH, &format!("/api/projects/{project_id}"), Some(doc.clone()))
            .await?;
        Ok(())
    }

    async fn request(&self, method: reqwest::Method, path: &str, body: Option<Value>) -> Result<Value, CliError> {
        let url = format!("{}{}", self.base_url, path);
        let request = self.client.request(method, &url);
        let request = if let Some(json) = body { request.json(&json) } else { request };

        let response = request.send().await?;
        let status = response.status();
        let value = response.json::<Value>().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(CliError::ServerError {
                context: format!("HTTP {} {}", status.as_u16(), url),
                message: value.to_string(),
            });
        }
        Ok(value)
    }

    /// Reconstitute bitmap handles after a load: fetch each image-bearing
    /// element's source and refresh its natural dimensions from the decoded
    /// bitmap. Fetches are awaited one by one; an element whose bitmap cannot
    /// be fetched or decoded keeps its stored dimensions.
    pub async fn reconstitute_images(&self, elements: &mut [Element]) -> ReconstituteReport {
        let mut report = ReconstituteReport::default();

        for element in elements.iter_mut() {
            let Some((src, natural_width, natural_height)) = image_slot(&mut element.kind) else {
                continue;
            };
            report.attempted += 1;

            match self.fetch_dimensions(&src).await {
                Ok((w, h)) => {
                    *natural_width = f64::from(w);
                    *natural_height = f64::from(h);
                    report.refreshed += 1;
                }
                Err(_) => report.failed += 1,
            }
        }

        report
    }

    async fn fetch_dimensions(&self, src: &str) -> Result<(u32, u32), CliError> {
        let bytes = self.client.get(src).send().await?.error_for_status()?.bytes().await?;
        let decoded = image::load_from_memory(&bytes)?;
        Ok(decoded.dimensions())
    }
}

/// Outcome of a bitmap-reconstitution pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReconstituteReport {
    pub attempted: usize,
    pub refreshed: usize,
    pub failed: usize,
}

/// Borrow the source URL and natural-dimension slots of an image-bearing
/// element kind.
fn image_slot(kind: &mut ElementKind) -> Option<(String, &mut f64, &mut f64)> {
    match kind {
        ElementKind::Image { src, natural_width, natural_height }
        | ElementKind::Upload { src, natural_width, natural_height, .. }
        | ElementKind::GeneratedImage { src, natural_width, natural_height, .. } => {
            Some((src.clone(), natural_width, natural_height))
        }
        _ => None,
    }
}
