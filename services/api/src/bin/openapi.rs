//! services/api/src/bin/openapi.rs
//!
//! Writes the OpenAPI specification of the study assistant's REST API.
//! The output path may be given as the first argument; it defaults to `openapi.json`.

use study_api::web::rest::ApiDoc;
use utoipa::OpenApi;

const DEFAULT_OUTPUT: &str = "openapi.json";

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::args().nth(1).unwrap_or_else(|| DEFAULT_OUTPUT.to_string());
    let spec_json = ApiDoc::openapi().to_pretty_json()?;
    std::fs::write(&path, spec_json)?;
    println!("✅ OpenAPI specification for {} paths generated at {}", ApiDoc::openapi().paths.paths.len(), path);
    Ok(())
}
