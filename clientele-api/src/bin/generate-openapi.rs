//! OpenAPI Specification Generator Binary
//!
//! Writes the Clientele OpenAPI document as JSON to stdout.
//!
//! Usage:
//!   cargo run -p clientele-api --bin generate-openapi > openapi.json

use clientele_api::ApiDoc;
use utoipa::OpenApi;

fn main() {
    match ApiDoc::openapi().to_pretty_json() {
        Ok(json) => println!("{}", json),
        Err(e) => {
            eprintln!("Failed to serialize OpenAPI document: {}", e);
            std::process::exit(1);
        }
    }
}
