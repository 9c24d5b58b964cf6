use std::path::PathBuf;

use playground_gateway::generate_openapi_json;

/// Writes the gateway's OpenAPI document, to `openapi.json` unless a path is
/// given as the first argument.
fn main() {
    let output_path = std::env::args_os()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("openapi.json"));

    if let Err(e) = generate_openapi_json(&output_path) {
        eprintln!(
            "Failed to write gateway OpenAPI document to {}: {}",
            output_path.display(),
            e
        );
        std::process::exit(1);
    }

    println!("Documented endpoints: /health, /search, /shell/exec/{{command}}");
}
