use std::fs;
use std::path::Path;

use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Playground Gateway API",
        version = "0.1.0",
        description = "Runs key-value store commands on a shared playground instance over HTTP",
        license(
            name = "MIT",
            url = "https://opensource.org/licenses/MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
        (url = "/", description = "Current server")
    ),
    paths(
        crate::api::handlers::health,
        crate::api::handlers::execute_command,
        crate::api::handlers::search,
    ),
    components(schemas(
        crate::api::handlers::HealthResponse,
        crate::domain::models::ExecResponse,
        crate::domain::models::SearchResponse,
        crate::domain::models::CommandDoc,
        crate::error::ErrorResponse,
    )),
    tags(
        (name = "Health", description = "Liveness and current rate-limit window"),
        (name = "Shell", description = "Store command execution"),
        (name = "Search", description = "Command catalog search")
    )
)]
pub struct ApiDoc;

pub fn generate_openapi_json(
    output_path: impl AsRef<Path>,
) -> Result<(), Box<dyn std::error::Error>> {
    let openapi_json = ApiDoc::openapi().to_pretty_json()?;

    if let Some(parent) = output_path.as_ref().parent() {
        fs::create_dir_all(parent)?;
    }

    fs::write(output_path.as_ref(), openapi_json)?;

    println!(
        "OpenAPI specification generated successfully at: {}",
        output_path.as_ref().display()
    );

    Ok(())
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}
