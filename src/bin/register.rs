// Registers the plugin manifest with the agent platform.

use postgresql_plugin::config::RegistrationConfig;
use postgresql_plugin::registration::Registrar;
use std::process::ExitCode;

#[tokio::main]
async fn main() -> ExitCode {
    dotenv::dotenv().ok();

    let config = match RegistrationConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Registering PostgreSQL plugin...");
    println!("API URL: {}", config.api_url);
    println!("Space ID: {}", config.space_id);
    if let Some(ref project_id) = config.project_id {
        println!("Project ID: {}", project_id);
    }

    let registrar = match Registrar::new(config) {
        Ok(registrar) => registrar,
        Err(e) => {
            eprintln!("Registration failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match registrar.register().await {
        Ok(response) => {
            println!("Plugin registered successfully!");
            if let Some(data) = response.data {
                println!("Plugin ID: {}", data.plugin_id);
            }
            println!("Next steps:");
            println!("  1. Start the plugin server with: cargo run --bin postgresql-plugin");
            println!("  2. Update the server URL in the plugin configuration if needed");
            println!("  3. Test the plugin from the platform");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Plugin registration failed:");
            eprintln!("   {}", e);

            let hints = registrar.hints(&e);
            if !hints.is_empty() {
                println!();
                println!("Common fixes:");
                for hint in hints {
                    println!("   - {}", hint);
                }
            }
            ExitCode::FAILURE
        }
    }
}
