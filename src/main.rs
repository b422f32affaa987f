use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use solidserver_ipam::backend::SolidServerBackend;
use solidserver_ipam::client::{RestTransport, SolidServerClient};
use solidserver_ipam::config::settings::{ApplicationCommand, SubnetCommand};
use solidserver_ipam::config::{CliArgs, Command, ProviderConfig};
use solidserver_ipam::resources::{
    group, space, ApplicationConfig, ApplicationResource, ClassParameters, SubnetConfig, SubnetResource,
};
use solidserver_ipam::utils::logging;

fn class_parameters(pairs: Vec<(String, String)>) -> ClassParameters {
    pairs.into_iter().collect()
}

fn print_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn run_subnet(resource: SubnetResource, command: SubnetCommand) -> anyhow::Result<()> {
    match command {
        SubnetCommand::Create { space, block, size, name, gateway_offset, terminal, class, params } => {
            let config = SubnetConfig {
                space,
                block,
                size,
                name,
                gateway_offset,
                terminal,
                class,
                class_parameters: class_parameters(params),
            };
            print_json(&resource.create(&config).await?)
        }
        SubnetCommand::Show { id } => print_json(&resource.import(&id).await?),
        SubnetCommand::Exists { id } => print_json(&resource.exists(&id).await?),
        SubnetCommand::Update { id, name, class, params } => {
            let current = resource.import(&id).await?;
            let mut desired = current.to_config();
            if let Some(name) = name {
                desired.name = name;
            }
            if let Some(class) = class {
                desired.class = class;
            }
            desired.class_parameters.extend(params);
            print_json(&resource.update(&current, &desired).await?)
        }
        SubnetCommand::Delete { id } => {
            let current = resource.import(&id).await?;
            resource.delete(&current).await?;
            Ok(())
        }
    }
}

async fn run_application(resource: ApplicationResource, command: ApplicationCommand) -> anyhow::Result<()> {
    match command {
        ApplicationCommand::Create { name, class, params } => {
            let config = ApplicationConfig { name, class, class_parameters: class_parameters(params) };
            print_json(&resource.create(&config).await?)
        }
        ApplicationCommand::Show { id } => print_json(&resource.import(&id).await?),
        ApplicationCommand::Exists { id } => print_json(&resource.exists(&id).await?),
        ApplicationCommand::Update { id, name, class, params } => {
            let current = resource.import(&id).await?;
            let mut desired = ApplicationConfig {
                name: current.name,
                class: current.class,
                class_parameters: current.class_parameters,
            };
            if let Some(name) = name {
                desired.name = name;
            }
            if let Some(class) = class {
                desired.class = class;
            }
            desired.class_parameters.extend(params);
            print_json(&resource.update(&id, &desired).await?)
        }
        ApplicationCommand::Delete { id } => resource.delete(&id).await.map_err(Into::into),
    }
}

async fn run(config: ProviderConfig, command: Command) -> anyhow::Result<()> {
    let transport: Arc<dyn RestTransport> = Arc::new(SolidServerClient::new(&config)?);

    match command {
        Command::Subnet(command) => {
            let backend = Arc::new(SolidServerBackend::new(transport));
            let resource = SubnetResource::new(backend, config.max_find, config.claim_jitter());
            run_subnet(resource, command).await
        }
        Command::Application(command) => run_application(ApplicationResource::new(transport), command).await,
        Command::Space { name } => print_json(&space::lookup(transport.as_ref(), &name).await?),
        Command::Group { name } => print_json(&group::lookup(transport.as_ref(), &name).await?),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command line arguments
    let args = CliArgs::parse();

    // File, then flags and environment; logging settings come from the merged result
    let config = ProviderConfig::from_args(&args).context("Invalid provider configuration")?;

    // Initialize logging; the guard flushes the log file on exit
    let _guard = match &config.log_file {
        Some(path) => Some(logging::init_file_logging(&config.log_level, path)?),
        None => {
            logging::init_logging(&config.log_level)?;
            None
        }
    };

    info!("Using SOLIDserver at {} as {}", config.base_url(), config.username);

    if let Err(e) = run(config, args.command).await {
        error!("{:#}", e);
        return Err(e);
    }

    Ok(())
}
