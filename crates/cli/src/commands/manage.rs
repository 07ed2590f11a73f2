use crate::di::AdblockServices;
use anyhow::{bail, Context};
use clap::Subcommand;
use ferrous_adblock_application::configuration::{
    FilteringConfiguration, PersistentFilteringConfiguration,
};
use ferrous_adblock_application::ports::FilteringConfigurationCleaner;
use ferrous_adblock_domain::config::DefaultConfiguration;
use ferrous_adblock_domain::validators;
use url::Url;

#[derive(Debug, Subcommand)]
pub enum ConfigAction {
    Enable,
    Disable,
    AddList { url: String },
    RemoveList { url: String },
    AddFilter { filter: String },
    RemoveFilter { filter: String },
    AddDomain { domain: String },
    RemoveDomain { domain: String },
}

fn open_existing(services: &AdblockServices, name: &str) -> anyhow::Result<PersistentFilteringConfiguration> {
    let names = PersistentFilteringConfiguration::persisted_names(services.prefs.as_ref());
    if !names.iter().any(|n| n == name) {
        bail!("No filtering configuration named {name:?}");
    }
    Ok(PersistentFilteringConfiguration::new(services.prefs.clone(), name))
}

fn parse_list_url(value: &str) -> anyhow::Result<Url> {
    let url = Url::parse(value).with_context(|| format!("invalid filter list URL {value}"))?;
    validators::validate_filter_list_url(&url)?;
    Ok(url)
}

/// Prints every persisted configuration with what is known about its lists.
pub fn list_configurations(services: &AdblockServices) -> anyhow::Result<()> {
    // Restoring creates the first-run defaults, matching what `run` would do.
    let configurations = services.restore_configurations();
    for configuration in configurations {
        let state = if configuration.is_enabled() { "enabled" } else { "disabled" };
        println!("{} ({state})", configuration.name());

        for list in configuration.filter_lists() {
            let version = services.metadata.version(&list);
            let installed = services
                .metadata
                .last_installation_time(&list)
                .map(|t| t.to_rfc3339())
                .unwrap_or_else(|| "never".to_string());
            let auto = if services.metadata.is_auto_installed(&list) { " [auto]" } else { "" };
            println!("  list    {list}{auto} version={version:?} installed={installed}");
        }
        for domain in configuration.allowed_domains() {
            println!("  allow   {domain}");
        }
        for filter in configuration.custom_filters() {
            println!("  filter  {filter}");
        }
    }
    Ok(())
}

pub fn create_configuration(services: &AdblockServices, name: &str) -> anyhow::Result<()> {
    validators::validate_configuration_name(name)?;
    let names = PersistentFilteringConfiguration::persisted_names(services.prefs.as_ref());
    if names.iter().any(|n| n == name) {
        bail!("Filtering configuration {name:?} already exists");
    }
    services.create_configuration(&DefaultConfiguration {
        name: name.to_string(),
        enabled: true,
        filter_lists: vec![],
        allowed_domains: vec![],
        custom_filters: vec![],
    });
    println!("Created {name}");
    Ok(())
}

pub async fn remove_configuration(services: &AdblockServices, name: &str) -> anyhow::Result<()> {
    open_existing(services, name)?;
    services.cleaner.clean(name).await;
    println!("Removed {name}");
    Ok(())
}

pub fn update_configuration(
    services: &AdblockServices,
    name: &str,
    action: ConfigAction,
) -> anyhow::Result<()> {
    let configuration = open_existing(services, name)?;
    let changed = match action {
        ConfigAction::Enable => configuration.set_enabled(true),
        ConfigAction::Disable => configuration.set_enabled(false),
        ConfigAction::AddList { url } => configuration.add_filter_list(&parse_list_url(&url)?),
        ConfigAction::RemoveList { url } => configuration.remove_filter_list(&parse_list_url(&url)?),
        ConfigAction::AddFilter { filter } => {
            validators::validate_custom_filter(&filter)?;
            configuration.add_custom_filter(&filter)
        }
        ConfigAction::RemoveFilter { filter } => configuration.remove_custom_filter(&filter),
        ConfigAction::AddDomain { domain } => {
            validators::validate_domain(&domain)?;
            configuration.add_allowed_domain(&domain)
        }
        ConfigAction::RemoveDomain { domain } => configuration.remove_allowed_domain(&domain),
    };
    println!("{}", if changed { "Updated" } else { "Unchanged" });
    Ok(())
}
