//! Profile command handlers - listing, adding, removing and default selection.

use chrono_humanize::HumanTime;

use crate::error::{MprofError, Result};
use crate::profile::{ConnectionProfile, Environment, ProfileStore, normalize_uri};

/// Options collected by `mprof add`.
#[derive(Debug, Default)]
pub struct AddArgs {
    pub name: String,
    pub uri: String,
    pub database: Option<String>,
    pub alias: Option<String>,
    pub tags: Vec<String>,
    pub env: Option<String>,
    pub description: Option<String>,
    pub default: bool,
}

/// Handle the list command - one line per profile
pub async fn handle_list(store: &ProfileStore) -> Result<()> {
    let profiles = store.list().await?;

    if profiles.is_empty() {
        eprintln!("No profiles yet. Add one with 'mprof add NAME URI'.");
        return Ok(());
    }

    for profile in profiles {
        let marker = if profile.is_default() { "*" } else { " " };
        let env = profile
            .metadata
            .environment
            .as_ref()
            .map(|e| format!(" [{}]", e))
            .unwrap_or_default();
        let used = profile
            .metadata
            .last_used
            .map(|t| format!("used {}", HumanTime::from(t)))
            .unwrap_or_else(|| "never used".to_string());
        println!(
            "{} {}{}  {}  ({})",
            marker,
            profile.name,
            env,
            mask_uri(&profile.uri),
            used
        );
    }

    Ok(())
}

/// Handle the show command - print one profile in detail
pub async fn handle_show(store: &ProfileStore, name: &str) -> Result<()> {
    let profile = store
        .get(name)
        .await?
        .ok_or_else(|| MprofError::not_found(format!("profile '{}'", name)))?;

    println!("Name:        {}", profile.name);
    println!("URI:         {}", mask_uri(&profile.uri));
    if let Some(db) = &profile.database {
        println!("Database:    {}", db);
    }
    if let Some(alias) = &profile.alias {
        println!("Alias:       {}", alias);
    }
    if !profile.tags.is_empty() {
        println!("Tags:        {}", profile.tags.join(", "));
    }
    if let Some(env) = &profile.metadata.environment {
        println!("Environment: {}", env);
    }
    if let Some(desc) = &profile.metadata.description {
        println!("Description: {}", desc);
    }
    println!("Default:     {}", if profile.is_default() { "yes" } else { "no" });
    println!("Created:     {}", HumanTime::from(profile.metadata.created_at));
    if let Some(t) = profile.metadata.last_used {
        println!("Last used:   {}", HumanTime::from(t));
    }
    if let Some(t) = profile.metadata.last_tested {
        println!("Last tested: {}", HumanTime::from(t));
    }

    Ok(())
}

/// Handle the add command
pub async fn handle_add(store: &ProfileStore, args: AddArgs) -> Result<()> {
    let mut profile = ConnectionProfile::new(args.name, normalize_uri(&args.uri)).with_tags(args.tags);
    if let Some(db) = args.database {
        profile = profile.with_database(db);
    }
    if let Some(alias) = args.alias {
        profile = profile.with_alias(alias);
    }
    if let Some(env) = args.env {
        profile = profile.with_environment(Environment::from(env));
    }
    if let Some(desc) = args.description {
        profile = profile.with_description(desc);
    }
    if args.default {
        profile = profile.as_default();
    }

    let name = profile.name.clone();
    store.add(profile).await?;
    println!("Added profile '{}'", name);
    Ok(())
}

/// Handle the remove command
pub async fn handle_remove(store: &ProfileStore, name: &str) -> Result<()> {
    if store.remove(name).await? {
        println!("Removed profile '{}'", name);
        Ok(())
    } else {
        Err(MprofError::not_found(format!("profile '{}'", name)))
    }
}

/// Handle the default command - show or set the default profile
pub async fn handle_default(store: &ProfileStore, name: Option<String>) -> Result<()> {
    match name {
        Some(name) => {
            if !store.set_default(&name).await? {
                return Err(MprofError::not_found(format!("profile '{}'", name)));
            }
            println!("Default profile is now '{}'", name);
        }
        None => match store.get_default().await? {
            Some(profile) => println!("{}", profile.name),
            None => eprintln!("No default profile set. Use 'mprof default NAME'."),
        },
    }
    Ok(())
}

/// Look up `name`, or the default profile when no name is given.
pub(crate) async fn resolve_profile(store: &ProfileStore, name: Option<&str>) -> Result<ConnectionProfile> {
    match name {
        Some(name) => store
            .get(name)
            .await?
            .ok_or_else(|| MprofError::not_found(format!("profile '{}'", name))),
        None => store.get_default().await?.ok_or_else(|| {
            MprofError::not_found("no profile given and no default profile set".to_string())
        }),
    }
}

/// Replace the password part of `user:password@` with asterisks.
pub(crate) fn mask_uri(uri: &str) -> String {
    let Some((scheme, rest)) = uri.split_once("://") else {
        return uri.to_string();
    };
    let Some(at) = rest.rfind('@') else {
        return uri.to_string();
    };
    let (userinfo, hosts) = rest.split_at(at);
    match userinfo.split_once(':') {
        Some((user, _)) => format!("{}://{}:****{}", scheme, user, hosts),
        None => uri.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mask_uri() {
        assert_eq!(
            mask_uri("mongodb://admin:s3cret@db:27017/app"),
            "mongodb://admin:****@db:27017/app"
        );
        assert_eq!(mask_uri("mongodb://db:27017"), "mongodb://db:27017");
        assert_eq!(mask_uri("mongodb://user@db"), "mongodb://user@db");
    }
}
